use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a bounded container in the engine's container arena.
    pub struct ContainerId;

    /// Identifies a product source (spawner).
    pub struct SourceId;

    /// Identifies a processing station.
    pub struct StationId;

    /// Identifies a construction project.
    pub struct ProjectId;

    /// Identifies an autonomous transport agent.
    pub struct AgentId;

    /// Identifies an overlap-driven carrier (player-style inventory).
    pub struct CarrierId;

    /// Identifies a disposal area.
    pub struct DisposalId;

    /// Identifies an interaction dispatcher.
    pub struct DispatcherId;

    /// Identifies a scheduled continuation.
    pub struct ActionId;
}

/// Identifies an item type in the registry. Equality is by identity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Identifies a single item instance. Minted by the engine, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);
