//! Read-only query API for inspecting simulation state.
//!
//! Snapshot types are owned copies, with no references into engine storage,
//! suitable for UI and for hosts deciding what to show.

use crate::agent::{AgentState, AgentTarget};
use crate::fixed::{Fixed64, Ticks};
use crate::id::{AgentId, ContainerId, ItemTypeId, ProjectId, SourceId, StationId};
use crate::station::StationState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub id: ContainerId,
    pub count: u32,
    pub capacity: u32,
    pub is_full: bool,
    pub type_lock: Option<ItemTypeId>,
    /// Item types oldest to newest.
    pub contents: Vec<ItemTypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub id: SourceId,
    pub produced_type: ItemTypeId,
    pub count: u32,
    pub capacity: u32,
    pub is_full: bool,
    pub active: bool,
    pub ticks_until_spawn: Option<Ticks>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationSnapshot {
    pub id: StationId,
    pub state: StationState,
    /// Progress as a 0..1 fraction. 0 when not busy.
    pub progress: Fixed64,
    /// The type the input area accepts.
    pub accepted_type: Option<ItemTypeId>,
    pub input_count: u32,
    pub input_capacity: u32,
    pub input_full: bool,
    pub processing: Option<ItemTypeId>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSnapshot {
    pub id: ProjectId,
    pub slot_count: usize,
    pub next_index: usize,
    pub in_flight: usize,
    /// Finished slots waiting on a lower slot.
    pub finished: Vec<usize>,
    pub next_required_type: Option<ItemTypeId>,
    pub progress: Fixed64,
    pub complete: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub state: AgentState,
    pub target: Option<AgentTarget>,
    pub held_type: Option<ItemTypeId>,
    pub inventory_count: u32,
    pub inventory_capacity: u32,
    pub active: bool,
}
