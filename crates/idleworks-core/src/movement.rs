//! The movement collaborator seam.
//!
//! Path execution lives outside the engine. Agents issue a move order and
//! then poll for arrival once per step; nothing else about the path is
//! inspected.

use crate::fixed::{f64_to_fixed64, Fixed64};
use crate::id::AgentId;

/// A world position. Opaque to the engine: only handed to [`Movement`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: Fixed64,
    pub y: Fixed64,
    pub z: Fixed64,
}

impl Position {
    pub fn new(x: Fixed64, y: Fixed64, z: Fixed64) -> Self {
        Self { x, y, z }
    }

    /// Convenience for initialization from floats.
    pub fn from_f64(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: f64_to_fixed64(x),
            y: f64_to_fixed64(y),
            z: f64_to_fixed64(z),
        }
    }
}

/// Executes move orders for agents.
pub trait Movement: std::fmt::Debug {
    /// Start moving `agent` toward `target`, replacing any previous order.
    fn request_move(&mut self, agent: AgentId, target: Position);

    /// Polled once per step while the agent is in a moving state.
    fn has_arrived(&mut self, agent: AgentId) -> bool;
}

/// Teleports: every agent has always arrived.
#[derive(Debug, Default)]
pub struct InstantMovement;

impl Movement for InstantMovement {
    fn request_move(&mut self, _agent: AgentId, _target: Position) {}

    fn has_arrived(&mut self, _agent: AgentId) -> bool {
        true
    }
}
