//! Construction projects: an ordered list of required item types consumed
//! one slot at a time, with several slot builds allowed in flight at once.
//!
//! Slot builds may finish in any order. Finished slots park in a set until
//! every lower slot has finished too; only then is the completion pointer
//! advanced past them (the flush), so progress is always reported in slot
//! order.
//!
//! `in_flight` counts claimed slots that have not been flushed yet. It drops
//! when a slot is flushed, not when its build finishes, so
//! `next_index + in_flight` is always the next unclaimed slot. Decrementing
//! at completion would hand a finished but unflushed slot out a second time.

use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::fixed::{fraction, Fixed64, Ticks};
use crate::id::{ItemTypeId, ProjectId};
use crate::movement::Position;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProjectConfig {
    /// Required item type for each slot, in build order.
    pub slots: Vec<ItemTypeId>,
    /// Default delay between accepting an item and finishing its slot.
    pub build_duration: Ticks,
    pub position: Position,
}

impl ProjectConfig {
    pub fn new(slots: Vec<ItemTypeId>, build_duration: Ticks) -> Self {
        Self {
            slots,
            build_duration,
            position: Position::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::ZeroCapacity {
                component: "construction project",
            });
        }
        Ok(())
    }
}

/// Decides how long each slot build takes once its item is accepted.
pub trait BuildAnimation: std::fmt::Debug {
    fn build_duration(&mut self, project: ProjectId, slot: usize, default: Ticks) -> Ticks {
        let _ = (project, slot);
        default
    }
}

/// Uses each project's configured build duration unchanged.
#[derive(Debug, Default)]
pub struct ConfiguredDuration;

impl BuildAnimation for ConfiguredDuration {}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why an offered item was not accepted. The offered item is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReceiveRejection {
    #[error("project is already complete")]
    Complete,
    #[error("every remaining slot is already claimed")]
    NoOpenSlot,
    #[error("slot requires {expected:?}, got {got:?}")]
    TypeMismatch { expected: ItemTypeId, got: ItemTypeId },
    #[error("project is not active")]
    Inactive,
    #[error("no such project")]
    Missing,
}

/// What finishing one slot build changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SlotCompletion {
    /// Slots flushed by this completion, ascending.
    pub flushed: Vec<usize>,
    /// The last slot was flushed by this completion.
    pub completed_now: bool,
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Invariants: `next_index + in_flight <= len()`; every index in `finished`
/// lies in `next_index..next_index + in_flight`.
#[derive(Debug, Clone)]
pub struct ConstructionProject {
    slots: Vec<ItemTypeId>,
    /// Lowest slot not yet flushed.
    next_index: usize,
    /// Slots claimed but not yet flushed, finished or not.
    in_flight: usize,
    finished: BTreeSet<usize>,
    complete: bool,
    build_duration: Ticks,
    position: Position,
    active: bool,
}

impl ConstructionProject {
    pub(crate) fn new(config: ProjectConfig) -> Self {
        Self {
            slots: config.slots,
            next_index: 0,
            in_flight: 0,
            finished: BTreeSet::new(),
            complete: false,
            build_duration: config.build_duration,
            position: config.position,
            active: true,
        }
    }

    /// Type of the first unclaimed slot, `None` once all slots are claimed.
    pub fn next_required_type(&self) -> Option<ItemTypeId> {
        if self.complete {
            return None;
        }
        self.slots.get(self.next_index + self.in_flight).copied()
    }

    pub fn needs_product(&self, item_type: ItemTypeId) -> bool {
        self.active && self.next_required_type() == Some(item_type)
    }

    /// Claim the first unclaimed slot for an item of `item_type`.
    pub fn claim_slot(&mut self, item_type: ItemTypeId) -> Result<usize, ReceiveRejection> {
        if self.complete {
            return Err(ReceiveRejection::Complete);
        }
        if !self.active {
            return Err(ReceiveRejection::Inactive);
        }
        let slot = self.next_index + self.in_flight;
        let Some(&expected) = self.slots.get(slot) else {
            return Err(ReceiveRejection::NoOpenSlot);
        };
        if expected != item_type {
            return Err(ReceiveRejection::TypeMismatch {
                expected,
                got: item_type,
            });
        }
        self.in_flight += 1;
        Ok(slot)
    }

    /// Record that the build of `slot` finished, then flush every contiguous
    /// finished slot starting at the completion pointer.
    ///
    /// Slots that are not claimed, or already finished, are ignored.
    pub fn complete_slot(&mut self, slot: usize) -> SlotCompletion {
        let mut result = SlotCompletion::default();
        let claimed = self.next_index..self.next_index + self.in_flight;
        if !claimed.contains(&slot) || !self.finished.insert(slot) {
            return result;
        }

        while self.finished.remove(&self.next_index) {
            result.flushed.push(self.next_index);
            self.next_index += 1;
            self.in_flight -= 1;
        }

        if self.next_index == self.slots.len() && !self.complete {
            self.complete = true;
            result.completed_now = true;
        }
        result
    }

    /// Release every unflushed claim. Returns how many claims were dropped.
    pub(crate) fn cancel_in_flight(&mut self) -> usize {
        let dropped = self.in_flight;
        self.in_flight = 0;
        self.finished.clear();
        dropped
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn required_type(&self, slot: usize) -> Option<ItemTypeId> {
        self.slots.get(slot).copied()
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Finished slots waiting on a lower slot, ascending.
    pub fn finished_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.finished.iter().copied()
    }

    /// Fraction of slots flushed.
    pub fn progress(&self) -> Fixed64 {
        fraction(self.next_index as u64, self.slots.len() as u64)
    }

    pub fn build_duration(&self) -> Ticks {
        self.build_duration
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

// ===========================================================================
// Tests
// ===========================================================================
