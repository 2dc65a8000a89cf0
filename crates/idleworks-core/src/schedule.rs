//! Scheduled continuations: delayed actions stored as data and resolved by
//! id when they come due.

use slotmap::SlotMap;

use crate::fixed::Ticks;
use crate::id::{ActionId, ProjectId};
use crate::item::Item;

/// What to do when a scheduled action comes due. Holds handles, never
/// references, so the target is looked up again at completion time.
#[derive(Debug, PartialEq, Eq)]
pub enum Continuation {
    /// Finish the build of one construction slot, consuming `item`.
    BuildSlot {
        project: ProjectId,
        slot: usize,
        item: Item,
    },
}

impl Continuation {
    pub fn project(&self) -> Option<ProjectId> {
        match self {
            Continuation::BuildSlot { project, .. } => Some(*project),
        }
    }
}

#[derive(Debug)]
struct ScheduledAction {
    due: Ticks,
    seq: u64,
    continuation: Continuation,
}

/// Arena of pending continuations.
#[derive(Debug, Default)]
pub struct Scheduler {
    actions: SlotMap<ActionId, ScheduledAction>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `continuation` to fire `duration` ticks after `now`. A
    /// duration of zero is treated as one tick, so nothing scheduled during a
    /// step fires in that same step.
    pub fn schedule(&mut self, now: Ticks, duration: Ticks, continuation: Continuation) -> ActionId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.actions.insert(ScheduledAction {
            due: now + duration.max(1),
            seq,
            continuation,
        })
    }

    /// Remove and return every continuation due at or before `now`, ordered
    /// by due tick and then by scheduling order.
    pub fn take_due(&mut self, now: Ticks) -> Vec<Continuation> {
        let mut due: Vec<(Ticks, u64, ActionId)> = self
            .actions
            .iter()
            .filter(|(_, a)| a.due <= now)
            .map(|(id, a)| (a.due, a.seq, id))
            .collect();
        due.sort_unstable();
        due.into_iter()
            .filter_map(|(_, _, id)| self.actions.remove(id))
            .map(|a| a.continuation)
            .collect()
    }

    /// Cancel every continuation matching `pred`, returned in scheduling
    /// order.
    pub fn cancel_where(&mut self, pred: impl Fn(&Continuation) -> bool) -> Vec<Continuation> {
        let mut matched: Vec<(u64, ActionId)> = self
            .actions
            .iter()
            .filter(|(_, a)| pred(&a.continuation))
            .map(|(id, a)| (a.seq, id))
            .collect();
        matched.sort_unstable();
        matched
            .into_iter()
            .filter_map(|(_, id)| self.actions.remove(id))
            .map(|a| a.continuation)
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
