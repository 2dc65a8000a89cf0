//! Processing stations: a single-slot consume, wait, produce loop between an
//! input area and an output source.

use crate::error::ConfigError;
use crate::fixed::{fraction, Fixed64, Ticks};
use crate::id::{ContainerId, ItemTypeId, SourceId};
use crate::item::{Container, Item};
use crate::movement::Position;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Static construction parameters for a [`ProcessingStation`].
///
/// Both references are handles; they are resolved when the station is
/// activated, not when it is added.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StationConfig {
    /// Input area the station consumes from (and agents deliver to).
    pub input: Option<ContainerId>,
    /// Source the station emits products into.
    pub output: Option<SourceId>,
    /// Ticks between claiming an input item and emitting the product.
    pub processing_time: Ticks,
    pub position: Position,
}

impl StationConfig {
    pub fn new(input: ContainerId, output: SourceId, processing_time: Ticks) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
            processing_time,
            position: Position::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Why an idle station is not claiming work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StallReason {
    MissingInputs,
    OutputFull,
}

/// Runtime state of a station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StationState {
    /// Inactive, or active but not yet evaluated.
    #[default]
    Idle,
    /// Busy with one claimed item.
    Working { progress: Ticks },
    Stalled { reason: StallReason },
}

/// The outcome of a single tick for a station.
#[derive(Debug, Default)]
pub struct StationResult {
    /// Type of the item claimed from the input this tick.
    pub claimed: Option<ItemTypeId>,
    /// The consumed item whose processing finished this tick. The caller
    /// destroys it and asks the output source for a product.
    pub finished: Option<Item>,
    pub state_changed: bool,
}

// ---------------------------------------------------------------------------
// Station
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ProcessingStation {
    config: StationConfig,
    state: StationState,
    /// The item being processed. Set exactly while `Working`.
    claimed: Option<Item>,
    active: bool,
}

impl ProcessingStation {
    pub(crate) fn new(config: StationConfig) -> Self {
        Self {
            config,
            state: StationState::Idle,
            claimed: None,
            active: false,
        }
    }

    /// Enter the active loop once both references are known to resolve.
    /// `resolves` reports whether the engine knows each handle.
    pub(crate) fn activate(
        &mut self,
        input_resolves: bool,
        output_resolves: bool,
    ) -> Result<(), ConfigError> {
        if self.config.processing_time == 0 {
            return Err(ConfigError::ZeroInterval { component: "station" });
        }
        if self.config.input.is_none() || !input_resolves {
            return Err(ConfigError::MissingReference {
                component: "station",
                reference: "input area",
            });
        }
        if self.config.output.is_none() || !output_resolves {
            return Err(ConfigError::MissingReference {
                component: "station",
                reference: "output source",
            });
        }
        self.active = true;
        Ok(())
    }

    /// Halt the loop. A claimed item is not restored to the input; it is
    /// handed back so the caller can record its loss.
    pub(crate) fn deactivate(&mut self) -> Option<Item> {
        self.active = false;
        self.state = StationState::Idle;
        self.claimed.take()
    }

    /// Advance the station by one tick.
    ///
    /// While working, progress advances and the claim finishes once it
    /// reaches `processing_time`. Otherwise the station claims the most
    /// recent input item if the output has room. Finishing and claiming never
    /// happen in the same tick.
    pub fn tick(&mut self, input: &mut Container, output_full: bool) -> StationResult {
        let mut result = StationResult::default();
        if !self.active {
            return result;
        }

        if let StationState::Working { progress } = &mut self.state {
            *progress += 1;
            if *progress >= self.config.processing_time {
                result.finished = self.claimed.take();
                self.state = StationState::Idle;
                result.state_changed = true;
            }
            return result;
        }

        let new_state = if output_full {
            StationState::Stalled {
                reason: StallReason::OutputFull,
            }
        } else if let Some(item) = input.try_remove_last() {
            result.claimed = Some(item.item_type());
            self.claimed = Some(item);
            StationState::Working { progress: 0 }
        } else {
            StationState::Stalled {
                reason: StallReason::MissingInputs,
            }
        };

        if self.state != new_state {
            self.state = new_state;
            result.state_changed = true;
        }
        result
    }

    pub fn state(&self) -> StationState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, StationState::Working { .. })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Progress of the current claim as a 0..1 fraction; 0 when not busy.
    pub fn progress(&self) -> Fixed64 {
        match self.state {
            StationState::Working { progress } => fraction(progress, self.config.processing_time),
            _ => Fixed64::ZERO,
        }
    }

    /// Type of the item currently being processed.
    pub fn claimed_type(&self) -> Option<ItemTypeId> {
        self.claimed.as_ref().map(Item::item_type)
    }

    pub fn input(&self) -> Option<ContainerId> {
        self.config.input
    }

    pub fn output(&self) -> Option<SourceId> {
        self.config.output
    }

    pub fn position(&self) -> Position {
        self.config.position
    }

    pub fn processing_time(&self) -> Ticks {
        self.config.processing_time
    }
}

// ===========================================================================
// Tests
// ===========================================================================
