//! Autonomous transport agents.
//!
//! Each agent cycles forever through a decide, move, interact loop: with an
//! empty inventory it collects from the first stocked source, otherwise it
//! delivers to the first station input that accepts what it holds. With
//! nothing to do it walks to its idle point and waits out the wait-check
//! interval before deciding again.

use slotmap::SlotMap;

use crate::error::ConfigError;
use crate::fixed::Ticks;
use crate::id::{AgentId, ContainerId, ItemTypeId, SourceId, StationId};
use crate::item::{transfer, Container, Item, LockMode, Pick, RejectReason, Transfer};
use crate::movement::{Movement, Position};
use crate::source::ProductSource;
use crate::station::ProcessingStation;
use crate::timer::Countdown;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AgentState {
    #[default]
    Deciding,
    MovingToSource,
    Collecting,
    MovingToSink,
    Dropping,
    MovingToIdle,
    Idle,
}

/// The component an agent is currently working against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AgentTarget {
    Source(SourceId),
    /// A station, reached through its input area.
    Sink(StationId),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AgentConfig {
    /// Inventory capacity.
    pub capacity: u32,
    /// Ticks between single-item pickups or drops.
    pub interaction_interval: Ticks,
    /// Ticks spent idle before re-deciding.
    pub wait_check_interval: Ticks,
    pub idle_point: Option<Position>,
    /// Candidate sources, scanned in this order.
    pub sources: Vec<SourceId>,
    /// Candidate stations, scanned in this order.
    pub sinks: Vec<StationId>,
}

impl AgentConfig {
    pub fn new(capacity: u32, interaction_interval: Ticks, wait_check_interval: Ticks) -> Self {
        Self {
            capacity,
            interaction_interval,
            wait_check_interval,
            idle_point: None,
            sources: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity { component: "agent" });
        }
        if self.interaction_interval == 0 || self.wait_check_interval == 0 {
            return Err(ConfigError::ZeroInterval { component: "agent" });
        }
        Ok(())
    }

    /// Agent inventories lock to the first item picked up.
    pub fn make_inventory(&self) -> Container {
        Container::with_mode(self.capacity, LockMode::FirstItem)
    }
}

// ---------------------------------------------------------------------------
// Step context and outcome
// ---------------------------------------------------------------------------

/// The parts of the world an agent reads and mutates during its step.
pub(crate) struct AgentWorld<'a> {
    pub containers: &'a mut SlotMap<ContainerId, Container>,
    pub sources: &'a SlotMap<SourceId, ProductSource>,
    pub stations: &'a SlotMap<StationId, ProcessingStation>,
    pub movement: &'a mut dyn Movement,
}

/// What one agent step did.
#[derive(Debug, Default)]
pub struct AgentOutcome {
    /// `(from, to)` when the state changed.
    pub transition: Option<(AgentState, AgentState)>,
    /// `(from, to, item_type)` when one item moved.
    pub transferred: Option<(ContainerId, ContainerId, ItemTypeId)>,
    /// An item the target refused on type, destroyed.
    pub destroyed: Option<Item>,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Agent {
    state: AgentState,
    target: Option<AgentTarget>,
    inventory: ContainerId,
    timer: Countdown,
    interaction_interval: Ticks,
    wait_check_interval: Ticks,
    idle_point: Option<Position>,
    sources: Vec<SourceId>,
    sinks: Vec<StationId>,
    active: bool,
}

impl Agent {
    pub(crate) fn new(config: AgentConfig, inventory: ContainerId) -> Self {
        Self {
            state: AgentState::Deciding,
            target: None,
            inventory,
            timer: Countdown::expired_now(),
            interaction_interval: config.interaction_interval,
            wait_check_interval: config.wait_check_interval,
            idle_point: config.idle_point,
            sources: config.sources,
            sinks: config.sinks,
            active: false,
        }
    }

    /// Enter the loop at `Deciding` once every registered handle resolves.
    pub(crate) fn activate(
        &mut self,
        source_resolves: impl Fn(SourceId) -> bool,
        station_resolves: impl Fn(StationId) -> bool,
    ) -> Result<(), ConfigError> {
        if !self.sources.iter().all(|&s| source_resolves(s)) {
            return Err(ConfigError::MissingReference {
                component: "agent",
                reference: "source",
            });
        }
        if !self.sinks.iter().all(|&s| station_resolves(s)) {
            return Err(ConfigError::MissingReference {
                component: "agent",
                reference: "sink",
            });
        }
        self.active = true;
        self.target = None;
        self.set_state(AgentState::Deciding);
        Ok(())
    }

    /// Halt the loop. Inventory contents stay with the agent.
    pub(crate) fn deactivate(&mut self) {
        self.active = false;
        self.target = None;
    }

    pub(crate) fn register_source(&mut self, source: SourceId) {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    pub(crate) fn register_sink(&mut self, station: StationId) {
        if !self.sinks.contains(&station) {
            self.sinks.push(station);
        }
    }

    fn set_state(&mut self, state: AgentState) {
        self.state = state;
        if state == AgentState::Idle {
            self.timer.reset(self.wait_check_interval);
        } else {
            self.timer.reset(0);
        }
    }

    fn transition(&mut self, to: AgentState, outcome: &mut AgentOutcome) {
        let from = self.state;
        self.set_state(to);
        if from != to {
            outcome.transition = Some((from, to));
        }
    }

    /// Advance the agent by one step.
    pub(crate) fn tick(&mut self, id: AgentId, world: &mut AgentWorld<'_>) -> AgentOutcome {
        let mut outcome = AgentOutcome::default();
        if !self.active {
            return outcome;
        }
        let interaction_due = self.timer.tick();

        match self.state {
            AgentState::Deciding => self.decide(id, world, &mut outcome),
            AgentState::MovingToSource => {
                if world.movement.has_arrived(id) {
                    self.transition(AgentState::Collecting, &mut outcome);
                }
            }
            AgentState::MovingToSink => {
                if world.movement.has_arrived(id) {
                    self.transition(AgentState::Dropping, &mut outcome);
                }
            }
            AgentState::MovingToIdle => {
                if world.movement.has_arrived(id) {
                    self.transition(AgentState::Idle, &mut outcome);
                }
            }
            AgentState::Collecting => self.collect(interaction_due, world, &mut outcome),
            AgentState::Dropping => self.drop_off(interaction_due, world, &mut outcome),
            AgentState::Idle => {
                if interaction_due {
                    self.transition(AgentState::Deciding, &mut outcome);
                }
            }
        }
        outcome
    }

    fn decide(&mut self, id: AgentId, world: &mut AgentWorld<'_>, outcome: &mut AgentOutcome) {
        let Some(inventory) = world.containers.get(self.inventory) else {
            return;
        };

        let found = if inventory.is_empty() {
            self.find_source(inventory, world)
                .map(|(source, pos)| (AgentTarget::Source(source), pos, AgentState::MovingToSource))
        } else {
            self.find_sink(inventory, world)
                .map(|(station, pos)| (AgentTarget::Sink(station), pos, AgentState::MovingToSink))
        };

        match found {
            Some((target, position, next)) => {
                self.target = Some(target);
                world.movement.request_move(id, position);
                self.transition(next, outcome);
            }
            None => {
                self.target = None;
                match self.idle_point {
                    Some(point) => {
                        world.movement.request_move(id, point);
                        self.transition(AgentState::MovingToIdle, outcome);
                    }
                    None => self.transition(AgentState::Idle, outcome),
                }
            }
        }
    }

    /// First registered source with stock of a type the inventory can hold.
    fn find_source(&self, inventory: &Container, world: &AgentWorld<'_>) -> Option<(SourceId, Position)> {
        self.sources.iter().find_map(|&id| {
            let source = world.sources.get(id)?;
            let stockpile = world.containers.get(source.container())?;
            let held_ok = inventory
                .type_lock()
                .is_none_or(|held| held == source.produced_type());
            (!stockpile.is_empty() && held_ok).then_some((id, source.position()))
        })
    }

    /// First registered station whose input has room for the held type.
    fn find_sink(&self, inventory: &Container, world: &AgentWorld<'_>) -> Option<(StationId, Position)> {
        let held = inventory.type_lock().or_else(|| inventory.last_type())?;
        self.sinks.iter().find_map(|&id| {
            let station = world.stations.get(id)?;
            let input = world.containers.get(station.input()?)?;
            input.can_accept(held).then_some((id, station.position()))
        })
    }

    fn collect(&mut self, due: bool, world: &mut AgentWorld<'_>, outcome: &mut AgentOutcome) {
        let stockpile = match self.target {
            Some(AgentTarget::Source(id)) => world.sources.get(id).map(ProductSource::container),
            _ => None,
        };
        let Some(stockpile) = stockpile else {
            self.transition(AgentState::Deciding, outcome);
            return;
        };
        let inventory_full = world
            .containers
            .get(self.inventory)
            .is_none_or(Container::is_full);
        let source_empty = world
            .containers
            .get(stockpile)
            .is_none_or(Container::is_empty);
        if inventory_full || source_empty {
            self.transition(AgentState::Deciding, outcome);
            return;
        }
        if !due {
            return;
        }

        match transfer(world.containers, stockpile, self.inventory, Pick::Last) {
            Transfer::Moved(ty) => outcome.transferred = Some((stockpile, self.inventory, ty)),
            Transfer::Refused(_) | Transfer::Missing => {
                self.transition(AgentState::Deciding, outcome);
                return;
            }
            Transfer::NothingToMove => {}
        }
        self.timer.reset(self.interaction_interval);
    }

    fn drop_off(&mut self, due: bool, world: &mut AgentWorld<'_>, outcome: &mut AgentOutcome) {
        let input = match self.target {
            Some(AgentTarget::Sink(id)) => world.stations.get(id).and_then(ProcessingStation::input),
            _ => None,
        };
        let Some(input) = input else {
            self.transition(AgentState::Deciding, outcome);
            return;
        };
        let inventory_empty = world
            .containers
            .get(self.inventory)
            .is_none_or(Container::is_empty);
        let sink_full = world.containers.get(input).is_none_or(Container::is_full);
        if inventory_empty || sink_full {
            self.transition(AgentState::Deciding, outcome);
            return;
        }
        if !due {
            return;
        }

        match transfer(world.containers, self.inventory, input, Pick::Last) {
            Transfer::Moved(ty) => outcome.transferred = Some((self.inventory, input, ty)),
            Transfer::Refused(RejectReason::TypeMismatch) => {
                outcome.destroyed = world
                    .containers
                    .get_mut(self.inventory)
                    .and_then(Container::try_remove_last);
            }
            Transfer::Refused(RejectReason::CapacityExceeded | RejectReason::Missing)
            | Transfer::Missing => {
                self.transition(AgentState::Deciding, outcome);
                return;
            }
            Transfer::NothingToMove => {}
        }
        self.timer.reset(self.interaction_interval);
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn target(&self) -> Option<AgentTarget> {
        self.target
    }

    pub fn inventory(&self) -> ContainerId {
        self.inventory
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Ticks until the next interaction or wait check may happen.
    pub fn timer_remaining(&self) -> Ticks {
        self.timer.remaining()
    }

    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    pub fn sinks(&self) -> &[StationId] {
        &self.sinks
    }
}

// ===========================================================================
// Tests
// ===========================================================================
