//! The simulation engine: owns every component and orchestrates the
//! seven-phase step.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - One [`Container`] arena. Sources, stations, agents and carriers refer
//!   to their containers by [`ContainerId`].
//! - Component arenas keyed by their ids, plus the [`Scheduler`] holding
//!   delayed slot builds.
//! - The [`Movement`] and [`BuildAnimation`] collaborators.
//! - A [`SimState`] (tick counter, accumulator) and an [`EventBus`].
//!
//! # Seven-Phase Pipeline
//!
//! Each `step()` runs:
//! 1. **Sources** -- spawn timers advance; products are added to stockpiles
//! 2. **Stations** -- claim, progress, and finish processing
//! 3. **Agents** -- each agent's state machine advances once
//! 4. **Dispatch** -- dispatchers broadcast; carriers act on announcements
//! 5. **Continuations** -- slot builds scheduled in earlier steps complete
//! 6. **Post-tick** -- deliver buffered events to listeners
//! 7. **Bookkeeping** -- update tick counter, compute state hash
//!
//! Components within a phase are evaluated in arena order, which is
//! insertion order for arenas that never remove.

use std::hash::Hasher;

use slotmap::SlotMap;
use tracing::{debug, info, trace, warn};

use crate::agent::{Agent, AgentConfig, AgentWorld};
use crate::carrier::{plan, Carrier, CarrierAction, CarrierConfig, CarrierView, Disposal};
use crate::construction::{
    BuildAnimation, ConfiguredDuration, ConstructionProject, ProjectConfig, ReceiveRejection,
};
use crate::dispatch::{DispatcherConfig, InteractionDispatcher, ZoneCategory, ZoneRef};
use crate::error::ConfigError;
use crate::event::{DestroyCause, Event, EventBus, EventKind, PassiveListener};
use crate::fixed::Ticks;
use crate::id::*;
use crate::item::{transfer, Container, Item, ItemMint, Pick, RejectReason, Rejected, Transfer};
use crate::movement::{InstantMovement, Movement, Position};
use crate::query::{AgentSnapshot, ContainerSnapshot, ProjectSnapshot, SourceSnapshot, StationSnapshot};
use crate::registry::Registry;
use crate::schedule::{Continuation, Scheduler};
use crate::sim::{AdvanceResult, SimState, SimulationStrategy, StateHash};
use crate::source::{spawn_product, ProductSource, SourceConfig, SpawnOutcome};
use crate::station::{ProcessingStation, StationConfig, StationState};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Engine {
    registry: Registry,

    pub(crate) containers: SlotMap<ContainerId, Container>,
    pub(crate) sources: SlotMap<SourceId, ProductSource>,
    pub(crate) stations: SlotMap<StationId, ProcessingStation>,
    pub(crate) projects: SlotMap<ProjectId, ConstructionProject>,
    pub(crate) agents: SlotMap<AgentId, Agent>,
    pub(crate) carriers: SlotMap<CarrierId, Carrier>,
    pub(crate) disposals: SlotMap<DisposalId, Disposal>,
    pub(crate) dispatchers: SlotMap<DispatcherId, InteractionDispatcher>,

    pub(crate) scheduler: Scheduler,
    mint: ItemMint,

    movement: Box<dyn Movement>,
    build_animation: Box<dyn BuildAnimation>,

    /// Typed event bus for simulation events.
    pub event_bus: EventBus,

    /// Simulation state (tick counter, accumulator).
    pub sim_state: SimState,
    pub(crate) strategy: SimulationStrategy,
    pub(crate) paused: bool,
    pub(crate) last_state_hash: u64,
}

impl Engine {
    /// An empty engine with instant movement and configured build durations.
    pub fn new(strategy: SimulationStrategy) -> Self {
        Self {
            registry: Registry::default(),
            containers: SlotMap::with_key(),
            sources: SlotMap::with_key(),
            stations: SlotMap::with_key(),
            projects: SlotMap::with_key(),
            agents: SlotMap::with_key(),
            carriers: SlotMap::with_key(),
            disposals: SlotMap::with_key(),
            dispatchers: SlotMap::with_key(),
            scheduler: Scheduler::new(),
            mint: ItemMint::new(),
            movement: Box::new(InstantMovement),
            build_animation: Box::new(ConfiguredDuration),
            event_bus: EventBus::default(),
            sim_state: SimState::new(),
            strategy,
            paused: false,
            last_state_hash: 0,
        }
    }

    /// Attach the item type registry used for log output.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn set_movement(&mut self, movement: Box<dyn Movement>) {
        self.movement = movement;
    }

    pub fn set_build_animation(&mut self, animation: Box<dyn BuildAnimation>) {
        self.build_animation = animation;
    }

    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }

    // -----------------------------------------------------------------------
    // Containers and items
    // -----------------------------------------------------------------------

    pub fn add_container(&mut self, container: Container) -> ContainerId {
        self.containers.insert(container)
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(id)
    }

    /// Create a fresh item outside any container.
    pub fn mint_item(&mut self, item_type: ItemTypeId) -> Item {
        self.mint.mint(item_type)
    }

    /// Add `item` to a container. On refusal the item is handed back; a
    /// dangling handle is reported as [`RejectReason::Missing`].
    pub fn insert_item(&mut self, container: ContainerId, item: Item) -> Result<(), Rejected> {
        match self.containers.get_mut(container) {
            Some(c) => c.try_add(item),
            None => Err(Rejected {
                item,
                reason: RejectReason::Missing,
            }),
        }
    }

    /// Remove the most recently added item of a container.
    pub fn take_item(&mut self, container: ContainerId) -> Option<Item> {
        self.containers.get_mut(container)?.try_remove_last()
    }

    /// Move one item between two containers. A refused transfer changes
    /// neither side.
    pub fn transfer(&mut self, from: ContainerId, to: ContainerId, pick: Pick) -> Transfer {
        let outcome = transfer(&mut self.containers, from, to, pick);
        if let Transfer::Moved(item_type) = outcome {
            self.event_bus.emit(Event::ItemTransferred {
                from,
                to,
                item_type,
                tick: self.sim_state.tick,
            });
        }
        outcome
    }

    fn destroy(&mut self, item: Item, cause: DestroyCause) {
        self.event_bus.emit(Event::ItemDestroyed {
            item_type: item.item_type(),
            cause,
            tick: self.sim_state.tick,
        });
    }

    // -----------------------------------------------------------------------
    // Sources
    // -----------------------------------------------------------------------

    /// Add a source and its stockpile. Active immediately when configured
    /// with `auto_spawn`.
    pub fn add_source(&mut self, config: SourceConfig) -> Result<SourceId, ConfigError> {
        config.validate()?;
        let container = self.containers.insert(config.make_container());
        Ok(self.sources.insert(ProductSource::new(&config, container)))
    }

    pub fn source(&self, id: SourceId) -> Option<&ProductSource> {
        self.sources.get(id)
    }

    pub fn activate_source(&mut self, id: SourceId) -> Result<(), ConfigError> {
        self.sources
            .get_mut(id)
            .ok_or(ConfigError::UnknownComponent { component: "source" })?
            .activate();
        Ok(())
    }

    pub fn deactivate_source(&mut self, id: SourceId) -> Result<(), ConfigError> {
        self.sources
            .get_mut(id)
            .ok_or(ConfigError::UnknownComponent { component: "source" })?
            .deactivate();
        debug!(source = ?id, "source deactivated");
        Ok(())
    }

    /// Add one product to the source's stockpile now, independent of its
    /// spawn timer.
    pub fn spawn_product(&mut self, id: SourceId) -> SpawnOutcome {
        let Some(source) = self.sources.get(id) else {
            return SpawnOutcome::Blocked;
        };
        let produced_type = source.produced_type();
        let Some(pile) = self.containers.get_mut(source.container()) else {
            return SpawnOutcome::Blocked;
        };
        let outcome = spawn_product(produced_type, pile, &mut self.mint);
        self.record_spawn(id, outcome);
        outcome
    }

    fn record_spawn(&mut self, source: SourceId, outcome: SpawnOutcome) {
        let tick = self.sim_state.tick;
        match outcome {
            SpawnOutcome::Spawned(item_type) => self.event_bus.emit(Event::ItemSpawned {
                source,
                item_type,
                tick,
            }),
            SpawnOutcome::Blocked => {
                debug!(source = ?source, tick, "spawn blocked, stockpile full");
                self.event_bus.emit(Event::SpawnBlocked { source, tick });
            }
            SpawnOutcome::NotDue => {}
        }
    }

    // -----------------------------------------------------------------------
    // Stations
    // -----------------------------------------------------------------------

    /// Add a station. It stays inactive until [`Engine::activate_station`]
    /// succeeds.
    pub fn add_station(&mut self, config: StationConfig) -> StationId {
        self.stations.insert(ProcessingStation::new(config))
    }

    pub fn station(&self, id: StationId) -> Option<&ProcessingStation> {
        self.stations.get(id)
    }

    /// Start the station's loop once its input area and output source
    /// resolve. On error the station stays inactive.
    pub fn activate_station(&mut self, id: StationId) -> Result<(), ConfigError> {
        let station = self
            .stations
            .get_mut(id)
            .ok_or(ConfigError::UnknownComponent { component: "station" })?;
        let input_resolves = station
            .input()
            .is_some_and(|c| self.containers.contains_key(c));
        let output_resolves = station
            .output()
            .is_some_and(|s| self.sources.contains_key(s));
        station.activate(input_resolves, output_resolves)
    }

    /// Halt the station. An item mid-processing is destroyed, not returned.
    pub fn deactivate_station(&mut self, id: StationId) -> Result<(), ConfigError> {
        let lost = self
            .stations
            .get_mut(id)
            .ok_or(ConfigError::UnknownComponent { component: "station" })?
            .deactivate();
        if let Some(item) = lost {
            debug!(station = ?id, item = %self.registry.item_name(item.item_type()), "processing cancelled, item lost");
            self.destroy(item, DestroyCause::Cancelled);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn add_project(&mut self, config: ProjectConfig) -> Result<ProjectId, ConfigError> {
        config.validate()?;
        Ok(self.projects.insert(ConstructionProject::new(config)))
    }

    pub fn project(&self, id: ProjectId) -> Option<&ConstructionProject> {
        self.projects.get(id)
    }

    pub fn activate_project(&mut self, id: ProjectId) -> Result<(), ConfigError> {
        self.projects
            .get_mut(id)
            .ok_or(ConfigError::UnknownComponent {
                component: "construction project",
            })?
            .activate();
        Ok(())
    }

    /// Halt the project: pending slot builds are cancelled and their items
    /// destroyed, and every unflushed claim is released.
    pub fn deactivate_project(&mut self, id: ProjectId) -> Result<(), ConfigError> {
        let project = self
            .projects
            .get_mut(id)
            .ok_or(ConfigError::UnknownComponent {
                component: "construction project",
            })?;
        project.deactivate();
        let released = project.cancel_in_flight();

        let cancelled = self.scheduler.cancel_where(|c| c.project() == Some(id));
        debug!(project = ?id, released, cancelled = cancelled.len(), "construction cancelled");
        for continuation in cancelled {
            let Continuation::BuildSlot { item, .. } = continuation;
            self.destroy(item, DestroyCause::Cancelled);
        }
        Ok(())
    }

    /// Offer an item to a project. An accepted item claims the next slot and
    /// its build is scheduled; a rejected item is destroyed.
    pub fn receive_item(&mut self, id: ProjectId, item: Item) -> Result<usize, ReceiveRejection> {
        let claim = self
            .projects
            .get_mut(id)
            .ok_or(ReceiveRejection::Missing)
            .and_then(|p| {
                let slot = p.claim_slot(item.item_type())?;
                Ok((slot, p.build_duration()))
            });

        match claim {
            Ok((slot, default)) => {
                let item_type = item.item_type();
                let now = self.sim_state.tick;
                let duration = self.build_animation.build_duration(id, slot, default);
                self.scheduler
                    .schedule(now, duration, Continuation::BuildSlot { project: id, slot, item });
                self.event_bus.emit(Event::SlotClaimed {
                    project: id,
                    slot,
                    item_type,
                    tick: now,
                });
                Ok(slot)
            }
            Err(rejection) => {
                let cause = match rejection {
                    ReceiveRejection::TypeMismatch { expected, got } => {
                        warn!(
                            project = ?id,
                            expected = %self.registry.item_name(expected),
                            got = %self.registry.item_name(got),
                            "type mismatch, item destroyed"
                        );
                        DestroyCause::TypeMismatch
                    }
                    ReceiveRejection::Complete => DestroyCause::ProjectComplete,
                    ReceiveRejection::NoOpenSlot => DestroyCause::NoOpenSlot,
                    ReceiveRejection::Inactive | ReceiveRejection::Missing => {
                        DestroyCause::ProjectInactive
                    }
                };
                if cause != DestroyCause::TypeMismatch {
                    debug!(project = ?id, %rejection, "item rejected by project");
                }
                self.destroy(item, cause);
                Err(rejection)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    /// Add an agent and its inventory. It stays inactive until
    /// [`Engine::activate_agent`] succeeds.
    pub fn add_agent(&mut self, config: AgentConfig) -> Result<AgentId, ConfigError> {
        config.validate()?;
        let inventory = self.containers.insert(config.make_inventory());
        Ok(self.agents.insert(Agent::new(config, inventory)))
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn register_agent_source(&mut self, agent: AgentId, source: SourceId) -> Result<(), ConfigError> {
        if !self.sources.contains_key(source) {
            return Err(ConfigError::UnknownComponent { component: "source" });
        }
        self.agents
            .get_mut(agent)
            .ok_or(ConfigError::UnknownComponent { component: "agent" })?
            .register_source(source);
        Ok(())
    }

    pub fn register_agent_sink(&mut self, agent: AgentId, station: StationId) -> Result<(), ConfigError> {
        if !self.stations.contains_key(station) {
            return Err(ConfigError::UnknownComponent { component: "station" });
        }
        self.agents
            .get_mut(agent)
            .ok_or(ConfigError::UnknownComponent { component: "agent" })?
            .register_sink(station);
        Ok(())
    }

    /// Enter the agent's loop at `Deciding` once every registered source and
    /// sink resolves.
    pub fn activate_agent(&mut self, id: AgentId) -> Result<(), ConfigError> {
        let agent = self
            .agents
            .get_mut(id)
            .ok_or(ConfigError::UnknownComponent { component: "agent" })?;
        let sources = &self.sources;
        let stations = &self.stations;
        agent.activate(|s| sources.contains_key(s), |s| stations.contains_key(s))
    }

    pub fn deactivate_agent(&mut self, id: AgentId) -> Result<(), ConfigError> {
        self.agents
            .get_mut(id)
            .ok_or(ConfigError::UnknownComponent { component: "agent" })?
            .deactivate();
        debug!(agent = ?id, "agent deactivated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Carriers, disposals, dispatchers
    // -----------------------------------------------------------------------

    pub fn add_carrier(&mut self, config: CarrierConfig) -> Result<CarrierId, ConfigError> {
        config.validate()?;
        let inventory = self.containers.insert(config.make_inventory());
        Ok(self.carriers.insert(Carrier::new(inventory)))
    }

    pub fn carrier(&self, id: CarrierId) -> Option<&Carrier> {
        self.carriers.get(id)
    }

    pub fn add_disposal(&mut self, position: Position) -> DisposalId {
        self.disposals.insert(Disposal::new(position))
    }

    pub fn disposal(&self, id: DisposalId) -> Option<&Disposal> {
        self.disposals.get(id)
    }

    /// Add a dispatcher. It does not broadcast until activated.
    pub fn add_dispatcher(&mut self, config: DispatcherConfig) -> Result<DispatcherId, ConfigError> {
        config.validate()?;
        Ok(self.dispatchers.insert(InteractionDispatcher::new(&config)))
    }

    pub fn dispatcher(&self, id: DispatcherId) -> Option<&InteractionDispatcher> {
        self.dispatchers.get(id)
    }

    /// Start broadcasting. The first broadcast happens on the next step.
    pub fn activate_dispatcher(&mut self, id: DispatcherId) -> Result<(), ConfigError> {
        self.dispatcher_mut(id)?.activate();
        Ok(())
    }

    pub fn deactivate_dispatcher(&mut self, id: DispatcherId) -> Result<(), ConfigError> {
        self.dispatcher_mut(id)?.deactivate();
        debug!(dispatcher = ?id, "dispatcher deactivated");
        Ok(())
    }

    pub fn subscribe(
        &mut self,
        dispatcher: DispatcherId,
        category: ZoneCategory,
        carrier: CarrierId,
    ) -> Result<(), ConfigError> {
        if !self.carriers.contains_key(carrier) {
            return Err(ConfigError::UnknownComponent { component: "carrier" });
        }
        self.dispatcher_mut(dispatcher)?.subscribe(category, carrier);
        Ok(())
    }

    /// Stop `carrier` receiving `category` broadcasts from `dispatcher`.
    pub fn unsubscribe(
        &mut self,
        dispatcher: DispatcherId,
        category: ZoneCategory,
        carrier: CarrierId,
    ) -> Result<(), ConfigError> {
        self.dispatcher_mut(dispatcher)?.unsubscribe(category, carrier);
        Ok(())
    }

    /// Edge-triggered overlap start. Returns false if the zone does not match
    /// the category or the dispatcher does not exist.
    pub fn overlap_enter(&mut self, dispatcher: DispatcherId, category: ZoneCategory, zone: ZoneRef) -> bool {
        self.dispatchers
            .get_mut(dispatcher)
            .is_some_and(|d| d.enter(category, zone))
    }

    /// Edge-triggered overlap end. Clears the category only if `zone` is
    /// its current zone.
    pub fn overlap_exit(&mut self, dispatcher: DispatcherId, category: ZoneCategory, zone: ZoneRef) -> bool {
        self.dispatchers
            .get_mut(dispatcher)
            .is_some_and(|d| d.exit(category, zone))
    }

    fn dispatcher_mut(&mut self, id: DispatcherId) -> Result<&mut InteractionDispatcher, ConfigError> {
        self.dispatchers.get_mut(id).ok_or(ConfigError::UnknownComponent {
            component: "interaction dispatcher",
        })
    }

    // -----------------------------------------------------------------------
    // State hash, pause, events
    // -----------------------------------------------------------------------

    /// The state hash computed at the end of the most recent step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// While paused, `advance()` and `step()` are no-ops.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    /// Slot builds scheduled but not yet complete.
    pub fn pending_builds(&self) -> usize {
        self.scheduler.pending()
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Advance the simulation according to the configured strategy.
    ///
    /// - **Tick mode**: `dt` is ignored; exactly one step runs.
    /// - **Delta mode**: `dt` is accumulated; as many fixed steps run as fit.
    pub fn advance(&mut self, dt: Ticks) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if self.paused {
            return result;
        }

        match self.strategy {
            SimulationStrategy::Tick => self.step_internal(&mut result),
            SimulationStrategy::Delta { fixed_timestep } => {
                self.sim_state.accumulator += dt;
                let step_size = fixed_timestep.max(1);
                while self.sim_state.accumulator >= step_size {
                    self.sim_state.accumulator -= step_size;
                    self.step_internal(&mut result);
                }
            }
        }
        result
    }

    /// Run a single step (convenience for tick mode).
    pub fn step(&mut self) -> AdvanceResult {
        self.advance(0)
    }

    /// Run `n` steps regardless of strategy. Honors pause.
    pub fn run_steps(&mut self, n: u64) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if self.paused {
            return result;
        }
        for _ in 0..n {
            self.step_internal(&mut result);
        }
        result
    }

    fn step_internal(&mut self, result: &mut AdvanceResult) {
        self.phase_sources();
        self.phase_stations();
        self.phase_agents();
        self.phase_dispatch();
        self.phase_continuations();
        result.events_delivered += self.event_bus.deliver();
        self.phase_bookkeeping();
        result.steps_run += 1;
    }

    // -----------------------------------------------------------------------
    // Phase 1: Sources
    // -----------------------------------------------------------------------

    fn phase_sources(&mut self) {
        let mut outcomes = Vec::new();
        for (id, source) in &mut self.sources {
            let Some(pile) = self.containers.get_mut(source.container()) else {
                continue;
            };
            let outcome = source.tick(pile, &mut self.mint);
            if outcome != SpawnOutcome::NotDue {
                outcomes.push((id, outcome));
            }
        }
        for (id, outcome) in outcomes {
            self.record_spawn(id, outcome);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: Stations
    // -----------------------------------------------------------------------

    fn phase_stations(&mut self) {
        let tick = self.sim_state.tick;
        for (id, station) in &mut self.stations {
            if !station.is_active() {
                continue;
            }
            let output = station.output().and_then(|s| self.sources.get(s).map(|src| (s, src)));
            let output_full = output
                .and_then(|(_, src)| self.containers.get(src.container()))
                .is_none_or(Container::is_full);
            let Some(input) = station.input().and_then(|c| self.containers.get_mut(c)) else {
                continue;
            };

            let result = station.tick(input, output_full);
            if result.state_changed {
                trace!(station = ?id, state = ?station.state(), tick, "station state changed");
            }
            if let Some(item_type) = result.claimed {
                self.event_bus.emit(Event::ProcessingStarted {
                    station: id,
                    item_type,
                    tick,
                });
            }
            let Some(consumed) = result.finished else {
                continue;
            };

            let mut product = None;
            if let Some((source_id, source)) = output
                && let Some(pile) = self.containers.get_mut(source.container())
            {
                match spawn_product(source.produced_type(), pile, &mut self.mint) {
                    SpawnOutcome::Spawned(item_type) => {
                        product = Some(item_type);
                        self.event_bus.emit(Event::ItemSpawned {
                            source: source_id,
                            item_type,
                            tick,
                        });
                    }
                    _ => {
                        debug!(station = ?id, tick, "output full at completion, product lost");
                    }
                }
            }
            self.event_bus.emit(Event::ProcessingFinished {
                station: id,
                consumed: consumed.item_type(),
                product,
                tick,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Agents
    // -----------------------------------------------------------------------

    fn phase_agents(&mut self) {
        let tick = self.sim_state.tick;
        let mut world = AgentWorld {
            containers: &mut self.containers,
            sources: &self.sources,
            stations: &self.stations,
            movement: self.movement.as_mut(),
        };
        for (id, agent) in &mut self.agents {
            let outcome = agent.tick(id, &mut world);
            if let Some((from, to)) = outcome.transition {
                debug!(agent = ?id, ?from, ?to, tick, "agent state changed");
                self.event_bus.emit(Event::AgentStateChanged {
                    agent: id,
                    from,
                    to,
                    tick,
                });
            }
            if let Some((from, to, item_type)) = outcome.transferred {
                self.event_bus.emit(Event::ItemTransferred {
                    from,
                    to,
                    item_type,
                    tick,
                });
            }
            if let Some(item) = outcome.destroyed {
                warn!(
                    agent = ?id,
                    item = %self.registry.item_name(item.item_type()),
                    "sink refused item type, item destroyed"
                );
                self.event_bus.emit(Event::ItemDestroyed {
                    item_type: item.item_type(),
                    cause: DestroyCause::TypeMismatch,
                    tick,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Dispatch
    // -----------------------------------------------------------------------

    fn phase_dispatch(&mut self) {
        let tick = self.sim_state.tick;
        let mut announcements = Vec::new();
        for (id, dispatcher) in &mut self.dispatchers {
            for (carrier, zone) in dispatcher.tick() {
                announcements.push((id, carrier, zone));
            }
        }

        for (dispatcher, carrier, zone) in announcements {
            self.event_bus.emit(Event::ZoneAnnounced {
                dispatcher,
                carrier,
                zone,
                tick,
            });
            let Some(inventory) = self.carriers.get(carrier).map(Carrier::inventory) else {
                continue;
            };
            let Some(held) = self.containers.get(inventory) else {
                continue;
            };
            let view = CarrierView {
                containers: &self.containers,
                sources: &self.sources,
                stations: &self.stations,
                projects: &self.projects,
                disposals: &self.disposals,
            };
            let action = plan(held, zone, &view);
            self.perform(inventory, action);
        }
    }

    fn perform(&mut self, inventory: ContainerId, action: CarrierAction) {
        match action {
            CarrierAction::Nothing => {}
            CarrierAction::Collect { from } => {
                self.transfer(from, inventory, Pick::Last);
            }
            CarrierAction::Deliver { to, item_type } => {
                self.transfer(inventory, to, Pick::OfType(item_type));
            }
            CarrierAction::Build { project, item_type } => {
                if let Some(item) = self
                    .containers
                    .get_mut(inventory)
                    .and_then(|c| c.try_remove_of_type(item_type))
                {
                    // Rejections are logged and recorded by receive_item.
                    let _ = self.receive_item(project, item);
                }
            }
            CarrierAction::Trash { disposal } => {
                let Some(item) = self.take_item(inventory) else {
                    return;
                };
                if let Some(d) = self.disposals.get_mut(disposal) {
                    d.record();
                }
                self.event_bus.emit(Event::ItemTrashed {
                    disposal,
                    item_type: item.item_type(),
                    tick: self.sim_state.tick,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 5: Continuations
    // -----------------------------------------------------------------------

    fn phase_continuations(&mut self) {
        let tick = self.sim_state.tick;
        for continuation in self.scheduler.take_due(tick) {
            let Continuation::BuildSlot { project, slot, item } = continuation;
            // The item is consumed by the build.
            drop(item);
            let Some(p) = self.projects.get_mut(project) else {
                continue;
            };
            let completion = p.complete_slot(slot);
            for flushed in completion.flushed {
                self.event_bus.emit(Event::PartCompleted {
                    project,
                    slot: flushed,
                    tick,
                });
            }
            if completion.completed_now {
                info!(project = ?project, tick, "construction complete");
                self.event_bus.emit(Event::ProjectCompleted { project, tick });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 7: Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self) {
        self.sim_state.tick += 1;
        self.last_state_hash = self.compute_state_hash();
    }

    /// Deterministic hash over tick, container contents, and component state,
    /// in arena order.
    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.tick);
        hasher.write_u64(self.mint.minted());

        for (_, container) in &self.containers {
            hasher.write_u32(container.len());
            for item in container.iter() {
                hasher.write_u32(item.item_type().0);
            }
        }
        for (_, station) in &self.stations {
            match station.state() {
                StationState::Idle => hasher.write_u32(0),
                StationState::Working { progress } => {
                    hasher.write_u32(1);
                    hasher.write_u64(progress);
                }
                StationState::Stalled { reason } => {
                    hasher.write_u32(2);
                    hasher.write_u32(reason as u32);
                }
            }
        }
        for (_, project) in &self.projects {
            hasher.write_u64(project.next_index() as u64);
            hasher.write_u64(project.in_flight() as u64);
        }
        for (_, agent) in &self.agents {
            hasher.write_u32(agent.state() as u32);
        }
        hasher.write_u64(self.scheduler.pending() as u64);
        hasher.finish()
    }

    // -----------------------------------------------------------------------
    // Query API (read-only)
    // -----------------------------------------------------------------------

    pub fn snapshot_container(&self, id: ContainerId) -> Option<ContainerSnapshot> {
        let c = self.containers.get(id)?;
        Some(ContainerSnapshot {
            id,
            count: c.len(),
            capacity: c.capacity(),
            is_full: c.is_full(),
            type_lock: c.type_lock(),
            contents: c.iter().map(Item::item_type).collect(),
        })
    }

    pub fn snapshot_source(&self, id: SourceId) -> Option<SourceSnapshot> {
        let source = self.sources.get(id)?;
        let pile = self.containers.get(source.container())?;
        Some(SourceSnapshot {
            id,
            produced_type: source.produced_type(),
            count: pile.len(),
            capacity: pile.capacity(),
            is_full: pile.is_full(),
            active: source.is_active(),
            ticks_until_spawn: source.ticks_until_spawn(),
        })
    }

    pub fn snapshot_station(&self, id: StationId) -> Option<StationSnapshot> {
        let station = self.stations.get(id)?;
        let input = station.input().and_then(|c| self.containers.get(c));
        Some(StationSnapshot {
            id,
            state: station.state(),
            progress: station.progress(),
            accepted_type: input.and_then(Container::type_lock),
            input_count: input.map_or(0, Container::len),
            input_capacity: input.map_or(0, Container::capacity),
            input_full: input.is_none_or(Container::is_full),
            processing: station.claimed_type(),
            active: station.is_active(),
        })
    }

    pub fn snapshot_project(&self, id: ProjectId) -> Option<ProjectSnapshot> {
        let p = self.projects.get(id)?;
        Some(ProjectSnapshot {
            id,
            slot_count: p.len(),
            next_index: p.next_index(),
            in_flight: p.in_flight(),
            finished: p.finished_slots().collect(),
            next_required_type: p.next_required_type(),
            progress: p.progress(),
            complete: p.is_complete(),
            active: p.is_active(),
        })
    }

    pub fn snapshot_agent(&self, id: AgentId) -> Option<AgentSnapshot> {
        let agent = self.agents.get(id)?;
        let inventory = self.containers.get(agent.inventory())?;
        Some(AgentSnapshot {
            id,
            state: agent.state(),
            target: agent.target(),
            held_type: inventory.type_lock(),
            inventory_count: inventory.len(),
            inventory_capacity: inventory.capacity(),
            active: agent.is_active(),
        })
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.keys()
    }

    pub fn project_ids(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.projects.keys()
    }

    pub fn station_ids(&self) -> impl Iterator<Item = StationId> + '_ {
        self.stations.keys()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.keys()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SimulationStrategy::Tick)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
