//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::collections::HashMap;

use crate::agent::AgentConfig;
use crate::construction::BuildAnimation;
use crate::engine::Engine;
use crate::fixed::{Fixed64, Ticks};
use crate::id::*;
use crate::item::Container;
use crate::movement::{Movement, Position};
use crate::registry::{Registry, RegistryBuilder, StackPlacement};
use crate::sim::SimulationStrategy;
use crate::source::SourceConfig;
use crate::station::StationConfig;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Item types
// ===========================================================================

pub fn ore() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn plate() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn gear() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn wood() -> ItemTypeId {
    ItemTypeId(3)
}

/// A registry whose ids match the constructors above.
pub fn test_registry() -> Registry {
    let mut builder = RegistryBuilder::new();
    for name in ["ore", "plate", "gear", "wood"] {
        builder.register_item(name, StackPlacement::default());
    }
    builder.build().expect("test registry names are unique")
}

// ===========================================================================
// Collaborators
// ===========================================================================

/// Arrives after a fixed number of `has_arrived` polls per move order.
#[derive(Debug, Default)]
pub struct DelayedMovement {
    polls: u32,
    remaining: HashMap<AgentId, u32>,
    pub requests: Vec<(AgentId, Position)>,
}

impl DelayedMovement {
    pub fn new(polls: u32) -> Self {
        Self {
            polls,
            ..Self::default()
        }
    }
}

impl Movement for DelayedMovement {
    fn request_move(&mut self, agent: AgentId, target: Position) {
        self.requests.push((agent, target));
        self.remaining.insert(agent, self.polls);
    }

    fn has_arrived(&mut self, agent: AgentId) -> bool {
        let left = self.remaining.entry(agent).or_insert(0);
        if *left == 0 {
            return true;
        }
        *left -= 1;
        false
    }
}

/// Per-slot build durations; unlisted slots use the project default.
#[derive(Debug, Default)]
pub struct ScriptedBuild {
    pub durations: HashMap<usize, Ticks>,
}

impl ScriptedBuild {
    pub fn new(durations: &[(usize, Ticks)]) -> Self {
        Self {
            durations: durations.iter().copied().collect(),
        }
    }
}

impl BuildAnimation for ScriptedBuild {
    fn build_duration(&mut self, _project: ProjectId, slot: usize, default: Ticks) -> Ticks {
        self.durations.get(&slot).copied().unwrap_or(default)
    }
}

// ===========================================================================
// Engine builders
// ===========================================================================

pub fn make_engine() -> Engine {
    Engine::new(SimulationStrategy::Tick).with_registry(test_registry())
}

/// A station fed by an input area locked to `input_type`, emitting into a
/// stockpile of `output_type` that only fills when the station finishes.
pub fn add_station(
    engine: &mut Engine,
    input_type: ItemTypeId,
    input_capacity: u32,
    output_type: ItemTypeId,
    output_capacity: u32,
    processing_time: Ticks,
) -> (StationId, ContainerId, SourceId) {
    let input = engine.add_container(Container::fixed(input_capacity, input_type));
    let mut output = SourceConfig::new(output_type, output_capacity, 1);
    output.auto_spawn = false;
    let output = engine.add_source(output).expect("valid output source");
    let station = engine.add_station(StationConfig::new(input, output, processing_time));
    engine.activate_station(station).expect("station references resolve");
    (station, input, output)
}

/// An active agent hauling from `sources` to `sinks`.
pub fn add_agent(
    engine: &mut Engine,
    capacity: u32,
    interaction_interval: Ticks,
    sources: &[SourceId],
    sinks: &[StationId],
) -> AgentId {
    let mut config = AgentConfig::new(capacity, interaction_interval, 4);
    config.sources = sources.to_vec();
    config.sinks = sinks.to_vec();
    let agent = engine.add_agent(config).expect("valid agent");
    engine.activate_agent(agent).expect("agent references resolve");
    agent
}

/// Ore source, one agent, and an ore-to-plate smelter.
pub struct SmallChain {
    pub engine: Engine,
    pub ore_source: SourceId,
    pub smelter: StationId,
    pub smelter_input: ContainerId,
    pub plate_pile: SourceId,
    pub agent: AgentId,
}

pub fn small_chain() -> SmallChain {
    let mut engine = make_engine();
    let ore_source = engine
        .add_source(SourceConfig::new(ore(), 5, 2))
        .expect("valid ore source");
    let (smelter, smelter_input, plate_pile) = add_station(&mut engine, ore(), 5, plate(), 5, 3);
    let agent = add_agent(&mut engine, 3, 1, &[ore_source], &[smelter]);
    SmallChain {
        engine,
        ore_source,
        smelter,
        smelter_input,
        plate_pile,
        agent,
    }
}
