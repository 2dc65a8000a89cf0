//! Builds a ready-to-run [`Engine`] from scene data.
//!
//! Components are created in dependency order (items, sources, stations,
//! projects, disposals, agents, carriers) so every name a component refers to
//! already has a handle when it is resolved.

use std::collections::HashMap;
use std::path::Path;

use idleworks_core::agent::AgentConfig;
use idleworks_core::carrier::CarrierConfig;
use idleworks_core::construction::ProjectConfig;
use idleworks_core::dispatch::{DispatcherConfig, ZoneCategory, ZoneRef};
use idleworks_core::engine::Engine;
use idleworks_core::error::ConfigError;
use idleworks_core::fixed::{checked_f64_to_fixed64, f64_to_fixed64, seconds_to_ticks, Fixed64, Ticks};
use idleworks_core::id::*;
use idleworks_core::item::Container;
use idleworks_core::movement::Position;
use idleworks_core::registry::{RegistryBuilder, StackPlacement};
use idleworks_core::sim::SimulationStrategy;
use idleworks_core::source::SourceConfig;
use idleworks_core::station::StationConfig;
use tracing::{debug, info};

use crate::loader::{deserialize_file, insert_unique, resolve_name, DataLoadError};
use crate::schema::{PositionData, SceneData, ZoneData};

/// Name-to-handle maps for every component in a scene.
#[derive(Debug, Default, Clone)]
pub struct SceneNames {
    pub items: HashMap<String, ItemTypeId>,
    pub sources: HashMap<String, SourceId>,
    pub stations: HashMap<String, StationId>,
    pub projects: HashMap<String, ProjectId>,
    pub disposals: HashMap<String, DisposalId>,
    pub agents: HashMap<String, AgentId>,
    pub carriers: HashMap<String, CarrierId>,
    /// Each carrier's own dispatcher, keyed by carrier name.
    pub dispatchers: HashMap<String, DispatcherId>,
}

/// A fully constructed scene ready for simulation.
#[derive(Debug)]
pub struct Scene {
    pub engine: Engine,
    pub names: SceneNames,
    pub ticks_per_second: u32,
}

/// Load a scene file (format from its extension) and build it.
pub fn load_scene(path: &Path) -> Result<Scene, DataLoadError> {
    let data: SceneData = deserialize_file(path)?;
    debug!(file = %path.display(), "scene file parsed");
    build_scene(&data)
}

/// Build an engine from scene data, resolving every name reference.
pub fn build_scene(data: &SceneData) -> Result<Scene, DataLoadError> {
    if data.ticks_per_second == 0 {
        return Err(DataLoadError::ZeroTickRate);
    }
    let tps = data.ticks_per_second;
    let ticks = |field: String, seconds: f64| {
        checked(field, seconds).map(|seconds| seconds_to_ticks(seconds, tps))
    };
    let mut names = SceneNames::default();

    // 1. Item types
    let mut registry = RegistryBuilder::new();
    for item in &data.items {
        let placement = StackPlacement {
            offset: fixed3(field("item", &item.name, "stack_offset"), item.stack_offset)?,
            rotation: fixed3(field("item", &item.name, "stack_rotation"), item.stack_rotation)?,
        };
        let id = registry.register_item(&item.name, placement);
        insert_unique(&mut names.items, &item.name, "item", id)?;
    }
    let mut engine = Engine::new(SimulationStrategy::Tick).with_registry(registry.build()?);

    // 2. Sources
    for source in &data.sources {
        let config = SourceConfig {
            produced_type: resolve_name(&names.items, &source.item, "item")?,
            capacity: source.capacity,
            spawn_interval: ticks(
                field("source", &source.name, "spawn_interval"),
                source.spawn_interval,
            )?,
            auto_spawn: source.auto_spawn,
            position: position(field("source", &source.name, "position"), source.position)?,
        };
        let id = engine
            .add_source(config)
            .map_err(|e| invalid("source", &source.name, e))?;
        insert_unique(&mut names.sources, &source.name, "source", id)?;
    }

    // 3. Stations, each with its own input area
    for station in &data.stations {
        let accepted = resolve_name(&names.items, &station.input, "item")?;
        let output = resolve_name(&names.sources, &station.output, "source")?;
        if station.input_capacity == 0 {
            return Err(invalid(
                "station",
                &station.name,
                ConfigError::ZeroCapacity {
                    component: "input area",
                },
            ));
        }
        let input = engine.add_container(Container::fixed(station.input_capacity, accepted));
        let processing_time = ticks(
            field("station", &station.name, "processing_time"),
            station.processing_time,
        )?;
        let mut config = StationConfig::new(input, output, processing_time);
        config.position = position(field("station", &station.name, "position"), station.position)?;
        let id = engine.add_station(config);
        engine
            .activate_station(id)
            .map_err(|e| invalid("station", &station.name, e))?;
        insert_unique(&mut names.stations, &station.name, "station", id)?;
    }

    // 4. Construction projects
    for project in &data.projects {
        let slots = project
            .parts
            .iter()
            .map(|part| resolve_name(&names.items, part, "item"))
            .collect::<Result<Vec<_>, _>>()?;
        let build_time = ticks(
            field("construction project", &project.name, "build_time"),
            project.build_time,
        )?;
        let mut config = ProjectConfig::new(slots, build_time);
        config.position = position(
            field("construction project", &project.name, "position"),
            project.position,
        )?;
        let id = engine
            .add_project(config)
            .map_err(|e| invalid("construction project", &project.name, e))?;
        insert_unique(&mut names.projects, &project.name, "construction project", id)?;
    }

    // 5. Disposal areas
    for disposal in &data.disposals {
        let at = position(field("disposal", &disposal.name, "position"), disposal.position)?;
        let id = engine.add_disposal(at);
        insert_unique(&mut names.disposals, &disposal.name, "disposal", id)?;
    }

    // 6. Agents
    let source_names: Vec<String> = data.sources.iter().map(|s| s.name.clone()).collect();
    let station_names: Vec<String> = data.stations.iter().map(|s| s.name.clone()).collect();
    let all_sources = resolve_all(&names.sources, &source_names, "source")?;
    let all_stations = resolve_all(&names.stations, &station_names, "station")?;
    for agent in &data.agents {
        let mut config = AgentConfig::new(
            agent.capacity,
            ticks(
                field("agent", &agent.name, "interaction_interval"),
                agent.interaction_interval,
            )?,
            ticks(
                field("agent", &agent.name, "wait_check_interval"),
                agent.wait_check_interval,
            )?,
        );
        config.idle_point = agent
            .idle_point
            .map(|p| position(field("agent", &agent.name, "idle_point"), p))
            .transpose()?;
        config.sources = match &agent.sources {
            Some(list) => resolve_all(&names.sources, list, "source")?,
            None => all_sources.clone(),
        };
        config.sinks = match &agent.sinks {
            Some(list) => resolve_all(&names.stations, list, "station")?,
            None => all_stations.clone(),
        };
        let id = engine
            .add_agent(config)
            .map_err(|e| invalid("agent", &agent.name, e))?;
        engine
            .activate_agent(id)
            .map_err(|e| invalid("agent", &agent.name, e))?;
        insert_unique(&mut names.agents, &agent.name, "agent", id)?;
    }

    // 7. Carriers, each with its own dispatcher
    for carrier in &data.carriers {
        let id = engine
            .add_carrier(CarrierConfig {
                capacity: carrier.capacity,
            })
            .map_err(|e| invalid("carrier", &carrier.name, e))?;
        let dispatcher = engine
            .add_dispatcher(DispatcherConfig {
                broadcast_interval: ticks(
                    field("carrier", &carrier.name, "tick_rate"),
                    carrier.tick_rate,
                )?,
            })
            .map_err(|e| invalid("carrier", &carrier.name, e))?;
        for category in ZoneCategory::ALL {
            engine
                .subscribe(dispatcher, category, id)
                .map_err(|e| invalid("carrier", &carrier.name, e))?;
        }
        for zone in &carrier.zones {
            let zone = resolve_zone(&names, zone)?;
            engine.overlap_enter(dispatcher, zone.category(), zone);
        }
        engine
            .activate_dispatcher(dispatcher)
            .map_err(|e| invalid("carrier", &carrier.name, e))?;
        insert_unique(&mut names.carriers, &carrier.name, "carrier", id)?;
        names.dispatchers.insert(carrier.name.clone(), dispatcher);
    }

    info!(
        items = names.items.len(),
        sources = names.sources.len(),
        stations = names.stations.len(),
        projects = names.projects.len(),
        agents = names.agents.len(),
        carriers = names.carriers.len(),
        ticks_per_second = tps,
        "scene built"
    );

    Ok(Scene {
        engine,
        names,
        ticks_per_second: tps,
    })
}

impl Scene {
    /// Convert seconds of wall time to the number of steps that cover it.
    ///
    /// Durations too long for the fixed-point range saturate.
    pub fn ticks_for(&self, seconds: f64) -> Ticks {
        seconds_to_ticks(f64_to_fixed64(seconds), self.ticks_per_second)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn invalid(kind: &str, name: &str, source: ConfigError) -> DataLoadError {
    DataLoadError::Config {
        name: format!("{kind} '{name}'"),
        source,
    }
}

fn resolve_all<V: Copy>(
    map: &HashMap<String, V>,
    list: &[String],
    kind: &'static str,
) -> Result<Vec<V>, DataLoadError> {
    list.iter().map(|name| resolve_name(map, name, kind)).collect()
}

fn resolve_zone(names: &SceneNames, zone: &ZoneData) -> Result<ZoneRef, DataLoadError> {
    Ok(match zone {
        ZoneData::Source(n) => ZoneRef::Source(resolve_name(&names.sources, n, "source")?),
        ZoneData::Sink(n) => ZoneRef::Sink(resolve_name(&names.stations, n, "station")?),
        ZoneData::Construction(n) => {
            ZoneRef::Construction(resolve_name(&names.projects, n, "construction project")?)
        }
        ZoneData::Disposal(n) => ZoneRef::Disposal(resolve_name(&names.disposals, n, "disposal")?),
    })
}

fn field(kind: &str, name: &str, field: &str) -> String {
    format!("{kind} '{name}' {field}")
}

/// Scene numbers must fit Q32.32. NaN and infinities are refused too.
fn checked(field: String, value: f64) -> Result<Fixed64, DataLoadError> {
    checked_f64_to_fixed64(value).ok_or(DataLoadError::InvalidValue { field, value })
}

fn fixed3(field: String, v: [f64; 3]) -> Result<[Fixed64; 3], DataLoadError> {
    Ok([
        checked(field.clone(), v[0])?,
        checked(field.clone(), v[1])?,
        checked(field, v[2])?,
    ])
}

fn position(field: String, p: PositionData) -> Result<Position, DataLoadError> {
    let [x, y, z] = fixed3(field, p)?;
    Ok(Position::new(x, y, z))
}
