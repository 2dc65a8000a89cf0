//! Serde data file structs for scene definitions.
//!
//! A scene file describes one yard: its item types and every component,
//! referring to other components by name. Durations are in seconds. The
//! builder resolves names and converts durations to ticks.

use serde::Deserialize;

// ===========================================================================
// Scene
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SceneData {
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
    pub items: Vec<ItemData>,
    #[serde(default)]
    pub sources: Vec<SourceData>,
    #[serde(default)]
    pub stations: Vec<StationData>,
    #[serde(default)]
    pub projects: Vec<ProjectData>,
    #[serde(default)]
    pub disposals: Vec<DisposalData>,
    #[serde(default)]
    pub agents: Vec<AgentData>,
    #[serde(default)]
    pub carriers: Vec<CarrierData>,
}

fn default_ticks_per_second() -> u32 {
    20
}

fn default_capacity() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

/// `[x, y, z]` in world units.
pub type PositionData = [f64; 3];

// ===========================================================================
// Items
// ===========================================================================

/// An item type definition. Offset and rotation only affect how stacks are
/// drawn.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default = "default_stack_offset")]
    pub stack_offset: [f64; 3],
    #[serde(default)]
    pub stack_rotation: [f64; 3],
}

fn default_stack_offset() -> [f64; 3] {
    [0.0, 0.1, 0.0]
}

// ===========================================================================
// Components
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SourceData {
    pub name: String,
    /// Item type name.
    pub item: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: f64,
    #[serde(default = "default_true")]
    pub auto_spawn: bool,
    #[serde(default)]
    pub position: PositionData,
}

fn default_spawn_interval() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationData {
    pub name: String,
    /// Item type the input area accepts.
    pub input: String,
    #[serde(default = "default_capacity")]
    pub input_capacity: u32,
    /// Name of the source that receives products.
    pub output: String,
    pub processing_time: f64,
    #[serde(default)]
    pub position: PositionData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectData {
    pub name: String,
    /// Item type names, one per slot, in build order.
    pub parts: Vec<String>,
    #[serde(default = "default_build_time")]
    pub build_time: f64,
    #[serde(default)]
    pub position: PositionData,
}

fn default_build_time() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisposalData {
    pub name: String,
    #[serde(default)]
    pub position: PositionData,
}

/// An autonomous hauler. Without explicit lists it serves every source and
/// every station in declaration order.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentData {
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default = "default_interaction_interval")]
    pub interaction_interval: f64,
    #[serde(default = "default_wait_check_interval")]
    pub wait_check_interval: f64,
    #[serde(default)]
    pub idle_point: Option<PositionData>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub sinks: Option<Vec<String>>,
}

fn default_interaction_interval() -> f64 {
    0.2
}

fn default_wait_check_interval() -> f64 {
    1.0
}

/// A player-style carrier. Each gets its own dispatcher subscribed to every
/// zone category; `zones` lists the zones it starts inside.
#[derive(Debug, Clone, Deserialize)]
pub struct CarrierData {
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    #[serde(default)]
    pub zones: Vec<ZoneData>,
}

fn default_tick_rate() -> f64 {
    0.25
}

/// A zone by category and component name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum ZoneData {
    Source(String),
    Sink(String),
    Construction(String),
    Disposal(String),
}

// ===========================================================================
// Tests
// ===========================================================================
