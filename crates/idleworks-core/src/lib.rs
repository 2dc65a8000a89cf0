//! Idleworks Core -- the simulation engine for idle production yards.
//!
//! A yard is built from bounded item containers and the components that move
//! items between them: product sources that fill stockpiles, processing
//! stations that consume one item and emit a product, staged construction
//! projects, autonomous agents that haul between sources and stations, and
//! interaction dispatchers that announce zones to player-like carriers.
//!
//! # Seven-Phase Step
//!
//! Each call to [`engine::Engine::step`] advances the simulation by one tick:
//!
//! 1. **Sources** -- Spawn timers advance and products enter stockpiles.
//! 2. **Stations** -- Stations claim input, progress, and emit products.
//! 3. **Agents** -- Each agent's hauling state machine advances once.
//! 4. **Dispatch** -- Dispatchers broadcast current zones to carriers.
//! 5. **Continuations** -- Slot builds that came due are completed.
//! 6. **Post-tick** -- Buffered events are delivered to listeners.
//! 7. **Bookkeeping** -- Tick counter and state hash are updated.
//!
//! Delays are measured in ticks. Hosts convert seconds with
//! [`fixed::seconds_to_ticks`].
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns every component and runs the pipeline.
//! - [`item::Container`] -- Ordered, capacity-limited, optionally type-locked
//!   item holder. Items move between containers, never duplicate.
//! - [`construction::ConstructionProject`] -- Ordered slots with
//!   out-of-order builds flushed in slot order.
//! - [`agent::Agent`] -- Source-to-sink hauling state machine.
//! - [`dispatch::InteractionDispatcher`] -- Periodic zone announcements.
//! - [`event::EventBus`] -- Buffered, per-kind event delivery.

pub mod agent;
pub mod carrier;
pub mod construction;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod fixed;
pub mod id;
pub mod item;
pub mod movement;
pub mod query;
pub mod registry;
pub mod schedule;
pub mod sim;
pub mod source;
pub mod station;
pub mod timer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
