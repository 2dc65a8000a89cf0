//! Product sources: periodic manufacture of one item type into a stockpile.

use crate::error::ConfigError;
use crate::fixed::Ticks;
use crate::id::{ContainerId, ItemTypeId};
use crate::item::{Container, ItemMint};
use crate::movement::Position;
use crate::timer::Countdown;

/// Static construction parameters for a [`ProductSource`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceConfig {
    pub produced_type: ItemTypeId,
    /// Stockpile capacity.
    pub capacity: u32,
    /// Ticks between spawn attempts.
    pub spawn_interval: Ticks,
    /// When false the source starts inactive and only fills through
    /// direct [`spawn_product`] calls.
    pub auto_spawn: bool,
    pub position: Position,
}

impl SourceConfig {
    pub fn new(produced_type: ItemTypeId, capacity: u32, spawn_interval: Ticks) -> Self {
        Self {
            produced_type,
            capacity,
            spawn_interval,
            auto_spawn: true,
            position: Position::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity { component: "source" });
        }
        if self.spawn_interval == 0 {
            return Err(ConfigError::ZeroInterval { component: "source" });
        }
        Ok(())
    }

    /// The stockpile this source fills: pinned to the produced type.
    pub fn make_container(&self) -> Container {
        Container::fixed(self.capacity, self.produced_type)
    }
}

/// What a spawn attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// The timer has not expired (or the source is inactive).
    NotDue,
    Spawned(ItemTypeId),
    /// The stockpile was full; the attempt still consumed the interval.
    Blocked,
}

/// A periodic spawner. The stockpile container lives in the engine's arena
/// and is referenced by handle.
#[derive(Debug, Clone)]
pub struct ProductSource {
    produced_type: ItemTypeId,
    container: ContainerId,
    spawn_interval: Ticks,
    /// `None` while inactive.
    timer: Option<Countdown>,
    position: Position,
}

impl ProductSource {
    pub(crate) fn new(config: &SourceConfig, container: ContainerId) -> Self {
        let mut source = Self {
            produced_type: config.produced_type,
            container,
            spawn_interval: config.spawn_interval,
            timer: None,
            position: config.position,
        };
        if config.auto_spawn {
            source.activate();
        }
        source
    }

    /// Start the spawn loop. The first attempt happens one full interval
    /// after activation. No-op if already active.
    pub fn activate(&mut self) {
        if self.timer.is_none() {
            self.timer = Some(Countdown::new(self.spawn_interval));
        }
    }

    /// Cancel the spawn timer.
    pub fn deactivate(&mut self) {
        self.timer = None;
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Advance the spawn timer by one tick and, when it expires, attempt a
    /// spawn. The timer is re-armed whether or not the spawn succeeded.
    pub fn tick(&mut self, stockpile: &mut Container, mint: &mut ItemMint) -> SpawnOutcome {
        let Some(timer) = self.timer.as_mut() else {
            return SpawnOutcome::NotDue;
        };
        if !timer.tick() {
            return SpawnOutcome::NotDue;
        }
        timer.reset(self.spawn_interval);
        spawn_product(self.produced_type, stockpile, mint)
    }

    pub fn produced_type(&self) -> ItemTypeId {
        self.produced_type
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn spawn_interval(&self) -> Ticks {
        self.spawn_interval
    }

    /// Ticks until the next spawn attempt, `None` while inactive.
    pub fn ticks_until_spawn(&self) -> Option<Ticks> {
        self.timer.map(|t| t.remaining())
    }
}

/// Add one freshly minted item to `stockpile`, independent of any timer.
/// Nothing is minted when the stockpile cannot take it.
pub fn spawn_product(
    produced_type: ItemTypeId,
    stockpile: &mut Container,
    mint: &mut ItemMint,
) -> SpawnOutcome {
    if !stockpile.can_accept(produced_type) {
        return SpawnOutcome::Blocked;
    }
    match stockpile.try_add(mint.mint(produced_type)) {
        Ok(()) => SpawnOutcome::Spawned(produced_type),
        Err(_) => SpawnOutcome::Blocked,
    }
}
