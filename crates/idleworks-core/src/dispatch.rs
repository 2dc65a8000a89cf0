//! Interaction dispatch: tracks which zone of each category a carrier stands
//! in and re-announces those zones to subscribers at a fixed rate.
//!
//! Enter and exit signals update the tracked zone immediately. Announcements
//! happen only on the broadcast tick, so the rate of carrier actions is
//! bounded no matter how long an overlap lasts.

use crate::error::ConfigError;
use crate::fixed::Ticks;
use crate::id::{CarrierId, DisposalId, ProjectId, SourceId, StationId};
use crate::timer::Countdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ZoneCategory {
    Source,
    Sink,
    Construction,
    Disposal,
}

impl ZoneCategory {
    /// Every category, in announcement order.
    pub const ALL: [ZoneCategory; 4] = [
        ZoneCategory::Source,
        ZoneCategory::Sink,
        ZoneCategory::Construction,
        ZoneCategory::Disposal,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// A zone a carrier can overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ZoneRef {
    Source(SourceId),
    Sink(StationId),
    Construction(ProjectId),
    Disposal(DisposalId),
}

impl ZoneRef {
    pub fn category(&self) -> ZoneCategory {
        match self {
            ZoneRef::Source(_) => ZoneCategory::Source,
            ZoneRef::Sink(_) => ZoneCategory::Sink,
            ZoneRef::Construction(_) => ZoneCategory::Construction,
            ZoneRef::Disposal(_) => ZoneCategory::Disposal,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DispatcherConfig {
    /// Ticks between broadcasts.
    pub broadcast_interval: Ticks,
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                component: "interaction dispatcher",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InteractionDispatcher {
    active: [Option<ZoneRef>; 4],
    subscribers: [Vec<CarrierId>; 4],
    interval: Ticks,
    /// `None` while inactive.
    timer: Option<Countdown>,
}

impl InteractionDispatcher {
    pub(crate) fn new(config: &DispatcherConfig) -> Self {
        Self {
            active: [None; 4],
            subscribers: Default::default(),
            interval: config.broadcast_interval,
            timer: None,
        }
    }

    /// Start broadcasting. The first broadcast happens on the next tick.
    pub(crate) fn activate(&mut self) {
        if self.timer.is_none() {
            self.timer = Some(Countdown::expired_now());
        }
    }

    pub(crate) fn deactivate(&mut self) {
        self.timer = None;
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Record that the carrier entered `zone`, replacing the category's
    /// current zone. Returns false if `zone` is not of `category`.
    pub fn enter(&mut self, category: ZoneCategory, zone: ZoneRef) -> bool {
        if zone.category() != category {
            return false;
        }
        self.active[category.index()] = Some(zone);
        true
    }

    /// Record that the carrier left `zone`. Clears the category only if
    /// `zone` is its current zone; returns whether it was cleared.
    pub fn exit(&mut self, category: ZoneCategory, zone: ZoneRef) -> bool {
        let slot = &mut self.active[category.index()];
        if *slot == Some(zone) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn current(&self, category: ZoneCategory) -> Option<ZoneRef> {
        self.active[category.index()]
    }

    pub fn subscribe(&mut self, category: ZoneCategory, carrier: CarrierId) {
        let list = &mut self.subscribers[category.index()];
        if !list.contains(&carrier) {
            list.push(carrier);
        }
    }

    pub fn unsubscribe(&mut self, category: ZoneCategory, carrier: CarrierId) {
        self.subscribers[category.index()].retain(|&c| c != carrier);
    }

    pub fn subscribers(&self, category: ZoneCategory) -> &[CarrierId] {
        &self.subscribers[category.index()]
    }

    /// Advance the broadcast timer. On a broadcast tick, returns one
    /// `(subscriber, zone)` pair per subscriber of each occupied category,
    /// categories in [`ZoneCategory::ALL`] order and subscribers in
    /// subscription order.
    pub fn tick(&mut self) -> Vec<(CarrierId, ZoneRef)> {
        let Some(timer) = self.timer.as_mut() else {
            return Vec::new();
        };
        if !timer.tick() {
            return Vec::new();
        }
        timer.reset(self.interval);

        let mut announcements = Vec::new();
        for category in ZoneCategory::ALL {
            if let Some(zone) = self.active[category.index()] {
                for &carrier in &self.subscribers[category.index()] {
                    announcements.push((carrier, zone));
                }
            }
        }
        announcements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    struct Ids {
        sources: SlotMap<SourceId, ()>,
        stations: SlotMap<StationId, ()>,
        carriers: SlotMap<CarrierId, ()>,
    }

    fn ids() -> Ids {
        Ids {
            sources: SlotMap::with_key(),
            stations: SlotMap::with_key(),
            carriers: SlotMap::with_key(),
        }
    }

    fn dispatcher(interval: Ticks) -> InteractionDispatcher {
        let mut d = InteractionDispatcher::new(&DispatcherConfig {
            broadcast_interval: interval,
        });
        d.activate();
        d
    }

    #[test]
    fn enter_rejects_wrong_category() {
        let mut ids = ids();
        let mut d = dispatcher(1);
        let zone = ZoneRef::Source(ids.sources.insert(()));
        assert!(!d.enter(ZoneCategory::Sink, zone));
        assert!(d.enter(ZoneCategory::Source, zone));
        assert_eq!(d.current(ZoneCategory::Source), Some(zone));
    }

    #[test]
    fn exit_only_clears_matching_zone() {
        let mut ids = ids();
        let mut d = dispatcher(1);
        let first = ZoneRef::Source(ids.sources.insert(()));
        let second = ZoneRef::Source(ids.sources.insert(()));
        d.enter(ZoneCategory::Source, first);
        d.enter(ZoneCategory::Source, second);
        assert!(!d.exit(ZoneCategory::Source, first));
        assert_eq!(d.current(ZoneCategory::Source), Some(second));
        assert!(d.exit(ZoneCategory::Source, second));
        assert_eq!(d.current(ZoneCategory::Source), None);
    }

    #[test]
    fn broadcasts_at_fixed_rate() {
        let mut ids = ids();
        let carrier = ids.carriers.insert(());
        let zone = ZoneRef::Source(ids.sources.insert(()));
        let mut d = dispatcher(3);
        d.subscribe(ZoneCategory::Source, carrier);
        d.enter(ZoneCategory::Source, zone);

        let counts: Vec<usize> = (0..7).map(|_| d.tick().len()).collect();
        assert_eq!(counts, vec![1, 0, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn announces_by_category_then_subscription() {
        let mut ids = ids();
        let c1 = ids.carriers.insert(());
        let c2 = ids.carriers.insert(());
        let source = ZoneRef::Source(ids.sources.insert(()));
        let sink = ZoneRef::Sink(ids.stations.insert(()));
        let mut d = dispatcher(1);
        d.subscribe(ZoneCategory::Sink, c1);
        d.subscribe(ZoneCategory::Source, c2);
        d.subscribe(ZoneCategory::Source, c1);
        d.subscribe(ZoneCategory::Source, c1);
        d.enter(ZoneCategory::Sink, sink);
        d.enter(ZoneCategory::Source, source);

        assert_eq!(d.tick(), vec![(c2, source), (c1, source), (c1, sink)]);
    }

    #[test]
    fn inactive_dispatcher_is_silent() {
        let mut ids = ids();
        let carrier = ids.carriers.insert(());
        let mut d = dispatcher(1);
        d.subscribe(ZoneCategory::Source, carrier);
        d.enter(ZoneCategory::Source, ZoneRef::Source(ids.sources.insert(())));
        d.deactivate();
        assert!(d.tick().is_empty());
        d.unsubscribe(ZoneCategory::Source, carrier);
        d.activate();
        assert!(d.tick().is_empty());
    }
}
