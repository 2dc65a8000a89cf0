//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted while components are stepped and delivered in batch
//! once the step's continuations have fired. Each event kind has its own
//! [`EventBuffer`] ring buffer with a configurable capacity. A full buffer
//! evicts its oldest event, except for the kinds listed by
//! [`EventKind::is_lossless`], whose buffers grow until delivery.
//!
//! Listeners are read-only: they observe the simulation (UI, audio, an
//! external economy) but cannot mutate it during delivery.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use std::collections::VecDeque;

use tracing::warn;

use crate::agent::AgentState;
use crate::dispatch::ZoneRef;
use crate::fixed::Ticks;
use crate::id::*;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why an item was destroyed outside the normal consume path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestroyCause {
    /// Delivered to a target that requires a different type.
    TypeMismatch,
    /// Offered to a project that is already complete.
    ProjectComplete,
    /// Offered to a project whose remaining slots are all claimed.
    NoOpenSlot,
    ProjectInactive,
    /// Held by a component when it was deactivated.
    Cancelled,
}

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Production --
    ItemSpawned {
        source: SourceId,
        item_type: ItemTypeId,
        tick: Ticks,
    },
    SpawnBlocked {
        source: SourceId,
        tick: Ticks,
    },
    ProcessingStarted {
        station: StationId,
        item_type: ItemTypeId,
        tick: Ticks,
    },
    /// The claimed item was consumed. `product` is `None` when the output
    /// source had no room for it.
    ProcessingFinished {
        station: StationId,
        consumed: ItemTypeId,
        product: Option<ItemTypeId>,
        tick: Ticks,
    },

    // -- Transport --
    ItemTransferred {
        from: ContainerId,
        to: ContainerId,
        item_type: ItemTypeId,
        tick: Ticks,
    },
    ItemDestroyed {
        item_type: ItemTypeId,
        cause: DestroyCause,
        tick: Ticks,
    },
    ItemTrashed {
        disposal: DisposalId,
        item_type: ItemTypeId,
        tick: Ticks,
    },

    // -- Construction --
    SlotClaimed {
        project: ProjectId,
        slot: usize,
        item_type: ItemTypeId,
        tick: Ticks,
    },
    PartCompleted {
        project: ProjectId,
        slot: usize,
        tick: Ticks,
    },
    ProjectCompleted {
        project: ProjectId,
        tick: Ticks,
    },

    // -- Agents and dispatch --
    AgentStateChanged {
        agent: AgentId,
        from: AgentState,
        to: AgentState,
        tick: Ticks,
    },
    ZoneAnnounced {
        dispatcher: DispatcherId,
        carrier: CarrierId,
        zone: ZoneRef,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemSpawned,
    SpawnBlocked,
    ProcessingStarted,
    ProcessingFinished,
    ItemTransferred,
    ItemDestroyed,
    ItemTrashed,
    SlotClaimed,
    PartCompleted,
    ProjectCompleted,
    AgentStateChanged,
    ZoneAnnounced,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 12;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ItemSpawned { .. } => EventKind::ItemSpawned,
            Event::SpawnBlocked { .. } => EventKind::SpawnBlocked,
            Event::ProcessingStarted { .. } => EventKind::ProcessingStarted,
            Event::ProcessingFinished { .. } => EventKind::ProcessingFinished,
            Event::ItemTransferred { .. } => EventKind::ItemTransferred,
            Event::ItemDestroyed { .. } => EventKind::ItemDestroyed,
            Event::ItemTrashed { .. } => EventKind::ItemTrashed,
            Event::SlotClaimed { .. } => EventKind::SlotClaimed,
            Event::PartCompleted { .. } => EventKind::PartCompleted,
            Event::ProjectCompleted { .. } => EventKind::ProjectCompleted,
            Event::AgentStateChanged { .. } => EventKind::AgentStateChanged,
            Event::ZoneAnnounced { .. } => EventKind::ZoneAnnounced,
        }
    }

    pub fn tick(&self) -> Ticks {
        match *self {
            Event::ItemSpawned { tick, .. }
            | Event::SpawnBlocked { tick, .. }
            | Event::ProcessingStarted { tick, .. }
            | Event::ProcessingFinished { tick, .. }
            | Event::ItemTransferred { tick, .. }
            | Event::ItemDestroyed { tick, .. }
            | Event::ItemTrashed { tick, .. }
            | Event::SlotClaimed { tick, .. }
            | Event::PartCompleted { tick, .. }
            | Event::ProjectCompleted { tick, .. }
            | Event::AgentStateChanged { tick, .. }
            | Event::ZoneAnnounced { tick, .. } => tick,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }

    /// Kinds that count something (completed parts, lost items) and so are
    /// never evicted from a full buffer.
    pub fn is_lossless(self) -> bool {
        matches!(
            self,
            EventKind::PartCompleted
                | EventKind::ProjectCompleted
                | EventKind::ItemDestroyed
                | EventKind::ItemTrashed
        )
    }
}

// ---------------------------------------------------------------------------
// Per-kind ring buffer
// ---------------------------------------------------------------------------

/// FIFO of one kind's events for the current step. A bounded buffer evicts
/// its oldest entry when full; a lossless one grows past its capacity.
#[derive(Debug)]
pub struct EventBuffer {
    ring: VecDeque<Event>,
    cap: usize,
    written: u64,
    lossless: bool,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        Self {
            ring: VecDeque::with_capacity(cap),
            cap,
            written: 0,
            lossless: false,
        }
    }

    /// Pre-allocates `capacity` but never evicts.
    pub fn lossless(capacity: usize) -> Self {
        Self {
            lossless: true,
            ..Self::new(capacity)
        }
    }

    /// Returns true if the oldest event was evicted to make room.
    pub fn push(&mut self, event: Event) -> bool {
        let evict = !self.lossless && self.ring.len() >= self.cap;
        if evict {
            self.ring.pop_front();
        }
        self.ring.push_back(event);
        self.written += 1;
        evict
    }

    pub fn is_lossless(&self) -> bool {
        self.lossless
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Every push since creation, evicted ones included.
    pub fn total_written(&self) -> u64 {
        self.written
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.ring.iter()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Read-only observer of one event kind.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Events for which this returns false skip the listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct Subscription {
    callback: PassiveListener,
    filter: Option<EventFilter>,
    /// `(priority, registration sequence)`.
    rank: (SubscriberPriority, u64),
}

impl Subscription {
    fn wants(&self, event: &Event) -> bool {
        self.filter.as_ref().is_none_or(|f| f(event))
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Buffers each step's events by kind and hands them to subscribers in the
/// post-tick phase.
pub struct EventBus {
    queues: [Option<EventBuffer>; EVENT_KIND_COUNT],
    muted: [bool; EVENT_KIND_COUNT],
    subscriptions: [Vec<Subscription>; EVENT_KIND_COUNT],
    queue_capacity: usize,
    /// Kinds that evicted an event since the last delivery.
    overflowed: [bool; EVENT_KIND_COUNT],
    next_seq: u64,
    needs_sort: bool,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers: usize = self.subscriptions.iter().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("queues", &self.queues)
            .field("muted", &self.muted)
            .field("subscribers", &subscribers)
            .finish()
    }
}

impl EventBus {
    /// `queue_capacity` bounds each kind's buffer.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queues: Default::default(),
            muted: [false; EVENT_KIND_COUNT],
            subscriptions: Default::default(),
            queue_capacity,
            overflowed: [false; EVENT_KIND_COUNT],
            next_seq: 0,
            needs_sort: false,
        }
    }

    /// Stop recording `kind`. Anything already buffered for it is dropped.
    pub fn suppress(&mut self, kind: EventKind) {
        self.muted[kind.index()] = true;
        self.queues[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.muted[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.muted[kind.index()]
    }

    pub fn emit(&mut self, event: Event) {
        let kind = event.kind();
        let slot = kind.index();
        if self.muted[slot] {
            return;
        }
        let capacity = self.queue_capacity;
        let evicted = self.queues[slot]
            .get_or_insert_with(|| {
                if kind.is_lossless() {
                    EventBuffer::lossless(capacity)
                } else {
                    EventBuffer::new(capacity)
                }
            })
            .push(event);
        if evicted && !self.overflowed[slot] {
            self.overflowed[slot] = true;
            warn!(?kind, capacity, "event buffer full, dropping oldest events this step");
        }
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.subscriptions[kind.index()].push(Subscription {
            callback: listener,
            filter,
            rank: (priority, seq),
        });
        self.needs_sort = true;
    }

    /// Hand every buffered event to its subscribers and empty the buffers.
    /// Returns how many events were delivered.
    ///
    /// Kinds go in declaration order. For one kind, each subscriber in
    /// `(priority, registration)` order sees the whole batch oldest to
    /// newest before the next subscriber runs.
    pub fn deliver(&mut self) -> usize {
        if self.needs_sort {
            for subs in &mut self.subscriptions {
                subs.sort_by_key(|s| s.rank);
            }
            self.needs_sort = false;
        }

        let mut delivered = 0;
        for (queue, subs) in self.queues.iter_mut().zip(&mut self.subscriptions) {
            let Some(queue) = queue.as_mut().filter(|q| !q.is_empty()) else {
                continue;
            };
            delivered += queue.len();
            for sub in subs.iter_mut() {
                for event in queue.iter() {
                    if sub.wants(event) {
                        (sub.callback)(event);
                    }
                }
            }
            queue.clear();
        }
        self.overflowed = [false; EVENT_KIND_COUNT];
        delivered
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.queues[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    /// Every emit of `kind` since its buffer was created, evicted ones
    /// included.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.subscriptions[kind.index()].len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
