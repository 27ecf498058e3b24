//! Typed events with synchronous observers and a bounded history.
//!
//! Every state change the host may want to mirror (pickups, platform counts,
//! production, money) is emitted as an [`Event`] the moment the mutation has
//! been applied. Listeners registered with [`EventBus::on`] run immediately
//! inside `emit`, so a UI binder always sees the post-mutation value. Each
//! event kind additionally keeps a ring buffer of recent events that the host
//! can poll and drain once per frame instead of registering closures.
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which skips both
//! buffering and listener dispatch for that kind.

use crate::collector::RollbackReason;
use crate::fixed::Ticks;
use crate::id::*;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Collector --
    PickupStarted {
        collector: CollectorId,
        item: ItemId,
        slot: u32,
        tick: Ticks,
    },
    PickupCommitted {
        collector: CollectorId,
        item: ItemId,
        stack: StackId,
        tick: Ticks,
    },
    PickupRolledBack {
        collector: CollectorId,
        item: ItemId,
        reason: RollbackReason,
        tick: Ticks,
    },

    // -- Station platforms --
    InputCountChanged {
        station: StationId,
        count: u32,
        tick: Ticks,
    },
    OutputCountChanged {
        station: StationId,
        count: u32,
        tick: Ticks,
    },

    // -- Station production --
    BatchConsumed {
        station: StationId,
        quantity: u32,
        tick: Ticks,
    },
    ItemsProduced {
        station: StationId,
        kind: ItemKindId,
        quantity: u32,
        tick: Ticks,
    },
    OutputTimedOut {
        station: StationId,
        free: u32,
        tick: Ticks,
    },

    // -- Money --
    MoneyAdded {
        station: StationId,
        amount: i64,
        tick: Ticks,
    },
    BalanceChanged {
        balance: i64,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PickupStarted,
    PickupCommitted,
    PickupRolledBack,
    InputCountChanged,
    OutputCountChanged,
    BatchConsumed,
    ItemsProduced,
    OutputTimedOut,
    MoneyAdded,
    BalanceChanged,
}

const EVENT_KIND_COUNT: usize = 10;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PickupStarted { .. } => EventKind::PickupStarted,
            Event::PickupCommitted { .. } => EventKind::PickupCommitted,
            Event::PickupRolledBack { .. } => EventKind::PickupRolledBack,
            Event::InputCountChanged { .. } => EventKind::InputCountChanged,
            Event::OutputCountChanged { .. } => EventKind::OutputCountChanged,
            Event::BatchConsumed { .. } => EventKind::BatchConsumed,
            Event::ItemsProduced { .. } => EventKind::ItemsProduced,
            Event::OutputTimedOut { .. } => EventKind::OutputTimedOut,
            Event::MoneyAdded { .. } => EventKind::MoneyAdded,
            Event::BalanceChanged { .. } => EventKind::BalanceChanged,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        let cap = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % cap].as_ref())
    }

    /// Remove and return every stored event, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        let events: Vec<Event> = self.iter().cloned().collect();
        self.clear();
        events
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A listener receives events read-only, synchronously on emit.
pub type Listener = Box<dyn FnMut(&Event)>;

/// Holds one history buffer and one listener list per event kind.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<Listener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listener_count: usize = self.listeners.iter().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("listeners", &listener_count)
            .field("default_capacity", &self.default_capacity)
            .finish()
    }
}

impl EventBus {
    /// Create a bus whose per-kind history holds `default_capacity` events.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Suppress an event kind. Its history buffer is dropped.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Register a listener. Listeners for a kind run in registration order.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Record an event and notify its listeners before returning.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }

        for listener in &mut self.listeners[idx] {
            listener(&event);
        }

        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map(EventBuffer::len).unwrap_or(0)
    }

    /// Total events ever emitted for a kind, including ones dropped from history.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map(EventBuffer::total_written).unwrap_or(0)
    }

    /// Remove and return the history of one kind, oldest first.
    pub fn drain(&mut self, kind: EventKind) -> Vec<Event> {
        self.buffers[kind.index()]
            .as_mut()
            .map(EventBuffer::drain)
            .unwrap_or_default()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn station_id() -> StationId {
        let mut sm = SlotMap::<StationId, ()>::with_key();
        sm.insert(())
    }

    fn input_changed(station: StationId, count: u32) -> Event {
        Event::InputCountChanged {
            station,
            count,
            tick: 0,
        }
    }

    #[test]
    fn ring_buffer_drops_oldest() {
        let station = station_id();
        let mut buf = EventBuffer::new(3);
        for i in 0..5 {
            buf.push(input_changed(station, i));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        let counts: Vec<u32> = buf
            .iter()
            .map(|e| match e {
                Event::InputCountChanged { count, .. } => *count,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(counts, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_clamped() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn listeners_run_synchronously_on_emit() {
        let station = station_id();
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.on(
            EventKind::InputCountChanged,
            Box::new(move |e| {
                if let Event::InputCountChanged { count, .. } = e {
                    sink.borrow_mut().push(*count);
                }
            }),
        );

        bus.emit(input_changed(station, 1));
        assert_eq!(*seen.borrow(), vec![1]);
        bus.emit(input_changed(station, 2));
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn listeners_only_see_their_kind() {
        let station = station_id();
        let mut bus = EventBus::default();
        let hits = Rc::new(RefCell::new(0));
        let sink = hits.clone();
        bus.on(EventKind::MoneyAdded, Box::new(move |_| *sink.borrow_mut() += 1));

        bus.emit(input_changed(station, 1));
        assert_eq!(*hits.borrow(), 0);
        bus.emit(Event::MoneyAdded {
            station,
            amount: 10,
            tick: 0,
        });
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn suppressed_kind_is_silent() {
        let station = station_id();
        let mut bus = EventBus::default();
        let hits = Rc::new(RefCell::new(0));
        let sink = hits.clone();
        bus.on(EventKind::InputCountChanged, Box::new(move |_| *sink.borrow_mut() += 1));
        bus.suppress(EventKind::InputCountChanged);

        bus.emit(input_changed(station, 1));
        assert_eq!(*hits.borrow(), 0);
        assert_eq!(bus.buffered_count(EventKind::InputCountChanged), 0);

        bus.unsuppress(EventKind::InputCountChanged);
        bus.emit(input_changed(station, 2));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn drain_empties_history() {
        let station = station_id();
        let mut bus = EventBus::default();
        bus.emit(input_changed(station, 1));
        bus.emit(input_changed(station, 2));
        let drained = bus.drain(EventKind::InputCountChanged);
        assert_eq!(drained.len(), 2);
        assert_eq!(bus.buffered_count(EventKind::InputCountChanged), 0);
        assert_eq!(bus.total_emitted(EventKind::InputCountChanged), 2);
        assert!(bus.drain(EventKind::MoneyAdded).is_empty());
    }
}
