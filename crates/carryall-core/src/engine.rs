//! The simulation driver: owns every item, container and task and advances
//! them once per host frame.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - An [`ItemArena`] holding every live [`CarriableItem`]
//! - [`Anchors`], the translation-only frames stacks and platforms hang from
//! - Stacks, collectors and stations in `SlotMap`s keyed by typed ids
//! - A [`MoneyBank`] and an [`EventBus`]
//! - A [`SimState`] (tick counter, elapsed seconds)
//!
//! # Tick
//!
//! Each `tick(dt)` runs:
//! 1. **Collectors** -- admit at most one overlapping item each, then advance
//!    every in-flight pickup
//! 2. **Stations** -- advance the drain task, then the processing task
//! 3. **Bookkeeping** -- update the clock and the state hash
//!
//! Host inputs (`report_overlap`, `station_triggered`, `destroy_item`, ...)
//! are applied immediately, except overlaps, which are consumed by the next
//! tick.

use crate::bank::MoneyBank;
use crate::collector::{Collector, CollectorSettings};
use crate::event::{EventBus, EventKind, Listener};
use crate::fixed::{non_negative, Seconds, Ticks};
use crate::id::{AnchorId, CollectorId, ItemId, StackId, StationId};
use crate::item::{Anchors, CarriableItem, ItemArena, Parent};
use crate::sim::{SimState, StateHash, TickContext};
use crate::stack::{ItemStack, StackSettings};
use crate::station::{Platform, ProcessingStation, StationSettings};
use crate::vec3::Vec3;
use slotmap::{Key, SlotMap};

/// Errors from host calls that name something the engine does not have.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("unknown stack {0:?}")]
    UnknownStack(StackId),
    #[error("unknown collector {0:?}")]
    UnknownCollector(CollectorId),
    #[error("unknown station {0:?}")]
    UnknownStation(StationId),
    #[error("unknown item {0:?}")]
    UnknownItem(ItemId),
    #[error("unknown anchor {0:?}")]
    UnknownAnchor(AnchorId),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Engine {
    pub(crate) items: ItemArena,
    pub(crate) anchors: Anchors,
    pub(crate) stacks: SlotMap<StackId, ItemStack>,
    pub(crate) collectors: SlotMap<CollectorId, Collector>,
    pub(crate) stations: SlotMap<StationId, ProcessingStation>,
    pub(crate) bank: MoneyBank,

    /// Simulation clock.
    pub sim_state: SimState,
    pub(crate) paused: bool,
    pub(crate) last_state_hash: u64,

    /// Event bus. Not part of snapshots.
    pub(crate) event_bus: EventBus,
}

/// Split the engine into the tick context and the task maps, so a task can
/// be borrowed mutably alongside the state it touches.
macro_rules! split {
    ($engine:expr) => {{
        let Engine {
            items,
            anchors,
            stacks,
            collectors,
            stations,
            bank,
            sim_state,
            event_bus,
            ..
        } = $engine;
        (
            TickContext {
                items,
                anchors,
                stacks,
                events: event_bus,
                bank,
                tick: sim_state.tick,
            },
            collectors,
            stations,
        )
    }};
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a non-zero balance.
    pub fn with_balance(balance: i64) -> Self {
        Self {
            bank: MoneyBank::new(balance),
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn add_anchor(&mut self, world_position: Vec3) -> AnchorId {
        self.anchors.insert(world_position)
    }

    /// Move an anchor; everything parented to it follows.
    pub fn set_anchor_position(
        &mut self,
        anchor: AnchorId,
        world_position: Vec3,
    ) -> Result<(), SimError> {
        if self.anchors.set(anchor, world_position) {
            Ok(())
        } else {
            Err(SimError::UnknownAnchor(anchor))
        }
    }

    pub fn add_stack(
        &mut self,
        settings: StackSettings,
        anchor: AnchorId,
    ) -> Result<StackId, SimError> {
        if self.anchors.get(anchor).is_none() {
            return Err(SimError::UnknownAnchor(anchor));
        }
        Ok(self.stacks.insert(ItemStack::new(settings, anchor)))
    }

    pub fn add_collector(
        &mut self,
        settings: CollectorSettings,
        stack: StackId,
    ) -> Result<CollectorId, SimError> {
        if !self.stacks.contains_key(stack) {
            return Err(SimError::UnknownStack(stack));
        }
        Ok(self.collectors.insert(Collector::new(stack, settings)))
    }

    pub fn add_station(
        &mut self,
        settings: StationSettings,
        source: StackId,
        input: Platform,
        output: Platform,
    ) -> Result<StationId, SimError> {
        if !self.stacks.contains_key(source) {
            return Err(SimError::UnknownStack(source));
        }
        for root in [input.root, output.root] {
            if self.anchors.get(root).is_none() {
                return Err(SimError::UnknownAnchor(root));
            }
        }
        Ok(self
            .stations
            .insert(ProcessingStation::new(settings, source, input, output)))
    }

    /// Place a new item in the world.
    pub fn spawn_item(&mut self, item: CarriableItem) -> ItemId {
        self.items.spawn(item)
    }

    // -----------------------------------------------------------------------
    // Host inputs
    // -----------------------------------------------------------------------

    /// `item` is inside the collector's trigger region this frame.
    pub fn report_overlap(&mut self, collector: CollectorId, item: ItemId) -> Result<(), SimError> {
        let c = self
            .collectors
            .get_mut(collector)
            .ok_or(SimError::UnknownCollector(collector))?;
        c.report_overlap(item);
        Ok(())
    }

    /// The carrier entered a station. Returns whether a drain was started.
    pub fn station_triggered(&mut self, station: StationId) -> Result<bool, SimError> {
        let s = self
            .stations
            .get_mut(station)
            .ok_or(SimError::UnknownStation(station))?;
        Ok(s.trigger())
    }

    /// Manually start processing. Returns whether a batch was started.
    pub fn start_processing(&mut self, station: StationId) -> Result<bool, SimError> {
        let s = self
            .stations
            .get_mut(station)
            .ok_or(SimError::UnknownStation(station))?;
        Ok(s.try_start_processing(station))
    }

    /// Let up to `n` produced items leave a station's output platform.
    pub fn release_output(&mut self, station: StationId, n: u32) -> Result<Vec<ItemId>, SimError> {
        let (mut ctx, _, stations) = split!(self);
        let s = stations
            .get_mut(station)
            .ok_or(SimError::UnknownStation(station))?;
        Ok(s.release_output(station, n, &mut ctx))
    }

    /// Abort an in-flight pickup. Returns false if the item was not in flight.
    pub fn abort_pickup(&mut self, collector: CollectorId, item: ItemId) -> Result<bool, SimError> {
        let (mut ctx, collectors, _) = split!(self);
        let c = collectors
            .get_mut(collector)
            .ok_or(SimError::UnknownCollector(collector))?;
        Ok(c.abort(collector, item, &mut ctx))
    }

    /// Destroy an item wherever it is. Stacks and platforms drop it at once;
    /// in-flight tasks notice on their next poll.
    pub fn destroy_item(&mut self, item: ItemId) -> Result<CarriableItem, SimError> {
        let removed = self.items.destroy(item).ok_or(SimError::UnknownItem(item))?;

        let (mut ctx, _, stations) = split!(self);
        for (_, stack) in ctx.stacks.iter_mut() {
            if stack.remove(item, ctx.items) {
                break;
            }
        }
        for (id, station) in stations.iter_mut() {
            if station.remove_item(id, item, &mut ctx).is_some() {
                break;
            }
        }
        Ok(removed)
    }

    /// Remove a collector, rolling back its in-flight pickups.
    pub fn remove_collector(&mut self, collector: CollectorId) -> Result<(), SimError> {
        let (mut ctx, collectors, _) = split!(self);
        let mut c = collectors
            .remove(collector)
            .ok_or(SimError::UnknownCollector(collector))?;
        c.abort_all(collector, &mut ctx);
        Ok(())
    }

    /// Remove a stack. Its items fall back into the world.
    pub fn remove_stack(&mut self, stack: StackId) -> Result<Vec<ItemId>, SimError> {
        let mut s = self.stacks.remove(stack).ok_or(SimError::UnknownStack(stack))?;
        let items = s.pop_all();
        for &item in &items {
            self.items.reparent(item, Parent::World, &self.anchors, true);
            self.items.set_physics(item, true);
        }
        Ok(items)
    }

    pub fn set_stack_capacity(&mut self, stack: StackId, capacity: i64) -> Result<(), SimError> {
        let s = self.stacks.get_mut(stack).ok_or(SimError::UnknownStack(stack))?;
        s.set_capacity(capacity);
        Ok(())
    }

    /// Take up to `n` items off the top of a stack. They stay parented to
    /// the stack anchor until the caller does something with them.
    pub fn pop_many(&mut self, stack: StackId, n: u32) -> Result<Vec<ItemId>, SimError> {
        let s = self.stacks.get_mut(stack).ok_or(SimError::UnknownStack(stack))?;
        Ok(s.pop_many(n, &mut self.items))
    }

    /// Put items back on top of a stack. Returns the ones that did not fit.
    pub fn push_back_top(
        &mut self,
        stack: StackId,
        items: Vec<ItemId>,
    ) -> Result<Vec<ItemId>, SimError> {
        let s = self.stacks.get_mut(stack).ok_or(SimError::UnknownStack(stack))?;
        Ok(s.push_back_top(items, &mut self.items))
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds. Negative `dt` counts as zero.
    /// No-op while paused.
    pub fn tick(&mut self, dt: Seconds) {
        if self.paused {
            return;
        }
        let dt = non_negative(dt);

        {
            let (mut ctx, collectors, stations) = split!(&mut *self);
            for (id, collector) in collectors.iter_mut() {
                collector.tick(id, dt, &mut ctx);
            }
            for (id, station) in stations.iter_mut() {
                station.tick(id, dt, &mut ctx);
            }
        }

        self.sim_state.tick += 1;
        self.sim_state.elapsed = self.sim_state.elapsed.saturating_add(dt);
        self.last_state_hash = self.compute_state_hash();
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -----------------------------------------------------------------------
    // Event system
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    /// Register an observer. It runs synchronously right after the state
    /// change it reports.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.event_bus.on(kind, listener);
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.event_bus
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn items(&self) -> &ItemArena {
        &self.items
    }

    pub fn item(&self, item: ItemId) -> Option<&CarriableItem> {
        self.items.get(item)
    }

    pub fn world_position(&self, item: ItemId) -> Option<Vec3> {
        self.items.world_position(item, &self.anchors)
    }

    pub fn anchors(&self) -> &Anchors {
        &self.anchors
    }

    pub fn stack(&self, stack: StackId) -> Option<&ItemStack> {
        self.stacks.get(stack)
    }

    pub fn collector(&self, collector: CollectorId) -> Option<&Collector> {
        self.collectors.get(collector)
    }

    pub fn station(&self, station: StationId) -> Option<&ProcessingStation> {
        self.stations.get(station)
    }

    pub fn balance(&self) -> i64 {
        self.bank.balance()
    }

    pub fn tick_count(&self) -> Ticks {
        self.sim_state.tick
    }

    pub fn elapsed(&self) -> Seconds {
        self.sim_state.elapsed
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// Hash computed at the end of the last tick.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// Hash of everything a host can observe: clock, balance, item poses,
    /// stack and platform contents.
    pub fn compute_state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.sim_state.tick);
        h.write_fixed64(self.sim_state.elapsed);
        h.write_i64(self.bank.balance());

        h.write_u64(self.items.len() as u64);
        for (id, item) in self.items.iter() {
            h.write_u64(id.data().as_ffi());
            h.write_u32(item.kind.0);
            match item.parent {
                Parent::World => h.write_u64(0),
                Parent::Anchor(a) => h.write_u64(a.data().as_ffi()),
            }
            for v in [item.local_position, item.local_scale] {
                h.write_fixed64(v.x);
                h.write_fixed64(v.y);
                h.write_fixed64(v.z);
            }
            h.write(&[item.physics_enabled as u8]);
        }

        for (id, stack) in &self.stacks {
            h.write_u64(id.data().as_ffi());
            h.write_u32(stack.reserved_slots());
            for item in stack.items() {
                h.write_u64(item.data().as_ffi());
            }
        }

        for (id, station) in &self.stations {
            h.write_u64(id.data().as_ffi());
            h.write_u32(station.input_count());
            h.write_u32(station.output_count());
            h.write(&[station.phase() as u8]);
        }

        h.finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
