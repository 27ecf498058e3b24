//! Batch-processing station.
//!
//! A station owns two grid platforms. Triggering it starts a drain task that
//! pops items off its source stack one at a time (LIFO) and hops each onto
//! the next input cell. Once the input holds a full batch, the processing
//! task consumes the oldest `batch_size` items, waits `process_time`, waits
//! for output space (optionally with a timeout), then grows the produced
//! items on the output platform and credits the reward.
//!
//! Both tasks are plain-data state machines polled from [`tick`]. They can
//! run at the same time: the drain keeps filling the input while a batch is
//! being processed. Consumption is irreversible; a batch whose output is
//! blocked still counts as consumed.
//!
//! [`tick`]: ProcessingStation::tick

use crate::event::Event;
use crate::fixed::{non_negative, Fixed64, Seconds};
use crate::grid::GridContainer;
use crate::id::{AnchorId, ItemId, ItemKindId, PlatformSide, StackId, StationId};
use crate::item::{AnimationProfile, CarriableItem, Parent};
use crate::sim::TickContext;
use crate::tween::{Easing, Hop, Progress, Tween};
use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Settings and platforms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSettings {
    /// Items consumed per cycle. Treated as at least 1.
    pub batch_size: u32,
    pub process_time: Seconds,
    /// Items produced per cycle. Treated as at least 1.
    pub produced_per_batch: u32,
    pub produced_kind: ItemKindId,
    /// Shrink/grow duration for consumed and produced items.
    pub scale_duration: Seconds,
    pub easing: Easing,
    /// Wait for output room before producing.
    pub block_until_output_space: bool,
    /// Give up waiting after this long. Zero waits forever.
    pub output_wait_timeout: Seconds,
    pub money_per_batch: i64,
    /// Start processing on its own once a drain finishes.
    pub auto_start_processing: bool,
    /// Duration of the hop from the stack onto the input platform.
    pub move_duration: Seconds,
    /// Peak height of that hop.
    pub move_arc: Fixed64,
}

/// A grid placed at an anchor. Items on the platform are parented to `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub grid: GridContainer,
    pub root: AnchorId,
}

impl Platform {
    pub fn new(grid: GridContainer, root: AnchorId) -> Self {
        Self { grid, root }
    }

    pub fn capacity(&self) -> u32 {
        self.grid.capacity()
    }
}

/// Coarse view of what the station is doing, for hosts and UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationPhase {
    Idle,
    Draining,
    /// Items sit on the input platform but no batch is running.
    BatchWaiting,
    Processing,
}

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum DrainStep {
    Hop(Hop),
    Normalize(Tween),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Transfer {
    item: ItemId,
    step: DrainStep,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct DrainTask {
    current: Option<Transfer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum ProcessStage {
    /// Shrinking and destroying the batch, one item at a time.
    Consuming {
        batch: VecDeque<ItemId>,
        current: Option<(ItemId, Tween)>,
    },
    Processing {
        elapsed: Seconds,
    },
    AwaitingOutput {
        waited: Seconds,
    },
    Spawning {
        remaining: u32,
        produced: u32,
        current: Option<(ItemId, Tween)>,
    },
}

/// Result of polling a task once.
enum Flow {
    /// Nothing more to do this tick.
    Yield,
    /// A step finished; poll again with zero elapsed time.
    Next,
    /// The task is over.
    Finished,
}

// ---------------------------------------------------------------------------
// ProcessingStation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStation {
    settings: StationSettings,
    source: StackId,
    input: Platform,
    output: Platform,
    input_items: Vec<ItemId>,
    output_items: Vec<ItemId>,
    drain: Option<DrainTask>,
    process: Option<ProcessStage>,
}

impl ProcessingStation {
    pub fn new(
        settings: StationSettings,
        source: StackId,
        input: Platform,
        output: Platform,
    ) -> Self {
        Self {
            settings,
            source,
            input,
            output,
            input_items: Vec::new(),
            output_items: Vec::new(),
            drain: None,
            process: None,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn settings(&self) -> &StationSettings {
        &self.settings
    }

    pub fn source(&self) -> StackId {
        self.source
    }

    pub fn platform(&self, side: PlatformSide) -> &Platform {
        match side {
            PlatformSide::Input => &self.input,
            PlatformSide::Output => &self.output,
        }
    }

    pub fn items_on(&self, side: PlatformSide) -> &[ItemId] {
        match side {
            PlatformSide::Input => &self.input_items,
            PlatformSide::Output => &self.output_items,
        }
    }

    pub fn input_count(&self) -> u32 {
        self.input_items.len() as u32
    }

    pub fn output_count(&self) -> u32 {
        self.output_items.len() as u32
    }

    /// Output cells not yet taken.
    pub fn free_output(&self) -> u32 {
        self.output.capacity().saturating_sub(self.output_count())
    }

    pub fn is_draining(&self) -> bool {
        self.drain.is_some()
    }

    pub fn is_processing(&self) -> bool {
        self.process.is_some()
    }

    pub fn phase(&self) -> StationPhase {
        if self.process.is_some() {
            StationPhase::Processing
        } else if self.drain.is_some() {
            StationPhase::Draining
        } else if !self.input_items.is_empty() {
            StationPhase::BatchWaiting
        } else {
            StationPhase::Idle
        }
    }

    /// Stamped onto every item the station moves, consumes or produces.
    pub fn animation_profile(&self) -> AnimationProfile {
        AnimationProfile::new(self.settings.scale_duration, self.settings.easing)
    }

    fn batch_size(&self) -> u32 {
        self.settings.batch_size.max(1)
    }

    // -----------------------------------------------------------------------
    // Host inputs
    // -----------------------------------------------------------------------

    /// The carrier entered the station. Starts a drain unless one is running.
    /// Returns whether a drain was started.
    pub fn trigger(&mut self) -> bool {
        if self.drain.is_some() {
            return false;
        }
        self.drain = Some(DrainTask::default());
        true
    }

    /// Start the processing loop if it is idle and a full batch is waiting.
    pub fn try_start_processing(&mut self, id: StationId) -> bool {
        if self.process.is_some() || self.input_count() < self.batch_size() {
            return false;
        }
        log::debug!("station {id:?} starting processing with {} inputs", self.input_count());
        self.process = Some(self.take_batch());
        true
    }

    /// Let up to `n` produced items leave the output platform, newest first.
    /// Released items return to the world with physics enabled.
    pub fn release_output(
        &mut self,
        id: StationId,
        n: u32,
        ctx: &mut TickContext<'_>,
    ) -> Vec<ItemId> {
        let n = (n as usize).min(self.output_items.len());
        let released = self.output_items.split_off(self.output_items.len() - n);
        for &item in released.iter().rev() {
            ctx.items.reparent(item, Parent::World, ctx.anchors, true);
            ctx.items.set_physics(item, true);
        }
        if !released.is_empty() {
            ctx.events.emit(Event::OutputCountChanged {
                station: id,
                count: self.output_count(),
                tick: ctx.tick,
            });
        }
        released
    }

    /// Forget an item that was destroyed elsewhere. Returns the side it was on.
    pub fn remove_item(
        &mut self,
        id: StationId,
        item: ItemId,
        ctx: &mut TickContext<'_>,
    ) -> Option<PlatformSide> {
        if let Some(pos) = self.input_items.iter().position(|&i| i == item) {
            self.input_items.remove(pos);
            self.relayout(PlatformSide::Input, ctx);
            ctx.events.emit(Event::InputCountChanged {
                station: id,
                count: self.input_count(),
                tick: ctx.tick,
            });
            return Some(PlatformSide::Input);
        }
        if let Some(pos) = self.output_items.iter().position(|&i| i == item) {
            self.output_items.remove(pos);
            self.relayout(PlatformSide::Output, ctx);
            ctx.events.emit(Event::OutputCountChanged {
                station: id,
                count: self.output_count(),
                tick: ctx.tick,
            });
            return Some(PlatformSide::Output);
        }
        None
    }

    /// Snap every item on a platform to the cell of its index at unit scale.
    fn relayout(&self, side: PlatformSide, ctx: &mut TickContext<'_>) {
        let platform = self.platform(side);
        for (i, &item) in self.items_on(side).iter().enumerate() {
            if let Some(it) = ctx.items.get_mut(item) {
                it.parent = Parent::Anchor(platform.root);
                it.local_position = platform.grid.slot_position(i as u32);
                it.local_scale = Vec3::ONE;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    pub fn tick(&mut self, id: StationId, dt: Seconds, ctx: &mut TickContext<'_>) {
        let dt = non_negative(dt);

        if self.drain.is_some() {
            let mut step_dt = dt;
            loop {
                match self.poll_drain(id, step_dt, ctx) {
                    Flow::Yield => break,
                    Flow::Next => step_dt = Fixed64::ZERO,
                    Flow::Finished => {
                        self.drain = None;
                        if self.settings.auto_start_processing {
                            self.try_start_processing(id);
                        }
                        break;
                    }
                }
            }
        }

        if self.process.is_some() {
            let mut step_dt = dt;
            loop {
                match self.poll_process(id, step_dt, ctx) {
                    Flow::Yield => break,
                    Flow::Next => step_dt = Fixed64::ZERO,
                    Flow::Finished => {
                        self.process = None;
                        log::debug!("station {id:?} processing stopped");
                        break;
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Drain task
    // -----------------------------------------------------------------------

    fn poll_drain(&mut self, id: StationId, dt: Seconds, ctx: &mut TickContext<'_>) -> Flow {
        let profile = self.animation_profile();
        let Some(task) = self.drain.as_mut() else {
            return Flow::Finished;
        };

        if task.current.is_none() {
            // Between items: pick the next one off the top of the stack.
            if self.input_items.len() as u32 >= self.input.capacity() {
                return Flow::Finished;
            }
            let Some(stack) = ctx.stacks.get_mut(self.source) else {
                return Flow::Finished;
            };
            let Some(item) = stack.pop_top(ctx.items) else {
                return Flow::Finished;
            };

            ctx.items.set_profile(item, profile);
            ctx.items.reparent(item, Parent::Anchor(self.input.root), ctx.anchors, true);
            let Some((from, easing)) = ctx
                .items
                .get(item)
                .map(|it| (it.local_position, it.profile.easing))
            else {
                return Flow::Next;
            };
            let to = self.input.grid.slot_position(self.input_items.len() as u32);
            task.current = Some(Transfer {
                item,
                step: DrainStep::Hop(Hop::new(
                    from,
                    to,
                    self.settings.move_duration,
                    self.settings.move_arc,
                    easing,
                )),
            });
            return Flow::Next;
        }
        let Some(transfer) = task.current.as_mut() else {
            return Flow::Finished;
        };

        if !ctx.items.contains(transfer.item) {
            log::debug!("station {id:?} lost {:?} while draining", transfer.item);
            task.current = None;
            return Flow::Next;
        }

        match &mut transfer.step {
            DrainStep::Hop(hop) => {
                let (position, done) = match hop.advance(dt) {
                    Progress::Pending(p) => (p, false),
                    Progress::Done(p) => (p, true),
                };
                ctx.items.set_local_position(transfer.item, position);
                if !done {
                    return Flow::Yield;
                }
                let normalize = ctx
                    .items
                    .get(transfer.item)
                    .filter(|it| it.local_scale != Vec3::ONE)
                    .map(|it| {
                        let duration = it.profile.scale_duration.saturating_mul_int(3) / 5;
                        it.scale_tween(Vec3::ONE, duration)
                    });
                match normalize {
                    Some(tween) => transfer.step = DrainStep::Normalize(tween),
                    None => {
                        let item = transfer.item;
                        task.current = None;
                        self.commit_input(id, item, ctx);
                    }
                }
                Flow::Next
            }
            DrainStep::Normalize(tween) => match tween.advance(dt) {
                Progress::Pending(scale) => {
                    ctx.items.set_scale(transfer.item, scale);
                    Flow::Yield
                }
                Progress::Done(scale) => {
                    ctx.items.set_scale(transfer.item, scale);
                    let item = transfer.item;
                    task.current = None;
                    self.commit_input(id, item, ctx);
                    Flow::Next
                }
            },
        }
    }

    /// Append a drained item at its actual index and announce the new count.
    fn commit_input(&mut self, id: StationId, item: ItemId, ctx: &mut TickContext<'_>) {
        self.input_items.push(item);
        let index = self.input_count() - 1;
        if let Some(it) = ctx.items.get_mut(item) {
            it.parent = Parent::Anchor(self.input.root);
            it.local_position = self.input.grid.slot_position(index);
            it.local_scale = Vec3::ONE;
        }
        ctx.events.emit(Event::InputCountChanged {
            station: id,
            count: self.input_count(),
            tick: ctx.tick,
        });
    }

    // -----------------------------------------------------------------------
    // Processing task
    // -----------------------------------------------------------------------

    /// Remove the oldest `batch_size` items from the input as the next batch.
    fn take_batch(&mut self) -> ProcessStage {
        let n = (self.batch_size() as usize).min(self.input_items.len());
        ProcessStage::Consuming {
            batch: self.input_items.drain(..n).collect(),
            current: None,
        }
    }

    fn poll_process(&mut self, id: StationId, dt: Seconds, ctx: &mut TickContext<'_>) -> Flow {
        let free = self.free_output();
        let profile = self.animation_profile();
        let Some(stage) = self.process.as_mut() else {
            return Flow::Finished;
        };

        match stage {
            ProcessStage::Consuming { batch, current } => {
                if let Some((item, tween)) = current {
                    let item = *item;
                    if !ctx.items.contains(item) {
                        *current = None;
                        return Flow::Next;
                    }
                    return match tween.advance(dt) {
                        Progress::Pending(scale) => {
                            ctx.items.set_scale(item, scale);
                            Flow::Yield
                        }
                        Progress::Done(_) => {
                            ctx.items.destroy(item);
                            *current = None;
                            Flow::Next
                        }
                    };
                }

                if let Some(item) = batch.pop_front() {
                    ctx.items.set_profile(item, profile);
                    if let Some(it) = ctx.items.get(item) {
                        let shrink = it.scale_tween(Vec3::ZERO, it.profile.scale_duration);
                        *current = Some((item, shrink));
                    }
                    return Flow::Next;
                }

                // Whole batch consumed.
                *stage = ProcessStage::Processing {
                    elapsed: Fixed64::ZERO,
                };
                self.relayout(PlatformSide::Input, ctx);
                ctx.events.emit(Event::InputCountChanged {
                    station: id,
                    count: self.input_count(),
                    tick: ctx.tick,
                });
                ctx.events.emit(Event::BatchConsumed {
                    station: id,
                    quantity: self.batch_size(),
                    tick: ctx.tick,
                });
                Flow::Next
            }

            ProcessStage::Processing { elapsed } => {
                *elapsed = elapsed.saturating_add(dt);
                if *elapsed < self.settings.process_time {
                    return Flow::Yield;
                }
                *stage = ProcessStage::AwaitingOutput {
                    waited: Fixed64::ZERO,
                };
                Flow::Next
            }

            ProcessStage::AwaitingOutput { waited } => {
                let needed = self.settings.produced_per_batch.max(1);
                if self.settings.block_until_output_space && free < needed {
                    let timeout = self.settings.output_wait_timeout;
                    if timeout <= Fixed64::ZERO || *waited < timeout {
                        *waited = waited.saturating_add(dt);
                        return Flow::Yield;
                    }
                    log::warn!(
                        "station {id:?} waited {waited} s for output space; \
                         producing {} of {needed}",
                        free.min(needed)
                    );
                    ctx.events.emit(Event::OutputTimedOut {
                        station: id,
                        free,
                        tick: ctx.tick,
                    });
                }
                *stage = ProcessStage::Spawning {
                    remaining: needed.min(free),
                    produced: 0,
                    current: None,
                };
                Flow::Next
            }

            ProcessStage::Spawning {
                remaining,
                produced,
                current,
            } => {
                if let Some((item, tween)) = current {
                    let item = *item;
                    if !ctx.items.contains(item) {
                        *current = None;
                        return Flow::Next;
                    }
                    return match tween.advance(dt) {
                        Progress::Pending(scale) => {
                            ctx.items.set_scale(item, scale);
                            Flow::Yield
                        }
                        Progress::Done(scale) => {
                            ctx.items.set_scale(item, scale);
                            *current = None;
                            *produced += 1;
                            self.output_items.push(item);
                            let index = self.output_count() - 1;
                            let position = self.output.grid.slot_position(index);
                            ctx.items.set_local_position(item, position);
                            ctx.events.emit(Event::OutputCountChanged {
                                station: id,
                                count: self.output_count(),
                                tick: ctx.tick,
                            });
                            Flow::Next
                        }
                    };
                }

                if *remaining > 0 {
                    *remaining -= 1;
                    let mut item = CarriableItem::new(
                        self.settings.produced_kind,
                        self.output.grid.slot_position(self.output_items.len() as u32),
                    );
                    item.parent = Parent::Anchor(self.output.root);
                    item.local_scale = Vec3::ZERO;
                    item.physics_enabled = false;
                    item.profile = profile;
                    let grow = item.scale_tween(Vec3::ONE, profile.scale_duration);
                    let spawned = ctx.items.spawn(item);
                    *current = Some((spawned, grow));
                    return Flow::Next;
                }

                let produced = *produced;
                if produced > 0 {
                    let kind = self.settings.produced_kind;
                    log::info!("station {id:?} produced {produced} x {kind:?}");
                    ctx.events.emit(Event::ItemsProduced {
                        station: id,
                        kind: self.settings.produced_kind,
                        quantity: produced,
                        tick: ctx.tick,
                    });
                    ctx.credit(id, self.settings.money_per_batch);
                }

                if self.input_count() >= self.batch_size() {
                    self.process = Some(self.take_batch());
                    Flow::Next
                } else {
                    Flow::Finished
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::MoneyBank;
    use crate::event::{EventBus, EventKind};
    use crate::fixed::f64_to_fixed64;
    use crate::grid::FillOrder;
    use crate::item::{Anchors, ItemArena};
    use crate::stack::{ItemStack, StackSettings};
    use slotmap::SlotMap;

    struct World {
        items: ItemArena,
        anchors: Anchors,
        stacks: SlotMap<StackId, ItemStack>,
        events: EventBus,
        bank: MoneyBank,
        stack: StackId,
        station: ProcessingStation,
        id: StationId,
    }

    fn settings() -> StationSettings {
        StationSettings {
            batch_size: 2,
            process_time: f64_to_fixed64(1.0),
            produced_per_batch: 1,
            produced_kind: ItemKindId(7),
            scale_duration: f64_to_fixed64(0.2),
            easing: Easing::Linear,
            block_until_output_space: true,
            output_wait_timeout: Fixed64::ZERO,
            money_per_batch: 10,
            auto_start_processing: true,
            move_duration: f64_to_fixed64(0.2),
            move_arc: f64_to_fixed64(0.15),
        }
    }

    impl World {
        fn new(
            settings: StationSettings,
            input_cells: u32,
            output_cells: u32,
            carried: usize,
        ) -> Self {
            let mut anchors = Anchors::new();
            let back = anchors.insert(Vec3::ZERO);
            let input_root = anchors.insert(Vec3::from_f64(5.0, 0.0, 0.0));
            let output_root = anchors.insert(Vec3::from_f64(8.0, 0.0, 0.0));
            let mut items = ItemArena::new();
            let mut stacks = SlotMap::with_key();
            let stack = stacks.insert(ItemStack::new(
                StackSettings {
                    capacity: 10,
                    vertical_spacing: f64_to_fixed64(0.15),
                    carried_scale: Vec3::from_f64(0.75, 0.75, 0.75),
                    scale_duration: f64_to_fixed64(0.2),
                    easing: Easing::Linear,
                },
                back,
            ));
            let carried_ids: Vec<ItemId> = (0..carried)
                .map(|_| items.spawn(CarriableItem::new(ItemKindId(1), Vec3::ZERO)))
                .collect();
            let rejected = stacks[stack].push_back_top(carried_ids, &mut items);
            assert!(rejected.is_empty());

            let spacing = Vec3::from_f64(0.35, 0.2, 0.35);
            let grid = |n| GridContainer::new([n, 1, 1], spacing, FillOrder::default(), Vec3::ZERO);
            let station = ProcessingStation::new(
                settings,
                stack,
                Platform::new(grid(input_cells), input_root),
                Platform::new(grid(output_cells), output_root),
            );
            Self {
                items,
                anchors,
                stacks,
                events: EventBus::default(),
                bank: MoneyBank::default(),
                stack,
                station,
                id: SlotMap::<StationId, ()>::with_key().insert(()),
            }
        }

        fn tick(&mut self, dt: f64) {
            let mut ctx = TickContext {
                items: &mut self.items,
                anchors: &self.anchors,
                stacks: &mut self.stacks,
                events: &mut self.events,
                bank: &mut self.bank,
                tick: 0,
            };
            self.station.tick(self.id, f64_to_fixed64(dt), &mut ctx);
        }

        fn run(&mut self, seconds: f64) {
            let steps = (seconds / 0.05).round() as usize;
            for _ in 0..steps {
                self.tick(0.05);
            }
        }
    }

    #[test]
    fn drain_moves_items_lifo_onto_grid() {
        let mut s = settings();
        s.auto_start_processing = false;
        let mut w = World::new(s, 4, 1, 3);
        let top = w.stacks[w.stack].top().unwrap();
        assert!(w.station.trigger());
        assert!(!w.station.trigger());
        w.run(2.0);

        assert!(w.stacks[w.stack].is_empty());
        assert_eq!(w.station.input_count(), 3);
        assert_eq!(w.station.items_on(PlatformSide::Input)[0], top);
        for (i, &item) in w.station.items_on(PlatformSide::Input).iter().enumerate() {
            let it = w.items.get(item).unwrap();
            assert_eq!(it.local_position, w.station.input.grid.slot_position(i as u32));
            assert_eq!(it.local_scale, Vec3::ONE);
        }
        assert_eq!(w.station.phase(), StationPhase::BatchWaiting);
        assert_eq!(w.events.total_emitted(EventKind::InputCountChanged), 3);
    }

    #[test]
    fn drain_stops_when_input_full() {
        let mut s = settings();
        s.auto_start_processing = false;
        let mut w = World::new(s, 2, 1, 5);
        w.station.trigger();
        w.run(2.0);
        assert_eq!(w.station.input_count(), 2);
        assert_eq!(w.stacks[w.stack].count(), 3);
        assert!(!w.station.is_draining());
    }

    #[test]
    fn manual_start_required_when_auto_start_off() {
        let mut s = settings();
        s.auto_start_processing = false;
        let mut w = World::new(s, 4, 4, 2);
        w.station.trigger();
        w.run(1.0);
        assert!(!w.station.is_processing());
        assert!(w.station.try_start_processing(w.id));
        assert!(w.station.is_processing());
    }

    #[test]
    fn full_cycle_produces_and_credits() {
        let mut w = World::new(settings(), 4, 4, 2);
        w.station.trigger();
        w.run(4.0);

        assert_eq!(w.station.input_count(), 0);
        assert_eq!(w.station.output_count(), 1);
        assert_eq!(w.items.len(), 1);
        let out = w.station.items_on(PlatformSide::Output)[0];
        let it = w.items.get(out).unwrap();
        assert_eq!(it.kind, ItemKindId(7));
        assert_eq!(it.local_scale, Vec3::ONE);
        assert!(!it.physics_enabled);
        assert_eq!(w.bank.balance(), 10);
        assert_eq!(w.station.phase(), StationPhase::Idle);
        assert_eq!(w.events.total_emitted(EventKind::BatchConsumed), 1);
        assert_eq!(w.events.total_emitted(EventKind::BalanceChanged), 1);
    }

    #[test]
    fn loop_runs_every_full_batch() {
        let mut w = World::new(settings(), 4, 4, 4);
        w.station.trigger();
        w.run(8.0);
        assert_eq!(w.station.input_count(), 0);
        assert_eq!(w.station.output_count(), 2);
        assert_eq!(w.bank.balance(), 20);
    }

    #[test]
    fn leftover_below_batch_waits() {
        let mut w = World::new(settings(), 4, 4, 3);
        w.station.trigger();
        w.run(8.0);
        assert_eq!(w.station.input_count(), 1);
        assert_eq!(w.station.output_count(), 1);
        assert_eq!(w.station.phase(), StationPhase::BatchWaiting);
    }

    #[test]
    fn blocked_output_waits_until_released() {
        let mut w = World::new(settings(), 4, 1, 4);
        w.station.trigger();
        w.run(8.0);
        // First batch filled the only output cell; second is stuck waiting.
        assert_eq!(w.station.output_count(), 1);
        assert!(w.station.is_processing());
        assert_eq!(w.bank.balance(), 10);

        let mut ctx = TickContext {
            items: &mut w.items,
            anchors: &w.anchors,
            stacks: &mut w.stacks,
            events: &mut w.events,
            bank: &mut w.bank,
            tick: 0,
        };
        let released = w.station.release_output(w.id, 1, &mut ctx);
        assert_eq!(released.len(), 1);
        assert!(w.items.get(released[0]).unwrap().physics_enabled);

        w.run(1.0);
        assert_eq!(w.station.output_count(), 1);
        assert_eq!(w.bank.balance(), 20);
        assert!(!w.station.is_processing());
    }

    #[test]
    fn timeout_degrades_to_zero_production() {
        let mut s = settings();
        s.output_wait_timeout = f64_to_fixed64(0.1);
        let mut w = World::new(s, 4, 1, 4);
        w.station.trigger();
        w.run(8.0);
        assert_eq!(w.station.input_count(), 0);
        assert_eq!(w.station.output_count(), 1);
        assert_eq!(w.bank.balance(), 10);
        assert!(!w.station.is_processing());
        assert_eq!(w.events.total_emitted(EventKind::OutputTimedOut), 1);
        assert_eq!(w.events.total_emitted(EventKind::BatchConsumed), 2);
    }

    #[test]
    fn timeout_produces_what_fits() {
        let mut s = settings();
        s.produced_per_batch = 3;
        s.output_wait_timeout = f64_to_fixed64(0.1);
        let mut w = World::new(s, 4, 2, 2);
        w.station.trigger();
        w.run(4.0);

        assert_eq!(w.station.output_count(), 2);
        assert!(!w.station.is_processing());
        assert_eq!(w.bank.balance(), 10);
        assert_eq!(w.events.total_emitted(EventKind::OutputTimedOut), 1);
        assert_eq!(w.events.total_emitted(EventKind::BalanceChanged), 1);

        let produced: Vec<u32> = w
            .events
            .buffer(EventKind::ItemsProduced)
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::ItemsProduced { quantity, .. } => Some(*quantity),
                _ => None,
            })
            .collect();
        assert_eq!(produced, vec![2]);
        let timed_out = w.events.buffer(EventKind::OutputTimedOut).unwrap().iter().next();
        assert!(matches!(timed_out, Some(Event::OutputTimedOut { free: 2, .. })));
    }

    #[test]
    fn items_take_the_station_profile() {
        let mut s = settings();
        s.auto_start_processing = false;
        s.easing = Easing::EaseIn;
        s.scale_duration = f64_to_fixed64(0.25);
        let mut w = World::new(s, 4, 4, 2);
        let profile = w.station.animation_profile();
        assert_eq!(profile.easing, Easing::EaseIn);

        w.station.trigger();
        w.run(2.0);
        for &item in w.station.items_on(PlatformSide::Input) {
            assert_eq!(w.items.profile(item), Some(profile));
        }

        assert!(w.station.try_start_processing(w.id));
        w.run(3.0);
        let out = w.station.items_on(PlatformSide::Output)[0];
        assert_eq!(w.items.profile(out), Some(profile));
    }

    #[test]
    fn non_blocking_output_skips_wait() {
        let mut s = settings();
        s.block_until_output_space = false;
        let mut w = World::new(s, 4, 1, 4);
        w.station.trigger();
        w.run(8.0);
        assert_eq!(w.station.output_count(), 1);
        assert!(!w.station.is_processing());
        assert_eq!(w.events.total_emitted(EventKind::OutputTimedOut), 0);
    }

    #[test]
    fn item_destroyed_on_input_is_forgotten() {
        let mut s = settings();
        s.auto_start_processing = false;
        let mut w = World::new(s, 4, 1, 3);
        w.station.trigger();
        w.run(2.0);
        let first = w.station.items_on(PlatformSide::Input)[0];
        w.items.destroy(first);

        let mut ctx = TickContext {
            items: &mut w.items,
            anchors: &w.anchors,
            stacks: &mut w.stacks,
            events: &mut w.events,
            bank: &mut w.bank,
            tick: 0,
        };
        assert_eq!(w.station.remove_item(w.id, first, &mut ctx), Some(PlatformSide::Input));
        assert_eq!(w.station.input_count(), 2);
        let next = w.station.items_on(PlatformSide::Input)[0];
        assert_eq!(
            w.items.get(next).unwrap().local_position,
            w.station.input.grid.slot_position(0)
        );
    }
}
