//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::collector::CollectorSettings;
use crate::engine::Engine;
use crate::fixed::{f64_to_fixed64, Fixed64};
use crate::grid::{FillOrder, GridContainer};
use crate::id::*;
use crate::item::CarriableItem;
use crate::stack::StackSettings;
use crate::station::{Platform, StationSettings};
use crate::tween::Easing;
use crate::vec3::Vec3;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    f64_to_fixed64(v)
}

// ===========================================================================
// Item kinds
// ===========================================================================

pub fn ore() -> ItemKindId {
    ItemKindId(0)
}

pub fn ingot() -> ItemKindId {
    ItemKindId(1)
}

/// A world item of kind `ore()` lying at `position` with physics on.
pub fn loose_item(position: Vec3) -> CarriableItem {
    CarriableItem::new(ore(), position)
}

// ===========================================================================
// Settings
// ===========================================================================

pub fn stack_settings(capacity: u32) -> StackSettings {
    StackSettings {
        capacity,
        vertical_spacing: fixed(0.15),
        carried_scale: Vec3::from_f64(0.75, 0.75, 0.75),
        scale_duration: fixed(0.2),
        easing: Easing::EaseInOut,
    }
}

pub fn collector_settings() -> CollectorSettings {
    CollectorSettings {
        pickup_interval: fixed(0.08),
        pile_scale_out_duration: fixed(0.15),
    }
}

pub fn station_settings(batch_size: u32) -> StationSettings {
    StationSettings {
        batch_size,
        process_time: fixed(2.0),
        produced_per_batch: 1,
        produced_kind: ingot(),
        scale_duration: fixed(0.2),
        easing: Easing::EaseInOut,
        block_until_output_space: true,
        output_wait_timeout: Fixed64::ZERO,
        money_per_batch: 10,
        auto_start_processing: true,
        move_duration: fixed(0.18),
        move_arc: fixed(0.15),
    }
}

/// A single-row grid with `cells` cells along X.
pub fn row_grid(cells: u32) -> GridContainer {
    GridContainer::new(
        [cells, 1, 1],
        Vec3::from_f64(0.35, 0.20, 0.35),
        FillOrder::default(),
        Vec3::ZERO,
    )
}

// ===========================================================================
// Rigs
// ===========================================================================

/// Fixed step used by the rigs.
pub const STEP: f64 = 0.05;

/// An engine with one stack anchored at (0, 1, 0) and one collector feeding it.
pub struct PickupRig {
    pub engine: Engine,
    pub anchor: AnchorId,
    pub stack: StackId,
    pub collector: CollectorId,
}

impl PickupRig {
    pub fn new(capacity: u32) -> Self {
        let mut engine = Engine::new();
        let anchor = engine.add_anchor(Vec3::from_f64(0.0, 1.0, 0.0));
        let stack = engine
            .add_stack(stack_settings(capacity), anchor)
            .expect("anchor was just added");
        let collector = engine
            .add_collector(collector_settings(), stack)
            .expect("stack was just added");
        Self {
            engine,
            anchor,
            stack,
            collector,
        }
    }

    /// Report every item as overlapping on each step for `seconds`.
    pub fn collect_for(&mut self, items: &[ItemId], seconds: f64) {
        collect_for(&mut self.engine, self.collector, items, seconds);
    }

    /// Tick for `seconds` without reporting overlaps.
    pub fn run(&mut self, seconds: f64) {
        run(&mut self.engine, seconds);
    }
}

/// A `PickupRig` plus a station fed from its stack. Input platform at
/// (5, 0, 0), output platform at (8, 0, 0).
pub struct StationRig {
    pub engine: Engine,
    pub stack: StackId,
    pub collector: CollectorId,
    pub station: StationId,
}

impl StationRig {
    pub fn new(
        capacity: u32,
        settings: StationSettings,
        input: GridContainer,
        output: GridContainer,
    ) -> Self {
        let PickupRig {
            mut engine,
            stack,
            collector,
            ..
        } = PickupRig::new(capacity);
        let input_root = engine.add_anchor(Vec3::from_f64(5.0, 0.0, 0.0));
        let output_root = engine.add_anchor(Vec3::from_f64(8.0, 0.0, 0.0));
        let station = engine
            .add_station(
                settings,
                stack,
                Platform::new(input, input_root),
                Platform::new(output, output_root),
            )
            .expect("stack and anchors were just added");
        Self {
            engine,
            stack,
            collector,
            station,
        }
    }

    /// Put `n` ore items straight into the stack, bypassing the collector.
    pub fn load(&mut self, n: usize) -> Vec<ItemId> {
        let items: Vec<ItemId> = (0..n)
            .map(|_| self.engine.spawn_item(loose_item(Vec3::ZERO)))
            .collect();
        let rejected = self
            .engine
            .push_back_top(self.stack, items.clone())
            .expect("stack exists");
        assert!(rejected.is_empty(), "stack too small for load");
        items
    }

    pub fn collect_for(&mut self, items: &[ItemId], seconds: f64) {
        collect_for(&mut self.engine, self.collector, items, seconds);
    }

    pub fn run(&mut self, seconds: f64) {
        run(&mut self.engine, seconds);
    }
}

/// Report `items` to `collector` and tick, in `STEP` increments for `seconds`.
pub fn collect_for(engine: &mut Engine, collector: CollectorId, items: &[ItemId], seconds: f64) {
    let steps = (seconds / STEP).round() as usize;
    for _ in 0..steps {
        for &item in items {
            engine
                .report_overlap(collector, item)
                .expect("collector exists");
        }
        engine.tick(fixed(STEP));
    }
}

/// Tick `engine` in `STEP` increments for `seconds`.
pub fn run(engine: &mut Engine, seconds: f64) {
    let steps = (seconds / STEP).round() as usize;
    for _ in 0..steps {
        engine.tick(fixed(STEP));
    }
}
