//! Carryall Core -- a deterministic item-transfer simulation for carry-and-
//! process games.
//!
//! Items lie in the world until a [`collector::Collector`] picks them up
//! into a capacity-bounded [`stack::ItemStack`] (the backpack). A
//! [`station::ProcessingStation`] drains the stack onto a grid platform,
//! consumes fixed-size batches, and grows produced items on an output
//! platform under backpressure, crediting a [`bank::MoneyBank`].
//!
//! Every multi-frame transition is a plain-data state machine polled once
//! per [`engine::Engine::tick`]; container mutations themselves are
//! instantaneous. That is what keeps slot accounting exact while many
//! pickups are in flight: a slot is reserved before an item starts moving
//! and is either committed or cancelled exactly once.
//!
//! # Tick Pipeline
//!
//! 1. **Collectors** -- admit one overlapping item, advance in-flight pickups.
//! 2. **Stations** -- advance the drain task, then the processing task.
//! 3. **Bookkeeping** -- increment the clock and compute the state hash.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns all state; the host's entry point.
//! - [`stack::ItemStack`] -- LIFO storage with slot reservations.
//! - [`grid::GridContainer`] -- Linear index to 3D cell mapping.
//! - [`tween::Tween`] -- Poll-based interpolation with exact completion.
//! - [`event::EventBus`] -- Synchronous observers plus per-kind history.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod bank;
pub mod collector;
pub mod config;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod grid;
pub mod id;
pub mod item;
pub mod serialize;
pub mod sim;
pub mod stack;
pub mod station;
pub mod tween;
pub mod vec3;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
