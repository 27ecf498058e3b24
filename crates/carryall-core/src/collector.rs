//! Picks world items up into a stack.
//!
//! Each pickup walks `Reserved -> Transitioning -> Committed` or ends in
//! `RolledBack`. The slot is reserved synchronously, before the first
//! suspension point, and the item's physics is switched off in the same
//! call, so overlapping detections can never book the same item twice.
//! Every successful `reserve_slot` is matched by exactly one
//! `add_reserved` (commit) or `cancel_reserve` (rollback).

use crate::event::Event;
use crate::fixed::{non_negative, Fixed64, Seconds};
use crate::id::{CollectorId, ItemId, StackId};
use crate::item::{AnimationProfile, Parent};
use crate::sim::TickContext;
use crate::tween::{Progress, Tween};
use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Why an in-flight pickup was undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollbackReason {
    /// The item was destroyed while it was moving.
    ItemDestroyed,
    /// The target stack no longer exists.
    StackMissing,
    /// The stack refused the commit.
    StackRejected,
    /// The host aborted the pickup.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// Minimum time between two admissions while candidates are present.
    pub pickup_interval: Seconds,
    /// Shrink duration at the item's world location.
    pub pile_scale_out_duration: Seconds,
}

/// Transition step of an in-flight pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupPhase {
    /// Shrinking to zero where the item lies.
    ShrinkAtWorld(Tween),
    /// Parented under the stack anchor at its slot, growing to carried scale.
    GrowInStack(Tween),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pickup {
    pub item: ItemId,
    /// Slot index returned by the reservation.
    pub slot: u32,
    pub phase: PickupPhase,
    /// Scale to put back if the pickup is rolled back.
    restore_scale: Vec3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collector {
    stack: StackId,
    settings: CollectorSettings,
    timer: Seconds,
    reserved: BTreeSet<ItemId>,
    in_flight: Vec<Pickup>,
    /// Overlaps reported since the last tick.
    candidates: Vec<ItemId>,
}

impl Collector {
    pub fn new(stack: StackId, settings: CollectorSettings) -> Self {
        Self {
            stack,
            settings,
            timer: Fixed64::ZERO,
            reserved: BTreeSet::new(),
            in_flight: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn stack(&self) -> StackId {
        self.stack
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn is_reserved(&self, item: ItemId) -> bool {
        self.reserved.contains(&item)
    }

    pub fn in_flight(&self) -> &[Pickup] {
        &self.in_flight
    }

    /// Record that `item` is inside the trigger region this frame.
    pub fn report_overlap(&mut self, item: ItemId) {
        if !self.candidates.contains(&item) {
            self.candidates.push(item);
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    pub fn tick(&mut self, id: CollectorId, dt: Seconds, ctx: &mut TickContext<'_>) {
        let dt = non_negative(dt);
        let candidates = std::mem::take(&mut self.candidates);
        self.try_admit(id, dt, &candidates, ctx);
        self.advance_pickups(id, dt, ctx);
    }

    fn is_admissible(&self, item: ItemId, ctx: &TickContext<'_>) -> bool {
        if self.reserved.contains(&item) {
            return false;
        }
        match ctx.items.get(item) {
            Some(it) => it.parent == Parent::World && it.physics_enabled,
            None => false,
        }
    }

    fn try_admit(
        &mut self,
        id: CollectorId,
        dt: Seconds,
        candidates: &[ItemId],
        ctx: &mut TickContext<'_>,
    ) {
        let has_room = ctx
            .stacks
            .get(self.stack)
            .is_some_and(|stack| stack.has_free_slot());
        if !has_room {
            return;
        }
        let view: &TickContext<'_> = ctx;
        let Some(item) = candidates
            .iter()
            .copied()
            .find(|&c| self.is_admissible(c, view))
        else {
            return;
        };

        self.timer += dt;
        if self.timer < self.settings.pickup_interval {
            return;
        }
        self.timer = Fixed64::ZERO;

        let Some(stack) = ctx.stacks.get_mut(self.stack) else {
            return;
        };
        let settings = stack.settings();
        let profile = AnimationProfile::new(settings.scale_duration, settings.easing);
        ctx.items.set_profile(item, profile);
        let Some((restore_scale, shrink)) = ctx.items.get(item).map(|it| {
            (
                it.local_scale,
                it.scale_tween(Vec3::ZERO, self.settings.pile_scale_out_duration),
            )
        }) else {
            return;
        };
        let Some(slot) = stack.reserve_slot() else {
            return;
        };

        self.reserved.insert(item);
        ctx.items.set_physics(item, false);
        self.in_flight.push(Pickup {
            item,
            slot,
            phase: PickupPhase::ShrinkAtWorld(shrink),
            restore_scale,
        });

        log::debug!("collector {id:?} reserved slot {slot} for {item:?}");
        ctx.events.emit(Event::PickupStarted {
            collector: id,
            item,
            slot,
            tick: ctx.tick,
        });
    }

    fn advance_pickups(&mut self, id: CollectorId, dt: Seconds, ctx: &mut TickContext<'_>) {
        let mut i = 0;
        while i < self.in_flight.len() {
            match advance_pickup(&mut self.in_flight[i], self.stack, dt, ctx) {
                Ok(false) => i += 1,
                Ok(true) => {
                    let pickup = self.in_flight.remove(i);
                    self.reserved.remove(&pickup.item);
                    log::debug!("collector {id:?} committed {:?}", pickup.item);
                    ctx.events.emit(Event::PickupCommitted {
                        collector: id,
                        item: pickup.item,
                        stack: self.stack,
                        tick: ctx.tick,
                    });
                }
                Err(reason) => self.rollback_at(id, i, reason, ctx),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Rollback
    // -----------------------------------------------------------------------

    /// Abort the pickup of `item`. Returns false if it was not in flight.
    pub fn abort(&mut self, id: CollectorId, item: ItemId, ctx: &mut TickContext<'_>) -> bool {
        match self.in_flight.iter().position(|p| p.item == item) {
            Some(i) => {
                self.rollback_at(id, i, RollbackReason::Aborted, ctx);
                true
            }
            None => false,
        }
    }

    /// Abort every in-flight pickup (the collector is going away).
    pub fn abort_all(&mut self, id: CollectorId, ctx: &mut TickContext<'_>) {
        while !self.in_flight.is_empty() {
            self.rollback_at(id, self.in_flight.len() - 1, RollbackReason::Aborted, ctx);
        }
    }

    fn rollback_at(
        &mut self,
        id: CollectorId,
        index: usize,
        reason: RollbackReason,
        ctx: &mut TickContext<'_>,
    ) {
        let pickup = self.in_flight.remove(index);
        self.reserved.remove(&pickup.item);

        let mut already_stacked = false;
        if let Some(stack) = ctx.stacks.get_mut(self.stack) {
            stack.cancel_reserve();
            already_stacked = stack.contains(pickup.item);
        }

        if !already_stacked && ctx.items.contains(pickup.item) {
            ctx.items
                .reparent(pickup.item, Parent::World, ctx.anchors, true);
            ctx.items.set_scale(pickup.item, pickup.restore_scale);
            ctx.items.set_physics(pickup.item, true);
        }

        log::debug!("collector {id:?} rolled back {:?}: {reason:?}", pickup.item);
        ctx.events.emit(Event::PickupRolledBack {
            collector: id,
            item: pickup.item,
            reason,
            tick: ctx.tick,
        });
    }
}

/// Drive one pickup. `Ok(true)` once the item is committed into the stack.
fn advance_pickup(
    pickup: &mut Pickup,
    stack_id: StackId,
    mut dt: Seconds,
    ctx: &mut TickContext<'_>,
) -> Result<bool, RollbackReason> {
    loop {
        if !ctx.items.contains(pickup.item) {
            return Err(RollbackReason::ItemDestroyed);
        }
        let Some(stack) = ctx.stacks.get_mut(stack_id) else {
            return Err(RollbackReason::StackMissing);
        };

        match &mut pickup.phase {
            PickupPhase::ShrinkAtWorld(tween) => match tween.advance(dt) {
                Progress::Pending(scale) => {
                    ctx.items.set_scale(pickup.item, scale);
                    return Ok(false);
                }
                Progress::Done(scale) => {
                    ctx.items.set_scale(pickup.item, scale);
                    ctx.items.reparent(
                        pickup.item,
                        Parent::Anchor(stack.anchor()),
                        ctx.anchors,
                        false,
                    );
                    ctx.items
                        .set_local_position(pickup.item, stack.slot_position(pickup.slot));
                    let settings = stack.settings();
                    let easing = ctx
                        .items
                        .profile(pickup.item)
                        .map_or(settings.easing, |p| p.easing);
                    pickup.phase = PickupPhase::GrowInStack(Tween::new(
                        Vec3::ZERO,
                        settings.carried_scale,
                        settings.scale_duration,
                        easing,
                    ));
                    dt = Fixed64::ZERO;
                }
            },
            PickupPhase::GrowInStack(tween) => match tween.advance(dt) {
                Progress::Pending(scale) => {
                    ctx.items.set_scale(pickup.item, scale);
                    return Ok(false);
                }
                Progress::Done(scale) => {
                    ctx.items.set_scale(pickup.item, scale);
                    stack
                        .add_reserved(pickup.item, ctx.items)
                        .map_err(|_| RollbackReason::StackRejected)?;
                    return Ok(true);
                }
            },
        }
    }
}
