//! The backpack: an ordered, capacity-bounded stack of carried items.
//!
//! Index 0 is the bottom, the last element is the top. Capacity is shared
//! between items physically present and *reserved* slots promised to
//! pickups that are still mid-transition, so that
//! `count + reserved_slots <= capacity` holds after every call.
//!
//! Every structural change re-lays out the whole stack synchronously: the
//! item at index `i` sits `i * vertical_spacing` above the anchor at the
//! carried scale.

use crate::fixed::{Fixed64, Seconds};
use crate::grid::MAX_COUNT;
use crate::id::{AnchorId, ItemId};
use crate::item::{ItemArena, Parent};
use crate::tween::Easing;
use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};

/// Errors from committing items into a stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    #[error("stack is full ({capacity} slots)")]
    CapacityExceeded { capacity: u32 },
    #[error("item is already in the stack")]
    AlreadyStacked,
}

/// Static layout and animation settings for a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSettings {
    pub capacity: u32,
    pub vertical_spacing: Fixed64,
    pub carried_scale: Vec3,
    /// Duration of the grow-in when an item lands in the stack.
    pub scale_duration: Seconds,
    pub easing: Easing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    items: Vec<ItemId>,
    reserved_slots: u32,
    anchor: AnchorId,
    settings: StackSettings,
}

impl ItemStack {
    pub fn new(settings: StackSettings, anchor: AnchorId) -> Self {
        Self {
            items: Vec::new(),
            reserved_slots: 0,
            anchor,
            settings,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn count(&self) -> u32 {
        self.items.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.settings.capacity
    }

    pub fn reserved_slots(&self) -> u32 {
        self.reserved_slots
    }

    /// Whether another slot can be reserved.
    pub fn has_free_slot(&self) -> bool {
        self.free_slots() > 0
    }

    pub fn free_slots(&self) -> u32 {
        self.settings
            .capacity
            .saturating_sub(self.count() + self.reserved_slots)
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn top(&self) -> Option<ItemId> {
        self.items.last().copied()
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    pub fn anchor(&self) -> AnchorId {
        self.anchor
    }

    pub fn settings(&self) -> &StackSettings {
        &self.settings
    }

    /// Local offset from the anchor of the item at `index`.
    pub fn slot_position(&self, index: u32) -> Vec3 {
        Vec3::new(
            Fixed64::ZERO,
            self.settings
                .vertical_spacing
                .saturating_mul(Fixed64::saturating_from_num(index)),
            Fixed64::ZERO,
        )
    }

    // -----------------------------------------------------------------------
    // Reservation protocol
    // -----------------------------------------------------------------------

    /// Claim a slot for an item that has not arrived yet. Returns the index
    /// the item will occupy, or `None` when the stack is fully booked.
    pub fn reserve_slot(&mut self) -> Option<u32> {
        if !self.has_free_slot() {
            return None;
        }
        self.reserved_slots += 1;
        Some(self.count() + self.reserved_slots - 1)
    }

    /// Roll back one reservation. No-op when nothing is reserved.
    pub fn cancel_reserve(&mut self) {
        self.reserved_slots = self.reserved_slots.saturating_sub(1);
    }

    /// Commit an item that arrived for a reservation. Without an outstanding
    /// reservation the item is still accepted if a slot is free.
    pub fn add_reserved(&mut self, item: ItemId, arena: &mut ItemArena) -> Result<(), StackError> {
        if self.contains(item) {
            return Err(StackError::AlreadyStacked);
        }
        if self.reserved_slots > 0 {
            self.reserved_slots -= 1;
        } else if !self.has_free_slot() {
            return Err(StackError::CapacityExceeded {
                capacity: self.settings.capacity,
            });
        }
        self.items.push(item);
        self.relayout(arena);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Remove the top item (LIFO).
    pub fn pop_top(&mut self, arena: &mut ItemArena) -> Option<ItemId> {
        let item = self.items.pop()?;
        self.relayout(arena);
        Some(item)
    }

    /// Remove up to `n` items from the top. The returned list keeps stack
    /// order: the bottom-most popped item comes first.
    pub fn pop_many(&mut self, n: u32, arena: &mut ItemArena) -> Vec<ItemId> {
        let n = (n as usize).min(self.items.len());
        let popped = self.items.split_off(self.items.len() - n);
        self.relayout(arena);
        popped
    }

    pub fn pop_all(&mut self) -> Vec<ItemId> {
        std::mem::take(&mut self.items)
    }

    /// Remove a specific item wherever it sits (e.g. it was destroyed).
    pub fn remove(&mut self, item: ItemId, arena: &mut ItemArena) -> bool {
        let Some(pos) = self.items.iter().position(|&i| i == item) else {
            return false;
        };
        self.items.remove(pos);
        self.relayout(arena);
        true
    }

    // -----------------------------------------------------------------------
    // Bulk add
    // -----------------------------------------------------------------------

    /// Push items back on top in the given order, giving each the carried
    /// pose. Items that are already stacked, no longer exist, or do not fit
    /// in the unreserved capacity are returned untouched.
    #[must_use = "rejected items are no longer owned by any container"]
    pub fn push_back_top(&mut self, items: Vec<ItemId>, arena: &mut ItemArena) -> Vec<ItemId> {
        let mut rejected = Vec::new();
        for item in items {
            if !self.has_free_slot() || self.contains(item) || !arena.contains(item) {
                rejected.push(item);
                continue;
            }
            arena.set_physics(item, false);
            self.items.push(item);
        }
        self.relayout(arena);
        rejected
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Change the capacity. The stack never shrinks below what it already
    /// holds or has promised.
    pub fn set_capacity(&mut self, capacity: i64) {
        let requested = capacity.clamp(0, MAX_COUNT as i64) as u32;
        let occupied = self.count() + self.reserved_slots;
        if requested < occupied {
            log::warn!(
                "stack capacity {requested} is below occupancy {occupied}; clamping"
            );
        }
        self.settings.capacity = requested.max(occupied);
    }

    /// Snap every item to the pose dictated by its index.
    pub fn relayout(&self, arena: &mut ItemArena) {
        for (i, &id) in self.items.iter().enumerate() {
            let position = self.slot_position(i as u32);
            if let Some(item) = arena.get_mut(id) {
                item.parent = Parent::Anchor(self.anchor);
                item.local_position = position;
                item.local_scale = self.settings.carried_scale;
            }
        }
    }
}
