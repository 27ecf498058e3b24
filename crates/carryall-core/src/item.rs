use crate::fixed::Seconds;
use crate::id::{AnchorId, ItemId, ItemKindId};
use crate::tween::{Easing, Tween};
use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Anchors
// ---------------------------------------------------------------------------

/// Translation-only frames items can be parented under (the backpack anchor
/// behind the player, the roots of station platforms). The host moves them;
/// the simulation only reads their world position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Anchors {
    positions: SlotMap<AnchorId, Vec3>,
}

impl Anchors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, world_position: Vec3) -> AnchorId {
        self.positions.insert(world_position)
    }

    pub fn get(&self, anchor: AnchorId) -> Option<Vec3> {
        self.positions.get(anchor).copied()
    }

    /// Move an anchor. Returns false if the anchor does not exist.
    pub fn set(&mut self, anchor: AnchorId, world_position: Vec3) -> bool {
        match self.positions.get_mut(anchor) {
            Some(p) => {
                *p = world_position;
                true
            }
            None => false,
        }
    }

    /// World origin of a parent frame. A missing anchor resolves to the world
    /// origin so a dangling parent never panics.
    pub fn origin(&self, parent: Parent) -> Vec3 {
        match parent {
            Parent::World => Vec3::ZERO,
            Parent::Anchor(a) => self.get(a).unwrap_or(Vec3::ZERO),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CarriableItem
// ---------------------------------------------------------------------------

/// Frame an item's local pose is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parent {
    #[default]
    World,
    Anchor(AnchorId),
}

/// Easing and scale duration an item animates with. Whoever takes an item
/// (a stack or a station) stamps its own profile onto it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationProfile {
    pub scale_duration: Seconds,
    pub easing: Easing,
}

impl AnimationProfile {
    pub fn new(scale_duration: Seconds, easing: Easing) -> Self {
        Self {
            scale_duration,
            easing,
        }
    }
}

impl Default for AnimationProfile {
    fn default() -> Self {
        Self {
            scale_duration: Seconds::from_bits(0x3333_3333), // 0.2s
            easing: Easing::EaseInOut,
        }
    }
}

/// The unit of inventory. Owned by at most one container at a time; the
/// containers hold `ItemId`s, the arena holds the pose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriableItem {
    pub kind: ItemKindId,
    pub parent: Parent,
    pub local_position: Vec3,
    pub local_scale: Vec3,
    /// Colliders and rigidbody simulation. Disabled while an item is being
    /// picked up, carried or processed.
    pub physics_enabled: bool,
    pub profile: AnimationProfile,
}

impl CarriableItem {
    pub fn new(kind: ItemKindId, world_position: Vec3) -> Self {
        Self {
            kind,
            parent: Parent::World,
            local_position: world_position,
            local_scale: Vec3::ONE,
            physics_enabled: true,
            profile: AnimationProfile::default(),
        }
    }

    pub fn world_position(&self, anchors: &Anchors) -> Vec3 {
        anchors.origin(self.parent) + self.local_position
    }

    /// Scale from the current scale toward `to` using the item's easing.
    pub fn scale_tween(&self, to: Vec3, duration: Seconds) -> Tween {
        Tween::new(self.local_scale, to, duration, self.profile.easing)
    }
}

// ---------------------------------------------------------------------------
// ItemArena
// ---------------------------------------------------------------------------

/// Owns every live item. Destroying an item invalidates its id, which is how
/// in-flight transitions notice that their item vanished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemArena {
    items: SlotMap<ItemId, CarriableItem>,
}

impl ItemArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, item: CarriableItem) -> ItemId {
        self.items.insert(item)
    }

    pub fn destroy(&mut self, id: ItemId) -> Option<CarriableItem> {
        self.items.remove(id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: ItemId) -> Option<&CarriableItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut CarriableItem> {
        self.items.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &CarriableItem)> {
        self.items.iter()
    }

    /// Toggle physical interaction. Returns false if the item is gone.
    pub fn set_physics(&mut self, id: ItemId, enabled: bool) -> bool {
        match self.items.get_mut(id) {
            Some(item) => {
                item.physics_enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_scale(&mut self, id: ItemId, scale: Vec3) -> bool {
        match self.items.get_mut(id) {
            Some(item) => {
                item.local_scale = scale;
                true
            }
            None => false,
        }
    }

    pub fn set_profile(&mut self, id: ItemId, profile: AnimationProfile) -> bool {
        match self.items.get_mut(id) {
            Some(item) => {
                item.profile = profile;
                true
            }
            None => false,
        }
    }

    pub fn profile(&self, id: ItemId) -> Option<AnimationProfile> {
        self.items.get(id).map(|item| item.profile)
    }

    pub fn set_local_position(&mut self, id: ItemId, position: Vec3) -> bool {
        match self.items.get_mut(id) {
            Some(item) => {
                item.local_position = position;
                true
            }
            None => false,
        }
    }

    /// Move an item under a new parent frame. With `preserve_world_pose` the
    /// local position is recomputed so the world position does not change;
    /// otherwise the local position is kept as-is.
    pub fn reparent(
        &mut self,
        id: ItemId,
        parent: Parent,
        anchors: &Anchors,
        preserve_world_pose: bool,
    ) -> bool {
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };
        if preserve_world_pose {
            let world = item.world_position(anchors);
            item.local_position = world - anchors.origin(parent);
        }
        item.parent = parent;
        true
    }

    pub fn world_position(&self, id: ItemId, anchors: &Anchors) -> Option<Vec3> {
        self.items.get(id).map(|item| item.world_position(anchors))
    }
}
