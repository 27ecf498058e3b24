use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a carriable item instance in the [`ItemArena`](crate::item::ItemArena).
    pub struct ItemId;

    /// Identifies a translation-only frame items can be parented under.
    pub struct AnchorId;

    /// Identifies an [`ItemStack`](crate::stack::ItemStack) (a backpack).
    pub struct StackId;

    /// Identifies a [`Collector`](crate::collector::Collector).
    pub struct CollectorId;

    /// Identifies a [`ProcessingStation`](crate::station::ProcessingStation).
    pub struct StationId;
}

/// Identifies an item kind (raw resource, processed product). Cheap to copy
/// and compare; names live in the data layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKindId(pub u32);

/// Which of a station's two platforms an item sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformSide {
    Input,
    Output,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn item_kind_equality() {
        assert_eq!(ItemKindId(0), ItemKindId(0));
        assert_ne!(ItemKindId(0), ItemKindId(1));
    }

    #[test]
    fn stale_keys_are_detected() {
        let mut map: SlotMap<ItemId, u32> = SlotMap::with_key();
        let a = map.insert(1);
        map.remove(a);
        let b = map.insert(2);
        assert!(!map.contains_key(a));
        assert!(map.contains_key(b));
        assert_ne!(a, b);
    }
}
