//! Property-based tests for carryall core.
//!
//! Uses proptest to drive stacks, grids and the engine with random
//! operation sequences and checks the structural invariants after each one.

use carryall_core::fixed::Fixed64;
use carryall_core::grid::{Cell, FillOrder, GridContainer};
use carryall_core::id::ItemId;
use carryall_core::item::{Anchors, ItemArena};
use carryall_core::stack::ItemStack;
use carryall_core::test_utils::*;
use carryall_core::vec3::Vec3;
use proptest::prelude::*;
use std::collections::BTreeSet;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum StackOp {
    Reserve,
    Commit,
    Cancel,
    PopTop,
    PopMany(u32),
    SetCapacity(i64),
}

fn arb_stack_ops(max_ops: usize) -> impl Strategy<Value = Vec<StackOp>> {
    proptest::collection::vec(
        prop_oneof![
            3 => Just(StackOp::Reserve),
            3 => Just(StackOp::Commit),
            2 => Just(StackOp::Cancel),
            1 => Just(StackOp::PopTop),
            1 => (0..5u32).prop_map(StackOp::PopMany),
            1 => (-3..12i64).prop_map(StackOp::SetCapacity),
        ],
        1..=max_ops,
    )
}

fn arb_order() -> impl Strategy<Value = FillOrder> {
    (0..6usize).prop_map(|i| FillOrder::all()[i])
}

fn new_stack(capacity: u32) -> (ItemStack, ItemArena) {
    let mut anchors = Anchors::new();
    let anchor = anchors.insert(Vec3::ZERO);
    (ItemStack::new(stack_settings(capacity), anchor), ItemArena::new())
}

// ===========================================================================
// Stack properties
// ===========================================================================

proptest! {
    #[test]
    fn reservation_accounting_never_overbooks(capacity in 0..8u32, ops in arb_stack_ops(60)) {
        let (mut stack, mut arena) = new_stack(capacity);
        let mut outstanding = 0u32;

        for op in ops {
            let count_before = stack.count();
            match op {
                StackOp::Reserve => {
                    if stack.reserve_slot().is_some() {
                        outstanding += 1;
                    }
                }
                StackOp::Commit => {
                    if outstanding > 0 {
                        let item = arena.spawn(loose_item(Vec3::ZERO));
                        stack.add_reserved(item, &mut arena).unwrap();
                        outstanding -= 1;
                        prop_assert_eq!(stack.count(), count_before + 1);
                    }
                }
                StackOp::Cancel => {
                    if outstanding > 0 {
                        stack.cancel_reserve();
                        outstanding -= 1;
                    }
                }
                StackOp::PopTop => {
                    stack.pop_top(&mut arena);
                }
                StackOp::PopMany(n) => {
                    stack.pop_many(n, &mut arena);
                }
                StackOp::SetCapacity(c) => stack.set_capacity(c),
            }

            prop_assert!(stack.count() + stack.reserved_slots() <= stack.capacity());
            prop_assert_eq!(stack.reserved_slots(), outstanding);
            if !matches!(op, StackOp::Commit) {
                prop_assert!(stack.count() <= count_before);
            }
            let unique: BTreeSet<ItemId> = stack.items().iter().copied().collect();
            prop_assert_eq!(unique.len(), stack.items().len());
        }
    }

    #[test]
    fn pop_many_then_push_back_restores(size in 0..10usize, n in 0..12u32) {
        let (mut stack, mut arena) = new_stack(10);
        let ids: Vec<ItemId> = (0..size)
            .map(|_| {
                let id = arena.spawn(loose_item(Vec3::ZERO));
                arena.set_physics(id, false);
                stack.reserve_slot().unwrap();
                stack.add_reserved(id, &mut arena).unwrap();
                id
            })
            .collect();
        let poses: Vec<_> = ids.iter().map(|&id| arena.get(id).unwrap().clone()).collect();

        let popped = stack.pop_many(n, &mut arena);
        prop_assert_eq!(popped.len(), size.min(n as usize));
        let rejected = stack.push_back_top(popped, &mut arena);
        prop_assert!(rejected.is_empty());

        prop_assert_eq!(stack.items(), ids.as_slice());
        let after: Vec<_> = ids.iter().map(|&id| arena.get(id).unwrap().clone()).collect();
        prop_assert_eq!(poses, after);
    }
}

// ===========================================================================
// Grid properties
// ===========================================================================

proptest! {
    #[test]
    fn index_to_coords_is_bijective(
        cx in 1..6u32,
        cy in 1..6u32,
        cz in 1..6u32,
        order in arb_order(),
    ) {
        let spacing = Vec3::from_f64(0.35, 0.2, 0.35);
        let grid = GridContainer::new([cx, cy, cz], spacing, order, Vec3::ZERO);
        prop_assert_eq!(grid.capacity(), cx * cy * cz);

        let mut seen = BTreeSet::new();
        for i in 0..grid.capacity() {
            let cell = grid.index_to_coords(i);
            prop_assert!(cell.x < cx && cell.y < cy && cell.z < cz);
            prop_assert_eq!(grid.coords_to_index(cell), i as u64);
            prop_assert!(seen.insert(cell));
        }
    }

    #[test]
    fn cell_positions_form_uniform_centred_grid(
        cx in 1..6u32,
        cz in 1..6u32,
        offset in -3.0..3.0f64,
    ) {
        let centre = Vec3::from_f64(offset, 0.0, -offset);
        let spacing = Vec3::from_f64(0.5, 0.25, 0.5);
        let grid = GridContainer::new([cx, 1, cz], spacing, FillOrder::default(), centre);

        let first = grid.cell_position(Cell::new(0, 0, 0));
        let last = grid.cell_position(Cell::new(cx - 1, 0, cz - 1));
        // Opposite corners are symmetric about the centre.
        prop_assert_eq!(first + last, centre + centre);
        // Neighbours differ by exactly one spacing step.
        if cx > 1 {
            let next = grid.cell_position(Cell::new(1, 0, 0));
            prop_assert_eq!(next - first, Vec3::new(spacing.x, Fixed64::ZERO, Fixed64::ZERO));
        }
    }
}

// ===========================================================================
// Engine properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn engine_pickups_respect_capacity(
        capacity in 0..6u32,
        item_count in 0..10usize,
        destroy_at in proptest::collection::vec(0..40usize, 0..4),
    ) {
        let mut rig = PickupRig::new(capacity);
        let items: Vec<ItemId> = (0..item_count)
            .map(|i| rig.engine.spawn_item(loose_item(Vec3::from_f64(i as f64, 0.0, 0.0))))
            .collect();

        for step in 0..40 {
            for (k, &when) in destroy_at.iter().enumerate() {
                if when == step && k < items.len() {
                    let _ = rig.engine.destroy_item(items[k]);
                }
            }
            for &item in &items {
                if rig.engine.item(item).is_some() {
                    rig.engine.report_overlap(rig.collector, item).unwrap();
                }
            }
            rig.engine.tick(fixed(STEP));

            let stack = rig.engine.stack(rig.stack).unwrap();
            prop_assert!(stack.count() + stack.reserved_slots() <= stack.capacity());
            let in_flight = rig.engine.collector(rig.collector).unwrap().in_flight().len() as u32;
            prop_assert_eq!(stack.reserved_slots(), in_flight);
        }
    }
}
