//! Grid placement for station platforms.
//!
//! A [`GridContainer`] never owns items. It maps a linear occupancy index to
//! a 3D cell under a configurable fill order and computes the local offset of
//! that cell, centred around `center_offset`.
//!
//! The fill order is a permutation of the three axes into fastest, middle
//! and slowest. Index decomposition is mixed-radix:
//!
//! ```text
//! a = index % count(fastest)
//! b = (index / count(fastest)) % count(middle)
//! c = index / (count(fastest) * count(middle))
//! ```

use crate::fixed::Fixed64;
use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};

/// Largest per-axis count and capacity a grid will report.
pub const MAX_COUNT: u32 = i32::MAX as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Errors from building a grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("fill order {fastest:?}/{middle:?}/{slowest:?} must use each axis exactly once")]
    AxisOrderNotPermutation {
        fastest: Axis,
        middle: Axis,
        slowest: Axis,
    },
}

/// Which axis varies fastest, in the middle, and slowest as the index grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FillOrder {
    pub fastest: Axis,
    pub middle: Axis,
    pub slowest: Axis,
}

impl FillOrder {
    pub fn new(fastest: Axis, middle: Axis, slowest: Axis) -> Result<Self, GridError> {
        if fastest == middle || middle == slowest || fastest == slowest {
            return Err(GridError::AxisOrderNotPermutation {
                fastest,
                middle,
                slowest,
            });
        }
        Ok(Self {
            fastest,
            middle,
            slowest,
        })
    }

    /// All six valid orders.
    pub fn all() -> [FillOrder; 6] {
        use Axis::*;
        [
            FillOrder { fastest: X, middle: Y, slowest: Z },
            FillOrder { fastest: X, middle: Z, slowest: Y },
            FillOrder { fastest: Y, middle: X, slowest: Z },
            FillOrder { fastest: Y, middle: Z, slowest: X },
            FillOrder { fastest: Z, middle: X, slowest: Y },
            FillOrder { fastest: Z, middle: Y, slowest: X },
        ]
    }
}

impl Default for FillOrder {
    fn default() -> Self {
        Self {
            fastest: Axis::X,
            middle: Axis::Z,
            slowest: Axis::Y,
        }
    }
}

/// Integer cell coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Cell {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    fn set(&mut self, axis: Axis, v: u32) {
        match axis {
            Axis::X => self.x = v,
            Axis::Y => self.y = v,
            Axis::Z => self.z = v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridContainer {
    count_x: u32,
    count_y: u32,
    count_z: u32,
    spacing: Vec3,
    order: FillOrder,
    center_offset: Vec3,
}

impl GridContainer {
    /// Counts are clamped to `1..=MAX_COUNT`.
    pub fn new(counts: [u32; 3], spacing: Vec3, order: FillOrder, center_offset: Vec3) -> Self {
        Self {
            count_x: counts[0].clamp(1, MAX_COUNT),
            count_y: counts[1].clamp(1, MAX_COUNT),
            count_z: counts[2].clamp(1, MAX_COUNT),
            spacing,
            order,
            center_offset,
        }
    }

    /// Number of cells, saturating at [`MAX_COUNT`].
    pub fn capacity(&self) -> u32 {
        let cap = self.count_x as u64 * self.count_y as u64 * self.count_z as u64;
        cap.min(MAX_COUNT as u64) as u32
    }

    pub fn count(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.count_x,
            Axis::Y => self.count_y,
            Axis::Z => self.count_z,
        }
    }

    pub fn order(&self) -> FillOrder {
        self.order
    }

    fn spacing(&self, axis: Axis) -> Fixed64 {
        match axis {
            Axis::X => self.spacing.x,
            Axis::Y => self.spacing.y,
            Axis::Z => self.spacing.z,
        }
    }

    /// Saturates instead of overflowing for huge grids.
    fn axis_offset(&self, axis: Axis, index: u32) -> Fixed64 {
        let spacing = self.spacing(axis);
        let extent = Fixed64::saturating_from_num(self.count(axis) - 1).saturating_mul(spacing);
        let along = Fixed64::saturating_from_num(index).saturating_mul(spacing);
        (-(extent / 2)).saturating_add(along)
    }

    /// Local offset of a cell, centred on `center_offset`.
    pub fn cell_position(&self, cell: Cell) -> Vec3 {
        let offset = self.center_offset;
        Vec3::new(
            self.axis_offset(Axis::X, cell.x).saturating_add(offset.x),
            self.axis_offset(Axis::Y, cell.y).saturating_add(offset.y),
            self.axis_offset(Axis::Z, cell.z).saturating_add(offset.z),
        )
    }

    /// Linear index to cell. Only meaningful for `index < capacity()`.
    pub fn index_to_coords(&self, index: u32) -> Cell {
        let a_count = self.count(self.order.fastest);
        let b_count = self.count(self.order.middle);

        let a = index % a_count;
        let b = (index / a_count) % b_count;
        let c = ((index as u64) / (a_count as u64 * b_count as u64)) as u32;

        let mut cell = Cell::default();
        cell.set(self.order.fastest, a);
        cell.set(self.order.middle, b);
        cell.set(self.order.slowest, c);
        cell
    }

    /// Inverse of [`index_to_coords`](Self::index_to_coords).
    pub fn coords_to_index(&self, cell: Cell) -> u64 {
        let a_count = self.count(self.order.fastest) as u64;
        let b_count = self.count(self.order.middle) as u64;
        cell.get(self.order.fastest) as u64
            + cell.get(self.order.middle) as u64 * a_count
            + cell.get(self.order.slowest) as u64 * a_count * b_count
    }

    /// Local offset of the cell the `index`-th item occupies.
    pub fn slot_position(&self, index: u32) -> Vec3 {
        self.cell_position(self.index_to_coords(index))
    }
}
