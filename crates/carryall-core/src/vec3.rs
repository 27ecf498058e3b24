//! Minimal fixed-point 3D vector used for local positions and scales.

use crate::fixed::{f64_to_fixed64, fixed64_to_f64, Fixed64};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: Fixed64,
    pub y: Fixed64,
    pub z: Fixed64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
        z: Fixed64::ZERO,
    };

    pub const ONE: Vec3 = Vec3 {
        x: Fixed64::ONE,
        y: Fixed64::ONE,
        z: Fixed64::ONE,
    };

    pub const fn new(x: Fixed64, y: Fixed64, z: Fixed64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: Fixed64) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn from_f64(x: f64, y: f64, z: f64) -> Self {
        Self::new(f64_to_fixed64(x), f64_to_fixed64(y), f64_to_fixed64(z))
    }

    pub fn to_f64(self) -> [f64; 3] {
        [
            fixed64_to_f64(self.x),
            fixed64_to_f64(self.y),
            fixed64_to_f64(self.z),
        ]
    }

    /// Unclamped linear interpolation; `t` outside `[0, 1]` extrapolates.
    pub fn lerp(self, to: Vec3, t: Fixed64) -> Vec3 {
        self + (to - self) * t
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<Fixed64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: Fixed64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}
