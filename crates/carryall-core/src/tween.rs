//! Time-based interpolation primitives.
//!
//! A [`Tween`] is a plain-data state machine: the owner calls
//! [`Tween::advance`] once per tick with the elapsed time and receives either
//! [`Progress::Pending`] with the intermediate value or [`Progress::Done`]
//! with the exact target value. Nothing here touches items directly; callers
//! apply the returned value to whatever they are animating.

use crate::fixed::{non_negative, Fixed64, Seconds};
use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Easing
// ---------------------------------------------------------------------------

/// Normalized easing curve mapping `k` in `[0, 1]` to an interpolation weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    /// k²
    EaseIn,
    /// 1 - (1 - k)²
    EaseOut,
    /// Smoothstep, 3k² - 2k³.
    #[default]
    EaseInOut,
}

impl Easing {
    pub fn apply(self, k: Fixed64) -> Fixed64 {
        let k = k.clamp(Fixed64::ZERO, Fixed64::ONE);
        let two = Fixed64::from_num(2);
        let three = Fixed64::from_num(3);
        match self {
            Easing::Linear => k,
            Easing::EaseIn => k * k,
            Easing::EaseOut => {
                let inv = Fixed64::ONE - k;
                Fixed64::ONE - inv * inv
            }
            Easing::EaseInOut => k * k * (three - two * k),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Result of polling a suspended operation for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<T> {
    Pending(T),
    Done(T),
}

impl<T> Progress<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Progress::Done(_))
    }

    pub fn into_value(self) -> T {
        match self {
            Progress::Pending(v) | Progress::Done(v) => v,
        }
    }
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// Interpolates a vector from `from` to `to` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tween {
    pub from: Vec3,
    pub to: Vec3,
    pub duration: Seconds,
    pub elapsed: Seconds,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: Vec3, to: Vec3, duration: Seconds, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: non_negative(duration),
            elapsed: Fixed64::ZERO,
            easing,
        }
    }

    /// Normalized linear progress in `[0, 1]`.
    pub fn fraction(&self) -> Fixed64 {
        if self.duration <= Fixed64::ZERO {
            return Fixed64::ONE;
        }
        (self.elapsed / self.duration).min(Fixed64::ONE)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advance by `dt` seconds. The `Done` value is always exactly `to`.
    pub fn advance(&mut self, dt: Seconds) -> Progress<Vec3> {
        self.elapsed = self
            .elapsed
            .saturating_add(non_negative(dt))
            .min(self.duration);
        if self.is_finished() {
            return Progress::Done(self.to);
        }
        let weight = self.easing.apply(self.fraction());
        Progress::Pending(self.from.lerp(self.to, weight))
    }
}

// ---------------------------------------------------------------------------
// Hop
// ---------------------------------------------------------------------------

/// A position tween with a parabolic vertical arc peaking at `arc` halfway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub tween: Tween,
    pub arc: Fixed64,
}

impl Hop {
    pub fn new(from: Vec3, to: Vec3, duration: Seconds, arc: Fixed64, easing: Easing) -> Self {
        Self {
            tween: Tween::new(from, to, duration, easing),
            arc: non_negative(arc),
        }
    }

    pub fn advance(&mut self, dt: Seconds) -> Progress<Vec3> {
        match self.tween.advance(dt) {
            Progress::Done(v) => Progress::Done(v),
            Progress::Pending(mut v) => {
                let k = self.tween.fraction();
                let four = Fixed64::from_num(4);
                v.y += self.arc * four * k * (Fixed64::ONE - k);
                Progress::Pending(v)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64;

    fn secs(v: f64) -> Seconds {
        f64_to_fixed64(v)
    }

    #[test]
    fn easing_endpoints() {
        for easing in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(easing.apply(Fixed64::ZERO), Fixed64::ZERO);
            assert_eq!(easing.apply(Fixed64::ONE), Fixed64::ONE);
        }
    }

    #[test]
    fn ease_in_out_is_symmetric_at_half() {
        assert_eq!(Easing::EaseInOut.apply(secs(0.5)), secs(0.5));
    }

    #[test]
    fn tween_finishes_on_exact_target() {
        let to = Vec3::from_f64(0.75, 0.75, 0.75);
        let mut tween = Tween::new(Vec3::ZERO, to, secs(0.2), Easing::EaseInOut);
        assert!(!tween.advance(secs(0.15)).is_done());
        // Overshooting dt must not overshoot the value.
        assert_eq!(tween.advance(secs(0.15)), Progress::Done(to));
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut tween = Tween::new(Vec3::ONE, Vec3::ZERO, Fixed64::ZERO, Easing::Linear);
        assert_eq!(tween.advance(Fixed64::ZERO), Progress::Done(Vec3::ZERO));
    }

    #[test]
    fn negative_duration_is_clamped() {
        let mut tween = Tween::new(Vec3::ONE, Vec3::ZERO, secs(-1.0), Easing::Linear);
        assert_eq!(tween.duration, Fixed64::ZERO);
        assert!(tween.advance(Fixed64::ZERO).is_done());
    }

    #[test]
    fn linear_tween_midpoint() {
        let to = Vec3::from_f64(2.0, 0.0, 0.0);
        let mut tween = Tween::new(Vec3::ZERO, to, secs(1.0), Easing::Linear);
        assert_eq!(tween.advance(secs(0.5)), Progress::Pending(Vec3::from_f64(1.0, 0.0, 0.0)));
    }

    #[test]
    fn hop_peaks_at_half_and_lands_exactly() {
        let target = Vec3::from_f64(1.0, 0.0, 0.0);
        let mut hop = Hop::new(Vec3::ZERO, target, secs(1.0), secs(0.5), Easing::Linear);
        let mid = hop.advance(secs(0.5)).into_value();
        assert_eq!(mid.y, secs(0.5));
        assert_eq!(hop.advance(secs(0.5)), Progress::Done(target));
    }
}
