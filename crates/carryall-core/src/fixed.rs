use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Used for every
/// duration, distance and scale inside the simulation.
pub type Fixed64 = I32F32;

/// Simulation time in seconds.
pub type Seconds = Fixed64;

/// Ticks are the atomic unit of simulation stepping.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for configuration, never in the tick loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and host read-back.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Clamp a duration to be non-negative.
#[inline]
pub fn non_negative(v: Fixed64) -> Fixed64 {
    v.max(Fixed64::ZERO)
}
