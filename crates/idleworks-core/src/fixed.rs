use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
///
/// Out-of-range values saturate and NaN becomes zero. Loaders that must
/// reject such input use [`checked_f64_to_fixed64`].
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    if v.is_nan() {
        Fixed64::ZERO
    } else {
        Fixed64::saturating_from_num(v)
    }
}

/// Convert an f64 to Fixed64, or `None` if it is NaN, infinite, or outside
/// the Q32.32 range.
#[inline]
pub fn checked_f64_to_fixed64(v: f64) -> Option<Fixed64> {
    Fixed64::checked_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Convert a duration in seconds to whole ticks, rounding up.
///
/// Zero or negative durations yield 0; any positive duration yields at
/// least one tick.
pub fn seconds_to_ticks(seconds: Fixed64, ticks_per_second: u32) -> Ticks {
    if seconds <= Fixed64::ZERO {
        return 0;
    }
    let scaled = seconds.saturating_mul(Fixed64::saturating_from_num(ticks_per_second));
    let whole: i64 = scaled.to_num();
    let ceiled = if scaled.frac() > Fixed64::ZERO {
        whole + 1
    } else {
        whole
    };
    ceiled.max(1) as Ticks
}

/// Ratio `done / total` as a 0..1 fraction. Returns 0 when `total` is 0.
pub fn fraction(done: Ticks, total: Ticks) -> Fixed64 {
    if total == 0 {
        return Fixed64::ZERO;
    }
    let done = u128::from(done.min(total));
    // done <= total, so the quotient is at most 1 << 32 and fits.
    Fixed64::from_bits(((done << 32) / u128::from(total)) as i64)
}
