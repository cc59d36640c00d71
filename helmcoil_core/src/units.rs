//! Unit conversions between device amps and controller milliamps.
//!
//! The controller works in integer milliamps; the source speaks amps with
//! three decimals.

/// Lowest fine trim value the source accepts.
pub const FINE_MIN: i8 = i8::MIN;
/// Highest fine trim value the source accepts.
pub const FINE_MAX: i8 = i8::MAX;

/// Convert amps to milliamps, truncating toward zero.
///
/// The nudge absorbs binary representation error of three-decimal replies
/// (`4.999` must read as 4999, not 4998).
#[inline]
pub fn amps_to_ma(amps: f64) -> i32 {
    if !amps.is_finite() {
        return 0;
    }
    let scaled = amps * 1000.0;
    let nudged = scaled + scaled.signum() * 1e-6;
    nudged.trunc().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// Convert milliamps to amps.
#[inline]
pub fn ma_to_amps(ma: i32) -> f64 {
    f64::from(ma) / 1000.0
}

/// Clamp an arbitrary fine value into the signed 8-bit device range.
#[inline]
pub fn clamp_fine(fine: i32) -> i8 {
    fine.clamp(i32::from(FINE_MIN), i32::from(FINE_MAX)) as i8
}
