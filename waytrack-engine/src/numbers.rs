//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a ratio in `[0, 1]` to a whole percentage, clamped to `0..=100`.
///
/// Non-finite ratios collapse to 0.
#[must_use]
pub fn ratio_to_percent(ratio: f64) -> u8 {
    if !ratio.is_finite() {
        return 0;
    }
    let scaled = (ratio * 100.0).clamp(0.0, 100.0).round();
    cast::<f64, u8>(scaled).unwrap_or(0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Split `total` into `segments` equal parts and return the offset of boundary `index`.
///
/// Computed in 128-bit space so large spans cannot overflow, then truncated
/// toward zero. `segments == 0` yields 0.
#[must_use]
pub fn even_share(total: i64, index: usize, segments: usize) -> i64 {
    if segments == 0 {
        return 0;
    }
    let index = i128::try_from(index).unwrap_or(i128::MAX);
    let segments = i128::try_from(segments).unwrap_or(i128::MAX);
    let share = i128::from(total).saturating_mul(index) / segments;
    i64::try_from(share).unwrap_or(if share.is_negative() { i64::MIN } else { i64::MAX })
}
