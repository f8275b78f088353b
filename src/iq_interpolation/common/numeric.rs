//! Scalar helpers shared by bracket search, blending and dirty checks.

/// Tolerance used by trigger comparisons unless configured otherwise.
pub const DEFAULT_EPSILON: f32 = 1e-9;

/// Returns true when `a` and `b` differ by less than `epsilon`.
#[inline]
pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

/// Position of `value` inside `[start, end]` as a fraction, clamped to `[0, 1]`.
///
/// Computed in double precision; a degenerate span (`end <= start`) yields 1 for any
/// value at or past `end`.
#[inline]
pub fn interpolation_ratio(value: f32, start: f32, end: f32) -> f32 {
    let (value, start, end) = (f64::from(value), f64::from(start), f64::from(end));

    if value < start {
        0.0
    } else if value >= end {
        1.0
    } else {
        ((value - start) / (end - start)) as f32
    }
}

/// Linear interpolation between `a` and `b`.
///
/// The ratio is clamped to `[0, 1]`; at either end the corresponding source is
/// returned verbatim so no rounding error is introduced.
#[inline]
pub fn lerp(a: f32, b: f32, ratio: f32) -> f32 {
    if ratio <= 0.0 {
        a
    } else if ratio >= 1.0 {
        b
    } else {
        let (a64, b64) = (f64::from(a), f64::from(b));
        (a64 + f64::from(ratio) * (b64 - a64)) as f32
    }
}
