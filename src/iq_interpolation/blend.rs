//! Blend-by-kind policy shared by every block.
//!
//! Each payload field is either continuous (linear interpolation) or discrete
//! (nearest neighbour). Both kinds go through the same interpolation primitive: a
//! discrete field just snaps the ratio to 0 or 1 first, and the primitive returns the
//! source verbatim at either end.

use std::ptr;

use crate::iq_interpolation::common::error::{InterpolationError, Result};
use crate::iq_interpolation::common::numeric::lerp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendKind {
    Linear,
    Nearest,
}

impl BlendKind {
    /// Ratio actually applied for this kind, always within `[0, 1]`.
    pub fn effective_ratio(self, ratio: f32) -> f32 {
        match self {
            BlendKind::Linear => {
                if ratio > 0.0 {
                    ratio.min(1.0)
                } else {
                    0.0
                }
            }
            BlendKind::Nearest => {
                if ratio + 0.5 >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// A payload field that can be interpolated.
pub trait Blendable: Clone {
    /// `ratio` is already clamped to `[0, 1]`.
    fn interpolate(a: &Self, b: &Self, ratio: f32) -> Self;
}

impl Blendable for f32 {
    fn interpolate(a: &Self, b: &Self, ratio: f32) -> Self {
        lerp(*a, *b, ratio)
    }
}

impl Blendable for i32 {
    fn interpolate(a: &Self, b: &Self, ratio: f32) -> Self {
        if ratio <= 0.0 {
            *a
        } else if ratio >= 1.0 {
            *b
        } else {
            let (a64, b64) = (f64::from(*a), f64::from(*b));
            (a64 + f64::from(ratio) * (b64 - a64)).round() as i32
        }
    }
}

impl Blendable for u32 {
    fn interpolate(a: &Self, b: &Self, ratio: f32) -> Self {
        if ratio <= 0.0 {
            *a
        } else if ratio >= 1.0 {
            *b
        } else {
            let (a64, b64) = (f64::from(*a), f64::from(*b));
            (a64 + f64::from(ratio) * (b64 - a64)).round() as u32
        }
    }
}

impl Blendable for bool {
    fn interpolate(a: &Self, b: &Self, ratio: f32) -> Self {
        if ratio >= 0.5 { *b } else { *a }
    }
}

impl<T: Blendable, const N: usize> Blendable for [T; N] {
    fn interpolate(a: &Self, b: &Self, ratio: f32) -> Self {
        std::array::from_fn(|i| T::interpolate(&a[i], &b[i], ratio))
    }
}

/// Blends one field according to its kind.
#[inline]
pub fn blend_field<T: Blendable>(a: &T, b: &T, ratio: f32, kind: BlendKind) -> T {
    T::interpolate(a, b, kind.effective_ratio(ratio))
}

/// Blends a variable-length table element-wise into `out`.
pub fn blend_table<T: Blendable>(
    field: &'static str,
    a: &[T],
    b: &[T],
    ratio: f32,
    kind: BlendKind,
    out: &mut Vec<T>,
) -> Result<()> {
    if a.len() != b.len() {
        return Err(InterpolationError::FieldMismatch {
            field,
            left: a.len(),
            right: b.len(),
        });
    }

    let ratio = kind.effective_ratio(ratio);
    out.clear();
    out.extend(a.iter().zip(b).map(|(a, b)| T::interpolate(a, b, ratio)));
    Ok(())
}

/// Field-by-field blend of a whole calibration record.
pub trait FieldBlend {
    /// Writes the blend of `a` and `b` into `out`. Only called with `0 < ratio < 1`.
    fn blend_fields(a: &Self, b: &Self, ratio: f32, out: &mut Self) -> Result<()>;
}

/// Record-level blend used by the reducer.
///
/// Blending a record against itself, or with a ratio at (or past) either end, copies
/// the corresponding source verbatim without touching the interpolation arithmetic.
pub fn blend_records<P: FieldBlend + Clone>(a: &P, b: &P, ratio: f32, out: &mut P) -> Result<()> {
    if ptr::eq(a, b) || ratio.is_nan() || ratio <= 0.0 {
        out.clone_from(a);
        Ok(())
    } else if ratio >= 1.0 {
        out.clone_from(b);
        Ok(())
    } else {
        P::blend_fields(a, b, ratio, out)
    }
}
