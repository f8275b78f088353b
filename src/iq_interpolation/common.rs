//! Common utilities module
//!
//! This module contains the error taxonomy and the numeric helpers shared by the
//! tree engine, the blend policy and the per-block specializations.

pub mod error;
pub mod numeric;

pub use error::{InterpolationError, Result};
pub use numeric::{approx_eq, interpolation_ratio, lerp, DEFAULT_EPSILON};
