//! Frame trigger inputs
//!
//! This module holds the per-frame metadata produced by AEC, AWB, lens and sensor
//! collaborators, and the helpers that turn it into block trigger values.

pub mod control;
pub mod frame;
pub mod hysteresis;

pub use control::{AecControl, AecTrigger, ControlMethod, HdrAecControl, HdrAecTrigger};
pub use frame::FrameTriggers;
pub use hysteresis::{ControlVariable, DynamicEnable, HysteresisCouplet, HysteresisDirection};
