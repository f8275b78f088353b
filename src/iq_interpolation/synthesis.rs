//! Per-frame synthesis of calibration records
//!
//! [`BlockSynthesizer`] puts the dirty check in front of tree build and reduction for
//! one block and keeps the last good record for fallback. [`FrameSynthesizer`] runs a
//! set of blocks for each frame.

mod frame;
mod synthesizer;
mod timing;
mod types;


pub use frame::{FrameReport, FrameSynthesizer, Synthesize};
pub use synthesizer::{BlockSynthesizer, interpolate};
pub use timing::{Step, StepTiming, SynthesisTimings, Timer};
pub use types::{Outcome, SynthesisConfig, SynthesisConfigBuilder, SynthesisStats};
