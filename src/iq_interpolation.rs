//! IQ calibration interpolation module
//!
//! This module turns nested Chromatix tuning tables and per-frame sensor triggers into
//! one interpolated calibration record per hardware block, with separate modules for
//! the tree engine, blend policy, block specializations and frame synthesis.

pub mod blend;
pub mod block;
pub mod blocks;
pub mod chromatix;
pub mod common;
pub mod synthesis;
pub mod tree;
pub mod triggers;

pub use common::{
    InterpolationError,
    Result,
};

pub use block::{
    BlockId,
    Branch,
    Child,
    Dimension,
    Operation,
    TriggeredEntry,
    TuningBlock,
};

pub use blocks::{
    Anr10,
    Gtm10,
    Pedestal13,
    Sce11,
};

pub use chromatix::{
    ChromatixBundle,
    ChromatixError,
    FrameSequence,
};

pub use synthesis::{
    BlockSynthesizer,
    FrameReport,
    FrameSynthesizer,
    Outcome,
    SynthesisConfig,
    SynthesisTimings,
    interpolate,
};

pub use triggers::FrameTriggers;
