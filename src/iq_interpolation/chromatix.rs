//! Chromatix tuning bundles and frame sequences loaded from TOML.
//!
//! A bundle holds one calibration table per block; blocks missing from the file stay
//! unregistered. A frame sequence is the list of per-frame triggers to replay.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::iq_interpolation::block::BlockId;
use crate::iq_interpolation::blocks::{
    Anr10Chromatix, Gtm10Chromatix, Pedestal13Chromatix, Sce11Chromatix,
};
use crate::iq_interpolation::triggers::FrameTriggers;

#[derive(Error, Debug)]
pub enum ChromatixError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid chromatix: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromatixBundle {
    pub sce11: Option<Sce11Chromatix>,
    pub gtm10: Option<Gtm10Chromatix>,
    pub pedestal13: Option<Pedestal13Chromatix>,
    pub anr10: Option<Anr10Chromatix>,
}

impl ChromatixBundle {
    pub fn from_toml_str(source: &str) -> Result<Self, ChromatixError> {
        let bundle: Self = toml::from_str(source)?;
        if bundle.is_empty() {
            return Err(ChromatixError::Invalid("bundle carries no block tables".to_string()));
        }
        debug!(blocks = ?bundle.blocks(), "Chromatix bundle parsed");
        Ok(bundle)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ChromatixError> {
        let path = path.as_ref();
        let bundle = Self::from_toml_str(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), blocks = bundle.blocks().len(), "Chromatix loaded");
        Ok(bundle)
    }

    /// Blocks with a table present, in registration order.
    pub fn blocks(&self) -> Vec<BlockId> {
        let present = [
            self.sce11.is_some(),
            self.gtm10.is_some(),
            self.pedestal13.is_some(),
            self.anr10.is_some(),
        ];
        BlockId::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(block, present)| present.then_some(block))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSequence {
    pub frames: Vec<FrameTriggers>,
}

impl FrameSequence {
    pub fn from_toml_str(source: &str) -> Result<Self, ChromatixError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ChromatixError> {
        let path = path.as_ref();
        let sequence = Self::from_toml_str(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), frames = sequence.frames.len(), "Frame sequence loaded");
        Ok(sequence)
    }
}
