//! Control methods that decide which AEC quantity drives the AEC and HDR-AEC dimensions.

use serde::{Deserialize, Serialize};

use crate::iq_interpolation::tree::bracket::TriggerRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AecControl {
    #[default]
    LuxIndex,
    Gain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HdrAecControl {
    #[default]
    ExposureTimeRatio,
    SensitivityRatio,
    ExposureGainRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlMethod {
    pub aec_exp_control: AecControl,
    pub aec_hdr_control: HdrAecControl,
}

impl ControlMethod {
    pub fn aec_trigger(&self, lux_index: f32, gain: f32) -> f32 {
        match self.aec_exp_control {
            AecControl::LuxIndex => lux_index,
            AecControl::Gain => gain,
        }
    }

    pub fn hdr_aec_trigger(
        &self,
        exposure_time_ratio: f32,
        sensitivity_ratio: f32,
        exposure_gain_ratio: f32,
    ) -> f32 {
        match self.aec_hdr_control {
            HdrAecControl::ExposureTimeRatio => exposure_time_ratio,
            HdrAecControl::SensitivityRatio => sensitivity_ratio,
            HdrAecControl::ExposureGainRatio => exposure_gain_ratio,
        }
    }
}

/// AEC region expressed in both lux index and gain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AecTrigger {
    pub lux_idx_start: f32,
    pub lux_idx_end: f32,
    pub gain_start: f32,
    pub gain_end: f32,
}

impl AecTrigger {
    pub fn region(&self, control: AecControl) -> TriggerRegion {
        match control {
            AecControl::LuxIndex => TriggerRegion::new(self.lux_idx_start, self.lux_idx_end),
            AecControl::Gain => TriggerRegion::new(self.gain_start, self.gain_end),
        }
    }
}

/// HDR-AEC region expressed in each of the three HDR ratios.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HdrAecTrigger {
    pub exp_time_start: f32,
    pub exp_time_end: f32,
    pub aec_sensitivity_start: f32,
    pub aec_sensitivity_end: f32,
    pub exp_gain_start: f32,
    pub exp_gain_end: f32,
}

impl HdrAecTrigger {
    pub fn region(&self, control: HdrAecControl) -> TriggerRegion {
        match control {
            HdrAecControl::ExposureTimeRatio => {
                TriggerRegion::new(self.exp_time_start, self.exp_time_end)
            }
            HdrAecControl::SensitivityRatio => {
                TriggerRegion::new(self.aec_sensitivity_start, self.aec_sensitivity_end)
            }
            HdrAecControl::ExposureGainRatio => {
                TriggerRegion::new(self.exp_gain_start, self.exp_gain_end)
            }
        }
    }
}
