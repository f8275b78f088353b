//! Hysteresis-controlled enable flag for blocks that switch on and off with a trigger.

use serde::{Deserialize, Serialize};

use crate::iq_interpolation::triggers::frame::FrameTriggers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlVariable {
    LensZoom,
    LuxIndex,
    Gain,
    DrcGain,
    ExposureTimeRatio,
    SensitivityRatio,
    Cct,
    LensPosition,
    TotalScaleRatio,
    PostScaleRatio,
    PreScaleRatio,
}

impl ControlVariable {
    pub fn value(&self, frame: &FrameTriggers) -> f32 {
        match self {
            ControlVariable::LensZoom => frame.lens_zoom,
            ControlVariable::LuxIndex => frame.aec_lux_index,
            ControlVariable::Gain => frame.aec_gain,
            ControlVariable::DrcGain => frame.drc_gain,
            ControlVariable::ExposureTimeRatio => frame.aec_exposure_time,
            ControlVariable::SensitivityRatio => frame.aec_sensitivity,
            ControlVariable::Cct => frame.awb_color_temperature,
            ControlVariable::LensPosition => frame.lens_position,
            ControlVariable::TotalScaleRatio => frame.total_scale_ratio,
            ControlVariable::PostScaleRatio => frame.post_scale_ratio,
            ControlVariable::PreScaleRatio => frame.pre_scale_ratio,
        }
    }

    /// Gain and exposure-time controls read the secondary couplet.
    fn uses_secondary_couplet(&self) -> bool {
        matches!(self, ControlVariable::Gain | ControlVariable::ExposureTimeRatio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HysteresisDirection {
    /// Enables once the trigger climbs past the band.
    #[default]
    Upward,
    /// Enables once the trigger falls below the band.
    Downward,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HysteresisCouplet {
    pub start1: f32,
    pub end1: f32,
    pub start2: f32,
    pub end2: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicEnable {
    pub enabled: bool,
    pub control: ControlVariable,
    pub direction: HysteresisDirection,
    pub couplet: HysteresisCouplet,
}

impl DynamicEnable {
    /// Updates `state` for this frame and returns it.
    ///
    /// Inside the band the previous state is kept. When dynamic enabling is off the
    /// block is always enabled.
    pub fn evaluate(&self, frame: &FrameTriggers, state: &mut bool) -> bool {
        if !self.enabled {
            *state = true;
            return *state;
        }

        let trigger = self.control.value(frame);
        let (start, end) = if self.control.uses_secondary_couplet() {
            (self.couplet.start2, self.couplet.end2)
        } else {
            (self.couplet.start1, self.couplet.end1)
        };

        match self.direction {
            HysteresisDirection::Upward => {
                if trigger >= end {
                    *state = true;
                } else if trigger < start {
                    *state = false;
                }
            }
            HysteresisDirection::Downward => {
                if trigger > end {
                    *state = false;
                } else if trigger <= start {
                    *state = true;
                }
            }
        }

        *state
    }
}
