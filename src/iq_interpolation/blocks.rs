//! Hardware-block specializations
//!
//! Each block declares its trigger dimensions, the nested calibration layout those
//! dimensions walk, its leaf record blend and the trigger subset its dirty check watches.

pub mod anr10;
pub mod gtm10;
pub mod pedestal13;
pub mod sce11;

pub use anr10::{Anr10, Anr10Chromatix, Anr10Region};
pub use gtm10::{Gtm10, Gtm10Chromatix, Gtm10Region};
pub use pedestal13::{Pedestal13, Pedestal13Chromatix, Pedestal13Region};
pub use sce11::{Sce11, Sce11Chromatix, Sce11Region};

use crate::iq_interpolation::common::numeric::approx_eq;
use crate::iq_interpolation::triggers::{ControlMethod, FrameTriggers};

/// Trigger values a block keeps from the last frame it computed.
pub(crate) trait Latched: Sized {
    fn capture(frame: &FrameTriggers) -> Self;

    fn matches(&self, other: &Self, epsilon: f32) -> bool;
}

/// Replaces `snapshot` with the frame's values when any of them moved.
pub(crate) fn refresh<S: Latched>(snapshot: &mut S, frame: &FrameTriggers, epsilon: f32) -> bool {
    let current = S::capture(frame);
    if snapshot.matches(&current, epsilon) {
        return false;
    }
    *snapshot = current;
    true
}

/// Exposure state shared by every block with an AEC or HDR-AEC dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExposureSnapshot {
    pub lux_index: f32,
    pub gain: f32,
    pub sensitivity: f32,
    pub exposure_time: f32,
    pub exposure_gain_ratio: f32,
}

impl ExposureSnapshot {
    pub fn aec_trigger(&self, control: &ControlMethod) -> f32 {
        control.aec_trigger(self.lux_index, self.gain)
    }

    pub fn hdr_aec_trigger(&self, control: &ControlMethod) -> f32 {
        control.hdr_aec_trigger(self.exposure_time, self.sensitivity, self.exposure_gain_ratio)
    }
}

impl Latched for ExposureSnapshot {
    fn capture(frame: &FrameTriggers) -> Self {
        Self {
            lux_index: frame.aec_lux_index,
            gain: frame.aec_gain,
            sensitivity: frame.aec_sensitivity,
            exposure_time: frame.aec_exposure_time,
            exposure_gain_ratio: frame.aec_exposure_gain_ratio,
        }
    }

    fn matches(&self, other: &Self, epsilon: f32) -> bool {
        approx_eq(self.lux_index, other.lux_index, epsilon)
            && approx_eq(self.gain, other.gain, epsilon)
            && approx_eq(self.sensitivity, other.sensitivity, epsilon)
            && approx_eq(self.exposure_time, other.exposure_time, epsilon)
            && approx_eq(self.exposure_gain_ratio, other.exposure_gain_ratio, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iq_interpolation::block::{Dimension, TuningBlock};
    use crate::iq_interpolation::triggers::{AecControl, HdrAecControl};

    #[test]
    fn test_every_dimension_is_searched_by_some_block() {
        let tables =
            [Sce11::OPERATIONS, Gtm10::OPERATIONS, Pedestal13::OPERATIONS, Anr10::OPERATIONS];
        let searched: Vec<Dimension> = tables
            .into_iter()
            .flatten()
            .map(|operation| operation.dimension)
            .collect();

        for dimension in [
            Dimension::LensPosition,
            Dimension::LensZoom,
            Dimension::PostScaleRatio,
            Dimension::PreScaleRatio,
            Dimension::DrcGain,
            Dimension::HdrAec,
            Dimension::Led,
            Dimension::Aec,
            Dimension::Cct,
        ] {
            assert!(searched.contains(&dimension), "{dimension:?} is not searched by any block");
        }
    }

    #[test]
    fn test_refresh_latches_changes_only() {
        let mut snapshot = ExposureSnapshot::default();
        let mut frame = FrameTriggers {
            aec_lux_index: 250.0,
            ..FrameTriggers::default()
        };
        assert!(refresh(&mut snapshot, &frame, 1e-9));
        assert_eq!(snapshot.lux_index, 250.0);
        assert!(!refresh(&mut snapshot, &frame, 1e-9));

        frame.aec_exposure_gain_ratio = 2.0;
        assert!(refresh(&mut snapshot, &frame, 1e-9));
        assert_eq!(snapshot.exposure_gain_ratio, 2.0);
    }

    #[test]
    fn test_exposure_triggers_follow_control() {
        let snapshot = ExposureSnapshot {
            lux_index: 300.0,
            gain: 4.0,
            sensitivity: 8.0,
            exposure_time: 16.0,
            exposure_gain_ratio: 2.0,
        };
        let control = ControlMethod {
            aec_exp_control: AecControl::Gain,
            aec_hdr_control: HdrAecControl::SensitivityRatio,
        };
        assert_eq!(snapshot.aec_trigger(&control), 4.0);
        assert_eq!(snapshot.hdr_aec_trigger(&control), 8.0);
        assert_eq!(snapshot.aec_trigger(&ControlMethod::default()), 300.0);
        assert_eq!(snapshot.hdr_aec_trigger(&ControlMethod::default()), 16.0);
    }
}
