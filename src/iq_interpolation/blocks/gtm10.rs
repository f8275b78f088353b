//! GTM 1.0 global tone mapping: DRC gain, HDR-AEC, AEC.

use serde::{Deserialize, Serialize};

use crate::iq_interpolation::blend::{BlendKind, FieldBlend, blend_field, blend_table};
use crate::iq_interpolation::block::{
    BlockId, Branch, Child, Dimension, Operation, TriggeredEntry, TuningBlock, bracket_branch,
    unexpected_node,
};
use crate::iq_interpolation::blocks::{ExposureSnapshot, Latched, refresh};
use crate::iq_interpolation::common::error::Result;
use crate::iq_interpolation::common::numeric::approx_eq;
use crate::iq_interpolation::tree::bracket::TriggerRegion;
use crate::iq_interpolation::triggers::{AecTrigger, ControlMethod, FrameTriggers, HdrAecTrigger};

/// Entries in the manual Y-ratio curve.
pub const YRATIO_BASE_ENTRIES: usize = 65;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gtm10Region {
    pub maxval_th: f32,
    pub key_min_th: f32,
    pub key_max_th: f32,
    pub key_hist_bin_weight: f32,
    pub yout_maxval: f32,
    pub minval_th: f32,
    pub a_middletone: f32,
    pub middletone_w: f32,
    pub temporal_w: f32,
    pub max_percentile: f32,
    pub min_percentile: f32,
    pub extra_ratio_factor: f32,
    pub dark_index_range: f32,
    pub yratio_base_manual: Vec<f32>,
    pub manual_curve_strength: f32,
    pub midlight_threshold_low: f32,
    pub midlight_threshold_high: f32,
    pub lowlight_w: f32,
    pub highlight_w: f32,
    pub max_ratio: f32,
    pub luma_peak_th0: f32,
    pub luma_peak_th1: f32,
    pub stretch_gain_0: f32,
    pub stretch_gain_1: f32,
}

pub type Gtm10AecEntry = TriggeredEntry<AecTrigger, Gtm10Region>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gtm10HdrAecData {
    pub aec_data: Vec<Gtm10AecEntry>,
}

pub type Gtm10HdrAecEntry = TriggeredEntry<HdrAecTrigger, Gtm10HdrAecData>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gtm10DrcGainData {
    pub hdr_aec_data: Vec<Gtm10HdrAecEntry>,
}

pub type Gtm10DrcGainEntry = TriggeredEntry<TriggerRegion, Gtm10DrcGainData>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gtm10Core {
    pub drc_gain_data: Vec<Gtm10DrcGainEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gtm10Chromatix {
    pub control_method: ControlMethod,
    pub core: Gtm10Core,
}

#[derive(Debug, Clone, Copy)]
pub enum Gtm10Node<'a> {
    Core(&'a Gtm10Core),
    DrcGain(&'a Gtm10DrcGainData),
    HdrAec(&'a Gtm10HdrAecData),
    Aec(&'a Gtm10AecEntry),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gtm10Triggers {
    pub control: ControlMethod,
    pub drc_gain: f32,
    pub hdr_aec: f32,
    pub aec: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gtm10Snapshot {
    pub exposure: ExposureSnapshot,
    pub drc_gain: f32,
}

impl Latched for Gtm10Snapshot {
    fn capture(frame: &FrameTriggers) -> Self {
        Self {
            exposure: ExposureSnapshot::capture(frame),
            drc_gain: frame.drc_gain,
        }
    }

    fn matches(&self, other: &Self, epsilon: f32) -> bool {
        self.exposure.matches(&other.exposure, epsilon)
            && approx_eq(self.drc_gain, other.drc_gain, epsilon)
    }
}

impl FieldBlend for Gtm10Region {
    fn blend_fields(a: &Self, b: &Self, ratio: f32, out: &mut Self) -> Result<()> {
        let linear = |x: &f32, y: &f32| blend_field(x, y, ratio, BlendKind::Linear);

        out.maxval_th = linear(&a.maxval_th, &b.maxval_th);
        out.key_min_th = linear(&a.key_min_th, &b.key_min_th);
        out.key_max_th = linear(&a.key_max_th, &b.key_max_th);
        out.key_hist_bin_weight = linear(&a.key_hist_bin_weight, &b.key_hist_bin_weight);
        out.yout_maxval = linear(&a.yout_maxval, &b.yout_maxval);
        out.minval_th = linear(&a.minval_th, &b.minval_th);
        out.a_middletone = linear(&a.a_middletone, &b.a_middletone);
        out.middletone_w = linear(&a.middletone_w, &b.middletone_w);
        out.temporal_w = linear(&a.temporal_w, &b.temporal_w);
        out.max_percentile = linear(&a.max_percentile, &b.max_percentile);
        out.min_percentile = linear(&a.min_percentile, &b.min_percentile);
        out.extra_ratio_factor = linear(&a.extra_ratio_factor, &b.extra_ratio_factor);
        out.dark_index_range = linear(&a.dark_index_range, &b.dark_index_range);
        out.manual_curve_strength = linear(&a.manual_curve_strength, &b.manual_curve_strength);
        out.midlight_threshold_low = linear(&a.midlight_threshold_low, &b.midlight_threshold_low);
        out.midlight_threshold_high =
            linear(&a.midlight_threshold_high, &b.midlight_threshold_high);
        out.lowlight_w = linear(&a.lowlight_w, &b.lowlight_w);
        out.highlight_w = linear(&a.highlight_w, &b.highlight_w);
        out.max_ratio = linear(&a.max_ratio, &b.max_ratio);
        out.luma_peak_th0 = linear(&a.luma_peak_th0, &b.luma_peak_th0);
        out.luma_peak_th1 = linear(&a.luma_peak_th1, &b.luma_peak_th1);
        out.stretch_gain_0 = linear(&a.stretch_gain_0, &b.stretch_gain_0);
        out.stretch_gain_1 = linear(&a.stretch_gain_1, &b.stretch_gain_1);

        blend_table(
            "yratio_base_manual",
            &a.yratio_base_manual,
            &b.yratio_base_manual,
            ratio,
            BlendKind::Linear,
            &mut out.yratio_base_manual,
        )
    }
}

pub struct Gtm10;

impl TuningBlock for Gtm10 {
    type Calibration = Gtm10Chromatix;
    type Node<'a> = Gtm10Node<'a>;
    type Payload = Gtm10Region;
    type Triggers = Gtm10Triggers;
    type Snapshot = Gtm10Snapshot;

    const ID: BlockId = BlockId::Gtm10;
    const OPERATIONS: &'static [Operation] = &[
        Operation::new(Dimension::DrcGain, 2),
        Operation::new(Dimension::HdrAec, 2),
        Operation::new(Dimension::Aec, 2),
    ];

    fn root(calibration: &Self::Calibration) -> Gtm10Node<'_> {
        Gtm10Node::Core(&calibration.core)
    }

    fn search<'a>(
        operation: &Operation,
        parent: Gtm10Node<'a>,
        triggers: &Gtm10Triggers,
    ) -> Result<Branch<'a, Gtm10Node<'a>, Gtm10Region>>
    where
        Self: 'a,
    {
        let dimension = operation.dimension;
        match (dimension, parent) {
            (Dimension::DrcGain, Gtm10Node::Core(core)) => bracket_branch(
                dimension,
                &core.drc_gain_data,
                triggers.drc_gain,
                |entry| entry.trigger,
                |entry| Child::inner(Gtm10Node::DrcGain(&entry.data)),
            ),
            (Dimension::HdrAec, Gtm10Node::DrcGain(drc)) => bracket_branch(
                dimension,
                &drc.hdr_aec_data,
                triggers.hdr_aec,
                |entry| entry.trigger.region(triggers.control.aec_hdr_control),
                |entry| Child::inner(Gtm10Node::HdrAec(&entry.data)),
            ),
            (Dimension::Aec, Gtm10Node::HdrAec(hdr)) => bracket_branch(
                dimension,
                &hdr.aec_data,
                triggers.aec,
                |entry| entry.trigger.region(triggers.control.aec_exp_control),
                |entry| Child::leaf(Gtm10Node::Aec(entry), &entry.data),
            ),
            _ => Err(unexpected_node(Self::ID, operation)),
        }
    }

    fn update_snapshot(snapshot: &mut Gtm10Snapshot, frame: &FrameTriggers, epsilon: f32) -> bool {
        refresh(snapshot, frame, epsilon)
    }

    fn triggers(calibration: &Gtm10Chromatix, snapshot: &Gtm10Snapshot) -> Gtm10Triggers {
        let control = calibration.control_method;
        Gtm10Triggers {
            control,
            drc_gain: snapshot.drc_gain,
            hdr_aec: snapshot.exposure.hdr_aec_trigger(&control),
            aec: snapshot.exposure.aec_trigger(&control),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iq_interpolation::blend::blend_records;
    use crate::iq_interpolation::common::error::InterpolationError;

    fn region(level: f32) -> Gtm10Region {
        Gtm10Region {
            maxval_th: level,
            max_ratio: level * 2.0,
            yratio_base_manual: vec![level; YRATIO_BASE_ENTRIES],
            ..Gtm10Region::default()
        }
    }

    #[test]
    fn test_curve_blends_elementwise() {
        let mut out = Gtm10Region::default();
        blend_records(&region(1.0), &region(3.0), 0.25, &mut out).unwrap();
        assert_eq!(out.maxval_th, 1.5);
        assert_eq!(out.max_ratio, 3.0);
        assert_eq!(out.yratio_base_manual.len(), YRATIO_BASE_ENTRIES);
        assert!(out.yratio_base_manual.iter().all(|v| *v == 1.5));
    }

    #[test]
    fn test_curve_length_mismatch_fails() {
        let mut short = region(3.0);
        short.yratio_base_manual.truncate(10);
        let mut out = Gtm10Region::default();
        let err = blend_records(&region(1.0), &short, 0.5, &mut out).unwrap_err();
        assert!(matches!(
            err,
            InterpolationError::FieldMismatch { field: "yratio_base_manual", .. }
        ));
    }

    #[test]
    fn test_drc_gain_change_marks_dirty() {
        let mut snapshot = Gtm10Snapshot::default();
        let mut frame = FrameTriggers {
            aec_lux_index: 200.0,
            drc_gain: 1.0,
            ..FrameTriggers::default()
        };
        assert!(Gtm10::update_snapshot(&mut snapshot, &frame, 1e-9));
        assert!(!Gtm10::update_snapshot(&mut snapshot, &frame, 1e-9));

        frame.drc_gain = 2.0;
        assert!(Gtm10::update_snapshot(&mut snapshot, &frame, 1e-9));
        assert_eq!(snapshot.drc_gain, 2.0);
    }
}
