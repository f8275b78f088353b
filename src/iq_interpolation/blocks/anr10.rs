//! ANR 1.0 advanced noise reduction.
//!
//! The deepest tree in the crate: lens position, lens zoom, post-scale ratio,
//! pre-scale ratio, DRC gain, HDR-AEC, AEC and CCT. Each leaf carries one region per
//! resolution pass; passes are matched by their pass trigger, not by position.

use serde::{Deserialize, Serialize};

use crate::iq_interpolation::blend::{BlendKind, FieldBlend, blend_field};
use crate::iq_interpolation::block::{
    BlockId, Branch, Child, Dimension, Operation, TriggeredEntry, TuningBlock, bracket_branch,
    unexpected_node,
};
use crate::iq_interpolation::blocks::{ExposureSnapshot, Latched, refresh};
use crate::iq_interpolation::common::error::{InterpolationError, Result};
use crate::iq_interpolation::common::numeric::approx_eq;
use crate::iq_interpolation::tree::bracket::TriggerRegion;
use crate::iq_interpolation::triggers::{
    AecTrigger, ControlMethod, DynamicEnable, FrameTriggers, HdrAecTrigger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    #[default]
    Full,
    Dc4,
    Dc16,
    Dc64,
}

impl Pass {
    pub const ALL: [Pass; 4] = [Pass::Full, Pass::Dc4, Pass::Dc16, Pass::Dc64];
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LumaChromaFilterConfig {
    pub threshold_lut_control_avg_block_size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub filter_isotropic_min_filter_size: f32,
    pub filter_manual_derivatives_flags: f32,
    pub dcind_isotropic_min_size: f32,
    pub dcind_manual_derivatives_flags: f32,
    pub second_derivative_max_influence_radius_filtering: f32,
    pub second_derivative_max_influence_radius_dc_indication: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LumaFilterKernel {
    pub edge_kernel_size: f32,
    pub automatic_definition_granularity: f32,
    pub manual_edge_kernel_1x1_center_coefficient: f32,
    pub manual_edge_kernel_3x3_horver_shift: f32,
    pub manual_edge_kernel_3x3_diag_shift: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GreyTreatment {
    pub enable_grey_treatment_dcblend2_chroma_modification: f32,
    pub detect_grey_condition_chromaticity_radius: f32,
    pub detect_grey_condition_chromaticity_thr_low: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10PassRegion {
    pub luma_chroma_filter_config: LumaChromaFilterConfig,
    pub luma_filter_config: FilterConfig,
    pub chroma_filter_config: FilterConfig,
    pub luma_filter_kernel: LumaFilterKernel,
    pub grey_treatment: GreyTreatment,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10PassData {
    pub pass_trigger: Pass,
    pub region: Anr10PassRegion,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10Region {
    pub passes: Vec<Anr10PassData>,
}

impl Anr10Region {
    pub fn pass(&self, pass: Pass) -> Option<&Anr10PassRegion> {
        self.passes
            .iter()
            .find(|data| data.pass_trigger == pass)
            .map(|data| &data.region)
    }
}

pub type Anr10CctEntry = TriggeredEntry<TriggerRegion, Anr10Region>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10AecData {
    pub cct_data: Vec<Anr10CctEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10HdrAecData {
    pub aec_data: Vec<TriggeredEntry<AecTrigger, Anr10AecData>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10DrcGainData {
    pub hdr_aec_data: Vec<TriggeredEntry<HdrAecTrigger, Anr10HdrAecData>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10PreScaleRatioData {
    pub drc_gain_data: Vec<TriggeredEntry<TriggerRegion, Anr10DrcGainData>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10PostScaleRatioData {
    pub pre_scale_ratio_data: Vec<TriggeredEntry<TriggerRegion, Anr10PreScaleRatioData>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10LensZoomData {
    pub post_scale_ratio_data: Vec<TriggeredEntry<TriggerRegion, Anr10PostScaleRatioData>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10LensPositionData {
    pub lens_zoom_data: Vec<TriggeredEntry<TriggerRegion, Anr10LensZoomData>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10Core {
    pub lens_position_data: Vec<TriggeredEntry<TriggerRegion, Anr10LensPositionData>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Anr10Chromatix {
    pub control_method: ControlMethod,
    pub dynamic_enable: Option<DynamicEnable>,
    pub core: Anr10Core,
}

#[derive(Debug, Clone, Copy)]
pub enum Anr10Node<'a> {
    Core(&'a Anr10Core),
    LensPosition(&'a Anr10LensPositionData),
    LensZoom(&'a Anr10LensZoomData),
    PostScaleRatio(&'a Anr10PostScaleRatioData),
    PreScaleRatio(&'a Anr10PreScaleRatioData),
    DrcGain(&'a Anr10DrcGainData),
    HdrAec(&'a Anr10HdrAecData),
    Aec(&'a Anr10AecData),
    Cct(&'a Anr10CctEntry),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anr10Triggers {
    pub control: ControlMethod,
    pub lens_position: f32,
    pub lens_zoom: f32,
    pub post_scale_ratio: f32,
    pub pre_scale_ratio: f32,
    pub drc_gain: f32,
    pub hdr_aec: f32,
    pub aec: f32,
    pub cct: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anr10Snapshot {
    pub exposure: ExposureSnapshot,
    pub cct: f32,
    pub lens_position: f32,
    pub lens_zoom: f32,
    pub post_scale_ratio: f32,
    pub pre_scale_ratio: f32,
    pub drc_gain: f32,
}

impl Latched for Anr10Snapshot {
    fn capture(frame: &FrameTriggers) -> Self {
        Self {
            exposure: ExposureSnapshot::capture(frame),
            cct: frame.awb_color_temperature,
            lens_position: frame.lens_position,
            lens_zoom: frame.lens_zoom,
            post_scale_ratio: frame.post_scale_ratio,
            pre_scale_ratio: frame.pre_scale_ratio,
            drc_gain: frame.drc_gain,
        }
    }

    fn matches(&self, other: &Self, epsilon: f32) -> bool {
        self.exposure.matches(&other.exposure, epsilon)
            && approx_eq(self.cct, other.cct, epsilon)
            && approx_eq(self.lens_position, other.lens_position, epsilon)
            && approx_eq(self.lens_zoom, other.lens_zoom, epsilon)
            && approx_eq(self.post_scale_ratio, other.post_scale_ratio, epsilon)
            && approx_eq(self.pre_scale_ratio, other.pre_scale_ratio, epsilon)
            && approx_eq(self.drc_gain, other.drc_gain, epsilon)
    }
}

fn blend_filter(a: &FilterConfig, b: &FilterConfig, ratio: f32) -> FilterConfig {
    use BlendKind::{Linear, Nearest};

    FilterConfig {
        filter_isotropic_min_filter_size: blend_field(
            &a.filter_isotropic_min_filter_size,
            &b.filter_isotropic_min_filter_size,
            ratio,
            Linear,
        ),
        filter_manual_derivatives_flags: blend_field(
            &a.filter_manual_derivatives_flags,
            &b.filter_manual_derivatives_flags,
            ratio,
            Nearest,
        ),
        dcind_isotropic_min_size: blend_field(
            &a.dcind_isotropic_min_size,
            &b.dcind_isotropic_min_size,
            ratio,
            Linear,
        ),
        dcind_manual_derivatives_flags: blend_field(
            &a.dcind_manual_derivatives_flags,
            &b.dcind_manual_derivatives_flags,
            ratio,
            Nearest,
        ),
        second_derivative_max_influence_radius_filtering: blend_field(
            &a.second_derivative_max_influence_radius_filtering,
            &b.second_derivative_max_influence_radius_filtering,
            ratio,
            Linear,
        ),
        second_derivative_max_influence_radius_dc_indication: blend_field(
            &a.second_derivative_max_influence_radius_dc_indication,
            &b.second_derivative_max_influence_radius_dc_indication,
            ratio,
            Linear,
        ),
    }
}

fn blend_pass(a: &Anr10PassRegion, b: &Anr10PassRegion, ratio: f32) -> Anr10PassRegion {
    use BlendKind::{Linear, Nearest};

    let (ak, bk) = (&a.luma_filter_kernel, &b.luma_filter_kernel);
    let (ag, bg) = (&a.grey_treatment, &b.grey_treatment);

    Anr10PassRegion {
        luma_chroma_filter_config: LumaChromaFilterConfig {
            threshold_lut_control_avg_block_size: blend_field(
                &a.luma_chroma_filter_config.threshold_lut_control_avg_block_size,
                &b.luma_chroma_filter_config.threshold_lut_control_avg_block_size,
                ratio,
                Nearest,
            ),
        },
        luma_filter_config: blend_filter(&a.luma_filter_config, &b.luma_filter_config, ratio),
        chroma_filter_config: blend_filter(&a.chroma_filter_config, &b.chroma_filter_config, ratio),
        luma_filter_kernel: LumaFilterKernel {
            edge_kernel_size: blend_field(
                &ak.edge_kernel_size,
                &bk.edge_kernel_size,
                ratio,
                Linear,
            ),
            automatic_definition_granularity: blend_field(
                &ak.automatic_definition_granularity,
                &bk.automatic_definition_granularity,
                ratio,
                Linear,
            ),
            manual_edge_kernel_1x1_center_coefficient: blend_field(
                &ak.manual_edge_kernel_1x1_center_coefficient,
                &bk.manual_edge_kernel_1x1_center_coefficient,
                ratio,
                Linear,
            ),
            manual_edge_kernel_3x3_horver_shift: blend_field(
                &ak.manual_edge_kernel_3x3_horver_shift,
                &bk.manual_edge_kernel_3x3_horver_shift,
                ratio,
                Linear,
            ),
            manual_edge_kernel_3x3_diag_shift: blend_field(
                &ak.manual_edge_kernel_3x3_diag_shift,
                &bk.manual_edge_kernel_3x3_diag_shift,
                ratio,
                Linear,
            ),
        },
        grey_treatment: GreyTreatment {
            enable_grey_treatment_dcblend2_chroma_modification: blend_field(
                &ag.enable_grey_treatment_dcblend2_chroma_modification,
                &bg.enable_grey_treatment_dcblend2_chroma_modification,
                ratio,
                Nearest,
            ),
            detect_grey_condition_chromaticity_radius: blend_field(
                &ag.detect_grey_condition_chromaticity_radius,
                &bg.detect_grey_condition_chromaticity_radius,
                ratio,
                Nearest,
            ),
            detect_grey_condition_chromaticity_thr_low: blend_field(
                &ag.detect_grey_condition_chromaticity_thr_low,
                &bg.detect_grey_condition_chromaticity_thr_low,
                ratio,
                Linear,
            ),
        },
    }
}

impl FieldBlend for Anr10Region {
    /// Output passes come out in pass order whatever order the inputs list them in.
    fn blend_fields(a: &Self, b: &Self, ratio: f32, out: &mut Self) -> Result<()> {
        if a.passes.len() != b.passes.len() {
            return Err(InterpolationError::FieldMismatch {
                field: "passes",
                left: a.passes.len(),
                right: b.passes.len(),
            });
        }

        out.passes.clear();
        for pass in Pass::ALL {
            match (a.pass(pass), b.pass(pass)) {
                (Some(first), Some(second)) => out.passes.push(Anr10PassData {
                    pass_trigger: pass,
                    region: blend_pass(first, second, ratio),
                }),
                (None, None) => {}
                _ => {
                    return Err(InterpolationError::malformed(format!(
                        "pass {pass:?} is present in only one of the blended records"
                    )));
                }
            }
        }
        Ok(())
    }
}

pub struct Anr10;

impl TuningBlock for Anr10 {
    type Calibration = Anr10Chromatix;
    type Node<'a> = Anr10Node<'a>;
    type Payload = Anr10Region;
    type Triggers = Anr10Triggers;
    type Snapshot = Anr10Snapshot;

    const ID: BlockId = BlockId::Anr10;
    const OPERATIONS: &'static [Operation] = &[
        Operation::new(Dimension::LensPosition, 2),
        Operation::new(Dimension::LensZoom, 2),
        Operation::new(Dimension::PostScaleRatio, 2),
        Operation::new(Dimension::PreScaleRatio, 2),
        Operation::new(Dimension::DrcGain, 2),
        Operation::new(Dimension::HdrAec, 2),
        Operation::new(Dimension::Aec, 2),
        Operation::new(Dimension::Cct, 2),
    ];

    fn root(calibration: &Self::Calibration) -> Anr10Node<'_> {
        Anr10Node::Core(&calibration.core)
    }

    fn search<'a>(
        operation: &Operation,
        parent: Anr10Node<'a>,
        t: &Anr10Triggers,
    ) -> Result<Branch<'a, Anr10Node<'a>, Anr10Region>>
    where
        Self: 'a,
    {
        let dim = operation.dimension;
        match (dim, parent) {
            (Dimension::LensPosition, Anr10Node::Core(core)) => bracket_branch(
                dim,
                &core.lens_position_data,
                t.lens_position,
                |entry| entry.trigger,
                |entry| Child::inner(Anr10Node::LensPosition(&entry.data)),
            ),
            (Dimension::LensZoom, Anr10Node::LensPosition(data)) => bracket_branch(
                dim,
                &data.lens_zoom_data,
                t.lens_zoom,
                |entry| entry.trigger,
                |entry| Child::inner(Anr10Node::LensZoom(&entry.data)),
            ),
            (Dimension::PostScaleRatio, Anr10Node::LensZoom(data)) => bracket_branch(
                dim,
                &data.post_scale_ratio_data,
                t.post_scale_ratio,
                |entry| entry.trigger,
                |entry| Child::inner(Anr10Node::PostScaleRatio(&entry.data)),
            ),
            (Dimension::PreScaleRatio, Anr10Node::PostScaleRatio(data)) => bracket_branch(
                dim,
                &data.pre_scale_ratio_data,
                t.pre_scale_ratio,
                |entry| entry.trigger,
                |entry| Child::inner(Anr10Node::PreScaleRatio(&entry.data)),
            ),
            (Dimension::DrcGain, Anr10Node::PreScaleRatio(data)) => bracket_branch(
                dim,
                &data.drc_gain_data,
                t.drc_gain,
                |entry| entry.trigger,
                |entry| Child::inner(Anr10Node::DrcGain(&entry.data)),
            ),
            (Dimension::HdrAec, Anr10Node::DrcGain(data)) => bracket_branch(
                dim,
                &data.hdr_aec_data,
                t.hdr_aec,
                |entry| entry.trigger.region(t.control.aec_hdr_control),
                |entry| Child::inner(Anr10Node::HdrAec(&entry.data)),
            ),
            (Dimension::Aec, Anr10Node::HdrAec(data)) => bracket_branch(
                dim,
                &data.aec_data,
                t.aec,
                |entry| entry.trigger.region(t.control.aec_exp_control),
                |entry| Child::inner(Anr10Node::Aec(&entry.data)),
            ),
            (Dimension::Cct, Anr10Node::Aec(data)) => bracket_branch(
                dim,
                &data.cct_data,
                t.cct,
                |entry| entry.trigger,
                |entry| Child::leaf(Anr10Node::Cct(entry), &entry.data),
            ),
            _ => Err(unexpected_node(Self::ID, operation)),
        }
    }

    fn update_snapshot(snapshot: &mut Anr10Snapshot, frame: &FrameTriggers, epsilon: f32) -> bool {
        refresh(snapshot, frame, epsilon)
    }

    fn triggers(calibration: &Anr10Chromatix, snapshot: &Anr10Snapshot) -> Anr10Triggers {
        let control = calibration.control_method;
        Anr10Triggers {
            control,
            lens_position: snapshot.lens_position,
            lens_zoom: snapshot.lens_zoom,
            post_scale_ratio: snapshot.post_scale_ratio,
            pre_scale_ratio: snapshot.pre_scale_ratio,
            drc_gain: snapshot.drc_gain,
            hdr_aec: snapshot.exposure.hdr_aec_trigger(&control),
            aec: snapshot.exposure.aec_trigger(&control),
            cct: snapshot.cct,
        }
    }

    fn dynamic_enable(calibration: &Anr10Chromatix) -> Option<&DynamicEnable> {
        calibration.dynamic_enable.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iq_interpolation::blend::blend_records;
    use crate::iq_interpolation::tree::node::TreeLayout;

    fn pass(pass_trigger: Pass, size: f32, flags: f32) -> Anr10PassData {
        let mut region = Anr10PassRegion::default();
        region.luma_filter_config.filter_isotropic_min_filter_size = size;
        region.luma_filter_config.filter_manual_derivatives_flags = flags;
        region.luma_filter_kernel.edge_kernel_size = size * 2.0;
        Anr10PassData { pass_trigger, region }
    }

    #[test]
    fn test_layout_sizing() {
        let layout = TreeLayout::from_operations(Anr10::OPERATIONS).unwrap();
        assert_eq!(layout.levels(), 9);
        assert_eq!(layout.node_count(), 511);
        assert_eq!(layout.non_leaf_count(), 255);
    }

    #[test]
    fn test_passes_match_by_trigger() {
        let a = Anr10Region {
            passes: vec![pass(Pass::Full, 2.0, 0.0), pass(Pass::Dc4, 4.0, 1.0)],
        };
        let b = Anr10Region {
            passes: vec![pass(Pass::Dc4, 8.0, 3.0), pass(Pass::Full, 6.0, 2.0)],
        };
        let mut out = Anr10Region::default();
        blend_records(&a, &b, 0.25, &mut out).unwrap();

        assert_eq!(out.passes.len(), 2);
        let full = out.pass(Pass::Full).unwrap();
        assert_eq!(full.luma_filter_config.filter_isotropic_min_filter_size, 3.0);
        assert_eq!(full.luma_filter_config.filter_manual_derivatives_flags, 0.0);
        assert_eq!(full.luma_filter_kernel.edge_kernel_size, 6.0);
        let dc4 = out.pass(Pass::Dc4).unwrap();
        assert_eq!(dc4.luma_filter_config.filter_isotropic_min_filter_size, 5.0);
        assert_eq!(dc4.luma_filter_config.filter_manual_derivatives_flags, 1.0);
    }

    #[test]
    fn test_nearest_fields_switch_at_half() {
        let a = Anr10Region {
            passes: vec![pass(Pass::Full, 2.0, 0.0)],
        };
        let b = Anr10Region {
            passes: vec![pass(Pass::Full, 6.0, 2.0)],
        };
        let mut out = Anr10Region::default();
        blend_records(&a, &b, 0.5, &mut out).unwrap();
        let full = out.pass(Pass::Full).unwrap();
        assert_eq!(full.luma_filter_config.filter_manual_derivatives_flags, 2.0);
        assert_eq!(full.luma_filter_config.filter_isotropic_min_filter_size, 4.0);
    }

    #[test]
    fn test_mismatched_passes_fail() {
        let a = Anr10Region {
            passes: vec![pass(Pass::Full, 2.0, 0.0)],
        };
        let b = Anr10Region {
            passes: vec![pass(Pass::Dc16, 6.0, 2.0)],
        };
        let mut out = Anr10Region::default();
        assert!(matches!(
            blend_records(&a, &b, 0.5, &mut out),
            Err(InterpolationError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_lens_change_marks_dirty() {
        let mut snapshot = Anr10Snapshot::default();
        let mut frame = FrameTriggers {
            lens_position: 10.0,
            ..FrameTriggers::default()
        };
        assert!(Anr10::update_snapshot(&mut snapshot, &frame, 1e-9));
        assert!(!Anr10::update_snapshot(&mut snapshot, &frame, 1e-9));
        frame.pre_scale_ratio = 1.5;
        assert!(Anr10::update_snapshot(&mut snapshot, &frame, 1e-9));
    }
}
