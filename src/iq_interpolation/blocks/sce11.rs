//! SCE 1.1 skin colour enhancement: AEC then CCT.

use serde::{Deserialize, Serialize};

use crate::iq_interpolation::blend::{BlendKind, FieldBlend, blend_field};
use crate::iq_interpolation::block::{
    BlockId, Branch, Child, Dimension, Operation, TriggeredEntry, TuningBlock, bracket_branch,
    unexpected_node,
};
use crate::iq_interpolation::blocks::{Latched, refresh};
use crate::iq_interpolation::common::error::Result;
use crate::iq_interpolation::common::numeric::{approx_eq, lerp};
use crate::iq_interpolation::tree::bracket::TriggerRegion;
use crate::iq_interpolation::triggers::{AecTrigger, ControlMethod, FrameTriggers};

/// Three `(x, y)` vertices.
pub type Triangle = [[i32; 2]; 3];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sce11Region {
    pub shift_vector_cb: f32,
    pub shift_vector_cr: f32,
    pub ori_triangle: [Triangle; 5],
    pub target_triangle: [Triangle; 5],
}

pub type Sce11CctEntry = TriggeredEntry<TriggerRegion, Sce11Region>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sce11AecData {
    pub cct_data: Vec<Sce11CctEntry>,
}

pub type Sce11AecEntry = TriggeredEntry<AecTrigger, Sce11AecData>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sce11Core {
    pub aec_data: Vec<Sce11AecEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sce11Chromatix {
    pub control_method: ControlMethod,
    pub core: Sce11Core,
}

#[derive(Debug, Clone, Copy)]
pub enum Sce11Node<'a> {
    Core(&'a Sce11Core),
    Aec(&'a Sce11AecData),
    Cct(&'a Sce11CctEntry),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sce11Triggers {
    pub control: ControlMethod,
    pub aec: f32,
    pub cct: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sce11Snapshot {
    pub lux_index: f32,
    pub gain: f32,
    pub cct: f32,
}

impl Latched for Sce11Snapshot {
    fn capture(frame: &FrameTriggers) -> Self {
        Self {
            lux_index: frame.aec_lux_index,
            gain: frame.aec_gain,
            cct: frame.awb_color_temperature,
        }
    }

    fn matches(&self, other: &Self, epsilon: f32) -> bool {
        approx_eq(self.lux_index, other.lux_index, epsilon)
            && approx_eq(self.gain, other.gain, epsilon)
            && approx_eq(self.cct, other.cct, epsilon)
    }
}

/// Vertices are interpolated as floats, rounded, and kept non-negative.
fn blend_triangles(a: &[Triangle; 5], b: &[Triangle; 5], ratio: f32) -> [Triangle; 5] {
    std::array::from_fn(|t| {
        std::array::from_fn(|p| {
            std::array::from_fn(|c| {
                lerp(a[t][p][c] as f32, b[t][p][c] as f32, ratio).round().abs() as i32
            })
        })
    })
}

impl FieldBlend for Sce11Region {
    fn blend_fields(a: &Self, b: &Self, ratio: f32, out: &mut Self) -> Result<()> {
        out.shift_vector_cb =
            blend_field(&a.shift_vector_cb, &b.shift_vector_cb, ratio, BlendKind::Linear);
        out.shift_vector_cr =
            blend_field(&a.shift_vector_cr, &b.shift_vector_cr, ratio, BlendKind::Linear);
        out.ori_triangle = blend_triangles(&a.ori_triangle, &b.ori_triangle, ratio);
        out.target_triangle = blend_triangles(&a.target_triangle, &b.target_triangle, ratio);
        Ok(())
    }
}

pub struct Sce11;

impl TuningBlock for Sce11 {
    type Calibration = Sce11Chromatix;
    type Node<'a> = Sce11Node<'a>;
    type Payload = Sce11Region;
    type Triggers = Sce11Triggers;
    type Snapshot = Sce11Snapshot;

    const ID: BlockId = BlockId::Sce11;
    const OPERATIONS: &'static [Operation] =
        &[Operation::new(Dimension::Aec, 2), Operation::new(Dimension::Cct, 2)];

    fn root(calibration: &Self::Calibration) -> Sce11Node<'_> {
        Sce11Node::Core(&calibration.core)
    }

    fn search<'a>(
        operation: &Operation,
        parent: Sce11Node<'a>,
        triggers: &Sce11Triggers,
    ) -> Result<Branch<'a, Sce11Node<'a>, Sce11Region>>
    where
        Self: 'a,
    {
        match (operation.dimension, parent) {
            (Dimension::Aec, Sce11Node::Core(core)) => bracket_branch(
                operation.dimension,
                &core.aec_data,
                triggers.aec,
                |entry| entry.trigger.region(triggers.control.aec_exp_control),
                |entry| Child::inner(Sce11Node::Aec(&entry.data)),
            ),
            (Dimension::Cct, Sce11Node::Aec(aec)) => bracket_branch(
                operation.dimension,
                &aec.cct_data,
                triggers.cct,
                |entry| entry.trigger,
                |entry| Child::leaf(Sce11Node::Cct(entry), &entry.data),
            ),
            _ => Err(unexpected_node(Self::ID, operation)),
        }
    }

    fn update_snapshot(snapshot: &mut Sce11Snapshot, frame: &FrameTriggers, epsilon: f32) -> bool {
        refresh(snapshot, frame, epsilon)
    }

    fn triggers(calibration: &Sce11Chromatix, snapshot: &Sce11Snapshot) -> Sce11Triggers {
        let control = calibration.control_method;
        Sce11Triggers {
            control,
            aec: control.aec_trigger(snapshot.lux_index, snapshot.gain),
            cct: snapshot.cct,
        }
    }
}
