//! Pedestal 1.3 black-level correction.
//!
//! Five dimensions: DRC gain, HDR-AEC, LED, AEC, CCT. The LED dimension is not a
//! region search: its entries are indexed by flash state, and with two LEDs a third
//! entry is mixed in with the externally supplied first-entry ratio.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::iq_interpolation::blend::{BlendKind, FieldBlend, blend_table};
use crate::iq_interpolation::block::{
    BlockId, Branch, Child, Dimension, Operation, TriggeredEntry, TuningBlock, bracket_branch,
    unexpected_node,
};
use crate::iq_interpolation::blocks::{ExposureSnapshot, Latched, refresh};
use crate::iq_interpolation::common::error::{InterpolationError, Result};
use crate::iq_interpolation::common::numeric::{approx_eq, interpolation_ratio};
use crate::iq_interpolation::tree::bracket::{Bracket, TriggerRegion};
use crate::iq_interpolation::triggers::{AecTrigger, ControlMethod, FrameTriggers, HdrAecTrigger};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedestal13Region {
    pub channel_black_level_r: Vec<f32>,
    pub channel_black_level_gr: Vec<f32>,
    pub channel_black_level_gb: Vec<f32>,
    pub channel_black_level_b: Vec<f32>,
}

pub type Pedestal13CctEntry = TriggeredEntry<TriggerRegion, Pedestal13Region>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedestal13AecData {
    pub cct_data: Vec<Pedestal13CctEntry>,
}

pub type Pedestal13AecEntry = TriggeredEntry<AecTrigger, Pedestal13AecData>;

/// Calibration for one LED state: 0 is flash off, 1 is the first LED, 2 the second.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedestal13LedData {
    pub aec_data: Vec<Pedestal13AecEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedestal13HdrAecData {
    pub led_idx_data: Vec<Pedestal13LedData>,
}

pub type Pedestal13HdrAecEntry = TriggeredEntry<HdrAecTrigger, Pedestal13HdrAecData>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedestal13DrcGainData {
    pub hdr_aec_data: Vec<Pedestal13HdrAecEntry>,
}

pub type Pedestal13DrcGainEntry = TriggeredEntry<TriggerRegion, Pedestal13DrcGainData>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedestal13Core {
    pub drc_gain_data: Vec<Pedestal13DrcGainEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedestal13PrivateInformation {
    /// LED sensitivity span over which flash-off blends into the first LED entry.
    pub led_sensitivity_trigger: TriggerRegion,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedestal13Chromatix {
    pub control_method: ControlMethod,
    pub private_information: Pedestal13PrivateInformation,
    pub core: Pedestal13Core,
}

#[derive(Debug, Clone, Copy)]
pub enum Pedestal13Node<'a> {
    Core(&'a Pedestal13Core),
    DrcGain(&'a Pedestal13DrcGainData),
    HdrAec(&'a Pedestal13HdrAecData),
    Led(&'a Pedestal13LedData),
    Aec(&'a Pedestal13AecData),
    Cct(&'a Pedestal13CctEntry),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pedestal13Triggers {
    pub control: ControlMethod,
    pub drc_gain: f32,
    pub hdr_aec: f32,
    pub led: f32,
    pub aec: f32,
    pub cct: f32,
    pub number_of_led: u32,
    pub led_first_entry_ratio: f32,
    pub led_sensitivity_trigger: TriggerRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pedestal13Snapshot {
    pub exposure: ExposureSnapshot,
    pub cct: f32,
    pub drc_gain: f32,
    pub led_first_entry_ratio: f32,
    pub image_width: u32,
    pub image_height: u32,
    pub led_sensitivity: i32,
    pub number_of_led: u32,
}

impl Latched for Pedestal13Snapshot {
    fn capture(frame: &FrameTriggers) -> Self {
        Self {
            exposure: ExposureSnapshot::capture(frame),
            cct: frame.awb_color_temperature,
            drc_gain: frame.drc_gain,
            led_first_entry_ratio: frame.led_first_entry_ratio,
            image_width: frame.sensor_image_width,
            image_height: frame.sensor_image_height,
            led_sensitivity: frame.led_sensitivity,
            number_of_led: frame.number_of_led,
        }
    }

    fn matches(&self, other: &Self, epsilon: f32) -> bool {
        self.exposure.matches(&other.exposure, epsilon)
            && approx_eq(self.cct, other.cct, epsilon)
            && approx_eq(self.drc_gain, other.drc_gain, epsilon)
            && approx_eq(self.led_first_entry_ratio, other.led_first_entry_ratio, epsilon)
            && self.image_width == other.image_width
            && self.image_height == other.image_height
            && self.led_sensitivity == other.led_sensitivity
            && self.number_of_led == other.number_of_led
    }
}

impl FieldBlend for Pedestal13Region {
    fn blend_fields(a: &Self, b: &Self, ratio: f32, out: &mut Self) -> Result<()> {
        blend_table(
            "channel_black_level_r",
            &a.channel_black_level_r,
            &b.channel_black_level_r,
            ratio,
            BlendKind::Linear,
            &mut out.channel_black_level_r,
        )?;
        blend_table(
            "channel_black_level_gr",
            &a.channel_black_level_gr,
            &b.channel_black_level_gr,
            ratio,
            BlendKind::Linear,
            &mut out.channel_black_level_gr,
        )?;
        blend_table(
            "channel_black_level_gb",
            &a.channel_black_level_gb,
            &b.channel_black_level_gb,
            ratio,
            BlendKind::Linear,
            &mut out.channel_black_level_gb,
        )?;
        blend_table(
            "channel_black_level_b",
            &a.channel_black_level_b,
            &b.channel_black_level_b,
            ratio,
            BlendKind::Linear,
            &mut out.channel_black_level_b,
        )
    }
}

/// Selects the LED entries for this frame.
///
/// No LED, or a table with a single entry, uses entry 0. One or two LEDs bracket entries
/// 0 and 1 over the LED sensitivity span. Two LEDs with a non-zero first-entry ratio add
/// entry 2, weighted against what was already selected by `1 - ratio`.
fn led_branch<'a>(
    hdr: &'a Pedestal13HdrAecData,
    triggers: &Pedestal13Triggers,
) -> Result<Branch<'a, Pedestal13Node<'a>, Pedestal13Region>> {
    let entries = &hdr.led_idx_data;
    let Some(last) = entries.len().checked_sub(1) else {
        return Err(InterpolationError::malformed("LED table has no entries"));
    };

    let mut second_source_ratio = 0.0;
    let bracket = if triggers.number_of_led == 0 || entries.len() == 1 {
        Bracket::FIRST
    } else if matches!(triggers.number_of_led, 1 | 2) {
        if triggers.number_of_led == 2 {
            second_source_ratio = triggers.led_first_entry_ratio;
        }
        let span = triggers.led_sensitivity_trigger;
        if triggers.led >= span.end {
            Bracket::exact(1)
        } else if triggers.led <= span.start {
            Bracket::FIRST
        } else {
            Bracket {
                start_index: 0,
                end_index: 1,
                ratio: interpolation_ratio(triggers.led, span.start, span.end),
            }
        }
    } else {
        warn!(
            number_of_led = triggers.number_of_led,
            "Unsupported LED count, treating flash as off"
        );
        Bracket::FIRST
    };

    let bracket = Bracket {
        start_index: bracket.start_index.min(last),
        end_index: bracket.end_index.min(last),
        ..bracket
    };

    let mut branch = Branch::from_bracket(bracket, |index| {
        entries.get(index).map(|entry| Child::inner(Pedestal13Node::Led(entry)))
    })?;

    if second_source_ratio != 0.0 {
        if let Some(third) = entries.get(2) {
            let third = Child::inner(Pedestal13Node::Led(third));
            branch.push_blended(third, 1.0 - second_source_ratio)?;
        }
    }

    Ok(branch)
}

pub struct Pedestal13;

impl TuningBlock for Pedestal13 {
    type Calibration = Pedestal13Chromatix;
    type Node<'a> = Pedestal13Node<'a>;
    type Payload = Pedestal13Region;
    type Triggers = Pedestal13Triggers;
    type Snapshot = Pedestal13Snapshot;

    const ID: BlockId = BlockId::Pedestal13;
    const OPERATIONS: &'static [Operation] = &[
        Operation::new(Dimension::DrcGain, 2),
        Operation::new(Dimension::HdrAec, 2),
        Operation::new(Dimension::Led, 3),
        Operation::new(Dimension::Aec, 2),
        Operation::new(Dimension::Cct, 2),
    ];

    fn root(calibration: &Self::Calibration) -> Pedestal13Node<'_> {
        Pedestal13Node::Core(&calibration.core)
    }

    fn search<'a>(
        operation: &Operation,
        parent: Pedestal13Node<'a>,
        triggers: &Pedestal13Triggers,
    ) -> Result<Branch<'a, Pedestal13Node<'a>, Pedestal13Region>>
    where
        Self: 'a,
    {
        let dimension = operation.dimension;
        match (dimension, parent) {
            (Dimension::DrcGain, Pedestal13Node::Core(core)) => bracket_branch(
                dimension,
                &core.drc_gain_data,
                triggers.drc_gain,
                |entry| entry.trigger,
                |entry| Child::inner(Pedestal13Node::DrcGain(&entry.data)),
            ),
            (Dimension::HdrAec, Pedestal13Node::DrcGain(drc)) => bracket_branch(
                dimension,
                &drc.hdr_aec_data,
                triggers.hdr_aec,
                |entry| entry.trigger.region(triggers.control.aec_hdr_control),
                |entry| Child::inner(Pedestal13Node::HdrAec(&entry.data)),
            ),
            (Dimension::Led, Pedestal13Node::HdrAec(hdr)) => led_branch(hdr, triggers),
            (Dimension::Aec, Pedestal13Node::Led(led)) => bracket_branch(
                dimension,
                &led.aec_data,
                triggers.aec,
                |entry| entry.trigger.region(triggers.control.aec_exp_control),
                |entry| Child::inner(Pedestal13Node::Aec(&entry.data)),
            ),
            (Dimension::Cct, Pedestal13Node::Aec(aec)) => bracket_branch(
                dimension,
                &aec.cct_data,
                triggers.cct,
                |entry| entry.trigger,
                |entry| Child::leaf(Pedestal13Node::Cct(entry), &entry.data),
            ),
            _ => Err(unexpected_node(Self::ID, operation)),
        }
    }

    fn update_snapshot(
        snapshot: &mut Pedestal13Snapshot,
        frame: &FrameTriggers,
        epsilon: f32,
    ) -> bool {
        refresh(snapshot, frame, epsilon)
    }

    fn triggers(
        calibration: &Pedestal13Chromatix,
        snapshot: &Pedestal13Snapshot,
    ) -> Pedestal13Triggers {
        let control = calibration.control_method;
        Pedestal13Triggers {
            control,
            drc_gain: snapshot.drc_gain,
            hdr_aec: snapshot.exposure.hdr_aec_trigger(&control),
            led: snapshot.led_sensitivity as f32,
            aec: snapshot.exposure.aec_trigger(&control),
            cct: snapshot.cct,
            number_of_led: snapshot.number_of_led,
            led_first_entry_ratio: snapshot.led_first_entry_ratio,
            led_sensitivity_trigger: calibration.private_information.led_sensitivity_trigger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iq_interpolation::tree::node::TreeLayout;

    fn hdr(entries: usize) -> Pedestal13HdrAecData {
        Pedestal13HdrAecData {
            led_idx_data: (0..entries).map(|_| Pedestal13LedData::default()).collect(),
        }
    }

    fn triggers(number_of_led: u32, led: f32, led_first_entry_ratio: f32) -> Pedestal13Triggers {
        Pedestal13Triggers {
            control: ControlMethod::default(),
            drc_gain: 1.0,
            hdr_aec: 1.0,
            led,
            aec: 100.0,
            cct: 5000.0,
            number_of_led,
            led_first_entry_ratio,
            led_sensitivity_trigger: TriggerRegion::new(100.0, 200.0),
        }
    }

    /// Indices of the LED entries a branch selected.
    fn selected(
        hdr: &Pedestal13HdrAecData,
        branch: &Branch<'_, Pedestal13Node<'_>, Pedestal13Region>,
    ) -> Vec<usize> {
        branch
            .children()
            .iter()
            .map(|child| match child.calibration {
                Pedestal13Node::Led(led) => hdr
                    .led_idx_data
                    .iter()
                    .position(|entry| std::ptr::eq(entry, led))
                    .unwrap(),
                other => panic!("unexpected node {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_layout_sizing() {
        let layout = TreeLayout::from_operations(Pedestal13::OPERATIONS).unwrap();
        assert_eq!(layout.node_count(), 91);
        assert_eq!(layout.non_leaf_count(), 43);
    }

    #[test]
    fn test_flash_off_uses_first_entry() {
        let hdr = hdr(3);
        let branch = led_branch(&hdr, &triggers(0, 500.0, 0.5)).unwrap();
        assert_eq!(selected(&hdr, &branch), vec![0]);

        let single = self::hdr(1);
        let branch = led_branch(&single, &triggers(2, 500.0, 0.5)).unwrap();
        assert_eq!(selected(&single, &branch), vec![0]);
    }

    #[test]
    fn test_single_led_brackets_sensitivity() {
        let hdr = hdr(3);

        let branch = led_branch(&hdr, &triggers(1, 150.0, 0.0)).unwrap();
        assert_eq!(selected(&hdr, &branch), vec![0, 1]);
        assert_eq!(branch.ratios(), [0.5, 0.0]);

        let branch = led_branch(&hdr, &triggers(1, 200.0, 0.0)).unwrap();
        assert_eq!(selected(&hdr, &branch), vec![1]);

        let branch = led_branch(&hdr, &triggers(1, 100.0, 0.0)).unwrap();
        assert_eq!(selected(&hdr, &branch), vec![0]);
    }

    #[test]
    fn test_dual_led_adds_third_source() {
        let hdr = hdr(3);

        let branch = led_branch(&hdr, &triggers(2, 125.0, 0.25)).unwrap();
        assert_eq!(selected(&hdr, &branch), vec![0, 1, 2]);
        assert_eq!(branch.ratios(), [0.25, 0.75]);

        let branch = led_branch(&hdr, &triggers(2, 250.0, 0.25)).unwrap();
        assert_eq!(selected(&hdr, &branch), vec![1, 2]);
        assert_eq!(branch.ratios(), [0.75, 0.0]);
    }

    #[test]
    fn test_dual_led_without_third_entry() {
        let hdr = hdr(2);
        let branch = led_branch(&hdr, &triggers(2, 150.0, 0.25)).unwrap();
        assert_eq!(selected(&hdr, &branch), vec![0, 1]);
        assert_eq!(branch.ratios(), [0.5, 0.0]);
    }

    #[test]
    fn test_unsupported_led_count_is_flash_off() {
        let hdr = hdr(3);
        let branch = led_branch(&hdr, &triggers(4, 250.0, 0.25)).unwrap();
        assert_eq!(selected(&hdr, &branch), vec![0]);
    }

    #[test]
    fn test_empty_led_table_is_malformed() {
        let hdr = hdr(0);
        assert!(matches!(
            led_branch(&hdr, &triggers(1, 150.0, 0.0)),
            Err(InterpolationError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_integer_triggers_compare_exactly() {
        let mut snapshot = Pedestal13Snapshot::default();
        let mut frame = FrameTriggers {
            sensor_image_width: 4000,
            sensor_image_height: 3000,
            ..FrameTriggers::default()
        };
        assert!(Pedestal13::update_snapshot(&mut snapshot, &frame, 1e-9));
        assert!(!Pedestal13::update_snapshot(&mut snapshot, &frame, 1e-9));

        frame.led_sensitivity = 1;
        assert!(Pedestal13::update_snapshot(&mut snapshot, &frame, 1e-9));
        frame.number_of_led = 2;
        assert!(Pedestal13::update_snapshot(&mut snapshot, &frame, 1e-9));
        assert_eq!(snapshot.number_of_led, 2);
    }
}
