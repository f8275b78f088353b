//! Per-block specialization seam.
//!
//! A hardware block declares its trigger dimensions in order (the operation table), how
//! to find the children of a node at each dimension, how its leaf payload blends, and
//! which frame triggers its dirty check watches. The tree engine is generic over this
//! trait and never looks inside the calibration records itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;

use crate::iq_interpolation::blend::FieldBlend;
use crate::iq_interpolation::common::error::{InterpolationError, Result};
use crate::iq_interpolation::tree::bracket::{self, Bracket, TriggerRegion};
use crate::iq_interpolation::tree::node::{MAX_CHILDREN, MAX_RATIOS};
use crate::iq_interpolation::triggers::{DynamicEnable, FrameTriggers};

/// Most regions a single calibration level is expected to carry.
pub const MAX_REGIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockId {
    Sce11,
    Gtm10,
    Pedestal13,
    Anr10,
}

impl BlockId {
    pub const ALL: [BlockId; 4] =
        [BlockId::Sce11, BlockId::Gtm10, BlockId::Pedestal13, BlockId::Anr10];

    pub fn name(&self) -> &'static str {
        match self {
            BlockId::Sce11 => "sce11",
            BlockId::Gtm10 => "gtm10",
            BlockId::Pedestal13 => "pedestal13",
            BlockId::Anr10 => "anr10",
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Trigger dimension searched at one tree level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    LensPosition,
    LensZoom,
    PostScaleRatio,
    PreScaleRatio,
    DrcGain,
    HdrAec,
    Led,
    Aec,
    Cct,
}

/// One entry of a block's operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub dimension: Dimension,
    pub max_children: usize,
}

impl Operation {
    pub const fn new(dimension: Dimension, max_children: usize) -> Self {
        Self {
            dimension,
            max_children,
        }
    }
}

/// Calibration entry keyed by a trigger region of some shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggeredEntry<R, T> {
    pub trigger: R,
    pub data: T,
}

/// A child produced by a search: the calibration handle for the next level and, at the
/// last dimension, the leaf payload it carries.
#[derive(Debug)]
pub struct Child<'a, C, P> {
    pub calibration: C,
    pub payload: Option<&'a P>,
}

impl<'a, C, P> Child<'a, C, P> {
    pub fn inner(calibration: C) -> Self {
        Self {
            calibration,
            payload: None,
        }
    }

    pub fn leaf(calibration: C, payload: &'a P) -> Self {
        Self {
            calibration,
            payload: Some(payload),
        }
    }
}

/// Result of searching one node: up to three children and their blend ratios.
#[derive(Debug)]
pub struct Branch<'a, C, P> {
    children: SmallVec<[Child<'a, C, P>; MAX_CHILDREN]>,
    ratios: [f32; MAX_RATIOS],
}

impl<'a, C, P> Branch<'a, C, P> {
    pub fn new() -> Self {
        Self {
            children: SmallVec::new(),
            ratios: [0.0; MAX_RATIOS],
        }
    }

    /// Builds the one or two children a bracket selects.
    pub fn from_bracket<F>(bracket: Bracket, mut child: F) -> Result<Self>
    where
        F: FnMut(usize) -> Option<Child<'a, C, P>>,
    {
        let mut branch = Self::new();
        branch.ratios[0] = bracket.ratio;
        branch.push(bracket.start_index, &mut child)?;
        if !bracket.is_exact() {
            branch.push(bracket.end_index, &mut child)?;
        }
        Ok(branch)
    }

    fn push<F>(&mut self, index: usize, child: &mut F) -> Result<()>
    where
        F: FnMut(usize) -> Option<Child<'a, C, P>>,
    {
        let child = child(index).ok_or_else(|| {
            InterpolationError::malformed(format!("calibration entry {index} does not exist"))
        })?;
        self.children.push(child);
        Ok(())
    }

    /// Appends a child blended against everything already in the branch.
    ///
    /// The ratio lands in the last populated slot: slot 0 after a single bracket child,
    /// slot 1 after two.
    pub fn push_blended(&mut self, child: Child<'a, C, P>, ratio: f32) -> Result<()> {
        let populated = self.children.len();
        if populated == 0 || populated >= MAX_CHILDREN {
            return Err(InterpolationError::malformed(format!(
                "cannot blend an extra source into a branch of {populated} children"
            )));
        }
        self.ratios[populated - 1] = ratio;
        self.children.push(child);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn ratios(&self) -> [f32; MAX_RATIOS] {
        self.ratios
    }

    pub fn children(&self) -> &[Child<'a, C, P>] {
        &self.children
    }

    pub(crate) fn into_parts(
        self,
    ) -> (SmallVec<[Child<'a, C, P>; MAX_CHILDREN]>, [f32; MAX_RATIOS]) {
        (self.children, self.ratios)
    }
}

impl<C, P> Default for Branch<'_, C, P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Brackets `value` against the regions of `entries` and emits the selected children.
///
/// An unresolved search falls back to the first entry; an empty entry list is malformed.
pub fn bracket_branch<'a, E, C, P, R, F>(
    dimension: Dimension,
    entries: &'a [E],
    value: f32,
    region: R,
    mut child: F,
) -> Result<Branch<'a, C, P>>
where
    R: Fn(&E) -> TriggerRegion,
    F: FnMut(&'a E) -> Child<'a, C, P>,
{
    if entries.is_empty() {
        return Err(InterpolationError::malformed(format!("{dimension:?} table has no entries")));
    }

    let regions: SmallVec<[TriggerRegion; MAX_REGIONS]> = entries.iter().map(region).collect();
    let bracket = bracket::search(&regions, value).unwrap_or_else(|| {
        warn!(
            ?dimension,
            value,
            regions = regions.len(),
            "Trigger did not resolve, using first region"
        );
        Bracket::FIRST
    });

    Branch::from_bracket(bracket, |index| entries.get(index).map(&mut child))
}

/// A hardware block's interpolation specialization.
pub trait TuningBlock: 'static {
    /// Root of the block's calibration table.
    type Calibration: 'static;
    /// Borrowed handle to a calibration record at some tree level.
    type Node<'a>: Copy
    where
        Self: 'a;
    /// Leaf record blended by the reducer.
    type Payload: FieldBlend + Clone + Default + 'static;
    /// Per-frame trigger values consumed by the child searches.
    type Triggers;
    /// Trigger values remembered across frames by the dirty check.
    type Snapshot: Default + Clone + 'static;

    const ID: BlockId;
    const OPERATIONS: &'static [Operation];

    fn root(calibration: &Self::Calibration) -> Self::Node<'_>;

    /// Finds the children of `parent` along `operation`'s dimension.
    fn search<'a>(
        operation: &Operation,
        parent: Self::Node<'a>,
        triggers: &Self::Triggers,
    ) -> Result<Branch<'a, Self::Node<'a>, Self::Payload>>
    where
        Self: 'a;

    /// Compares `frame` against `snapshot`; on change refreshes the snapshot and returns true.
    fn update_snapshot(snapshot: &mut Self::Snapshot, frame: &FrameTriggers, epsilon: f32) -> bool;

    /// Derives this frame's trigger list from the snapshot and the calibration's control methods.
    fn triggers(calibration: &Self::Calibration, snapshot: &Self::Snapshot) -> Self::Triggers;

    /// Hysteresis switch for blocks that turn themselves off under some trigger range.
    fn dynamic_enable(_calibration: &Self::Calibration) -> Option<&DynamicEnable> {
        None
    }
}

/// Error for a node handle arriving at a dimension it does not belong to.
pub(crate) fn unexpected_node(block: BlockId, operation: &Operation) -> InterpolationError {
    InterpolationError::malformed(format!(
        "{block}: calibration handle does not match dimension {:?}",
        operation.dimension
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<TriggeredEntry<TriggerRegion, f32>> {
        vec![
            TriggeredEntry { trigger: TriggerRegion::new(0.0, 10.0), data: 1.0 },
            TriggeredEntry { trigger: TriggerRegion::new(20.0, 30.0), data: 2.0 },
        ]
    }

    fn leaf(entry: &TriggeredEntry<TriggerRegion, f32>) -> Child<'_, usize, f32> {
        Child::leaf(0, &entry.data)
    }

    #[test]
    fn test_bracket_branch_gap() {
        let entries = entries();
        let branch = bracket_branch(Dimension::Cct, &entries, 15.0, |e| e.trigger, leaf).unwrap();
        assert_eq!(branch.len(), 2);
        assert_eq!(branch.ratios()[0], 0.5);
        assert_eq!(branch.children()[1].payload, Some(&2.0));
    }

    #[test]
    fn test_bracket_branch_exact() {
        let entries = entries();
        let branch = bracket_branch(Dimension::Cct, &entries, 25.0, |e| e.trigger, leaf).unwrap();
        assert_eq!(branch.len(), 1);
        assert_eq!(branch.children()[0].payload, Some(&2.0));
    }

    #[test]
    fn test_bracket_branch_nan_uses_first() {
        let entries = entries();
        let branch =
            bracket_branch(Dimension::Cct, &entries, f32::NAN, |e| e.trigger, leaf).unwrap();
        assert_eq!(branch.len(), 1);
        assert_eq!(branch.children()[0].payload, Some(&1.0));
    }

    #[test]
    fn test_bracket_branch_empty_is_malformed() {
        let entries: Vec<TriggeredEntry<TriggerRegion, f32>> = Vec::new();
        let result = bracket_branch(Dimension::Cct, &entries, 1.0, |e| e.trigger, leaf);
        assert!(matches!(result, Err(InterpolationError::MalformedInput(_))));
    }

    #[test]
    fn test_push_blended_ratio_slot() {
        let a = 1.0f32;
        let mut single: Branch<'_, usize, f32> = Branch::new();
        single.children.push(Child::leaf(0, &a));
        single.push_blended(Child::leaf(1, &a), 0.3).unwrap();
        assert_eq!(single.ratios(), [0.3, 0.0]);

        let bracket = Bracket { start_index: 0, end_index: 1, ratio: 0.6 };
        let mut pair: Branch<'_, usize, f32> =
            Branch::from_bracket(bracket, |i| Some(Child::leaf(i, &a))).unwrap();
        pair.push_blended(Child::leaf(2, &a), 0.25).unwrap();
        assert_eq!(pair.len(), 3);
        assert_eq!(pair.ratios(), [0.6, 0.25]);
        assert!(pair.push_blended(Child::leaf(3, &a), 0.1).is_err());
    }
}
