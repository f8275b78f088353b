//! Flat, index-addressed storage for one interpolation tree.
//!
//! Level `k` of the tree occupies a contiguous run of slots whose width is the product
//! of the maximum fan-out of every level above it. Non-leaf slots come first and each
//! owns one scratch payload; leaf slots borrow their payload from the calibration table.

use crate::iq_interpolation::block::Operation;
use crate::iq_interpolation::common::error::{InterpolationError, Result};

/// Most children a node can have (two bracket neighbours plus one blended source).
pub const MAX_CHILDREN: usize = 3;

/// Ratio slots per node.
pub const MAX_RATIOS: usize = MAX_CHILDREN - 1;

/// Where a node's payload lives.
#[derive(Debug)]
pub enum PayloadSlot<'a, P> {
    Empty,
    /// Borrowed straight from the calibration table.
    Calibration(&'a P),
    /// Index into the node store's scratch buffers.
    Scratch(usize),
}

impl<P> Clone for PayloadSlot<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PayloadSlot<'_, P> {}

#[derive(Debug)]
pub struct TuningNode<'a, C, P> {
    pub level: usize,
    pub is_valid: bool,
    pub num_children: usize,
    pub calibration: Option<C>,
    pub payload: PayloadSlot<'a, P>,
    pub children: [usize; MAX_CHILDREN],
    pub ratios: [f32; MAX_RATIOS],
}

impl<'a, C, P> TuningNode<'a, C, P> {
    fn empty(payload: PayloadSlot<'a, P>) -> Self {
        Self {
            level: 0,
            is_valid: false,
            num_children: 0,
            calibration: None,
            payload,
            children: [0; MAX_CHILDREN],
            ratios: [0.0; MAX_RATIOS],
        }
    }
}

/// Static sizing of a block's tree, derived from its operation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLayout {
    level_offsets: Vec<usize>,
    level_widths: Vec<usize>,
    max_children: Vec<usize>,
    node_count: usize,
    non_leaf_count: usize,
}

impl TreeLayout {
    pub fn from_operations(operations: &[Operation]) -> Result<Self> {
        if operations.is_empty() {
            return Err(InterpolationError::malformed("operation table is empty"));
        }

        let mut level_offsets = Vec::with_capacity(operations.len() + 1);
        let mut level_widths = Vec::with_capacity(operations.len() + 1);
        let mut max_children = Vec::with_capacity(operations.len());
        let mut width = 1usize;
        let mut offset = 0usize;

        for operation in operations {
            if operation.max_children == 0 || operation.max_children > MAX_CHILDREN {
                return Err(InterpolationError::malformed(format!(
                    "{:?} declares {} children per node",
                    operation.dimension, operation.max_children
                )));
            }
            level_offsets.push(offset);
            level_widths.push(width);
            max_children.push(operation.max_children);
            offset += width;
            width *= operation.max_children;
        }

        let non_leaf_count = offset;
        level_offsets.push(offset);
        level_widths.push(width);

        Ok(Self {
            level_offsets,
            level_widths,
            max_children,
            node_count: non_leaf_count + width,
            non_leaf_count,
        })
    }

    /// Number of tree levels, root included.
    pub fn levels(&self) -> usize {
        self.level_widths.len()
    }

    pub fn leaf_level(&self) -> usize {
        self.levels() - 1
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn non_leaf_count(&self) -> usize {
        self.non_leaf_count
    }

    pub fn level_offset(&self, level: usize) -> usize {
        self.level_offsets[level]
    }

    pub fn level_width(&self, level: usize) -> usize {
        self.level_widths[level]
    }

    pub fn max_children(&self, level: usize) -> usize {
        self.max_children[level]
    }

    /// First child slot of the `position`-th node of `level`.
    pub fn first_child(&self, level: usize, position: usize) -> usize {
        self.level_offsets[level + 1] + position * self.max_children[level]
    }
}

/// Node arena plus scratch payloads for one block and one frame.
pub struct NodeStore<'a, C, P> {
    layout: &'a TreeLayout,
    nodes: Vec<TuningNode<'a, C, P>>,
    scratch: Vec<P>,
}

impl<'a, C: Copy, P: Default> NodeStore<'a, C, P> {
    pub fn new(layout: &'a TreeLayout) -> Self {
        let nodes = (0..layout.node_count())
            .map(|index| {
                if index < layout.non_leaf_count() {
                    TuningNode::empty(PayloadSlot::Scratch(index))
                } else {
                    TuningNode::empty(PayloadSlot::Empty)
                }
            })
            .collect();
        let scratch = (0..layout.non_leaf_count()).map(|_| P::default()).collect();

        Self {
            layout,
            nodes,
            scratch,
        }
    }
}

impl<'a, C: Copy, P> NodeStore<'a, C, P> {
    pub fn layout(&self) -> &'a TreeLayout {
        self.layout
    }

    pub fn nodes(&self) -> &[TuningNode<'a, C, P>] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &TuningNode<'a, C, P> {
        &self.nodes[index]
    }

    pub(crate) fn node_mut(&mut self, index: usize) -> &mut TuningNode<'a, C, P> {
        &mut self.nodes[index]
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [TuningNode<'a, C, P>], &mut [P]) {
        (&mut self.nodes, &mut self.scratch)
    }

    /// Seeds the root with the block's top-level calibration handle.
    pub fn set_root(&mut self, calibration: C) {
        let root = &mut self.nodes[0];
        root.is_valid = true;
        root.level = 0;
        root.calibration = Some(calibration);
    }

    /// Returns every node to its unbuilt state, keeping the root's seeded calibration.
    ///
    /// The reducer re-points single-child nodes at their child's payload, so a store
    /// must be reset before it is built again.
    pub fn reset(&mut self) {
        let non_leaf_count = self.layout.non_leaf_count();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let payload = if index < non_leaf_count {
                PayloadSlot::Scratch(index)
            } else {
                PayloadSlot::Empty
            };
            if index == 0 {
                node.num_children = 0;
                node.payload = payload;
            } else {
                *node = TuningNode::empty(payload);
            }
        }
    }

    /// Payload the root resolves to; valid after a successful reduction.
    pub fn root_payload(&self) -> Result<&P> {
        self.payload(0)
    }

    pub fn payload(&self, index: usize) -> Result<&P> {
        match self.nodes.get(index).map(|node| node.payload) {
            Some(PayloadSlot::Calibration(payload)) => Ok(payload),
            Some(PayloadSlot::Scratch(slot)) => self
                .scratch
                .get(slot)
                .ok_or_else(|| InterpolationError::reduction(index, "scratch slot out of range")),
            Some(PayloadSlot::Empty) => {
                Err(InterpolationError::reduction(index, "node has no payload"))
            }
            None => Err(InterpolationError::reduction(index, "node index out of range")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iq_interpolation::block::Dimension;

    fn ops(max_children: &[usize]) -> Vec<Operation> {
        max_children
            .iter()
            .map(|&max_children| Operation::new(Dimension::Aec, max_children))
            .collect()
    }

    #[test]
    fn test_binary_layout_matches_full_tree() {
        let layout = TreeLayout::from_operations(&ops(&[2, 2, 2])).unwrap();
        assert_eq!(layout.levels(), 4);
        assert_eq!(layout.node_count(), (1 << 4) - 1);
        assert_eq!(layout.non_leaf_count(), 7);
        assert_eq!(layout.level_offset(3), 7);
        assert_eq!(layout.level_width(3), 8);
    }

    #[test]
    fn test_dual_source_layout() {
        let layout = TreeLayout::from_operations(&ops(&[2, 2, 3, 2, 2])).unwrap();
        assert_eq!(layout.node_count(), 91);
        assert_eq!(layout.non_leaf_count(), 43);
        assert_eq!(layout.level_width(3), 12);
        assert_eq!(layout.first_child(2, 1), 7 + 3);
    }

    #[test]
    fn test_invalid_tables_rejected() {
        assert!(TreeLayout::from_operations(&[]).is_err());
        assert!(TreeLayout::from_operations(&ops(&[2, 4])).is_err());
        assert!(TreeLayout::from_operations(&ops(&[0])).is_err());
    }

    #[test]
    fn test_store_slots() {
        let layout = TreeLayout::from_operations(&ops(&[2])).unwrap();
        let store: NodeStore<'_, u8, f32> = NodeStore::new(&layout);
        assert_eq!(store.nodes().len(), 3);
        assert!(matches!(store.node(0).payload, PayloadSlot::Scratch(0)));
        assert!(matches!(store.node(1).payload, PayloadSlot::Empty));
        assert!(store.payload(2).is_err());
        assert_eq!(*store.root_payload().unwrap(), 0.0);
    }
}
