use tracing::debug;

use crate::iq_interpolation::block::{Branch, Operation};
use crate::iq_interpolation::common::error::{InterpolationError, Result};
use crate::iq_interpolation::tree::node::{NodeStore, PayloadSlot};

/// Populates `store` level by level, one trigger dimension per level.
///
/// Every valid node of level `L` is handed to `search` with `operations[L]`; its children
/// are written into the node's fixed run of slots on level `L + 1`. The root must have
/// been seeded with [`NodeStore::set_root`]; anything left from an earlier build is
/// cleared first. A search that yields no children, or more than the level allows,
/// aborts the whole build.
pub fn build<'a, C, P, S>(
    store: &mut NodeStore<'a, C, P>,
    operations: &[Operation],
    mut search: S,
) -> Result<()>
where
    C: Copy,
    S: FnMut(&Operation, C) -> Result<Branch<'a, C, P>>,
{
    let layout = store.layout();

    if operations.len() + 1 != layout.levels() {
        return Err(InterpolationError::malformed(format!(
            "{} operations for a tree of {} levels",
            operations.len(),
            layout.levels()
        )));
    }
    if !store.node(0).is_valid {
        return Err(InterpolationError::malformed("tree root was not seeded"));
    }
    store.reset();

    for (level, operation) in operations.iter().enumerate() {
        let offset = layout.level_offset(level);
        let mut searched = 0usize;

        for position in 0..layout.level_width(level) {
            let index = offset + position;
            let parent = store.node(index);
            if !parent.is_valid {
                continue;
            }

            let calibration = parent.calibration.ok_or_else(|| {
                InterpolationError::structural(level, index, "valid node has no calibration")
            })?;

            let branch = search(operation, calibration)?;
            if branch.is_empty() {
                return Err(InterpolationError::structural(
                    level,
                    index,
                    "search produced no children",
                ));
            }
            if branch.len() > operation.max_children {
                return Err(InterpolationError::structural(
                    level,
                    index,
                    format!(
                        "search produced {} children, {:?} allows {}",
                        branch.len(),
                        operation.dimension,
                        operation.max_children
                    ),
                ));
            }

            let first_child = layout.first_child(level, position);
            let child_level = level + 1;
            let (children, ratios) = branch.into_parts();
            let count = children.len();

            for (k, child) in children.into_iter().enumerate() {
                let child_index = first_child + k;
                let node = store.node_mut(child_index);
                node.is_valid = true;
                node.level = child_level;
                node.num_children = 0;
                node.calibration = Some(child.calibration);

                if let Some(payload) = child.payload {
                    if child_level != layout.leaf_level() {
                        return Err(InterpolationError::structural(
                            level,
                            index,
                            "leaf payload supplied above the leaf level",
                        ));
                    }
                    node.payload = PayloadSlot::Calibration(payload);
                }
            }

            let parent = store.node_mut(index);
            parent.num_children = count;
            parent.ratios = ratios;
            for k in 0..count {
                parent.children[k] = first_child + k;
            }
            searched += 1;
        }

        debug!(level, dimension = ?operation.dimension, nodes = searched, "Tree level built");
    }

    Ok(())
}
