use tracing::debug;

use crate::iq_interpolation::common::error::{InterpolationError, Result};
use crate::iq_interpolation::tree::node::{NodeStore, PayloadSlot};

/// Merges the built tree bottom-up until the root's scratch payload holds the result.
///
/// Non-leaf nodes are visited from the end of the non-leaf range back to the root, so
/// every child is final before its parent reads it. `blend(a, b, ratio, out)` writes the
/// weighted combination of `a` and `b` (weight `ratio` on `b`) into `out`.
///
/// A non-root node with a single child simply aliases the child's payload; the root
/// always copies into its own buffer. Three children merge the second and third first
/// (ratio slot 1), then blend the first against that partial result (ratio slot 0).
pub fn reduce<C, P, F>(store: &mut NodeStore<'_, C, P>, mut blend: F) -> Result<()>
where
    C: Copy,
    P: Clone,
    F: FnMut(&P, &P, f32, &mut P) -> Result<()>,
{
    let layout = store.layout();
    let leaf_level = layout.leaf_level();
    let (nodes, scratch) = store.parts_mut();
    let mut merged = 0usize;

    for index in (0..layout.non_leaf_count()).rev() {
        let node = &nodes[index];
        if !node.is_valid || node.level >= leaf_level {
            continue;
        }

        let count = node.num_children;
        let ratios = node.ratios;
        let target = node.payload;
        let mut sources = [PayloadSlot::Empty; 3];
        for k in 0..count.min(sources.len()) {
            let child = nodes
                .get(node.children[k])
                .filter(|child| child.is_valid)
                .ok_or_else(|| {
                    InterpolationError::reduction(index, format!("child {k} is missing"))
                })?;
            sources[k] = child.payload;
        }

        match count {
            1 if index > 0 => {
                if matches!(sources[0], PayloadSlot::Empty) {
                    return Err(InterpolationError::reduction(index, "child 0 has no payload"));
                }
                nodes[index].payload = sources[0];
            }
            1 => {
                let (out, tail, base) = split_target(scratch, target, index)?;
                let only = resolve(sources[0], tail, base, index)?;
                blend(only, only, 0.0, out)?;
            }
            2 => {
                let (out, tail, base) = split_target(scratch, target, index)?;
                let first = resolve(sources[0], tail, base, index)?;
                let second = resolve(sources[1], tail, base, index)?;
                blend(first, second, ratios[0], out)?;
            }
            3 => {
                let (out, tail, base) = split_target(scratch, target, index)?;
                let first = resolve(sources[0], tail, base, index)?;
                let second = resolve(sources[1], tail, base, index)?;
                let third = resolve(sources[2], tail, base, index)?;
                blend(second, third, ratios[1], out)?;
                let partial = out.clone();
                blend(first, &partial, ratios[0], out)?;
            }
            other => {
                return Err(InterpolationError::reduction(
                    index,
                    format!("cannot merge {other} children"),
                ));
            }
        }
        merged += 1;
    }

    debug!(merged, "Tree reduced");
    Ok(())
}

/// Splits scratch so the node's own buffer is writable while later buffers stay readable.
fn split_target<'s, P>(
    scratch: &'s mut [P],
    slot: PayloadSlot<'_, P>,
    node: usize,
) -> Result<(&'s mut P, &'s [P], usize)> {
    let PayloadSlot::Scratch(target) = slot else {
        return Err(InterpolationError::reduction(node, "merge target is not a scratch buffer"));
    };
    if target >= scratch.len() {
        return Err(InterpolationError::reduction(node, "scratch slot out of range"));
    }

    let (head, tail) = scratch.split_at_mut(target + 1);
    Ok((&mut head[target], tail, target + 1))
}

fn resolve<'s, 'a: 's, P>(
    slot: PayloadSlot<'a, P>,
    tail: &'s [P],
    base: usize,
    node: usize,
) -> Result<&'s P> {
    match slot {
        PayloadSlot::Calibration(payload) => Ok(payload),
        PayloadSlot::Scratch(index) if index >= base => tail
            .get(index - base)
            .ok_or_else(|| InterpolationError::reduction(node, "child scratch slot out of range")),
        PayloadSlot::Scratch(_) => {
            Err(InterpolationError::reduction(node, "child buffer precedes its parent"))
        }
        PayloadSlot::Empty => Err(InterpolationError::reduction(node, "child has no payload")),
    }
}
