//! Bracket search over the ordered trigger regions of one dimension.

use serde::{Deserialize, Serialize};

use crate::iq_interpolation::common::numeric::interpolation_ratio;

/// Closed interval of a trigger's key space owned by one calibration entry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerRegion {
    pub start: f32,
    pub end: f32,
}

impl TriggerRegion {
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.start && value <= self.end
    }
}

/// Pair of neighbouring regions around a trigger value plus the weight of `end_index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub start_index: usize,
    pub end_index: usize,
    pub ratio: f32,
}

impl Bracket {
    /// Fallback used when a search does not resolve.
    pub const FIRST: Bracket = Bracket::exact(0);

    pub const fn exact(index: usize) -> Self {
        Self {
            start_index: index,
            end_index: index,
            ratio: 0.0,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.start_index == self.end_index
    }
}

/// Finds the bracket enclosing `value`.
///
/// Regions are scanned in ascending order. A value at or below a region's end belongs
/// to that region, so shared boundaries resolve to the lower region and values below the
/// first region resolve to region 0. Values past the last region clamp to it. Returns
/// `None` for an empty region list or a value that matches nothing (NaN).
pub fn search(regions: &[TriggerRegion], value: f32) -> Option<Bracket> {
    let last = regions.len().checked_sub(1)?;

    for (index, region) in regions.iter().enumerate() {
        if index == last && value > region.end {
            return Some(Bracket::exact(index));
        }

        if value <= region.end {
            return Some(Bracket::exact(index));
        }

        if index < last {
            let next = &regions[index + 1];
            if value > region.end && value < next.start {
                return Some(Bracket {
                    start_index: index,
                    end_index: index + 1,
                    ratio: interpolation_ratio(value, region.end, next.start),
                });
            }
        }
    }

    None
}
