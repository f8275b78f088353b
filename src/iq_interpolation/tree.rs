//! Hierarchical trigger-interpolation engine
//!
//! This module provides bracket search, the flat node store, and the level-by-level
//! build and bottom-up reduction over it.

pub mod bracket;
pub mod builder;
pub mod node;
pub mod reducer;

#[cfg(test)]
mod tests;

pub use bracket::{Bracket, TriggerRegion, search};
pub use builder::build;
pub use node::{MAX_CHILDREN, MAX_RATIOS, NodeStore, PayloadSlot, TreeLayout, TuningNode};
pub use reducer::reduce;
