use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::iq_interpolation::blend::blend_records;
use crate::iq_interpolation::block::{BlockId, TuningBlock};
use crate::iq_interpolation::common::error::Result;
use crate::iq_interpolation::synthesis::timing::{Step, SynthesisTimings, Timer};
use crate::iq_interpolation::synthesis::types::{Outcome, SynthesisConfig, SynthesisStats};
use crate::iq_interpolation::tree::{NodeStore, TreeLayout, build, reduce};
use crate::iq_interpolation::triggers::FrameTriggers;

/// Builds and reduces one tree for `B` over `calibration`.
///
/// Pure: the node store lives only for this call, and the root record is cloned out
/// before it is dropped.
pub fn interpolate<B: TuningBlock>(
    calibration: &B::Calibration,
    layout: &TreeLayout,
    triggers: &B::Triggers,
) -> Result<B::Payload> {
    run::<B>(calibration, layout, triggers, &mut SynthesisTimings::new())
}

fn run<B: TuningBlock>(
    calibration: &B::Calibration,
    layout: &TreeLayout,
    triggers: &B::Triggers,
    timings: &mut SynthesisTimings,
) -> Result<B::Payload> {
    let mut store = NodeStore::new(layout);
    store.set_root(B::root(calibration));

    {
        let _span = tracing::info_span!("build_tree", levels = layout.levels()).entered();
        let timer = Timer::start(B::ID, Step::BuildTree);
        build(&mut store, B::OPERATIONS, |operation, node| B::search(operation, node, triggers))?;
        timings.record(timer);
    }

    {
        let _span =
            tracing::info_span!("reduce_tree", non_leaf = layout.non_leaf_count()).entered();
        let timer = Timer::start(B::ID, Step::ReduceTree);
        reduce(&mut store, blend_records::<B::Payload>)?;
        timings.record(timer);
    }

    let timer = Timer::start(B::ID, Step::CopyRoot);
    let record = store.root_payload()?.clone();
    timings.record(timer);
    Ok(record)
}

/// Per-block synthesis state carried across frames.
///
/// Holds the shared calibration, the layout computed once from the operation table,
/// the dirty-check snapshot and the last good record.
pub struct BlockSynthesizer<B: TuningBlock> {
    calibration: Arc<B::Calibration>,
    layout: TreeLayout,
    config: SynthesisConfig,
    snapshot: B::Snapshot,
    record: Option<B::Payload>,
    force_recompute: bool,
    enabled: bool,
    stats: SynthesisStats,
}

impl<B: TuningBlock> BlockSynthesizer<B> {
    pub fn new(calibration: Arc<B::Calibration>, config: SynthesisConfig) -> Result<Self> {
        let layout = TreeLayout::from_operations(B::OPERATIONS)?;
        debug!(
            block = %B::ID,
            nodes = layout.node_count(),
            non_leaf = layout.non_leaf_count(),
            "Block registered"
        );

        Ok(Self {
            calibration,
            layout,
            config,
            snapshot: B::Snapshot::default(),
            record: None,
            force_recompute: false,
            enabled: true,
            stats: SynthesisStats::default(),
        })
    }

    #[instrument(skip(self, frame), fields(block = %B::ID))]
    pub fn synthesize(&mut self, frame: &FrameTriggers) -> Result<Outcome> {
        self.synthesize_into(frame, &mut SynthesisTimings::new())
    }

    pub fn synthesize_with_timings(
        &mut self,
        frame: &FrameTriggers,
    ) -> Result<(Outcome, SynthesisTimings)> {
        let mut timings = SynthesisTimings::new();
        let outcome = self.synthesize_into(frame, &mut timings)?;
        Ok((outcome, timings))
    }

    pub(crate) fn synthesize_into(
        &mut self,
        frame: &FrameTriggers,
        timings: &mut SynthesisTimings,
    ) -> Result<Outcome> {
        if let Some(switch) = B::dynamic_enable(&self.calibration) {
            let was_enabled = self.enabled;
            if !switch.evaluate(frame, &mut self.enabled) {
                if was_enabled {
                    info!(block = %B::ID, "Block disabled by trigger hysteresis");
                }
                self.stats.disabled += 1;
                return Ok(Outcome::Disabled);
            }
        }

        let changed = B::update_snapshot(&mut self.snapshot, frame, self.config.epsilon);
        let must_compute = changed
            || !self.config.dirty_check
            || self.force_recompute
            || self.record.is_none();
        if !must_compute {
            debug!(block = %B::ID, "Triggers unchanged, reusing previous record");
            self.stats.reused += 1;
            return Ok(Outcome::Reused);
        }

        let triggers = B::triggers(&self.calibration, &self.snapshot);
        match run::<B>(&self.calibration, &self.layout, &triggers, timings) {
            Ok(record) => {
                self.record = Some(record);
                self.force_recompute = false;
                self.stats.computed += 1;
                info!(block = %B::ID, "Block synthesized");
                Ok(Outcome::Computed)
            }
            Err(err) => {
                self.force_recompute = true;
                self.stats.failed += 1;
                if !self.config.reuse_previous_on_failure {
                    self.record = None;
                }
                warn!(
                    block = %B::ID,
                    error = %err,
                    has_previous = self.record.is_some(),
                    "Synthesis failed"
                );
                Err(err)
            }
        }
    }

    /// Last successfully synthesized record.
    pub fn record(&self) -> Option<&B::Payload> {
        self.record.as_ref()
    }

    pub fn stats(&self) -> SynthesisStats {
        self.stats
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn block_id(&self) -> BlockId {
        B::ID
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    pub fn calibration(&self) -> &B::Calibration {
        &self.calibration
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Swaps in new calibration; the next frame recomputes regardless of triggers.
    pub fn set_calibration(&mut self, calibration: Arc<B::Calibration>) {
        self.calibration = calibration;
        self.force_recompute = true;
    }
}
