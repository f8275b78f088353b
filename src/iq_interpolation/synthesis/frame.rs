use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::iq_interpolation::block::{BlockId, TuningBlock};
use crate::iq_interpolation::blocks::{Anr10, Gtm10, Pedestal13, Sce11};
use crate::iq_interpolation::chromatix::ChromatixBundle;
use crate::iq_interpolation::common::error::{InterpolationError, Result};
use crate::iq_interpolation::synthesis::synthesizer::BlockSynthesizer;
use crate::iq_interpolation::synthesis::timing::SynthesisTimings;
use crate::iq_interpolation::synthesis::types::{Outcome, SynthesisConfig, SynthesisStats};
use crate::iq_interpolation::triggers::FrameTriggers;

/// Object-safe view of a [`BlockSynthesizer`] so blocks of different types share a registry.
pub trait Synthesize {
    fn block_id(&self) -> BlockId;

    fn synthesize_timed(
        &mut self,
        frame: &FrameTriggers,
        timings: &mut SynthesisTimings,
    ) -> Result<Outcome>;

    fn stats(&self) -> SynthesisStats;

    fn has_record(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl<B: TuningBlock> Synthesize for BlockSynthesizer<B> {
    fn block_id(&self) -> BlockId {
        B::ID
    }

    fn synthesize_timed(
        &mut self,
        frame: &FrameTriggers,
        timings: &mut SynthesisTimings,
    ) -> Result<Outcome> {
        self.synthesize_into(frame, timings)
    }

    fn stats(&self) -> SynthesisStats {
        BlockSynthesizer::stats(self)
    }

    fn has_record(&self) -> bool {
        self.record().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Per-block results of one frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    outcomes: BTreeMap<BlockId, Result<Outcome>>,
}

impl FrameReport {
    pub fn outcome(&self, block: BlockId) -> Option<&Result<Outcome>> {
        self.outcomes.get(&block)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Result<Outcome>)> {
        self.outcomes.iter().map(|(block, outcome)| (*block, outcome))
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes
            .values()
            .filter(|result| matches!(result, Ok(o) if *o == outcome))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (BlockId, &InterpolationError)> {
        self.outcomes
            .iter()
            .filter_map(|(block, result)| result.as_ref().err().map(|err| (*block, err)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(|result| result.is_ok())
    }
}

/// Runs every registered block for each frame.
///
/// Blocks run in [`BlockId`] order and independently: one block failing leaves the
/// others' results, and its own previous record, untouched.
pub struct FrameSynthesizer {
    config: SynthesisConfig,
    blocks: BTreeMap<BlockId, Box<dyn Synthesize>>,
    frames: u64,
}

impl FrameSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            config,
            blocks: BTreeMap::new(),
            frames: 0,
        }
    }

    /// Registers every block present in `bundle`.
    pub fn from_bundle(bundle: ChromatixBundle, config: SynthesisConfig) -> Result<Self> {
        let mut synthesizer = Self::new(config);
        if let Some(sce11) = bundle.sce11 {
            synthesizer.register::<Sce11>(Arc::new(sce11))?;
        }
        if let Some(gtm10) = bundle.gtm10 {
            synthesizer.register::<Gtm10>(Arc::new(gtm10))?;
        }
        if let Some(pedestal13) = bundle.pedestal13 {
            synthesizer.register::<Pedestal13>(Arc::new(pedestal13))?;
        }
        if let Some(anr10) = bundle.anr10 {
            synthesizer.register::<Anr10>(Arc::new(anr10))?;
        }
        Ok(synthesizer)
    }

    /// Adds or replaces the synthesizer for `B`.
    pub fn register<B: TuningBlock>(&mut self, calibration: Arc<B::Calibration>) -> Result<()> {
        let block = BlockSynthesizer::<B>::new(calibration, self.config)?;
        self.blocks.insert(B::ID, Box::new(block));
        Ok(())
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys().copied()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[instrument(skip(self, frame), fields(frame_index = self.frames))]
    pub fn synthesize(&mut self, frame: &FrameTriggers) -> FrameReport {
        self.synthesize_with_timings(frame).0
    }

    pub fn synthesize_with_timings(
        &mut self,
        frame: &FrameTriggers,
    ) -> (FrameReport, SynthesisTimings) {
        let mut timings = SynthesisTimings::new();
        let mut report = FrameReport::default();

        for (id, block) in self.blocks.iter_mut() {
            let _span = tracing::info_span!("block", block = %id).entered();
            report.outcomes.insert(*id, block.synthesize_timed(frame, &mut timings));
        }

        self.frames += 1;
        info!(
            computed = report.count(Outcome::Computed),
            reused = report.count(Outcome::Reused),
            disabled = report.count(Outcome::Disabled),
            failed = report.failures().count(),
            "Frame synthesized"
        );
        (report, timings)
    }

    pub fn block<B: TuningBlock>(&self) -> Option<&BlockSynthesizer<B>> {
        self.blocks.get(&B::ID)?.as_any().downcast_ref::<BlockSynthesizer<B>>()
    }

    /// Latest record for `B`; after a failed frame this is the last good one.
    pub fn record<B: TuningBlock>(&self) -> Option<&B::Payload> {
        self.block::<B>()?.record()
    }

    pub fn stats(&self, block: BlockId) -> Option<SynthesisStats> {
        self.blocks.get(&block).map(|synthesizer| synthesizer.stats())
    }

    pub fn has_record(&self, block: BlockId) -> bool {
        self.blocks.get(&block).is_some_and(|synthesizer| synthesizer.has_record())
    }
}
