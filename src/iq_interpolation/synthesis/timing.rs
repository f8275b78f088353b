use std::fmt;
use std::time::{Duration, Instant};

use crate::iq_interpolation::block::BlockId;

/// Timed phase of one block's synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    BuildTree,
    ReduceTree,
    CopyRoot,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::BuildTree => "build_tree",
            Step::ReduceTree => "reduce_tree",
            Step::CopyRoot => "copy_root",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    pub block: BlockId,
    pub step: Step,
    pub duration: Duration,
}

/// Step durations of the blocks computed in one frame, in the order they ran.
///
/// Reused and disabled blocks contribute nothing.
#[derive(Debug, Default)]
pub struct SynthesisTimings {
    steps: Vec<StepTiming>,
}

impl SynthesisTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, block: BlockId, step: Step, duration: Duration) {
        self.steps.push(StepTiming { block, step, duration });
    }

    /// Stops `timer` and records its step.
    pub fn record(&mut self, timer: Timer) {
        let duration = timer.start.elapsed();
        self.add_step(timer.block, timer.step, duration);
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Duration of `step` for `block`, summed if it ran more than once.
    pub fn get(&self, block: BlockId, step: Step) -> Option<Duration> {
        self.steps
            .iter()
            .filter(|timing| timing.block == block && timing.step == step)
            .map(|timing| timing.duration)
            .reduce(|total, duration| total + duration)
    }

    pub fn block_total(&self, block: BlockId) -> Duration {
        self.steps
            .iter()
            .filter(|timing| timing.block == block)
            .map(|timing| timing.duration)
            .sum()
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|timing| timing.duration).sum()
    }

    pub fn print_summary(&self) {
        let total = self.total_duration().as_secs_f64();
        let micros = |duration: Duration| duration.as_secs_f64() * 1_000_000.0;

        println!("\nSynthesis Timing Summary:");
        println!("{:-<52}", "");
        let mut current = None;
        for timing in &self.steps {
            if current != Some(timing.block) {
                current = Some(timing.block);
                println!("{:<24} {:>12.1}us", timing.block, micros(self.block_total(timing.block)));
            }
            let share =
                if total > 0.0 { timing.duration.as_secs_f64() / total * 100.0 } else { 0.0 };
            println!("  {:<22} {:>12.1}us ({:>5.1}%)", timing.step, micros(timing.duration), share);
        }
        println!("{:-<52}", "");
        println!("{:<24} {:>12.1}us", "Total", total * 1_000_000.0);
    }
}

/// Running measurement of one step.
pub struct Timer {
    block: BlockId,
    step: Step,
    start: Instant,
}

impl Timer {
    pub fn start(block: BlockId, step: Step) -> Self {
        Self {
            block,
            step,
            start: Instant::now(),
        }
    }
}
