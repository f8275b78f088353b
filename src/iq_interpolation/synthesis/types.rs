use crate::iq_interpolation::common::numeric::DEFAULT_EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisConfig {
    /// Skip build and reduce when no watched trigger moved since the last computed frame.
    pub dirty_check: bool,
    /// Tolerance for the dirty check's float comparisons.
    pub epsilon: f32,
    /// Keep the last good record available after a failed frame.
    pub reuse_previous_on_failure: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            dirty_check: true,
            epsilon: DEFAULT_EPSILON,
            reuse_previous_on_failure: true,
        }
    }
}

impl SynthesisConfig {
    pub fn builder() -> SynthesisConfigBuilder {
        SynthesisConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct SynthesisConfigBuilder {
    dirty_check: Option<bool>,
    epsilon: Option<f32>,
    reuse_previous_on_failure: Option<bool>,
}

impl SynthesisConfigBuilder {
    pub fn dirty_check(mut self, enabled: bool) -> Self {
        self.dirty_check = Some(enabled);
        self
    }

    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    pub fn reuse_previous_on_failure(mut self, reuse: bool) -> Self {
        self.reuse_previous_on_failure = Some(reuse);
        self
    }

    pub fn build(self) -> SynthesisConfig {
        let default = SynthesisConfig::default();
        SynthesisConfig {
            dirty_check: self.dirty_check.unwrap_or(default.dirty_check),
            epsilon: self.epsilon.unwrap_or(default.epsilon),
            reuse_previous_on_failure: self
                .reuse_previous_on_failure
                .unwrap_or(default.reuse_previous_on_failure),
        }
    }
}

/// What a synthesis call did for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The tree was built and reduced; the record is new.
    Computed,
    /// Triggers were unchanged; the previous record stands.
    Reused,
    /// The block's dynamic enable switched it off for this frame.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SynthesisStats {
    pub computed: u64,
    pub reused: u64,
    pub disabled: u64,
    pub failed: u64,
}

impl SynthesisStats {
    pub fn frames(&self) -> u64 {
        self.computed + self.reused + self.disabled + self.failed
    }
}
