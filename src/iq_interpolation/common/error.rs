use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Tree build failed at level {level}, node {node}: {reason}")]
    StructuralFailure {
        level: usize,
        node: usize,
        reason: String,
    },

    #[error("Tree reduction failed at node {node}: {reason}")]
    ReductionFailure { node: usize, reason: String },

    #[error("Field {field} length mismatch: {left} vs {right}")]
    FieldMismatch {
        field: &'static str,
        left: usize,
        right: usize,
    },
}

impl InterpolationError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput(reason.into())
    }

    pub(crate) fn structural(level: usize, node: usize, reason: impl Into<String>) -> Self {
        Self::StructuralFailure {
            level,
            node,
            reason: reason.into(),
        }
    }

    pub(crate) fn reduction(node: usize, reason: impl Into<String>) -> Self {
        Self::ReductionFailure {
            node,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InterpolationError>;
