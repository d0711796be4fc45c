//! Error types for the transform engine.

use std::fmt;
use thiserror::Error;

/// Stage of the eigen-decomposition pipeline that reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecompositionStage {
    /// Unitary reduction of the packed Hermitian matrix to real tridiagonal form.
    Tridiagonalize,
    /// Sturm-count bisection for the largest eigenvalues.
    SelectEigenvalues,
    /// Inverse iteration for the tridiagonal eigenvectors.
    InverseIteration,
    /// Mapping the tridiagonal eigenvectors back to the original basis.
    BackTransform,
}

impl DecompositionStage {
    /// Short stage name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            DecompositionStage::Tridiagonalize => "tridiagonalize",
            DecompositionStage::SelectEigenvalues => "select_eigenvalues",
            DecompositionStage::InverseIteration => "inverse_iteration",
            DecompositionStage::BackTransform => "back_transform",
        }
    }
}

impl fmt::Display for DecompositionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by [`KltEngine`](crate::KltEngine) and its stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KltError {
    /// Illegal combination of lengths/orders.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the violated constraint.
        reason: String,
    },

    /// A scratch or I/O buffer could not be obtained at construction.
    #[error("failed to allocate {buffer} (size {len})")]
    Allocation {
        /// Name of the buffer.
        buffer: &'static str,
        /// Requested element count.
        len: usize,
    },

    /// The eigen-decomposition failed for the current block.
    ///
    /// Engine outputs (eigenvalues, coefficients, basis) are all zero when
    /// this is returned.
    #[error("{stage} failed, info={info}")]
    Decomposition {
        /// Failing stage.
        stage: DecompositionStage,
        /// Stage-specific status code.
        info: i32,
    },
}

impl KltError {
    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        KltError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a decomposition failure.
    pub fn decomposition(stage: DecompositionStage, info: i32) -> Self {
        KltError::Decomposition { stage, info }
    }

    /// Whether processing may continue with the next block.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, KltError::Decomposition { .. })
    }
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, KltError>;
