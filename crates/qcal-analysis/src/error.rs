//! Error types for the analysis crate.

use thiserror::Error;

/// Errors that can occur while fitting a curve model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalysisError {
    /// Not enough data points for the number of free parameters.
    #[error("Insufficient data: need at least {needed} points, got {got}")]
    InsufficientData {
        /// Minimum number of points.
        needed: usize,
        /// Number of usable points.
        got: usize,
    },

    /// A required data series is absent.
    #[error("Missing data series '{0}'")]
    MissingSeries(String),

    /// Peak search found too few resonances.
    #[error("Found {found} peaks, need {needed}")]
    NoPeaks {
        /// Peaks found.
        found: usize,
        /// Peaks required by the model.
        needed: usize,
    },

    /// The optimizer did not produce a finite solution.
    #[error("Fit failed: {0}")]
    FitFailed(String),

    /// Data cannot be processed.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
