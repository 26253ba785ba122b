//! Error types for experiments and updates.

use thiserror::Error;

use qcal_analysis::AnalysisError;
use qcal_bench::BenchError;
use qcal_hal::HalError;
use qcal_store::StoreError;

/// A correction formula produced a value that must not be committed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpdateError {
    /// Result is non-finite or outside the physical range.
    #[error("{quantity} = {value} is out of range: {reason}")]
    OutOfRange {
        /// Parameter being updated.
        quantity: String,
        /// Offending value.
        value: f64,
        /// Which bound was violated.
        reason: String,
    },

    /// The analysis output lacks a record the update needs.
    #[error("Analysis result '{0}' not found")]
    MissingResult(String),
}

/// Errors that can occur while running an experiment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExpError {
    /// Submission or execution failed. Not retried.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(HalError),

    /// Option name not declared by the experiment.
    #[error("Unknown option '{name}' for experiment {experiment}")]
    UnknownOption {
        /// Experiment name.
        experiment: String,
        /// Rejected option name.
        name: String,
    },

    /// Option value has the wrong type or an unusable value.
    #[error("Invalid value for option '{name}': {reason}")]
    InvalidOption {
        /// Option name.
        name: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// No experiment with this name.
    #[error("Unknown experiment '{0}'")]
    UnknownExperiment(String),

    /// Model selection left no usable fit.
    #[error("No usable fit for experiment {0}")]
    NoUsableFit(String),

    /// Store lookup or template resolution failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sequence synthesis failed.
    #[error(transparent)]
    Bench(#[from] BenchError),

    /// Analysis failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Correction formula rejected its result.
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Options file could not be parsed.
    #[error("Options parse error: {0}")]
    OptionsParse(#[from] serde_yaml_ng::Error),
}

/// Result type for experiment operations.
pub type ExpResult<T> = Result<T, ExpError>;
