//! Error types for the benchmarking crate.

use thiserror::Error;

/// Errors that can occur while synthesizing benchmark sequences.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BenchError {
    /// Matrix is not unitary.
    #[error("Matrix is not unitary: {0}")]
    NotUnitary(String),

    /// Invalid benchmark configuration.
    #[error("Invalid benchmark configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for benchmark operations.
pub type BenchResult<T> = Result<T, BenchError>;
