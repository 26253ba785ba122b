//! Error types for the store crate.

use thiserror::Error;

use qcal_ir::IrError;

use crate::key::ParameterKey;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No valid entry exists for a key at the requested time.
    #[error("Missing parameter {key}")]
    MissingParameter {
        /// The key that was looked up.
        key: ParameterKey,
    },

    /// Qubit has no usable control line.
    #[error("Qubit {qubit} has no usable control line")]
    TopologyGap {
        /// The blacklisted or unknown qubit.
        qubit: u32,
    },

    /// No template with this name.
    #[error("Unknown schedule template '{0}'")]
    UnknownTemplate(String),

    /// Template evaluation failed.
    #[error("Template evaluation failed: {0}")]
    Ir(#[from] IrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
