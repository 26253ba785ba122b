//! Error types for the IR crate.

use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Parameter is unbound.
    #[error("Parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// Instruction addresses a qubit the program does not own.
    #[error("Qubit {qubit} is not part of program '{program}'")]
    QubitNotFound {
        /// The offending qubit.
        qubit: QubitId,
        /// Name of the program.
        program: String,
    },

    /// A gate has no pulse calibration attached.
    #[error("No calibration attached for gate '{0}'")]
    MissingCalibration(String),

    /// Division by zero while evaluating an expression.
    #[error("Division by zero in expression '{0}'")]
    DivisionByZero(String),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
