//! Randomized benchmarking for qutrit EF gates.
//!
//! - [`clifford`]: 2x2 unitaries, the 24-element Clifford table and the
//!   fixed five-gate native decomposition
//! - [`rb`]: full-group and polar sequence synthesis, program wrapping and
//!   the decay-to-fidelity helpers

pub mod clifford;
pub mod error;
pub mod rb;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use clifford::{Clifford, EulerAngles, Unitary2, decompose};
pub use error::{BenchError, BenchResult};
pub use rb::{
    RbConfig, RbMode, RbSequence, default_lengths, error_per_clifford, fit_rb_decay,
    generate_programs, rb_result, synthesize,
};

/// Reported outcome of a benchmark on one qubit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Name of the benchmark.
    pub name: String,
    /// Physical qubit that was benchmarked.
    pub qubit: u32,
    /// Primary metric value.
    pub value: f64,
    /// Unit of the primary metric.
    pub unit: String,
    /// Total wall-clock time.
    pub duration: Duration,
    /// Additional metrics.
    pub metrics: serde_json::Map<String, serde_json::Value>,
}

impl BenchmarkResult {
    /// Create a new benchmark result.
    pub fn new(name: impl Into<String>, qubit: u32, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qubit,
            value,
            unit: unit.into(),
            duration: Duration::ZERO,
            metrics: serde_json::Map::new(),
        }
    }

    /// Set the wall-clock duration of the run.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add a secondary metric.
    pub fn with_metric(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }
}
