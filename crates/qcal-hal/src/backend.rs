//! Backend trait and execution options.
//!
//! ```text
//!   capabilities() ──→ validate() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! A backend takes a whole sweep as one batch. There is no cancel: once a
//! batch is submitted it runs to completion or fails as a unit.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use qcal_ir::StimulusProgram;

use crate::capability::Capabilities;
use crate::error::HalResult;
use crate::job::{JobId, JobStatus};
use crate::result::ExecutionResult;

/// How measured signals are turned into outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeasurementMode {
    /// Two-state discriminator: anything outside level 0 reads as `"1"`.
    #[default]
    Standard,
    /// Excited-state promotion before readout (three outcomes).
    ExcitedStatePromotion,
}

/// Options applied to every program of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Shots per program.
    pub shots: u32,
    /// Delay between repetitions (s).
    pub rep_delay: f64,
    /// Discriminator mode.
    pub measurement: MeasurementMode,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            shots: 1024,
            rep_delay: 300e-6,
            measurement: MeasurementMode::Standard,
        }
    }
}

impl ExecutionOptions {
    /// Set the shot count.
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = shots;
        self
    }

    /// Set the repetition delay.
    pub fn with_rep_delay(mut self, rep_delay: f64) -> Self {
        self.rep_delay = rep_delay;
        self
    }

    /// Set the measurement mode.
    pub fn with_measurement(mut self, measurement: MeasurementMode) -> Self {
        self.measurement = measurement;
        self
    }
}

/// Trait for execution backends.
///
/// # Contract
///
/// - `capabilities()` MUST be synchronous and infallible, cached at
///   construction time.
/// - `submit()` takes the full batch and MUST return a job in `Queued`
///   (or an already terminal) status.
/// - `result()` returns one entry per program, in submission order, each
///   carrying the program's sweep metadata.
/// - `wait()` has a default implementation (500ms poll, 5-minute timeout).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Check backend availability.
    async fn availability(&self) -> HalResult<BackendAvailability>;

    /// Validate a batch against backend constraints.
    async fn validate(&self, programs: &[StimulusProgram]) -> HalResult<ValidationResult>;

    /// Submit a batch for execution.
    async fn submit(
        &self,
        programs: &[StimulusProgram],
        options: &ExecutionOptions,
    ) -> HalResult<JobId>;

    /// Get the status of a job.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Get the result of a completed job.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult>;

    /// Wait for a job to complete and return its result.
    ///
    /// Default implementation polls every 500ms for up to 5 minutes.
    async fn wait(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        use crate::error::HalError;
        use tokio::time::sleep;

        let poll_interval = Duration::from_millis(500);
        let max_polls = 600; // 5 minutes max

        for _ in 0..max_polls {
            let status = self.status(job_id).await?;

            match status {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {
                    sleep(poll_interval).await;
                }
            }
        }

        Err(HalError::Timeout(job_id.0.clone()))
    }
}

/// Backend availability information.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    /// Whether the backend is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs currently in queue (if known).
    pub queue_depth: Option<u32>,
    /// Human-readable status message.
    pub status_message: Option<String>,
}

impl BackendAvailability {
    /// Availability of a backend that is always ready (simulators).
    pub fn always_available() -> Self {
        Self {
            is_available: true,
            queue_depth: Some(0),
            status_message: None,
        }
    }

    /// Create availability for an offline backend.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            status_message: Some(reason.into()),
        }
    }
}

/// Result of batch validation against backend constraints.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Batch can be submitted.
    Valid,
    /// Batch cannot run on this backend.
    Invalid {
        /// Reasons the batch is invalid.
        reasons: Vec<String>,
    },
}

impl ValidationResult {
    /// Check if the batch is valid.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}
