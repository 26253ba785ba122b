//! qcal Hardware Abstraction Layer
//!
//! The boundary between the calibration pipeline and whatever executes
//! stimulus programs: a simulator, or real control electronics behind a
//! service.
//!
//! # Overview
//!
//! - [`Backend`]: async batch submission, status polling and result retrieval
//! - [`Capabilities`]: static topology, per-qubit defaults and pulse timing,
//!   read once when a calibration store is created
//! - [`ExecutionOptions`]: shots, repetition delay and discriminator mode
//! - [`ExecutionResult`] / [`Counts`]: per-program outcome tables keyed by the
//!   program's sweep metadata
//!
//! # Implementing a Backend
//!
//! ```ignore
//! use qcal_hal::{
//!     Backend, BackendAvailability, Capabilities, ExecutionOptions, ExecutionResult,
//!     HalResult, JobId, JobStatus, ValidationResult,
//! };
//! use qcal_ir::StimulusProgram;
//! use async_trait::async_trait;
//!
//! struct MyBackend {
//!     capabilities: Capabilities,
//! }
//!
//! #[async_trait]
//! impl Backend for MyBackend {
//!     fn name(&self) -> &str { "my_backend" }
//!
//!     fn capabilities(&self) -> &Capabilities {
//!         &self.capabilities
//!     }
//!
//!     async fn availability(&self) -> HalResult<BackendAvailability> {
//!         Ok(BackendAvailability::always_available())
//!     }
//!
//!     async fn validate(&self, programs: &[StimulusProgram]) -> HalResult<ValidationResult> {
//!         Ok(ValidationResult::Valid)
//!     }
//!
//!     async fn submit(
//!         &self,
//!         programs: &[StimulusProgram],
//!         options: &ExecutionOptions,
//!     ) -> HalResult<JobId> {
//!         # todo!()
//!     }
//!
//!     async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
//!         # todo!()
//!     }
//!
//!     async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
//!         # todo!()
//!     }
//! }
//! ```

pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod result;

pub use backend::{
    Backend, BackendAvailability, ExecutionOptions, MeasurementMode, ValidationResult,
};
pub use capability::{Capabilities, CouplingEdge, QubitProperties, Timing, Topology, TopologyKind};
pub use error::{HalError, HalResult};
pub use job::{Job, JobId, JobStatus};
pub use result::{Counts, ExecutionResult, ProgramResult};
