//! The closed calibration loop.
//!
//! ```text
//!   build_circuits ──→ validate ──→ submit ──→ wait ──→ analysis ──→ updates ──→ commit
//!     (store read)      (backend)   (one batch)          (selector)   (checked)   (store write)
//! ```
//!
//! Backend failures surface as [`ExpError::BackendUnavailable`] and are not
//! retried. An empty analysis output (no usable fit) ends the run without
//! touching the store.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use qcal_analysis::AnalysisOutput;
use qcal_hal::{Backend, HalError, ValidationResult};
use qcal_store::{CalibrationStore, TemplateLibrary};

use crate::error::{ExpError, ExpResult};
use crate::experiments::{BuildContext, CalibrationExperiment};
use crate::updater::{CalibrationUpdate, commit};

/// Outcome of one experiment run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Experiment name.
    pub experiment: String,
    /// Physical qubit.
    pub qubit: u32,
    /// Backend job that executed the batch.
    pub job_id: String,
    /// Number of programs in the batch.
    pub num_programs: usize,
    /// Analysis output; empty if no candidate produced a usable fit.
    pub output: AnalysisOutput,
    /// Updates derived from the output.
    pub updates: Vec<CalibrationUpdate>,
    /// Whether the updates were written to the store.
    pub committed: bool,
}

impl RunReport {
    /// Check if the run produced a usable fit.
    pub fn has_fit(&self) -> bool {
        !self.output.is_empty()
    }
}

/// Runs experiments against one backend.
pub struct Pipeline<'a> {
    backend: &'a dyn Backend,
    library: &'a TemplateLibrary,
    commit: bool,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline that commits updates.
    pub fn new(backend: &'a dyn Backend, library: &'a TemplateLibrary) -> Self {
        Self {
            backend,
            library,
            commit: true,
        }
    }

    /// Compute updates without writing them.
    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    /// Run one experiment and apply its updates to `store`.
    #[instrument(
        skip(self, experiment, store),
        fields(experiment = %experiment.name(), qubit = experiment.qubit())
    )]
    pub async fn run(
        &self,
        experiment: &dyn CalibrationExperiment,
        store: &mut CalibrationStore,
    ) -> ExpResult<RunReport> {
        let timing = self.backend.capabilities().timing;
        let programs = {
            let ctx = BuildContext::new(store, self.library, &timing);
            experiment.build_circuits(&ctx)?
        };
        debug!("Built {} programs", programs.len());

        let availability = self
            .backend
            .availability()
            .await
            .map_err(ExpError::BackendUnavailable)?;
        if !availability.is_available {
            let reason = availability
                .status_message
                .unwrap_or_else(|| self.backend.name().to_string());
            return Err(ExpError::BackendUnavailable(HalError::BackendUnavailable(
                reason,
            )));
        }

        if let ValidationResult::Invalid { reasons } = self
            .backend
            .validate(&programs)
            .await
            .map_err(ExpError::BackendUnavailable)?
        {
            return Err(ExpError::BackendUnavailable(HalError::InvalidProgram(
                reasons.join("; "),
            )));
        }

        let options = experiment.execution_options()?;
        let job_id = self
            .backend
            .submit(&programs, &options)
            .await
            .map_err(ExpError::BackendUnavailable)?;
        debug!("Submitted job {}", job_id);

        let result = self
            .backend
            .wait(&job_id)
            .await
            .map_err(ExpError::BackendUnavailable)?;
        debug!(
            "Job {} returned {} results",
            job_id,
            result.results.len()
        );

        let output = experiment.analysis().run(&result.results)?;
        let mut report = RunReport {
            experiment: experiment.name().to_string(),
            qubit: experiment.qubit(),
            job_id: job_id.0.clone(),
            num_programs: programs.len(),
            output,
            updates: Vec::new(),
            committed: false,
        };
        if report.output.is_empty() {
            warn!("No usable fit, store left unchanged");
            return Ok(report);
        }

        report.updates = {
            let ctx = BuildContext::new(store, self.library, &timing);
            experiment.apply_update(&report.output, &ctx)?
        };

        if self.commit && !report.updates.is_empty() {
            commit(
                store,
                &report.updates,
                &report.experiment,
                &report.output,
                &report.job_id,
                Utc::now(),
            )?;
            report.committed = true;
            info!(
                "Committed {} update(s) from {}",
                report.updates.len(),
                report.experiment
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qcal_hal::{
        BackendAvailability, Capabilities, ExecutionOptions, ExecutionResult, HalResult, JobId,
        JobStatus,
    };
    use qcal_ir::StimulusProgram;

    use crate::experiments::Experiment;

    /// A backend that refuses every submission.
    struct OfflineBackend {
        capabilities: Capabilities,
        available: bool,
    }

    #[async_trait]
    impl Backend for OfflineBackend {
        fn name(&self) -> &str {
            "offline"
        }

        fn capabilities(&self) -> &Capabilities {
            &self.capabilities
        }

        async fn availability(&self) -> HalResult<BackendAvailability> {
            if self.available {
                Ok(BackendAvailability::always_available())
            } else {
                Ok(BackendAvailability::unavailable("maintenance"))
            }
        }

        async fn validate(&self, _programs: &[StimulusProgram]) -> HalResult<ValidationResult> {
            Ok(ValidationResult::Valid)
        }

        async fn submit(
            &self,
            _programs: &[StimulusProgram],
            _options: &ExecutionOptions,
        ) -> HalResult<JobId> {
            Err(HalError::SubmissionFailed("connection refused".into()))
        }

        async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
            Err(HalError::JobNotFound(job_id.0.clone()))
        }

        async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
            Err(HalError::JobNotFound(job_id.0.clone()))
        }
    }

    fn setup(available: bool) -> (OfflineBackend, TemplateLibrary, CalibrationStore) {
        let capabilities = Capabilities::simulator(2);
        let library = TemplateLibrary::default();
        let store = CalibrationStore::from_backend(&capabilities, &library);
        (
            OfflineBackend {
                capabilities,
                available,
            },
            library,
            store,
        )
    }

    #[tokio::test]
    async fn test_submission_failure_is_backend_unavailable() {
        let (backend, library, mut store) = setup(true);
        let before = store.len();
        let exp = Experiment::from_name("rough_amp", 0).unwrap();

        let err = Pipeline::new(&backend, &library)
            .run(&exp, &mut store)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExpError::BackendUnavailable(HalError::SubmissionFailed(_))
        ));
        assert_eq!(store.len(), before);
    }

    #[tokio::test]
    async fn test_offline_backend() {
        let (backend, library, mut store) = setup(false);
        let exp = Experiment::from_name("rough_freq", 1).unwrap();

        let err = Pipeline::new(&backend, &library)
            .run(&exp, &mut store)
            .await
            .unwrap_err();
        match err {
            ExpError::BackendUnavailable(HalError::BackendUnavailable(msg)) => {
                assert_eq!(msg, "maintenance");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_parameter_fails_before_submission() {
        let (backend, library, _) = setup(true);
        let mut empty = CalibrationStore::new("offline");
        let exp = Experiment::from_name("rough_amp", 0).unwrap();

        let err = Pipeline::new(&backend, &library)
            .run(&exp, &mut empty)
            .await
            .unwrap_err();
        assert!(matches!(err, ExpError::Store(_)));
    }
}
