//! Simulator backend implementation.

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

use qcal_hal::{
    Backend, BackendAvailability, Capabilities, Counts, ExecutionOptions, ExecutionResult,
    HalError, HalResult, Job, JobId, JobStatus, MeasurementMode, ProgramResult,
    ValidationResult,
};
use qcal_ir::StimulusProgram;

use crate::density::DensityMatrix;
use crate::device::{QutritDevice, simulate};

/// Job data for the simulator.
struct SimJob {
    job: Job,
    result: Option<ExecutionResult>,
}

/// Local qutrit simulator backend.
///
/// Every qubit is an independent three-level system with hidden device
/// parameters ([`QutritDevice`]). Counts are the rounded expectation
/// values unless shot noise is enabled.
pub struct SimulatorBackend {
    capabilities: Capabilities,
    devices: FxHashMap<u32, QutritDevice>,
    default_device: QutritDevice,
    shot_noise_seed: Option<u64>,
    /// Active jobs.
    jobs: Arc<Mutex<FxHashMap<String, SimJob>>>,
}

impl SimulatorBackend {
    /// Create a simulator of `num_qubits` identical qutrits on a line.
    pub fn new(num_qubits: u32) -> Self {
        Self::with_capabilities(Capabilities::simulator(num_qubits))
    }

    /// Create a simulator with explicit capabilities.
    ///
    /// The default device's anharmonicity follows the first qubit's.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        let mut default_device = QutritDevice::default();
        if let Some(props) = capabilities.qubit(0) {
            default_device.anharmonicity = props.anharmonicity;
        }
        Self {
            capabilities,
            devices: FxHashMap::default(),
            default_device,
            shot_noise_seed: None,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Override the device parameters of one qubit.
    pub fn with_device(mut self, qubit: u32, device: QutritDevice) -> Self {
        self.devices.insert(qubit, device);
        self
    }

    /// Sample counts shot by shot from a seeded generator.
    pub fn with_shot_noise(mut self, seed: u64) -> Self {
        self.shot_noise_seed = Some(seed);
        self
    }

    /// Device parameters of a qubit.
    pub fn device(&self, qubit: u32) -> &QutritDevice {
        self.devices.get(&qubit).unwrap_or(&self.default_device)
    }

    fn check_program(&self, program: &StimulusProgram) -> Result<(), String> {
        let qubit = program.qubit.0;
        if qubit >= self.capabilities.num_qubits {
            return Err(format!(
                "program '{}' targets qubit {} but the device has {}",
                program.name, qubit, self.capabilities.num_qubits
            ));
        }
        program
            .validate()
            .map_err(|e| format!("program '{}': {e}", program.name))?;
        if !program.instructions.iter().any(|i| i.is_measure()) {
            return Err(format!("program '{}' has no measurement", program.name));
        }
        Ok(())
    }

    /// Run a batch synchronously.
    #[instrument(skip(self, programs, options))]
    fn run_simulation(
        &self,
        programs: &[StimulusProgram],
        options: &ExecutionOptions,
    ) -> HalResult<ExecutionResult> {
        let start = Instant::now();
        debug!(
            "Starting simulation: {} programs, {} shots",
            programs.len(),
            options.shots
        );

        let mut results = Vec::with_capacity(programs.len());
        for (index, program) in programs.iter().enumerate() {
            let qubit = program.qubit.0;
            let props = self.capabilities.qubit(qubit).ok_or_else(|| {
                HalError::InvalidProgram(format!("qubit {qubit} not on device"))
            })?;
            let nominal_f12 = props.drive_freq + props.anharmonicity;
            let rho = simulate(
                self.device(qubit),
                program,
                props.drive_freq,
                nominal_f12,
                self.capabilities.timing.dt,
            )?;

            let probabilities = outcome_probabilities(&rho, options.measurement);
            let counts = match self.shot_noise_seed {
                Some(seed) => {
                    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(index as u64));
                    sampled_counts(&probabilities, options.shots, &mut rng)
                }
                None => expected_counts(&probabilities, options.shots),
            };
            results.push(ProgramResult {
                name: program.name.clone(),
                metadata: program.metadata.clone(),
                counts,
                shots: options.shots,
            });
        }

        let elapsed = start.elapsed();
        debug!("Simulation completed in {:?}", elapsed);
        Ok(ExecutionResult::new(results).with_execution_time(elapsed.as_millis() as u64))
    }
}

/// Outcome labels with their probabilities for a measurement mode.
fn outcome_probabilities(rho: &DensityMatrix, mode: MeasurementMode) -> Vec<(&'static str, f64)> {
    let [p0, p1, p2] = rho.populations();
    match mode {
        MeasurementMode::Standard => vec![("0", p0), ("1", (1.0 - p0).max(0.0))],
        MeasurementMode::ExcitedStatePromotion => vec![("0", p0), ("1", p1), ("2", p2)],
    }
}

/// Rounded expectation counts; the last outcome takes the remainder.
fn expected_counts(probabilities: &[(&str, f64)], shots: u32) -> Counts {
    let shots = u64::from(shots);
    let mut counts = Counts::new();
    let mut remaining = shots;
    for (i, (outcome, p)) in probabilities.iter().enumerate() {
        let n = if i + 1 == probabilities.len() {
            remaining
        } else {
            ((p * shots as f64).round() as u64).min(remaining)
        };
        remaining -= n;
        if n > 0 {
            counts.insert(*outcome, n);
        }
    }
    counts
}

fn sampled_counts<R: Rng>(
    probabilities: &[(&str, f64)],
    shots: u32,
    rng: &mut R,
) -> Counts {
    let mut counts = Counts::new();
    for _ in 0..shots {
        let u: f64 = rng.r#gen();
        let mut acc = 0.0;
        let mut chosen = probabilities.last().map_or("0", |(o, _)| *o);
        for (outcome, p) in probabilities {
            acc += p;
            if u < acc {
                chosen = *outcome;
                break;
            }
        }
        counts.insert(chosen, 1);
    }
    counts
}

#[async_trait]
impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.capabilities.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    async fn validate(&self, programs: &[StimulusProgram]) -> HalResult<ValidationResult> {
        let reasons: Vec<String> = programs
            .iter()
            .filter_map(|p| self.check_program(p).err())
            .collect();
        if reasons.is_empty() {
            Ok(ValidationResult::Valid)
        } else {
            Ok(ValidationResult::Invalid { reasons })
        }
    }

    #[instrument(skip(self, programs, options))]
    async fn submit(
        &self,
        programs: &[StimulusProgram],
        options: &ExecutionOptions,
    ) -> HalResult<JobId> {
        if options.shots == 0 || options.shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{} shots requested, simulator accepts 1 to {}",
                options.shots, self.capabilities.max_shots
            )));
        }

        // Generate job ID
        let job_id = JobId::new(Uuid::new_v4().to_string());
        let job = Job::new(job_id.clone(), options.shots, programs.len())
            .with_backend(self.capabilities.name.clone());

        {
            let mut jobs = self
                .jobs
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            jobs.insert(job_id.0.clone(), SimJob { job, result: None });
        }
        debug!("Submitted job: {}", job_id);

        // The batch runs to completion or fails as a unit
        let outcome = self.run_simulation(programs, options);

        let mut jobs = self
            .jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(sim_job) = jobs.get_mut(&job_id.0) {
            match outcome {
                Ok(result) => {
                    sim_job.result = Some(result);
                    sim_job.job = sim_job.job.clone().with_status(JobStatus::Completed);
                }
                Err(e) => {
                    sim_job.job = sim_job
                        .job
                        .clone()
                        .with_status(JobStatus::Failed(e.to_string()));
                }
            }
        }

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let jobs = self
            .jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        jobs.get(&job_id.0)
            .map(|j| j.job.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let jobs = self
            .jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let sim_job = jobs
            .get(&job_id.0)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        match (&sim_job.result, &sim_job.job.status) {
            (Some(result), _) => Ok(result.clone()),
            (None, JobStatus::Failed(msg)) => Err(HalError::JobFailed(msg.clone())),
            (None, _) => Err(HalError::JobNotFound(job_id.0.clone())),
        }
    }
}
