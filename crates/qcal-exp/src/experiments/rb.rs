//! Randomized benchmarking of the calibrated EF gates.

use qcal_analysis::{AnalysisOutput, CurveAnalysis, RbDecayAnalysis};
use qcal_bench::{BenchmarkResult, RbConfig, RbMode, default_lengths, generate_programs, rb_result};
use qcal_ir::{QubitId, StimulusProgram};

use super::{BuildContext, CalibrationExperiment};
use crate::error::{ExpError, ExpResult};
use crate::options::{ExperimentOptions, OptionValue};
use crate::updater::{CalibrationUpdate, result_value};

/// Standard or polar RB on one qubit. Reports fidelity, updates nothing.
///
/// Options: `lengths` (15 lengths from 1 to 100), `num_samples` (5),
/// `seed` (123).
#[derive(Debug, Clone)]
pub struct RandomizedBenchmarking {
    qubit: u32,
    mode: RbMode,
    options: ExperimentOptions,
}

impl RandomizedBenchmarking {
    /// Create with default options.
    pub fn new(qubit: u32, mode: RbMode) -> Self {
        let lengths = default_lengths(1, 100, 15)
            .into_iter()
            .map(i64::from)
            .collect();
        let name = match mode {
            RbMode::Standard => "rb_standard",
            RbMode::Polar => "rb_polar",
        };
        let options = ExperimentOptions::new(name)
            .declare("lengths", OptionValue::IntList(lengths))
            .declare("num_samples", OptionValue::Int(5))
            .declare("seed", OptionValue::Int(123));
        Self {
            qubit,
            mode,
            options,
        }
    }

    /// Sampling mode.
    pub fn mode(&self) -> RbMode {
        self.mode
    }

    /// Synthesizer configuration from the options.
    pub fn config(&self) -> ExpResult<RbConfig> {
        let num_samples =
            u32::try_from(self.options.count("num_samples")?).map_err(|_| {
                ExpError::InvalidOption {
                    name: "num_samples".into(),
                    reason: "too large".into(),
                }
            })?;
        Ok(RbConfig {
            lengths: self.options.counts("lengths")?,
            num_samples,
            seed: self.options.count("seed")?,
            mode: self.mode,
        })
    }

    /// Benchmark report from a decay fit.
    pub fn benchmark_result(&self, output: &AnalysisOutput) -> ExpResult<BenchmarkResult> {
        let alpha = result_value(output, "α")?;
        let epc = result_value(output, "EPC")?;
        let lengths = self.options.counts("lengths")?;
        Ok(rb_result(self.mode, self.qubit, epc, alpha, &lengths))
    }
}

impl CalibrationExperiment for RandomizedBenchmarking {
    fn name(&self) -> &str {
        self.options.experiment()
    }

    fn qubit(&self) -> u32 {
        self.qubit
    }

    fn options(&self) -> &ExperimentOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut ExperimentOptions {
        &mut self.options
    }

    fn build_circuits(&self, ctx: &BuildContext<'_>) -> ExpResult<Vec<StimulusProgram>> {
        let mut programs = generate_programs(&self.config()?, QubitId(self.qubit))?;
        for prog in &mut programs {
            ctx.calibrate(prog)?;
        }
        Ok(programs)
    }

    fn analysis(&self) -> Box<dyn CurveAnalysis> {
        Box::new(RbDecayAnalysis::new())
    }

    fn apply_update(
        &self,
        _output: &AnalysisOutput,
        _ctx: &BuildContext<'_>,
    ) -> ExpResult<Vec<CalibrationUpdate>> {
        Ok(Vec::new())
    }
}
