//! The closed set of calibration experiments.
//!
//! Every flavor implements [`CalibrationExperiment`]; [`Experiment`] is the
//! tagged union the pipeline and the CLI work with.

pub mod amplitude;
pub mod drag;
pub mod rb;
pub mod spectroscopy;

pub use amplitude::{FineAmplitude, RoughAmplitude};
pub use drag::RoughDrag;
pub use rb::RandomizedBenchmarking;
pub use spectroscopy::{NarrowBandSpectroscopy, RoughFrequency};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use qcal_analysis::{AnalysisOutput, CurveAnalysis};
use qcal_bench::RbMode;
use qcal_hal::{ExecutionOptions, MeasurementMode, Timing};
use qcal_ir::{NativeGate, ProgramMetadata, QubitId, Schedule, StimulusProgram};
use qcal_store::{CalibrationStore, ParameterKey, TemplateLibrary, format_param, linspace};

use crate::error::{ExpError, ExpResult};
use crate::options::{ExperimentOptions, OptionValue};
use crate::updater::CalibrationUpdate;

/// Read-only view of everything circuit construction needs.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Parameter store.
    pub store: &'a CalibrationStore,
    /// Gate templates.
    pub library: &'a TemplateLibrary,
    /// Device timing constraints.
    pub timing: &'a Timing,
    /// Point in time whose parameter values are used (default: now).
    pub at: Option<DateTime<Utc>>,
}

impl<'a> BuildContext<'a> {
    /// Context reading current values.
    pub fn new(store: &'a CalibrationStore, library: &'a TemplateLibrary, timing: &'a Timing) -> Self {
        Self {
            store,
            library,
            timing,
            at: None,
        }
    }

    /// Current value of a per-qubit parameter.
    pub fn param(&self, name: &str, qubit: u32, schedule: Option<&str>) -> ExpResult<f64> {
        Ok(self
            .store
            .get_current(&ParameterKey::qubit(name, qubit, schedule), self.at)?)
    }

    /// A gate template resolved with some symbols overridden.
    pub fn resolve(
        &self,
        template: &str,
        qubit: u32,
        overrides: &[(&str, f64)],
    ) -> ExpResult<Schedule> {
        let overrides: BTreeMap<String, f64> = overrides
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect();
        Ok(self
            .library
            .resolve(template, qubit, self.store, &overrides, self.at)?)
    }

    /// Frequency setup for the 1–2 transition, offset by `detuning`.
    pub fn qutrit_context(&self, qubit: u32, detuning: f64) -> ExpResult<Schedule> {
        Ok(self
            .library
            .qutrit_context(self.store, qubit, detuning, self.at)?)
    }

    /// Attach schedules for the EF gates of a program.
    pub fn calibrate(&self, program: &mut StimulusProgram) -> ExpResult<()> {
        Ok(self
            .library
            .calibrate_program(program, self.store, self.at)?)
    }
}

/// A calibratable gate of the 1–2 transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetGate {
    /// π rotation.
    X12,
    /// π/2 rotation.
    SX12,
}

impl TargetGate {
    /// Template and schedule name.
    pub fn name(&self) -> &'static str {
        match self {
            TargetGate::X12 => "x12",
            TargetGate::SX12 => "sx12",
        }
    }

    /// Native gate.
    pub fn gate(&self) -> NativeGate {
        match self {
            TargetGate::X12 => NativeGate::X12,
            TargetGate::SX12 => NativeGate::SX12,
        }
    }
}

/// Shared interface of all experiment flavors.
pub trait CalibrationExperiment: Send + Sync {
    /// Experiment name.
    fn name(&self) -> &str;

    /// Physical qubit.
    fn qubit(&self) -> u32;

    /// Current options.
    fn options(&self) -> &ExperimentOptions;

    /// Mutable options.
    fn options_mut(&mut self) -> &mut ExperimentOptions;

    /// Build the sweep, one program per data point, in submission order.
    fn build_circuits(&self, ctx: &BuildContext<'_>) -> ExpResult<Vec<StimulusProgram>>;

    /// Analysis applied to the returned results.
    fn analysis(&self) -> Box<dyn CurveAnalysis>;

    /// Parameter updates implied by a non-empty analysis output.
    fn apply_update(
        &self,
        output: &AnalysisOutput,
        ctx: &BuildContext<'_>,
    ) -> ExpResult<Vec<CalibrationUpdate>>;

    /// Set one option by name.
    fn set_option(&mut self, name: &str, value: OptionValue) -> ExpResult<()> {
        self.options_mut().set(name, value)
    }

    /// Shots, repetition delay and discriminator mode from the options.
    fn execution_options(&self) -> ExpResult<ExecutionOptions> {
        let opts = self.options();
        let shots = u32::try_from(opts.count("shots")?).map_err(|_| ExpError::InvalidOption {
            name: "shots".into(),
            reason: "too large".into(),
        })?;
        if shots == 0 {
            return Err(ExpError::InvalidOption {
                name: "shots".into(),
                reason: "must be positive".into(),
            });
        }
        let measurement = if opts.flag("use_measure_esp")? {
            MeasurementMode::ExcitedStatePromotion
        } else {
            MeasurementMode::Standard
        };
        Ok(ExecutionOptions::default()
            .with_shots(shots)
            .with_rep_delay(opts.float("rep_delay")?)
            .with_measurement(measurement))
    }
}

/// Rounded, strictly increasing sweep values over `[min, max]`.
pub(crate) fn sweep_values(
    opts: &ExperimentOptions,
    min: &str,
    max: &str,
    num: &str,
) -> ExpResult<Vec<f64>> {
    let (lo, hi) = (opts.float(min)?, opts.float(max)?);
    let n = opts.count(num)? as usize;
    if n == 0 || !(lo <= hi) {
        return Err(ExpError::InvalidOption {
            name: num.to_string(),
            reason: format!("empty sweep over [{lo}, {hi}] with {n} points"),
        });
    }
    let mut values: Vec<f64> = linspace(lo, hi, n).into_iter().map(format_param).collect();
    values.dedup();
    Ok(values)
}

/// `X`, the body, `X`, measure.
pub(crate) fn wrapped(
    name: String,
    qubit: u32,
    metadata: ProgramMetadata,
    body: impl FnOnce(&mut StimulusProgram),
) -> StimulusProgram {
    let mut prog = StimulusProgram::new(name, QubitId(qubit));
    prog.x();
    body(&mut prog);
    prog.x().measure();
    prog.with_metadata(metadata)
}

/// One of the supported experiments.
#[derive(Debug, Clone)]
pub enum Experiment {
    /// Rabi sweep of the π amplitude.
    RoughAmplitude(RoughAmplitude),
    /// Error amplification of a π or π/2 gate.
    FineAmplitude(FineAmplitude),
    /// DRAG coefficient sweep.
    RoughDrag(RoughDrag),
    /// Wide anharmonicity search.
    RoughFrequency(RoughFrequency),
    /// Narrow anharmonicity scan with model selection.
    NarrowBand(NarrowBandSpectroscopy),
    /// Randomized benchmarking.
    Rb(RandomizedBenchmarking),
}

/// Names accepted by [`Experiment::from_name`].
pub const EXPERIMENT_NAMES: [&str; 9] = [
    "rough_amp",
    "fine_amp_x12",
    "fine_amp_sx12",
    "rough_drag_x12",
    "rough_drag_sx12",
    "rough_freq",
    "narrow_band",
    "rb_standard",
    "rb_polar",
];

impl Experiment {
    /// Create an experiment by name with default options.
    pub fn from_name(name: &str, qubit: u32) -> ExpResult<Self> {
        Ok(match name {
            "rough_amp" => Experiment::RoughAmplitude(RoughAmplitude::new(qubit)),
            "fine_amp_x12" => Experiment::FineAmplitude(FineAmplitude::new(qubit, TargetGate::X12)),
            "fine_amp_sx12" => {
                Experiment::FineAmplitude(FineAmplitude::new(qubit, TargetGate::SX12))
            }
            "rough_drag_x12" => Experiment::RoughDrag(RoughDrag::new(qubit, TargetGate::X12)),
            "rough_drag_sx12" => Experiment::RoughDrag(RoughDrag::new(qubit, TargetGate::SX12)),
            "rough_freq" => Experiment::RoughFrequency(RoughFrequency::new(qubit)),
            "narrow_band" => Experiment::NarrowBand(NarrowBandSpectroscopy::new(qubit)),
            "rb_standard" => Experiment::Rb(RandomizedBenchmarking::new(qubit, RbMode::Standard)),
            "rb_polar" => Experiment::Rb(RandomizedBenchmarking::new(qubit, RbMode::Polar)),
            other => return Err(ExpError::UnknownExperiment(other.to_string())),
        })
    }

    fn inner(&self) -> &dyn CalibrationExperiment {
        match self {
            Experiment::RoughAmplitude(e) => e,
            Experiment::FineAmplitude(e) => e,
            Experiment::RoughDrag(e) => e,
            Experiment::RoughFrequency(e) => e,
            Experiment::NarrowBand(e) => e,
            Experiment::Rb(e) => e,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn CalibrationExperiment {
        match self {
            Experiment::RoughAmplitude(e) => e,
            Experiment::FineAmplitude(e) => e,
            Experiment::RoughDrag(e) => e,
            Experiment::RoughFrequency(e) => e,
            Experiment::NarrowBand(e) => e,
            Experiment::Rb(e) => e,
        }
    }
}

impl CalibrationExperiment for Experiment {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn qubit(&self) -> u32 {
        self.inner().qubit()
    }

    fn options(&self) -> &ExperimentOptions {
        self.inner().options()
    }

    fn options_mut(&mut self) -> &mut ExperimentOptions {
        self.inner_mut().options_mut()
    }

    fn build_circuits(&self, ctx: &BuildContext<'_>) -> ExpResult<Vec<StimulusProgram>> {
        self.inner().build_circuits(ctx)
    }

    fn analysis(&self) -> Box<dyn CurveAnalysis> {
        self.inner().analysis()
    }

    fn apply_update(
        &self,
        output: &AnalysisOutput,
        ctx: &BuildContext<'_>,
    ) -> ExpResult<Vec<CalibrationUpdate>> {
        self.inner().apply_update(output, ctx)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_every_name_builds() {
        for name in EXPERIMENT_NAMES {
            let exp = Experiment::from_name(name, 1).unwrap();
            assert_eq!(exp.name(), name);
            assert_eq!(exp.qubit(), 1);
        }
        assert!(matches!(
            Experiment::from_name("t1", 0),
            Err(ExpError::UnknownExperiment(_))
        ));
    }

    #[test]
    fn test_unknown_option_through_enum() {
        let mut exp = Experiment::from_name("rough_amp", 0).unwrap();
        let err = exp.set_option("seed", OptionValue::Int(3)).unwrap_err();
        assert!(matches!(err, ExpError::UnknownOption { .. }));
        exp.set_option("shots", OptionValue::Int(4000)).unwrap();
        assert_eq!(exp.execution_options().unwrap().shots, 4000);
    }

    #[test]
    fn test_measure_esp_option() {
        let mut exp = Experiment::from_name("rough_freq", 0).unwrap();
        exp.set_option("use_measure_esp", OptionValue::Bool(true))
            .unwrap();
        assert_eq!(
            exp.execution_options().unwrap().measurement,
            MeasurementMode::ExcitedStatePromotion
        );
    }

    #[test]
    fn test_zero_shots_rejected() {
        let mut exp = Experiment::from_name("rough_amp", 0).unwrap();
        exp.set_option("shots", OptionValue::Int(0)).unwrap();
        assert!(matches!(
            exp.execution_options(),
            Err(ExpError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_sweep_values_are_rounded_and_distinct() {
        let opts = ExperimentOptions::new("t")
            .declare("lo", OptionValue::Float(-0.5))
            .declare("hi", OptionValue::Float(0.5))
            .declare("n", OptionValue::Int(51));
        let values = sweep_values(&opts, "lo", "hi", "n").unwrap();
        assert_eq!(values.len(), 51);
        assert_eq!(values[0], -0.5);
        assert_eq!(values[25], 0.0);
        assert_eq!(values[50], 0.5);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_sweep_rejected() {
        let opts = ExperimentOptions::new("t")
            .declare("lo", OptionValue::Float(1.0))
            .declare("hi", OptionValue::Float(-1.0))
            .declare("n", OptionValue::Int(5));
        assert!(matches!(
            sweep_values(&opts, "lo", "hi", "n"),
            Err(ExpError::InvalidOption { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_sweep_values_sorted_and_distinct(
            lo in -10.0f64..0.0,
            span in 0.01f64..20.0,
            n in 1i64..200,
        ) {
            let opts = ExperimentOptions::new("t")
                .declare("lo", OptionValue::Float(lo))
                .declare("hi", OptionValue::Float(lo + span))
                .declare("n", OptionValue::Int(n));
            let values = sweep_values(&opts, "lo", "hi", "n").unwrap();
            prop_assert!(!values.is_empty());
            prop_assert!(values.len() <= n as usize);
            prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
            for v in values {
                prop_assert_eq!(format_param(v), v);
            }
        }
    }
}
