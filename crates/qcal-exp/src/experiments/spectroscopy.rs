//! Anharmonicity spectroscopy of the 1–2 transition.
//!
//! A weak Gaussian is played at `f01 + α + detuning` for each detuning of
//! the sweep. The resonance offset from zero detuning corrects `α`.

use tracing::debug;

use qcal_analysis::{
    AnalysisOutput, CurveAnalysis, DoubleResonanceAnalysis, MultiCurveAnalysis,
    ResonanceAnalysis,
};
use qcal_ir::{ProgramMetadata, StimulusProgram, Waveform};
use qcal_store::ParameterKey;

use super::{BuildContext, CalibrationExperiment, sweep_values, wrapped};
use crate::error::{ExpError, ExpResult};
use crate::options::{ExperimentOptions, OptionValue};
use crate::updater::{CalibrationUpdate, result_value, shifted_anharmonicity};

/// A Gaussian drive at each detuning, wrapped in `X … X`.
fn detuning_sweep(
    name: &str,
    qubit: u32,
    detunings: &[f64],
    pulse: &Waveform,
    ctx: &BuildContext<'_>,
) -> ExpResult<Vec<StimulusProgram>> {
    let channel = ctx.store.qutrit_channel(qubit)?;
    detunings
        .iter()
        .enumerate()
        .map(|(i, &detuning)| {
            let schedule = ctx
                .qutrit_context(qubit, detuning)?
                .play(pulse.clone(), channel);
            Ok(wrapped(
                format!("{name}_q{qubit}_{i}"),
                qubit,
                ProgramMetadata::at(detuning),
                |prog| {
                    prog.pulse(schedule);
                },
            ))
        })
        .collect()
}

fn anharmonicity_update(
    qubit: u32,
    offset: f64,
    result_name: &str,
    ctx: &BuildContext<'_>,
) -> ExpResult<Vec<CalibrationUpdate>> {
    let key = ParameterKey::qubit("α", qubit, None);
    let current = ctx.param("α", qubit, None)?;
    let value = shifted_anharmonicity(&key.to_string(), current, offset)?;
    Ok(vec![
        CalibrationUpdate::new(key, value, result_name, offset).with_previous(current),
    ])
}

/// Wide search for the 1–2 line.
///
/// Options: `min_detuning` (−20 MHz), `max_detuning` (20 MHz),
/// `num_points` (101), `duration` (1120), `sigma` (280), `amp` (0.01).
#[derive(Debug, Clone)]
pub struct RoughFrequency {
    qubit: u32,
    options: ExperimentOptions,
}

impl RoughFrequency {
    /// Create with default options.
    pub fn new(qubit: u32) -> Self {
        let options = ExperimentOptions::new("rough_freq")
            .declare("min_detuning", OptionValue::Float(-20e6))
            .declare("max_detuning", OptionValue::Float(20e6))
            .declare("num_points", OptionValue::Int(101))
            .declare("duration", OptionValue::Int(1120))
            .declare("sigma", OptionValue::Float(280.0))
            .declare("amp", OptionValue::Float(0.01));
        Self { qubit, options }
    }
}

impl CalibrationExperiment for RoughFrequency {
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
        let detunings =
            sweep_values(&self.options, "min_detuning", "max_detuning", "num_points")?;
        let pulse = Waveform::Gaussian {
            duration: self.options.count("duration")?,
            amp: self.options.float("amp")?,
            sigma: self.options.float("sigma")?,
            angle: 0.0,
        };
        let programs = detuning_sweep(self.name(), self.qubit, &detunings, &pulse, ctx)?;
        debug!("Built {} spectroscopy programs", programs.len());
        Ok(programs)
    }

    fn analysis(&self) -> Box<dyn CurveAnalysis> {
        Box::new(ResonanceAnalysis::new())
    }

    fn apply_update(
        &self,
        output: &AnalysisOutput,
        ctx: &BuildContext<'_>,
    ) -> ExpResult<Vec<CalibrationUpdate>> {
        let offset = result_value(output, "Δα")?;
        anharmonicity_update(self.qubit, offset, "Δα", ctx)
    }
}

/// Narrow scan around the current line with a π-area pulse.
///
/// Both a single and a double line are fitted and the better one wins. A
/// double line corrects `α` by the mean of the two centres.
///
/// Options: `min_detuning` (−3 MHz), `max_detuning` (3 MHz), `num_points`
/// (150), `resolution` (1 MHz).
#[derive(Debug, Clone)]
pub struct NarrowBandSpectroscopy {
    qubit: u32,
    options: ExperimentOptions,
}

impl NarrowBandSpectroscopy {
    /// Create with default options.
    pub fn new(qubit: u32) -> Self {
        let options = ExperimentOptions::new("narrow_band")
            .declare("min_detuning", OptionValue::Float(-3e6))
            .declare("max_detuning", OptionValue::Float(3e6))
            .declare("num_points", OptionValue::Int(150))
            .declare("resolution", OptionValue::Float(1e6));
        Self { qubit, options }
    }

    /// π-area Gaussian long enough to resolve `resolution`.
    fn pulse(&self, ctx: &BuildContext<'_>) -> ExpResult<Waveform> {
        let resolution = self.options.float("resolution")?;
        if !(resolution > 0.0) {
            return Err(ExpError::InvalidOption {
                name: "resolution".into(),
                reason: "must be positive".into(),
            });
        }
        let duration = ctx.timing.round_pulse_time(4.0 / resolution);
        let sigma = duration as f64 / 4.0;
        let amp_x12 = ctx.param("amp", self.qubit, Some("x12"))?;
        let sigma_x12 = ctx.param("σ", self.qubit, Some("x12"))?;
        Ok(Waveform::Gaussian {
            duration,
            amp: amp_x12 * sigma_x12 / sigma,
            sigma,
            angle: 0.0,
        })
    }
}

impl CalibrationExperiment for NarrowBandSpectroscopy {
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
        let detunings =
            sweep_values(&self.options, "min_detuning", "max_detuning", "num_points")?;
        let pulse = self.pulse(ctx)?;
        debug!(
            "Narrow-band pulse: duration={} amp={:.5}",
            pulse.duration(),
            pulse.amp()
        );
        detuning_sweep(self.name(), self.qubit, &detunings, &pulse, ctx)
    }

    fn analysis(&self) -> Box<dyn CurveAnalysis> {
        Box::new(
            MultiCurveAnalysis::new("narrow_band")
                .with_candidate(DoubleResonanceAnalysis::new())
                .with_candidate(ResonanceAnalysis::new()),
        )
    }

    fn apply_update(
        &self,
        output: &AnalysisOutput,
        ctx: &BuildContext<'_>,
    ) -> ExpResult<Vec<CalibrationUpdate>> {
        match (output.value("Δα0"), output.value("Δα1")) {
            (Some(a), Some(b)) => anharmonicity_update(self.qubit, (a + b) / 2.0, "Δα0,Δα1", ctx),
            _ => {
                let offset = result_value(output, "Δα")?;
                anharmonicity_update(self.qubit, offset, "Δα", ctx)
            }
        }
    }
}
