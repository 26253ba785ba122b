//! Amplitude calibration of the EF π and π/2 pulses.

use std::f64::consts::{FRAC_PI_2, PI};

use tracing::debug;

use qcal_analysis::{AnalysisOutput, CurveAnalysis, FineAmplitudeAnalysis, OscillationAnalysis};
use qcal_ir::{ProgramMetadata, QubitId, Series, StimulusProgram};
use qcal_store::ParameterKey;

use super::{BuildContext, CalibrationExperiment, TargetGate, sweep_values, wrapped};
use crate::error::ExpResult;
use crate::options::{ExperimentOptions, OptionValue};
use crate::updater::{
    CalibrationUpdate, amplitude_from_angle_error, amplitude_from_rate, result_value,
};

/// Rabi sweep of the `x12` amplitude.
///
/// Options: `min_amp` (−0.5), `max_amp` (0.5), `num_amps` (51).
#[derive(Debug, Clone)]
pub struct RoughAmplitude {
    qubit: u32,
    options: ExperimentOptions,
}

impl RoughAmplitude {
    /// Create with default options.
    pub fn new(qubit: u32) -> Self {
        let options = ExperimentOptions::new("rough_amp")
            .declare("min_amp", OptionValue::Float(-0.5))
            .declare("max_amp", OptionValue::Float(0.5))
            .declare("num_amps", OptionValue::Int(51));
        Self { qubit, options }
    }
}

impl CalibrationExperiment for RoughAmplitude {
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
        let amps = sweep_values(&self.options, "min_amp", "max_amp", "num_amps")?;
        let context = ctx.qutrit_context(self.qubit, 0.0)?;

        let mut programs = Vec::with_capacity(amps.len());
        for (i, amp) in amps.into_iter().enumerate() {
            let pulse = ctx.resolve("x12", self.qubit, &[("amp", amp)])?;
            let schedule = context.clone().append(&pulse);
            programs.push(wrapped(
                format!("{}_q{}_{i}", self.name(), self.qubit),
                self.qubit,
                ProgramMetadata::at(amp),
                |prog| {
                    prog.pulse(schedule);
                },
            ));
        }
        debug!("Built {} rough amplitude programs", programs.len());
        Ok(programs)
    }

    fn analysis(&self) -> Box<dyn CurveAnalysis> {
        Box::new(OscillationAnalysis::new())
    }

    fn apply_update(
        &self,
        output: &AnalysisOutput,
        ctx: &BuildContext<'_>,
    ) -> ExpResult<Vec<CalibrationUpdate>> {
        let rate = result_value(output, "Ω12")?;
        let mut updates = Vec::with_capacity(2);
        for (gate, half) in [(TargetGate::X12, false), (TargetGate::SX12, true)] {
            let key = ParameterKey::qubit("amp", self.qubit, Some(gate.name()));
            let value = amplitude_from_rate(&key.to_string(), rate, half)?;
            let mut update = CalibrationUpdate::new(key, value, "Ω12", rate);
            if let Ok(previous) = ctx.param("amp", self.qubit, Some(gate.name())) {
                update = update.with_previous(previous);
            }
            updates.push(update);
        }
        Ok(updates)
    }
}

/// Error amplification of `x12` or `sx12`.
///
/// Options: `repetitions` (0..14 for `x12`, odd counts up to 25 for
/// `sx12`). The batch opens with the two SPAM reference points.
#[derive(Debug, Clone)]
pub struct FineAmplitude {
    qubit: u32,
    gate: TargetGate,
    options: ExperimentOptions,
}

impl FineAmplitude {
    /// Create with default options.
    pub fn new(qubit: u32, gate: TargetGate) -> Self {
        let (name, reps) = match gate {
            TargetGate::X12 => ("fine_amp_x12", (0..15).collect()),
            TargetGate::SX12 => (
                "fine_amp_sx12",
                vec![1, 3, 5, 7, 9, 11, 13, 15, 17, 21, 23, 25],
            ),
        };
        let options =
            ExperimentOptions::new(name).declare("repetitions", OptionValue::IntList(reps));
        Self {
            qubit,
            gate,
            options,
        }
    }

    /// Gate under calibration.
    pub fn gate(&self) -> TargetGate {
        self.gate
    }

    fn analysis_model(&self) -> FineAmplitudeAnalysis {
        match self.gate {
            TargetGate::X12 => FineAmplitudeAnalysis::full_rotation(),
            TargetGate::SX12 => FineAmplitudeAnalysis::half_rotation(),
        }
    }

    /// Discriminator references: nothing (all in 0) and a bare `X` (all in
    /// 1). Neither touches the 1–2 transition under calibration.
    fn spam_pair(&self) -> [StimulusProgram; 2] {
        let qubit = QubitId(self.qubit);
        let mut ground =
            StimulusProgram::new(format!("{}_q{}_spam0", self.name(), self.qubit), qubit);
        ground.measure();
        let mut excited =
            StimulusProgram::new(format!("{}_q{}_spam1", self.name(), self.qubit), qubit);
        excited.x().measure();
        [
            ground.with_metadata(ProgramMetadata::at(0.0).with_series(Series::spam_cal())),
            excited.with_metadata(ProgramMetadata::at(1.0).with_series(Series::spam_cal())),
        ]
    }
}

impl CalibrationExperiment for FineAmplitude {
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
        let reps = self.options.counts("repetitions")?;
        let mut programs: Vec<StimulusProgram> = self.spam_pair().into();

        for n in reps {
            let mut prog = StimulusProgram::new(
                format!("{}_q{}_n{n}", self.name(), self.qubit),
                QubitId(self.qubit),
            );
            prog.x();
            if self.gate == TargetGate::X12 {
                prog.gate(TargetGate::SX12.gate());
            }
            for _ in 0..n {
                prog.gate(self.gate.gate());
            }
            prog.x().measure();
            programs.push(prog.with_metadata(ProgramMetadata::at(f64::from(n)).with_nrep(n)));
        }

        for prog in &mut programs {
            ctx.calibrate(prog)?;
        }
        debug!(
            "Built {} fine amplitude programs for {}",
            programs.len(),
            self.gate.name()
        );
        Ok(programs)
    }

    fn analysis(&self) -> Box<dyn CurveAnalysis> {
        Box::new(self.analysis_model())
    }

    fn apply_update(
        &self,
        output: &AnalysisOutput,
        ctx: &BuildContext<'_>,
    ) -> ExpResult<Vec<CalibrationUpdate>> {
        let d_theta = result_value(output, "d_theta12")?;
        let key = ParameterKey::qubit("amp", self.qubit, Some(self.gate.name()));
        let current = ctx.param("amp", self.qubit, Some(self.gate.name()))?;
        let target = match self.gate {
            TargetGate::X12 => PI,
            TargetGate::SX12 => FRAC_PI_2,
        };
        let value = amplitude_from_angle_error(&key.to_string(), current, target, d_theta)?;
        Ok(vec![
            CalibrationUpdate::new(key, value, "d_theta12", d_theta).with_previous(current),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::tests_support::fixture;
    use qcal_analysis::{AnalysisRecord, FitSummary};
    use qcal_ir::{InstructionKind, NativeGate, PulseOp, Waveform};

    fn output(name: &str, value: f64) -> AnalysisOutput {
        AnalysisOutput::new(
            "test",
            vec![AnalysisRecord::new(name, value)],
            FitSummary {
                model: "test".into(),
                params: vec![],
                stderr: None,
                reduced_chisq: Some(1.0),
                dof: 10,
            },
        )
    }

    #[test]
    fn test_rough_amplitude_sweep() {
        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let programs = RoughAmplitude::new(0).build_circuits(&ctx).unwrap();

        assert_eq!(programs.len(), 51);
        let xs: Vec<f64> = programs.iter().map(|p| p.metadata.xval).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(xs[0], -0.5);
        assert_eq!(xs[50], 0.5);

        // the bound amplitude matches the metadata
        for prog in &programs {
            let InstructionKind::Pulse(schedule) = &prog.instructions[1].kind else {
                panic!("expected a pulse");
            };
            let amp = schedule
                .ops
                .iter()
                .find_map(|op| match op {
                    PulseOp::Play { waveform, .. } => Some(waveform.amp()),
                    _ => None,
                })
                .unwrap();
            assert_eq!(amp, prog.metadata.xval);
            assert!(prog.validate().is_ok());
        }
    }

    #[test]
    fn test_rough_amplitude_update() {
        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let exp = RoughAmplitude::new(0);
        let updates = exp.apply_update(&output("Ω12", 1.0 / 0.3), &ctx).unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].key, ParameterKey::qubit("amp", 0, Some("x12")));
        assert!((updates[0].value - 0.15).abs() < 1e-8);
        assert_eq!(updates[0].previous, Some(0.14));
        assert_eq!(updates[1].key, ParameterKey::qubit("amp", 0, Some("sx12")));
        assert!((updates[1].value - 0.075).abs() < 1e-8);
    }

    #[test]
    fn test_fine_amplitude_spam_pair_first() {
        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let programs = FineAmplitude::new(1, TargetGate::X12)
            .build_circuits(&ctx)
            .unwrap();

        assert_eq!(programs.len(), 2 + 15);
        assert!(programs[0].metadata.series.as_ref().unwrap().is_spam_cal());
        assert_eq!(programs[0].metadata.xval, 0.0);
        assert!(programs[1].metadata.series.as_ref().unwrap().is_spam_cal());
        assert_eq!(programs[1].metadata.xval, 1.0);
        assert!(programs[2..].iter().all(|p| p.metadata.series.is_none()));

        // references never use the gate being calibrated
        assert_eq!(programs[0].gates().count(), 0);
        let excited: Vec<&NativeGate> = programs[1].gates().collect();
        assert_eq!(excited, vec![&NativeGate::X]);
        assert!(programs[..2].iter().all(|p| p.gates().all(|g| !g.is_ef())));

        // sx12 preparation, then n × x12
        let n5 = &programs[2 + 5];
        assert_eq!(n5.metadata.nrep, Some(5));
        let gates: Vec<&NativeGate> = n5.gates().collect();
        assert_eq!(gates.len(), 1 + 1 + 5 + 1);
        assert_eq!(*gates[1], NativeGate::SX12);
        assert!(gates[2..7].iter().all(|g| **g == NativeGate::X12));

        for prog in &programs {
            assert!(prog.uncalibrated_gates().is_empty());
        }
    }

    #[test]
    fn test_fine_amplitude_sx12_reps() {
        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let programs = FineAmplitude::new(0, TargetGate::SX12)
            .build_circuits(&ctx)
            .unwrap();
        let reps: Vec<u32> = programs[2..]
            .iter()
            .map(|p| p.metadata.nrep.unwrap())
            .collect();
        assert_eq!(reps, vec![1, 3, 5, 7, 9, 11, 13, 15, 17, 21, 23, 25]);
        let n3 = &programs[3];
        assert_eq!(
            n3.gates().filter(|g| **g == NativeGate::SX12).count(),
            3
        );
    }

    #[test]
    fn test_fine_amplitude_update() {
        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let exp = FineAmplitude::new(0, TargetGate::SX12);
        let updates = exp
            .apply_update(&output("d_theta12", 0.1 * FRAC_PI_2), &ctx)
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert!((updates[0].value - 0.07 / 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_rough_amplitude_pulse_waveform_is_drag() {
        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let programs = RoughAmplitude::new(0).build_circuits(&ctx).unwrap();
        let InstructionKind::Pulse(schedule) = &programs[0].instructions[1].kind else {
            panic!("expected a pulse");
        };
        assert!(matches!(
            schedule.waveforms().next(),
            Some(Waveform::Drag { duration: 160, .. })
        ));
    }
}
