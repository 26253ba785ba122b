//! DRAG coefficient sweep.
//!
//! Each point repeats the pair `gate(β, 0)`, `gate(β, π)` `n` times. The
//! pair is the identity for the right β; away from it the phase error
//! builds up `n` times faster, so the rep series share one crossing.

use std::f64::consts::PI;

use tracing::debug;

use qcal_analysis::{AnalysisOutput, CurveAnalysis, DragAnalysis};
use qcal_ir::{ProgramMetadata, StimulusProgram};
use qcal_store::ParameterKey;

use super::{BuildContext, CalibrationExperiment, TargetGate, sweep_values, wrapped};
use crate::error::ExpResult;
use crate::options::{ExperimentOptions, OptionValue};
use crate::updater::{CalibrationUpdate, drag_coefficient, result_value};

/// Rough DRAG calibration of `x12` or `sx12`.
///
/// Options: `min_beta` (−5), `max_beta` (5), `num_betas` (51), `reps`
/// ([1, 3, 5]).
#[derive(Debug, Clone)]
pub struct RoughDrag {
    qubit: u32,
    gate: TargetGate,
    options: ExperimentOptions,
}

impl RoughDrag {
    /// Create with default options.
    pub fn new(qubit: u32, gate: TargetGate) -> Self {
        let name = match gate {
            TargetGate::X12 => "rough_drag_x12",
            TargetGate::SX12 => "rough_drag_sx12",
        };
        let options = ExperimentOptions::new(name)
            .declare("min_beta", OptionValue::Float(-5.0))
            .declare("max_beta", OptionValue::Float(5.0))
            .declare("num_betas", OptionValue::Int(51))
            .declare("reps", OptionValue::IntList(vec![1, 3, 5]));
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
}

impl CalibrationExperiment for RoughDrag {
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
        let betas = sweep_values(&self.options, "min_beta", "max_beta", "num_betas")?;
        let reps = self.options.counts("reps")?;
        let context = ctx.qutrit_context(self.qubit, 0.0)?;
        let template = self.gate.name();

        let mut programs = Vec::with_capacity(reps.len() * betas.len());
        for &n in &reps {
            for (i, &beta) in betas.iter().enumerate() {
                let plus = ctx.resolve(template, self.qubit, &[("β", beta), ("angle", 0.0)])?;
                let minus = ctx.resolve(template, self.qubit, &[("β", beta), ("angle", PI)])?;
                let mut schedule = context.clone();
                for _ in 0..n {
                    schedule = schedule.append(&plus).append(&minus);
                }
                programs.push(wrapped(
                    format!("{}_q{}_n{n}_{i}", self.name(), self.qubit),
                    self.qubit,
                    ProgramMetadata::at(beta).with_nrep(n),
                    |prog| {
                        prog.pulse(schedule);
                    },
                ));
            }
        }
        debug!(
            "Built {} DRAG programs for {} ({} rep series)",
            programs.len(),
            template,
            reps.len()
        );
        Ok(programs)
    }

    fn analysis(&self) -> Box<dyn CurveAnalysis> {
        Box::new(DragAnalysis::new())
    }

    fn apply_update(
        &self,
        output: &AnalysisOutput,
        ctx: &BuildContext<'_>,
    ) -> ExpResult<Vec<CalibrationUpdate>> {
        let beta = result_value(output, "β12")?;
        let key = ParameterKey::qubit("β", self.qubit, Some(self.gate.name()));
        let value = drag_coefficient(&key.to_string(), beta)?;
        let mut update = CalibrationUpdate::new(key, value, "β12", beta);
        if let Ok(previous) = ctx.param("β", self.qubit, Some(self.gate.name())) {
            update = update.with_previous(previous);
        }
        Ok(vec![update])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::tests_support::fixture;
    use qcal_ir::{InstructionKind, Waveform};

    #[test]
    fn test_reps_are_the_outer_loop() {
        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let programs = RoughDrag::new(0, TargetGate::X12)
            .build_circuits(&ctx)
            .unwrap();

        assert_eq!(programs.len(), 3 * 51);
        assert_eq!(programs[0].metadata.nrep, Some(1));
        assert_eq!(programs[51].metadata.nrep, Some(3));
        assert_eq!(programs[102].metadata.nrep, Some(5));
        assert_eq!(programs[0].metadata.xval, -5.0);
        assert_eq!(programs[50].metadata.xval, 5.0);
    }

    #[test]
    fn test_pulse_pairs() {
        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let programs = RoughDrag::new(0, TargetGate::SX12)
            .build_circuits(&ctx)
            .unwrap();

        let prog = &programs[51 + 10];
        let InstructionKind::Pulse(schedule) = &prog.instructions[1].kind else {
            panic!("expected a pulse");
        };
        let waveforms: Vec<&Waveform> = schedule.waveforms().collect();
        assert_eq!(waveforms.len(), 2 * 3);
        for pair in waveforms.chunks(2) {
            assert_eq!(pair[0].angle(), 0.0);
            assert_eq!(pair[1].angle(), PI);
            assert_eq!(pair[0].beta(), prog.metadata.xval);
            assert_eq!(pair[0].amp(), 0.07);
        }
    }

    #[test]
    fn test_update_writes_beta() {
        use qcal_analysis::{AnalysisRecord, FitSummary};

        let (store, library, caps) = fixture();
        let ctx = BuildContext::new(&store, &library, &caps.timing);
        let output = AnalysisOutput::new(
            "drag",
            vec![AnalysisRecord::new("β12", -1.3)],
            FitSummary {
                model: "drag".into(),
                params: vec![],
                stderr: None,
                reduced_chisq: Some(1.1),
                dof: 150,
            },
        );
        let updates = RoughDrag::new(1, TargetGate::X12)
            .apply_update(&output, &ctx)
            .unwrap();
        assert_eq!(updates[0].key, ParameterKey::qubit("β", 1, Some("x12")));
        assert_eq!(updates[0].value, -1.3);
        assert_eq!(updates[0].previous, Some(0.0));
    }
}
