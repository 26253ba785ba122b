//! Error amplification: `amp/2·cos((dθ + apg)·x − phase_offset) + base`.
//!
//! `x` is the repetition count and `apg` the nominal angle per gate. The
//! two SPAM reference points of the same batch rescale the data to the
//! 0–1 range before the fit.

use std::f64::consts::{FRAC_PI_2, PI};

use tracing::debug;

use qcal_hal::ProgramResult;

use crate::analysis::{AnalysisOutput, CurveAnalysis};
use crate::data::CurveData;
use crate::error::{AnalysisError, AnalysisResult};
use crate::fitter::CurveFitter;
use crate::models::{DEFAULT_OUTCOME, param_record, summarize};

const PARAMS: [&str; 3] = ["amp", "d_theta", "base"];

/// Rotation-error fit for an amplified gate sequence. Reports `d_theta12`.
#[derive(Debug, Clone)]
pub struct FineAmplitudeAnalysis {
    angle_per_gate: f64,
    phase_offset: f64,
    outcome: String,
    result_name: String,
}

impl FineAmplitudeAnalysis {
    /// Create for a gate of nominal angle `angle_per_gate`.
    pub fn new(angle_per_gate: f64, phase_offset: f64) -> Self {
        Self {
            angle_per_gate,
            phase_offset,
            outcome: DEFAULT_OUTCOME.into(),
            result_name: "d_theta12".into(),
        }
    }

    /// Full rotation after a half-rotation preparation.
    pub fn full_rotation() -> Self {
        Self::new(PI, FRAC_PI_2)
    }

    /// Half rotation.
    pub fn half_rotation() -> Self {
        Self::new(FRAC_PI_2, PI)
    }

    /// Nominal angle per gate.
    pub fn angle_per_gate(&self) -> f64 {
        self.angle_per_gate
    }

    fn model(&self) -> impl Fn(f64, &[f64]) -> f64 + '_ {
        move |x, p| {
            p[0] / 2.0 * ((p[1] + self.angle_per_gate) * x - self.phase_offset).cos() + p[2]
        }
    }
}

impl CurveAnalysis for FineAmplitudeAnalysis {
    fn name(&self) -> &str {
        "fine_amplitude"
    }

    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput> {
        let all = CurveData::from_results(results, &self.outcome);
        let (y0, y1) = all
            .spam_references()
            .ok_or_else(|| AnalysisError::MissingSeries("spam-cal".into()))?;
        if (y1 - y0).abs() < 1e-6 {
            return Err(AnalysisError::InvalidData(
                "SPAM references are indistinguishable".into(),
            ));
        }
        let data = all.main_series().normalized(y0, y1);

        let apg = self.angle_per_gate;
        let starts: Vec<Vec<f64>> = (-4..=4)
            .map(|i| vec![1.0, apg * 0.05 * f64::from(i), 0.5])
            .collect();
        let fitter = CurveFitter::new(vec![(0.0, 2.0), (-apg / 2.0, apg / 2.0), (-1.0, 1.0)]);
        let fit = fitter.fit(self.model(), &data, &starts)?;
        debug!("Fine amplitude fit: d_theta={:.6}", fit.params[1]);

        Ok(AnalysisOutput::new(
            self.name(),
            vec![param_record(&self.result_name, 1, &fit).with_unit("rad")],
            summarize(self.name(), &PARAMS, &fit),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests_support::result_at;
    use qcal_ir::{ProgramMetadata, Series};

    fn batch(angle: impl Fn(u32) -> f64, reps: &[u32]) -> Vec<ProgramResult> {
        let mut results = vec![
            result_at(ProgramMetadata::at(0.0).with_series(Series::spam_cal()), 0.0, 1024),
            result_at(ProgramMetadata::at(1.0).with_series(Series::spam_cal()), 1.0, 1024),
        ];
        for &n in reps {
            let p = 0.5 - 0.5 * angle(n).cos();
            results.push(result_at(ProgramMetadata::at(f64::from(n)).with_nrep(n), p, 1024));
        }
        results
    }

    #[test]
    fn test_full_rotation_error() {
        let d_theta = 0.04;
        let reps: Vec<u32> = (0..15).collect();
        let results = batch(|n| FRAC_PI_2 + f64::from(n) * (PI + d_theta), &reps);
        let out = FineAmplitudeAnalysis::full_rotation().run(&results).unwrap();
        let fitted = out.value("d_theta12").unwrap();
        assert!((fitted - d_theta).abs() < 0.005, "d_theta {fitted}");
    }

    #[test]
    fn test_half_rotation_error() {
        let d_theta = -0.03;
        let reps = [1, 3, 5, 7, 9, 11, 13, 15, 17, 21, 23, 25];
        let results = batch(|n| f64::from(n) * (FRAC_PI_2 + d_theta), &reps);
        let out = FineAmplitudeAnalysis::half_rotation().run(&results).unwrap();
        let fitted = out.value("d_theta12").unwrap();
        assert!((fitted - d_theta).abs() < 0.005, "d_theta {fitted}");
    }

    #[test]
    fn test_missing_spam_points() {
        let results = batch(|n| f64::from(n) * PI, &[0, 1, 2, 3, 4, 5]);
        let err = FineAmplitudeAnalysis::full_rotation()
            .run(&results[2..])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingSeries(_)));
    }
}
