//! Rabi oscillation: `amp·cos(2π·f·x + φ) + base`.

use std::f64::consts::{FRAC_PI_2, PI};

use tracing::debug;

use qcal_hal::ProgramResult;

use crate::analysis::{AnalysisOutput, CurveAnalysis};
use crate::data::CurveData;
use crate::error::AnalysisResult;
use crate::fitter::CurveFitter;
use crate::guess;
use crate::models::{DEFAULT_OUTCOME, param_record, summarize};

const PARAMS: [&str; 4] = ["amp", "freq", "phase", "base"];

/// Cosine fit of an amplitude sweep. Reports the oscillation rate as `Ω12`.
#[derive(Debug, Clone)]
pub struct OscillationAnalysis {
    outcome: String,
    result_name: String,
}

impl Default for OscillationAnalysis {
    fn default() -> Self {
        Self {
            outcome: DEFAULT_OUTCOME.into(),
            result_name: "Ω12".into(),
        }
    }
}

impl OscillationAnalysis {
    /// Create with default outcome and result name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outcome bitstring.
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = outcome.into();
        self
    }

    /// Model value.
    pub fn model(x: f64, p: &[f64]) -> f64 {
        p[0] * (2.0 * PI * p[1] * x + p[2]).cos() + p[3]
    }
}

impl CurveAnalysis for OscillationAnalysis {
    fn name(&self) -> &str {
        "oscillation"
    }

    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput> {
        let data = CurveData::from_results(results, &self.outcome).averaged();
        let (xs, ys) = (data.xs(), data.ys());
        let (x_min, x_max) = data.x_range();
        let span = (x_max - x_min).max(f64::EPSILON);
        let step = span / (data.len().max(2) - 1) as f64;
        let nyquist = 0.5 / step;

        let base0 = ys.iter().sum::<f64>() / ys.len().max(1) as f64;
        let amp0 = (guess::ptp(&ys) / 2.0).max(1e-3);
        let freq0 = guess::frequency(&xs, &ys).clamp(1.0 / span / 4.0, nyquist);

        let starts: Vec<Vec<f64>> = [-FRAC_PI_2, 0.0, FRAC_PI_2, PI]
            .iter()
            .flat_map(|&phase| {
                [0.5, 1.0].map(|scale| vec![amp0, freq0 * scale, phase, base0])
            })
            .collect();

        let fitter = CurveFitter::new(vec![
            (0.0, 1.5),
            (0.0, nyquist),
            (-2.0 * PI, 2.0 * PI),
            (-1.0, 1.5),
        ]);
        let fit = fitter.fit(Self::model, &data, &starts)?;
        debug!("Oscillation fit: freq={:.5}", fit.params[1]);

        Ok(AnalysisOutput::new(
            self.name(),
            vec![param_record(&self.result_name, 1, &fit)],
            summarize(self.name(), &PARAMS, &fit),
        ))
    }
}
