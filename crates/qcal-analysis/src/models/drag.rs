//! DRAG coefficient: `amp·cos(2π·n·f·(x − β)) + base` shared across the
//! repetition series.
//!
//! Every series is minimal at `x = β`, so the coefficient is where the
//! curves for all repetition counts dip together.

use std::f64::consts::PI;

use tracing::debug;

use qcal_hal::ProgramResult;

use crate::analysis::{AnalysisOutput, CurveAnalysis};
use crate::data::CurveData;
use crate::error::{AnalysisError, AnalysisResult};
use crate::fitter::CurveFitter;
use crate::guess;
use crate::models::{DEFAULT_OUTCOME, param_record, summarize};

const PARAMS: [&str; 4] = ["amp", "freq", "beta", "base"];

/// Fit of a DRAG sweep over several repetition counts. Reports `β12`.
#[derive(Debug, Clone)]
pub struct DragAnalysis {
    outcome: String,
    result_name: String,
}

impl Default for DragAnalysis {
    fn default() -> Self {
        Self {
            outcome: DEFAULT_OUTCOME.into(),
            result_name: "β12".into(),
        }
    }
}

impl DragAnalysis {
    /// Create with default outcome and result name.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CurveAnalysis for DragAnalysis {
    fn name(&self) -> &str {
        "drag"
    }

    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput> {
        let data = CurveData::from_results(results, &self.outcome);
        let reps = data.reps();
        let Some(&rep_min) = reps.first() else {
            return Err(AnalysisError::MissingSeries("nrep".into()));
        };
        let rep_max = reps[reps.len() - 1];
        let (x_min, x_max) = data.x_range();

        // frequency from the fastest series, per repetition
        let fastest = data.filter(|p| p.nrep == Some(rep_max));
        let freq0 = guess::frequency(&fastest.xs(), &fastest.ys()) / f64::from(rep_max);
        let step = (x_max - x_min) / (fastest.len().max(2) - 1) as f64;
        let freq_max = 0.5 / (step * f64::from(rep_max));

        // β where the summed curves are lowest
        let mut summed: Vec<(f64, f64)> = Vec::new();
        for p in &data.points {
            match summed.iter_mut().find(|(x, _)| *x == p.x) {
                Some((_, y)) => *y += p.y,
                None => summed.push((p.x, p.y)),
            }
        }
        let beta0 = summed
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(x, _)| *x)
            .unwrap_or(0.0);

        let ys = data.ys();
        let amp0 = -(guess::ptp(&ys) / 2.0).max(1e-3);
        let base0 = ys.iter().sum::<f64>() / ys.len() as f64;
        let max_abs = guess::max_height(&ys);

        let starts: Vec<Vec<f64>> = [1.0, 0.5, 2.0]
            .iter()
            .map(|scale| vec![amp0, (freq0 * scale).min(freq_max), beta0, base0])
            .collect();
        let fitter = CurveFitter::new(vec![
            (-2.0 * max_abs, 0.0),
            (0.0, freq_max),
            (x_min, x_max),
            (-max_abs, 2.0 * max_abs),
        ]);
        let mut fit = fitter.fit_points(
            |pt, p| {
                let n = f64::from(pt.nrep.unwrap_or(rep_min));
                p[0] * (2.0 * PI * n * p[1] * (pt.x - p[2])).cos() + p[3]
            },
            &data,
            &starts,
        )?;

        // fold into one period of the slowest series around zero
        if fit.params[1] > 0.0 {
            let period = 1.0 / (f64::from(rep_min) * fit.params[1]);
            let beta = fit.params[2];
            fit.params[2] = beta - period * (beta / period).round();
        }
        debug!("DRAG fit: beta={:.4}", fit.params[2]);

        Ok(AnalysisOutput::new(
            self.name(),
            vec![param_record(&self.result_name, 2, &fit)],
            summarize(self.name(), &PARAMS, &fit),
        ))
    }
}
