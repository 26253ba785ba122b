//! Spectroscopy line shapes.
//!
//! A resonance is modelled as `a·|κ|/√(κ² + 4(x − x₀)²) + b`. A single line
//! reports its centre as `Δα`. When the transition is split, the double
//! model reports both centres, ordered by frequency, as `Δα0` and `Δα1`.

use tracing::{debug, warn};

use qcal_hal::ProgramResult;

use crate::analysis::{AnalysisOutput, CurveAnalysis};
use crate::data::CurveData;
use crate::error::{AnalysisError, AnalysisResult};
use crate::fitter::CurveFitter;
use crate::guess;
use crate::models::{DEFAULT_OUTCOME, param_record, summarize};

/// One Lorentzian line of width `kappa` centred at `x0`.
pub fn lorentzian(x: f64, a: f64, kappa: f64, x0: f64) -> f64 {
    a * kappa.abs() / (kappa * kappa + 4.0 * (x - x0).powi(2)).sqrt()
}

/// Single-line fit. Reports `Δα`.
#[derive(Debug, Clone)]
pub struct ResonanceAnalysis {
    outcome: String,
    result_name: String,
}

impl Default for ResonanceAnalysis {
    fn default() -> Self {
        Self {
            outcome: DEFAULT_OUTCOME.into(),
            result_name: "Δα".into(),
        }
    }
}

impl ResonanceAnalysis {
    /// Create with default outcome and result name.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CurveAnalysis for ResonanceAnalysis {
    fn name(&self) -> &str {
        "resonance"
    }

    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput> {
        let data = CurveData::from_results(results, &self.outcome).averaged();
        let (xs, ys) = (data.xs(), data.ys());
        let (x_min, x_max) = data.x_range();
        let max_y = ys.iter().copied().fold(0.0, f64::max);

        let b0 = guess::constant_spectral_offset(&ys);
        let shifted: Vec<f64> = ys.iter().map(|y| y - b0).collect();
        let peak = guess::argmax(&shifted)
            .ok_or(AnalysisError::InsufficientData { needed: 5, got: 0 })?;
        let a0 = ys[peak] - b0;
        let kappa0 = guess::fwhm(&xs, &shifted);

        let fitter = CurveFitter::new(vec![
            (0.0, 2.0 * max_y),
            (0.0, guess::ptp(&xs)),
            (x_min, x_max),
            (0.0, max_y),
        ]);
        let starts = [0.5, 1.0, 2.0].map(|w| vec![a0, kappa0 * w, xs[peak], b0]);
        let fit = fitter.fit(
            |x, p| lorentzian(x, p[0], p[1], p[2]) + p[3],
            &data,
            &starts,
        )?;
        debug!("Resonance fit: center={:.1}", fit.params[2]);

        Ok(AnalysisOutput::new(
            self.name(),
            vec![param_record(&self.result_name, 2, &fit).with_unit("Hz")],
            summarize(self.name(), &["a", "kappa", "freq", "b"], &fit),
        ))
    }
}

/// Two-line fit. Reports `Δα0` and `Δα1`.
#[derive(Debug, Clone)]
pub struct DoubleResonanceAnalysis {
    outcome: String,
    min_height: f64,
    min_width: f64,
}

impl Default for DoubleResonanceAnalysis {
    fn default() -> Self {
        Self {
            outcome: DEFAULT_OUTCOME.into(),
            min_height: 0.5,
            min_width: 3.0,
        }
    }
}

impl DoubleResonanceAnalysis {
    /// Create with default peak-finding thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    fn model(x: f64, p: &[f64]) -> f64 {
        lorentzian(x, p[0], p[1], p[2]) + lorentzian(x, p[3], p[4], p[5]) + p[6]
    }
}

impl CurveAnalysis for DoubleResonanceAnalysis {
    fn name(&self) -> &str {
        "double_resonance"
    }

    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput> {
        let data = CurveData::from_results(results, &self.outcome).averaged();
        let (xs, ys) = (data.xs(), data.ys());
        let (x_min, x_max) = data.x_range();
        let max_abs = guess::max_height(&ys);
        let x_span = guess::ptp(&xs);
        let dx = x_span / (xs.len().max(2) - 1) as f64;

        let b0 = guess::constant_spectral_offset(&ys);
        let shifted: Vec<f64> = ys.iter().map(|y| y - b0).collect();
        let height = self.min_height * guess::max_height(&shifted);
        let mut peaks = guess::find_peaks(&shifted, height, self.min_width);
        if peaks.len() < 2 {
            warn!("Found {} peak(s), expected 2", peaks.len());
            return Err(AnalysisError::NoPeaks {
                found: peaks.len(),
                needed: 2,
            });
        }
        peaks.sort_by(|a, b| b.height.total_cmp(&a.height));
        peaks.truncate(2);
        peaks.sort_by_key(|p| p.index);

        let p0: Vec<f64> = peaks
            .iter()
            .flat_map(|p| [p.height, (p.width * dx).max(dx), xs[p.index]])
            .chain([b0])
            .collect();
        // each centre stays on its own side of the midpoint between the peaks
        let mid = 0.5 * (xs[peaks[0].index] + xs[peaks[1].index]);
        let amp = (-2.0 * max_abs, 2.0 * max_abs);
        let fitter = CurveFitter::new(vec![
            amp,
            (0.0, x_span),
            (x_min, mid),
            amp,
            (0.0, x_span),
            (mid, x_max),
            (-max_abs, max_abs),
        ]);
        let mut narrow = p0.clone();
        narrow[1] /= 2.0;
        narrow[4] /= 2.0;
        let fit = fitter.fit(Self::model, &data, &[p0, narrow])?;
        debug!(
            "Double resonance fit: centers={:.1}, {:.1}",
            fit.params[2], fit.params[5]
        );

        Ok(AnalysisOutput::new(
            self.name(),
            vec![
                param_record("Δα0", 2, &fit).with_unit("Hz"),
                param_record("Δα1", 5, &fit).with_unit("Hz"),
            ],
            summarize(
                self.name(),
                &["a0", "kappa0", "freq0", "a1", "kappa1", "freq1", "b"],
                &fit,
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests_support::results_from;

    fn detunings(span: f64, n: u32) -> Vec<f64> {
        (0..n)
            .map(|i| -span + 2.0 * span * f64::from(i) / f64::from(n - 1))
            .collect()
    }

    #[test]
    fn test_single_line() {
        let xs = detunings(20e6, 101);
        let results = results_from(&xs, |x| 0.05 + lorentzian(x, 0.6, 1.5e6, 4.2e6), 1024);
        let out = ResonanceAnalysis::new().run(&results).unwrap();
        let center = out.value("Δα").unwrap();
        assert!((center - 4.2e6).abs() < 0.1e6, "center {center}");
        assert_eq!(out.record("Δα").unwrap().unit.as_deref(), Some("Hz"));
    }

    #[test]
    fn test_double_line() {
        let xs = detunings(3e6, 150);
        let results = results_from(
            &xs,
            |x| 0.02 + lorentzian(x, 0.4, 0.2e6, -0.9e6) + lorentzian(x, 0.35, 0.2e6, 1.1e6),
            1024,
        );
        let out = DoubleResonanceAnalysis::new().run(&results).unwrap();
        let (lo, hi) = (out.value("Δα0").unwrap(), out.value("Δα1").unwrap());
        assert!((lo + 0.9e6).abs() < 0.05e6, "low {lo}");
        assert!((hi - 1.1e6).abs() < 0.05e6, "high {hi}");
    }

    #[test]
    fn test_close_equal_lines_stay_apart() {
        // non-Lorentzian lines, as seen from a finite Gaussian drive
        let xs = detunings(3e6, 150);
        let line = |x: f64, x0: f64| 0.45 * (-((x - x0) / 0.25e6).powi(2) / 2.0).exp();
        let results = results_from(&xs, |x| 0.03 + line(x, -0.6e6) + line(x, 0.6e6), 1024);
        let out = DoubleResonanceAnalysis::new().run(&results).unwrap();
        let (lo, hi) = (out.value("Δα0").unwrap(), out.value("Δα1").unwrap());
        assert!(lo < 0.0 && hi > 0.0, "centres {lo}, {hi}");
        assert!((lo + 0.6e6).abs() < 0.1e6, "low {lo}");
        assert!((hi - 0.6e6).abs() < 0.1e6, "high {hi}");
        assert!((0.5 * (lo + hi)).abs() < 50e3);
    }

    #[test]
    fn test_double_line_needs_two_peaks() {
        let xs = detunings(3e6, 150);
        let results = results_from(&xs, |x| 0.02 + lorentzian(x, 0.5, 0.2e6, 0.3e6), 1024);
        let err = DoubleResonanceAnalysis::new().run(&results).unwrap_err();
        assert!(matches!(err, AnalysisError::NoPeaks { found: 1, needed: 2 }));
    }
}
