//! Randomized-benchmarking decay: `a·α^x + b`.

use tracing::debug;

use qcal_bench::{error_per_clifford, fit_rb_decay};
use qcal_hal::ProgramResult;

use crate::analysis::{AnalysisOutput, AnalysisRecord, CurveAnalysis};
use crate::data::CurveData;
use crate::error::AnalysisResult;
use crate::fitter::CurveFitter;
use crate::models::{param_record, summarize};

/// Survival-probability decay over sequence length. Reports `α` and `EPC`.
#[derive(Debug, Clone)]
pub struct RbDecayAnalysis {
    outcome: String,
}

impl Default for RbDecayAnalysis {
    fn default() -> Self {
        Self {
            outcome: "0".into(),
        }
    }
}

impl RbDecayAnalysis {
    /// Create with the default survival outcome `"0"`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CurveAnalysis for RbDecayAnalysis {
    fn name(&self) -> &str {
        "rb_decay"
    }

    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput> {
        // samples of the same length are averaged
        let data = CurveData::from_results(results, &self.outcome).averaged();
        let pairs: Vec<(u32, f64)> = data
            .points
            .iter()
            .map(|p| (p.x.max(0.0) as u32, p.y))
            .collect();
        let (a0, alpha0, b0) = fit_rb_decay(&pairs);

        let starts = vec![
            vec![a0, alpha0.clamp(0.5, 0.9999), b0],
            vec![0.5, 0.99, 0.5],
            vec![0.5, 0.9, 0.5],
        ];
        let fitter = CurveFitter::new(vec![(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)]);
        let fit = fitter.fit(|x, p| p[0] * p[1].powf(x) + p[2], &data, &starts)?;

        let alpha = fit.params[1];
        let epc = error_per_clifford(alpha);
        debug!("RB decay fit: alpha={:.6}, EPC={:.3e}", alpha, epc);

        let alpha_record = param_record("α", 1, &fit);
        let epc_record = AnalysisRecord::new("EPC", epc)
            .with_stderr(alpha_record.stderr.map(|s| s / 2.0))
            .with_chisq(Some(fit.reduced_chisq));
        Ok(AnalysisOutput::new(
            self.name(),
            vec![alpha_record, epc_record],
            summarize(self.name(), &["a", "alpha", "b"], &fit),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_hal::Counts;
    use qcal_ir::ProgramMetadata;

    fn survival(length: u32, sample: u32, p: f64) -> ProgramResult {
        let shots = 1024u64;
        let zeros = (p.clamp(0.0, 1.0) * shots as f64).round() as u64;
        ProgramResult {
            name: format!("rb_{length}_{sample}"),
            metadata: ProgramMetadata::at(f64::from(length)).with_sample(sample),
            counts: Counts::from_pairs([("0", zeros), ("1", shots - zeros)]),
            shots: shots as u32,
        }
    }

    #[test]
    fn test_decay_fit() {
        let alpha: f64 = 0.985;
        let lengths = qcal_bench::default_lengths(1, 100, 15);
        let mut results = Vec::new();
        for sample in 0..5 {
            for &m in &lengths {
                let jitter = 0.004 * (f64::from(sample) - 2.0);
                results.push(survival(m, sample, 0.5 * alpha.powi(m as i32) + 0.5 + jitter));
            }
        }
        let out = RbDecayAnalysis::new().run(&results).unwrap();
        let fitted = out.value("α").unwrap();
        assert!((fitted - alpha).abs() < 0.002, "alpha {fitted}");
        let epc = out.value("EPC").unwrap();
        assert!((epc - (1.0 - fitted) / 2.0).abs() < 1e-12);
        assert_eq!(out.fit.as_ref().unwrap().dof, 12);
    }
}
