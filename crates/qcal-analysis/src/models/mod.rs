//! Fit models for the calibration experiments.
//!
//! Every model is a [`CurveAnalysis`](crate::CurveAnalysis) that reads the
//! probability of one outcome bitstring from the results, guesses starting
//! points from the data and runs a bounded least-squares fit.

pub mod decay;
pub mod drag;
pub mod fine_amplitude;
pub mod oscillation;
pub mod resonance;

pub use decay::RbDecayAnalysis;
pub use drag::DragAnalysis;
pub use fine_amplitude::FineAmplitudeAnalysis;
pub use oscillation::OscillationAnalysis;
pub use resonance::{DoubleResonanceAnalysis, ResonanceAnalysis};

use crate::analysis::{AnalysisRecord, FitSummary};
use crate::fitter::FitOutcome;

/// Outcome whose probability most models fit.
pub const DEFAULT_OUTCOME: &str = "1";

pub(crate) fn summarize(model: &str, names: &[&str], fit: &FitOutcome) -> FitSummary {
    FitSummary {
        model: model.to_string(),
        params: names
            .iter()
            .zip(&fit.params)
            .map(|(n, v)| ((*n).to_string(), *v))
            .collect(),
        stderr: fit.stderr.clone(),
        reduced_chisq: Some(fit.reduced_chisq),
        dof: fit.dof,
    }
}

/// Record for fit parameter `index`, carrying its error and the fit χ².
pub(crate) fn param_record(name: &str, index: usize, fit: &FitOutcome) -> AnalysisRecord {
    AnalysisRecord::new(name, fit.params[index])
        .with_stderr(fit.stderr.as_ref().and_then(|s| s.get(index).copied()))
        .with_chisq(Some(fit.reduced_chisq))
}
