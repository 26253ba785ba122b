//! Candidate-model selection.
//!
//! Every candidate is fitted to the same results. Candidates that fail,
//! or that produce no fit, are dropped with a warning. The survivor with
//! the smallest reduced χ² wins; a missing χ² counts as NaN and only wins
//! if no survivor has a number. Ties go to the earlier candidate.

use tracing::{debug, warn};

use qcal_hal::ProgramResult;

use crate::analysis::{AnalysisOutput, CurveAnalysis};
use crate::error::AnalysisResult;

/// Runs several analyses on one dataset and keeps the best fit.
pub struct MultiCurveAnalysis {
    name: String,
    candidates: Vec<Box<dyn CurveAnalysis>>,
}

impl MultiCurveAnalysis {
    /// Create an empty selector.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }

    /// Add a candidate. Declaration order breaks χ² ties.
    pub fn with_candidate(mut self, candidate: impl CurveAnalysis + 'static) -> Self {
        self.candidates.push(Box::new(candidate));
        self
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check if there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Run every candidate, keeping each outcome.
    pub fn run_all(&self, results: &[ProgramResult]) -> Vec<(String, AnalysisResult<AnalysisOutput>)> {
        self.candidates
            .iter()
            .map(|c| (c.name().to_string(), c.run(results)))
            .collect()
    }

    /// Pick the winner among candidate outcomes.
    pub fn select(
        &self,
        outcomes: Vec<(String, AnalysisResult<AnalysisOutput>)>,
    ) -> AnalysisOutput {
        let survivors: Vec<(f64, AnalysisOutput)> = outcomes
            .into_iter()
            .filter_map(|(name, outcome)| match outcome {
                Ok(output) if output.fit.is_some() => {
                    let chisq = output.chisq().unwrap_or(f64::NAN);
                    debug!("Candidate {name}: chisq={chisq}");
                    Some((chisq, output))
                }
                Ok(_) => {
                    warn!("Candidate {name} produced no fit; dropped");
                    None
                }
                Err(e) => {
                    warn!("Candidate {name} failed: {e}; dropped");
                    None
                }
            })
            .collect();

        // first strictly smallest χ², NaN never beats a number
        let mut best: Option<usize> = None;
        for (i, (chisq, _)) in survivors.iter().enumerate() {
            best = match best {
                None => Some(i),
                Some(b) => {
                    let current = survivors[b].0;
                    if !chisq.is_nan() && (current.is_nan() || *chisq < current) {
                        Some(i)
                    } else {
                        Some(b)
                    }
                }
            };
        }

        match best {
            Some(i) => survivors
                .into_iter()
                .nth(i)
                .map(|(_, output)| output)
                .unwrap_or_else(|| AnalysisOutput::empty(&self.name)),
            None => {
                warn!("No usable fit among {} candidates", self.candidates.len());
                AnalysisOutput::empty(&self.name)
            }
        }
    }
}

impl CurveAnalysis for MultiCurveAnalysis {
    fn name(&self) -> &str {
        &self.name
    }

    /// Never fails: a selection without survivors is an empty output.
    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput> {
        Ok(self.select(self.run_all(results)))
    }
}

impl std::fmt::Debug for MultiCurveAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.candidates.iter().map(|c| c.name()).collect();
        f.debug_struct("MultiCurveAnalysis")
            .field("name", &self.name)
            .field("candidates", &names)
            .finish()
    }
}
