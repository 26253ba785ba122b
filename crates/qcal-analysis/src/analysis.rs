//! Analysis outputs and the curve-analysis trait.

use serde::{Deserialize, Serialize};

use qcal_hal::ProgramResult;

use crate::error::AnalysisResult;

/// One named quantity extracted by an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Result name, e.g. `"Ω12"` or `"β12"`.
    pub name: String,
    /// Nominal value.
    pub value: f64,
    /// One-sigma uncertainty, if known.
    pub stderr: Option<f64>,
    /// Unit label.
    pub unit: Option<String>,
    /// Reduced χ² of the fit that produced it.
    pub chisq: Option<f64>,
}

impl AnalysisRecord {
    /// Create a record without uncertainty.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            stderr: None,
            unit: None,
            chisq: None,
        }
    }

    /// Set the uncertainty.
    pub fn with_stderr(mut self, stderr: Option<f64>) -> Self {
        self.stderr = stderr;
        self
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the fit quality.
    pub fn with_chisq(mut self, chisq: Option<f64>) -> Self {
        self.chisq = chisq;
        self
    }
}

/// Parameters and quality of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Model name.
    pub model: String,
    /// Named best-fit parameters.
    pub params: Vec<(String, f64)>,
    /// Standard errors, in parameter order.
    pub stderr: Option<Vec<f64>>,
    /// Reduced χ².
    pub reduced_chisq: Option<f64>,
    /// Degrees of freedom.
    pub dof: usize,
}

impl FitSummary {
    /// Best-fit value by parameter name.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Standard error by parameter name.
    pub fn param_stderr(&self, name: &str) -> Option<f64> {
        let idx = self.params.iter().position(|(n, _)| n == name)?;
        self.stderr.as_ref()?.get(idx).copied()
    }
}

/// Everything an analysis produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Name of the analysis that produced the output.
    pub analysis: String,
    /// Extracted quantities.
    pub records: Vec<AnalysisRecord>,
    /// Underlying fit, absent if none was performed.
    pub fit: Option<FitSummary>,
}

impl AnalysisOutput {
    /// Output with records from a fit.
    pub fn new(analysis: impl Into<String>, records: Vec<AnalysisRecord>, fit: FitSummary) -> Self {
        Self {
            analysis: analysis.into(),
            records,
            fit: Some(fit),
        }
    }

    /// An output with no records and no fit.
    pub fn empty(analysis: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            ..Self::default()
        }
    }

    /// Check if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record by name.
    pub fn record(&self, name: &str) -> Option<&AnalysisRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Value of a record by name.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.record(name).map(|r| r.value)
    }

    /// Reduced χ² of the fit.
    pub fn chisq(&self) -> Option<f64> {
        self.fit.as_ref().and_then(|f| f.reduced_chisq)
    }
}

/// A fit over a batch of program results.
pub trait CurveAnalysis: Send + Sync {
    /// Analysis name.
    fn name(&self) -> &str;

    /// Run the analysis.
    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput>;
}

impl<T: CurveAnalysis + ?Sized> CurveAnalysis for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, results: &[ProgramResult]) -> AnalysisResult<AnalysisOutput> {
        (**self).run(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_accessors() {
        let fit = FitSummary {
            model: "line".into(),
            params: vec![("a".into(), 1.0), ("b".into(), 2.0)],
            stderr: Some(vec![0.1, 0.2]),
            reduced_chisq: Some(1.3),
            dof: 10,
        };
        assert_eq!(fit.param("b"), Some(2.0));
        assert_eq!(fit.param_stderr("b"), Some(0.2));
        assert_eq!(fit.param("c"), None);

        let out = AnalysisOutput::new("line", vec![AnalysisRecord::new("a", 1.0)], fit);
        assert!(!out.is_empty());
        assert_eq!(out.value("a"), Some(1.0));
        assert_eq!(out.chisq(), Some(1.3));

        let empty = AnalysisOutput::empty("none");
        assert!(empty.is_empty());
        assert_eq!(empty.chisq(), None);
    }
}
