//! Parameter keys and immutable value records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one calibratable knob.
///
/// An empty qubit scope is the default for every qubit. The same name on
/// the same qubits under different schedules is an independent knob (the
/// amplitude of `x12` is not the amplitude of `sx12`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParameterKey {
    /// Parameter name (`amp`, `β`, `α`, ...).
    pub name: String,
    /// Ordered qubit scope.
    pub qubits: Vec<u32>,
    /// Owning schedule, if any.
    pub schedule: Option<String>,
}

impl ParameterKey {
    /// Create a key.
    pub fn new(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = u32>,
        schedule: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            qubits: qubits.into_iter().collect(),
            schedule: schedule.map(str::to_string),
        }
    }

    /// Key with an empty (default) qubit scope.
    pub fn default_scope(name: impl Into<String>, schedule: Option<&str>) -> Self {
        Self::new(name, [], schedule)
    }

    /// Single-qubit key.
    pub fn qubit(name: impl Into<String>, qubit: u32, schedule: Option<&str>) -> Self {
        Self::new(name, [qubit], schedule)
    }

    /// Same name and schedule with an empty qubit scope.
    pub fn to_default_scope(&self) -> Self {
        Self {
            name: self.name.clone(),
            qubits: vec![],
            schedule: self.schedule.clone(),
        }
    }

    /// Check if this key has the default scope.
    pub fn is_default_scope(&self) -> bool {
        self.qubits.is_empty()
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let qubits: Vec<String> = self.qubits.iter().map(u32::to_string).collect();
        write!(f, "[{}]", qubits.join(","))?;
        if let Some(s) = &self.schedule {
            write!(f, "@{s}")?;
        }
        Ok(())
    }
}

/// Where a value came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Provenance {
    /// Producer: an experiment name, `"default"` or `"backend"`.
    pub source: String,
    /// Analysis that produced the estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    /// Name of the fitted result (`Ω12`, `d_theta12`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_name: Option<String>,
    /// Raw fitted value before the correction formula.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_value: Option<f64>,
    /// Reduced chi-square of the fit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chisq: Option<f64>,
    /// Job that produced the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl Provenance {
    /// Provenance of a library default.
    pub fn default_value() -> Self {
        Self::from_source("default")
    }

    /// Provenance of a backend-reported value.
    pub fn backend() -> Self {
        Self::from_source("backend")
    }

    /// Provenance with only a source.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Set the analysis name.
    pub fn with_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.analysis = Some(analysis.into());
        self
    }

    /// Set the fitted result name and raw value.
    pub fn with_result(mut self, name: impl Into<String>, value: f64) -> Self {
        self.result_name = Some(name.into());
        self.fit_value = Some(value);
        self
    }

    /// Set the reduced chi-square.
    pub fn with_chisq(mut self, chisq: Option<f64>) -> Self {
        self.chisq = chisq;
        self
    }

    /// Set the job id.
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }
}

/// Immutable value record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    /// Numeric value.
    pub value: f64,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Validity flag at creation.
    pub valid: bool,
    /// Origin of the value.
    pub provenance: Provenance,
}

impl ParameterValue {
    /// Create a valid record.
    pub fn new(value: f64, timestamp: DateTime<Utc>, provenance: Provenance) -> Self {
        Self {
            value,
            timestamp,
            valid: true,
            provenance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let k = ParameterKey::qubit("amp", 3, Some("x12"));
        assert_eq!(k.to_string(), "amp[3]@x12");
        assert_eq!(ParameterKey::default_scope("α", None).to_string(), "α[]");
    }

    #[test]
    fn test_schedules_are_independent_keys() {
        let a = ParameterKey::qubit("amp", 0, Some("x12"));
        let b = ParameterKey::qubit("amp", 0, Some("sx12"));
        assert_ne!(a, b);
        assert_eq!(a.to_default_scope(), ParameterKey::default_scope("amp", Some("x12")));
    }

    #[test]
    fn test_provenance_builder() {
        let p = Provenance::from_source("fine_amplitude_x12")
            .with_analysis("fine_amplitude")
            .with_result("d_theta12", 0.02)
            .with_chisq(Some(1.1));
        assert_eq!(p.result_name.as_deref(), Some("d_theta12"));
        assert_eq!(p.fit_value, Some(0.02));
        assert_eq!(p.chisq, Some(1.1));
    }
}
