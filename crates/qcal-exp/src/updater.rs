//! Correction formulas and store commits.
//!
//! Each formula maps one fitted quantity to a new parameter value. The
//! results are checked before anything is written: a non-finite value, a
//! pulse amplitude outside `(0, 1]` or a non-positive denominator in the
//! fine-amplitude correction fails with [`UpdateError::OutOfRange`], and
//! none of the updates of that run are committed.

use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use tracing::info;

use qcal_analysis::AnalysisOutput;
use qcal_store::{CalibrationStore, ParameterKey, Provenance};

use crate::error::{ExpResult, UpdateError};

/// Round to `digits` decimal places, half away from zero.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

fn out_of_range(quantity: &str, value: f64, reason: &str) -> UpdateError {
    UpdateError::OutOfRange {
        quantity: quantity.to_string(),
        value,
        reason: reason.to_string(),
    }
}

fn finite(quantity: &str, value: f64) -> Result<f64, UpdateError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(out_of_range(quantity, value, "not finite"))
    }
}

/// Check a pulse amplitude lies in `(0, 1]`.
pub fn check_amplitude(quantity: &str, amp: f64) -> Result<f64, UpdateError> {
    let amp = finite(quantity, amp)?;
    if amp <= 0.0 {
        Err(out_of_range(quantity, amp, "amplitude must be positive"))
    } else if amp > 1.0 {
        Err(out_of_range(quantity, amp, "amplitude exceeds 1"))
    } else {
        Ok(amp)
    }
}

/// `current · target / (target + error)`.
pub fn amplitude_from_angle_error(
    quantity: &str,
    current: f64,
    target: f64,
    error: f64,
) -> Result<f64, UpdateError> {
    let denominator = finite(quantity, target + error)?;
    if denominator <= 0.0 {
        return Err(out_of_range(
            quantity,
            denominator,
            "rotation error cancels the target angle",
        ));
    }
    check_amplitude(quantity, current * target / denominator)
}

/// `π / (2π · rate)` rounded to 8 digits, halved for a half rotation.
pub fn amplitude_from_rate(quantity: &str, rate: f64, half: bool) -> Result<f64, UpdateError> {
    let rate = finite(quantity, rate)?;
    if rate <= 0.0 {
        return Err(out_of_range(quantity, rate, "oscillation rate must be positive"));
    }
    let pi_amp = round_to(PI / (2.0 * PI * rate), 8);
    check_amplitude(quantity, if half { pi_amp / 2.0 } else { pi_amp })
}

/// `current + offset`.
pub fn shifted_anharmonicity(quantity: &str, current: f64, offset: f64) -> Result<f64, UpdateError> {
    finite(quantity, current + offset)
}

/// Fitted DRAG coefficient, written back as is.
pub fn drag_coefficient(quantity: &str, beta: f64) -> Result<f64, UpdateError> {
    finite(quantity, beta)
}

/// Fitted value of a named record.
pub fn result_value(output: &AnalysisOutput, name: &str) -> Result<f64, UpdateError> {
    output
        .value(name)
        .ok_or_else(|| UpdateError::MissingResult(name.to_string()))
}

/// A checked new value for one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationUpdate {
    /// Parameter to write.
    pub key: ParameterKey,
    /// New value.
    pub value: f64,
    /// Value the formula started from.
    pub previous: Option<f64>,
    /// Analysis result the value was derived from.
    pub result_name: String,
    /// Raw fitted value.
    pub fit_value: f64,
}

impl CalibrationUpdate {
    /// Create an update.
    pub fn new(
        key: ParameterKey,
        value: f64,
        result_name: impl Into<String>,
        fit_value: f64,
    ) -> Self {
        Self {
            key,
            value,
            previous: None,
            result_name: result_name.into(),
            fit_value,
        }
    }

    /// Record the value the formula started from.
    pub fn with_previous(mut self, previous: f64) -> Self {
        self.previous = Some(previous);
        self
    }
}

/// Write checked updates to the store, each carrying the provenance of
/// the analysis that produced it.
pub fn commit(
    store: &mut CalibrationStore,
    updates: &[CalibrationUpdate],
    experiment: &str,
    output: &AnalysisOutput,
    job_id: &str,
    at: DateTime<Utc>,
) -> ExpResult<()> {
    for update in updates {
        let provenance = Provenance::from_source(experiment)
            .with_analysis(output.analysis.as_str())
            .with_result(update.result_name.as_str(), update.fit_value)
            .with_chisq(output.chisq())
            .with_job_id(job_id);
        store.add_value(update.key.clone(), update.value, at, provenance);
        info!(
            "Updated {} = {} (was {})",
            update.key,
            update.value,
            update
                .previous
                .map_or_else(|| "unset".to_string(), |v| v.to_string())
        );
    }
    Ok(())
}
