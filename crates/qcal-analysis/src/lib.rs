//! Curve fitting and model selection for qutrit calibration.
//!
//! Results from a batch of stimulus programs are turned into curve points
//! ([`CurveData`]), fitted with a bounded least-squares fitter
//! ([`CurveFitter`]) and reported as named records ([`AnalysisOutput`]).
//!
//! # Models
//!
//! | Analysis | Model | Result |
//! |----------|-------|--------|
//! | [`OscillationAnalysis`] | `amp·cos(2π·f·x + φ) + base` | `Ω12` |
//! | [`FineAmplitudeAnalysis`] | `amp/2·cos((dθ + apg)·x − φ₀) + base` | `d_theta12` |
//! | [`DragAnalysis`] | `amp·cos(2π·n·f·(x − β)) + base` | `β12` |
//! | [`ResonanceAnalysis`] | `a·κ/√(κ² + 4(x − x₀)²) + b` | `Δα` |
//! | [`DoubleResonanceAnalysis`] | sum of two lines | `Δα0`, `Δα1` |
//! | [`RbDecayAnalysis`] | `a·α^x + b` | `α`, `EPC` |
//!
//! [`MultiCurveAnalysis`] fits several candidates to the same data and
//! keeps the one with the smallest reduced χ².

pub mod analysis;
pub mod data;
pub mod error;
pub mod fitter;
pub mod guess;
pub mod models;
pub mod selector;

pub use analysis::{AnalysisOutput, AnalysisRecord, CurveAnalysis, FitSummary};
pub use data::{CurveData, CurvePoint, binomial_estimate};
pub use error::{AnalysisError, AnalysisResult};
pub use fitter::{CurveFitter, FitOutcome, NelderMead};
pub use models::{
    DoubleResonanceAnalysis, DragAnalysis, FineAmplitudeAnalysis, OscillationAnalysis,
    RbDecayAnalysis, ResonanceAnalysis,
};
pub use selector::MultiCurveAnalysis;
