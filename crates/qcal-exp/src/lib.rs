//! Calibration experiments for qutrit EF gates.
//!
//! An experiment builds a sweep of stimulus programs from the current
//! store values, a [`Pipeline`] runs the batch on a backend and fits the
//! results, and the updater turns the fit into checked parameter updates.
//!
//! # Example
//!
//! ```ignore
//! use qcal_exp::{Experiment, Pipeline};
//!
//! let mut exp = Experiment::from_name("rough_amp", 0)?;
//! exp.set_option("num_amps", OptionValue::Int(41))?;
//! let report = Pipeline::new(&backend, &library).run(&exp, &mut store).await?;
//! for update in &report.updates {
//!     println!("{} = {}", update.key, update.value);
//! }
//! ```
//!
//! # Experiments
//!
//! | Name | Sweeps | Updates |
//! |------|--------|---------|
//! | `rough_amp` | `x12` amplitude | `amp@x12`, `amp@sx12` |
//! | `fine_amp_x12`, `fine_amp_sx12` | repetitions | `amp` of the gate |
//! | `rough_drag_x12`, `rough_drag_sx12` | β per rep series | `β` of the gate |
//! | `rough_freq`, `narrow_band` | detuning | `α` |
//! | `rb_standard`, `rb_polar` | sequence length | none |

pub mod error;
pub mod experiments;
pub mod options;
pub mod pipeline;
pub mod updater;

pub use error::{ExpError, ExpResult, UpdateError};
pub use experiments::{
    BuildContext, CalibrationExperiment, EXPERIMENT_NAMES, Experiment, FineAmplitude,
    NarrowBandSpectroscopy, RandomizedBenchmarking, RoughAmplitude, RoughDrag, RoughFrequency,
    TargetGate,
};
pub use options::{ExperimentOptions, OptionValue};
pub use pipeline::{Pipeline, RunReport};
pub use updater::{CalibrationUpdate, commit};
