//! qcal Calibration Store
//!
//! Versioned, append-only registry of calibration parameters for one
//! backend, together with the schedule templates that read from it.
//!
//! # Overview
//!
//! - [`CalibrationStore`]: every value ever written, keyed by
//!   [`ParameterKey`]; the current value is a projection over the log
//! - [`TemplateLibrary`]: `x12`, `y12`, `sx12`, `sy12` and `rz12` templates
//!   and their default values
//! - [`round_down`]: the rounding policy for swept values
//! - JSON persistence with [`CalibrationStore::save`] and
//!   [`CalibrationStore::load`]
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use qcal_hal::Capabilities;
//! use qcal_store::{CalibrationStore, ParameterKey, TemplateLibrary};
//!
//! let library = TemplateLibrary::default();
//! let store = CalibrationStore::from_backend(&Capabilities::simulator(2), &library);
//!
//! let amp = store
//!     .get_current(&ParameterKey::qubit("amp", 0, Some("x12")), None)
//!     .unwrap();
//! assert_eq!(amp, 0.14);
//!
//! let x12 = library.resolve("x12", 0, &store, &BTreeMap::new(), None).unwrap();
//! assert_eq!(x12.duration(), 160);
//! ```

pub mod error;
pub mod key;
pub mod persistence;
pub mod rounding;
pub mod store;
pub mod templates;

pub use error::{StoreError, StoreResult};
pub use key::{ParameterKey, ParameterValue, Provenance};
pub use persistence::StoreSnapshot;
pub use rounding::{DEFAULT_DIGITS, format_param, linspace, round_down};
pub use store::{CalibrationStore, Entry, Invalidation, ParameterRow};
pub use templates::{ParamSource, ScheduleTemplate, TemplateBody, TemplateLibrary};
