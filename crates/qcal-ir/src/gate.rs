//! Native gate set.
//!
//! The qubit-level `X` is the device's own calibrated 0–1 π pulse. Every
//! other gate acts on the 1–2 transition and is executed through a pulse
//! schedule attached to the program.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gates that may appear in a stimulus program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeGate {
    /// π rotation on the 0–1 transition (state transfer into the manifold).
    X,
    /// π rotation about X on the 1–2 transition.
    X12,
    /// π rotation about Y on the 1–2 transition.
    Y12,
    /// π/2 rotation about X on the 1–2 transition.
    SX12,
    /// π/2 rotation about Y on the 1–2 transition.
    SY12,
    /// Virtual Z rotation on the 1–2 transition.
    Rz12(f64),
}

impl NativeGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            NativeGate::X => "x",
            NativeGate::X12 => "x12",
            NativeGate::Y12 => "y12",
            NativeGate::SX12 => "sx12",
            NativeGate::SY12 => "sy12",
            NativeGate::Rz12(_) => "rz12",
        }
    }

    /// Whether the gate drives the 1–2 transition.
    pub fn is_ef(&self) -> bool {
        !matches!(self, NativeGate::X)
    }

    /// Whether the gate needs an attached pulse schedule to execute.
    pub fn needs_calibration(&self) -> bool {
        self.is_ef()
    }

    /// Key under which the gate's schedule is attached to a program.
    ///
    /// Parameterized gates carry their angle in the key, so two phase
    /// gates with different angles get independent schedules.
    pub fn calibration_key(&self) -> String {
        self.to_string()
    }

    /// Rotation angle parameter, if any.
    pub fn angle(&self) -> Option<f64> {
        match self {
            NativeGate::Rz12(theta) => Some(*theta),
            _ => None,
        }
    }
}

impl fmt::Display for NativeGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeGate::Rz12(theta) => write!(f, "rz12({theta})"),
            other => write!(f, "{}", other.name()),
        }
    }
}
