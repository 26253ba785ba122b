//! qcal Local Qutrit Simulator
//!
//! This crate provides a local backend that executes stimulus programs on
//! simulated three-level transmons. Each qubit carries hidden device
//! parameters so calibration experiments can be run closed-loop and
//! checked against a known truth.
//!
//! # Features
//!
//! - **Density Matrix**: 3×3 mixed state per qubit
//! - **Pulse Physics**: amplitude, carrier detuning, frame phase and DRAG
//!   mismatch all shape the 1–2 rotation
//! - **Noise**: per-pulse depolarizing of the 1–2 block and charge-parity
//!   line splitting
//! - **Readout**: two-state discrimination or excited-state promotion
//! - **Deterministic**: rounded expectation counts, or seeded shot noise
//!
//! # Example
//!
//! ```ignore
//! use qcal_adapter_sim::{QutritDevice, SimulatorBackend};
//! use qcal_hal::{Backend, ExecutionOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SimulatorBackend::new(2)
//!         .with_device(0, QutritDevice::default().with_pi_amp(0.15));
//!
//!     let job_id = backend.submit(&programs, &ExecutionOptions::default()).await?;
//!     let result = backend.wait(&job_id).await?;
//!     println!("{} programs", result.len());
//!     Ok(())
//! }
//! ```

mod density;
mod device;
mod simulator;

pub use density::DensityMatrix;
pub use device::{QutritDevice, REFERENCE_SIGMA};
pub use simulator::SimulatorBackend;
