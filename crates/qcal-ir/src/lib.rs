//! qcal Stimulus-Program Representation
//!
//! Carrier types shared by every other qcal crate: the native gate set,
//! pulse schedules, parameter expressions for schedule templates, and the
//! [`StimulusProgram`] that experiments build and backends execute.
//!
//! # Example: an EF Rabi point
//!
//! ```rust
//! use qcal_ir::{Channel, ProgramMetadata, QubitId, Schedule, StimulusProgram, Waveform};
//!
//! let drive = Schedule::new("rabi").play(
//!     Waveform::Drag { duration: 160, amp: 0.12, sigma: 40.0, beta: 0.0, angle: 0.0 },
//!     Channel::Control(0),
//! );
//!
//! let mut prog = StimulusProgram::new("rabi_0.12", QubitId(0));
//! prog.x().pulse(drive).x().measure();
//! let prog = prog.with_metadata(ProgramMetadata::at(0.12));
//!
//! assert_eq!(prog.len(), 4);
//! ```

pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod program;
pub mod pulse;
pub mod qubit;

pub use error::{IrError, IrResult};
pub use gate::NativeGate;
pub use instruction::{Instruction, InstructionKind};
pub use parameter::ParameterExpression;
pub use program::{ProgramMetadata, Series, StimulusProgram};
pub use pulse::{Channel, PulseOp, Schedule, Waveform};
pub use qubit::{ClbitId, QubitId};
