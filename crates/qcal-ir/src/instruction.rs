//! Program instructions combining operations with operands.

use serde::{Deserialize, Serialize};

use crate::gate::NativeGate;
use crate::pulse::Schedule;
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a stimulus program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A native gate; EF gates execute through the program's calibrations.
    Gate(NativeGate),
    /// An inline pulse schedule (swept stimulus with bound values).
    Pulse(Schedule),
    /// Measurement operation.
    Measure,
    /// Barrier: no scheduling optimisation may move operations across it.
    Barrier,
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction writes (for measure).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: NativeGate, qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Gate(gate),
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create an inline pulse instruction.
    pub fn pulse(schedule: Schedule, qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Pulse(schedule),
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// The gate, if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&NativeGate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, InstructionKind::Barrier)
    }

    /// Name of the operation.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Pulse(s) => &s.name,
            InstructionKind::Measure => "measure",
            InstructionKind::Barrier => "barrier",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_instruction() {
        let inst = Instruction::gate(NativeGate::X12, QubitId(2));
        assert_eq!(inst.name(), "x12");
        assert_eq!(inst.qubits, vec![QubitId(2)]);
        assert_eq!(inst.as_gate(), Some(&NativeGate::X12));
    }

    #[test]
    fn test_measure_and_barrier() {
        let m = Instruction::measure(QubitId(0), ClbitId(0));
        assert!(m.is_measure());
        assert_eq!(m.clbits, vec![ClbitId(0)]);

        let b = Instruction::barrier([QubitId(0)]);
        assert!(b.is_barrier());
        assert!(b.as_gate().is_none());
    }
}
