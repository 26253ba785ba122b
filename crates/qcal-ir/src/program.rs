//! Stimulus programs.
//!
//! A [`StimulusProgram`] is one data point of a sweep: an ordered list of
//! instructions on a single physical qubit, the pulse schedules backing its
//! EF gates, and the sweep metadata the analysis needs to place the
//! outcome on its curve. Programs are built fresh per data point and are
//! not modified after being handed to a backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::gate::NativeGate;
use crate::instruction::{Instruction, InstructionKind};
use crate::pulse::Schedule;
use crate::qubit::{ClbitId, QubitId};

/// Grouping tag for a data point.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Series {
    /// Numbered series (e.g. main data).
    Index(u32),
    /// Named series (e.g. `"spam-cal"`).
    Label(String),
}

impl Series {
    /// Series tag of the SPAM reference points.
    pub fn spam_cal() -> Self {
        Series::Label("spam-cal".into())
    }

    /// Check if this is the SPAM reference series.
    pub fn is_spam_cal(&self) -> bool {
        matches!(self, Series::Label(l) if l == "spam-cal")
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Series::Index(i) => write!(f, "{i}"),
            Series::Label(l) => write!(f, "{l}"),
        }
    }
}

/// Sweep metadata attached to each program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramMetadata {
    /// Independent variable of the sweep (already rounded).
    pub xval: f64,
    /// Series/grouping tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,
    /// Repetition count for amplification sequences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrep: Option<u32>,
    /// Sample index for randomized sequences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<u32>,
}

impl ProgramMetadata {
    /// Metadata with only an x value.
    pub fn at(xval: f64) -> Self {
        Self {
            xval,
            ..Self::default()
        }
    }

    /// Set the series tag.
    pub fn with_series(mut self, series: Series) -> Self {
        self.series = Some(series);
        self
    }

    /// Set the repetition count.
    pub fn with_nrep(mut self, nrep: u32) -> Self {
        self.nrep = Some(nrep);
        self
    }

    /// Set the sample index.
    pub fn with_sample(mut self, sample: u32) -> Self {
        self.sample = Some(sample);
        self
    }
}

/// One executable stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusProgram {
    /// Program name.
    pub name: String,
    /// Physical qubit the program runs on.
    pub qubit: QubitId,
    /// Instructions in program order.
    pub instructions: Vec<Instruction>,
    /// Pulse schedules for EF gates, keyed by [`NativeGate::calibration_key`].
    pub calibrations: BTreeMap<String, Schedule>,
    /// Sweep metadata.
    pub metadata: ProgramMetadata,
}

impl StimulusProgram {
    /// Create an empty program on one qubit.
    pub fn new(name: impl Into<String>, qubit: QubitId) -> Self {
        Self {
            name: name.into(),
            qubit,
            instructions: Vec::new(),
            calibrations: BTreeMap::new(),
            metadata: ProgramMetadata::default(),
        }
    }

    /// Append a native gate.
    pub fn gate(&mut self, gate: NativeGate) -> &mut Self {
        self.instructions.push(Instruction::gate(gate, self.qubit));
        self
    }

    /// Append the 0–1 π pulse.
    pub fn x(&mut self) -> &mut Self {
        self.gate(NativeGate::X)
    }

    /// Append an inline pulse schedule.
    pub fn pulse(&mut self, schedule: Schedule) -> &mut Self {
        self.instructions.push(Instruction::pulse(schedule, self.qubit));
        self
    }

    /// Append a barrier.
    pub fn barrier(&mut self) -> &mut Self {
        self.instructions.push(Instruction::barrier([self.qubit]));
        self
    }

    /// Append a measurement into classical bit 0.
    pub fn measure(&mut self) -> &mut Self {
        self.instructions
            .push(Instruction::measure(self.qubit, ClbitId(0)));
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: ProgramMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach a schedule for a gate.
    pub fn add_calibration(&mut self, gate: &NativeGate, schedule: Schedule) {
        self.calibrations.insert(gate.calibration_key(), schedule);
    }

    /// Look up the schedule for a gate.
    pub fn calibration(&self, gate: &NativeGate) -> IrResult<&Schedule> {
        self.calibrations
            .get(&gate.calibration_key())
            .ok_or_else(|| IrError::MissingCalibration(gate.calibration_key()))
    }

    /// Gates in program order.
    pub fn gates(&self) -> impl Iterator<Item = &NativeGate> {
        self.instructions.iter().filter_map(Instruction::as_gate)
    }

    /// Distinct EF gates that need a schedule but have none attached.
    pub fn uncalibrated_gates(&self) -> Vec<NativeGate> {
        let mut missing: Vec<NativeGate> = Vec::new();
        for gate in self.gates() {
            if gate.needs_calibration()
                && !self.calibrations.contains_key(&gate.calibration_key())
                && !missing.contains(gate)
            {
                missing.push(gate.clone());
            }
        }
        missing
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Check that every instruction addresses the program's qubit.
    pub fn validate(&self) -> IrResult<()> {
        for inst in &self.instructions {
            if let Some(q) = inst.qubits.iter().find(|q| **q != self.qubit) {
                return Err(IrError::QubitNotFound {
                    qubit: *q,
                    program: self.name.clone(),
                });
            }
            if let InstructionKind::Gate(g) = &inst.kind {
                if g.needs_calibration() && !self.calibrations.contains_key(&g.calibration_key())
                {
                    return Err(IrError::MissingCalibration(g.calibration_key()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::Channel;

    #[test]
    fn test_build_program() {
        let mut prog = StimulusProgram::new("rabi", QubitId(0));
        prog.x().gate(NativeGate::X12).x().measure();
        let prog = prog.with_metadata(ProgramMetadata::at(0.25).with_series(Series::Index(1)));

        assert_eq!(prog.len(), 4);
        assert_eq!(prog.metadata.xval, 0.25);
        assert_eq!(prog.gates().count(), 3);
        assert_eq!(prog.uncalibrated_gates(), vec![NativeGate::X12]);
        assert!(matches!(
            prog.validate(),
            Err(IrError::MissingCalibration(k)) if k == "x12"
        ));
    }

    #[test]
    fn test_calibration_lookup() {
        let mut prog = StimulusProgram::new("p", QubitId(1));
        prog.gate(NativeGate::Rz12(0.5));
        prog.add_calibration(
            &NativeGate::Rz12(0.5),
            Schedule::new("rz12").shift_phase(-0.5, Channel::Control(1)),
        );
        assert!(prog.calibration(&NativeGate::Rz12(0.5)).is_ok());
        assert!(prog.calibration(&NativeGate::Rz12(0.6)).is_err());
        assert!(prog.validate().is_ok());
    }

    #[test]
    fn test_series_serde() {
        let md = ProgramMetadata::at(1.0).with_series(Series::spam_cal());
        let json = serde_json::to_string(&md).unwrap();
        assert!(json.contains("\"spam-cal\""));
        let back: ProgramMetadata = serde_json::from_str(&json).unwrap();
        assert!(back.series.unwrap().is_spam_cal());
    }
}
