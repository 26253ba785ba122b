//! Pulse-level schedule types.
//!
//! A [`Schedule`] is the concrete, fully bound pulse sequence behind one
//! gate or one swept stimulus. Durations are in device samples (`dt`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hardware output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Qubit drive line.
    Drive(u32),
    /// Auxiliary control line (used to address the 1–2 transition).
    Control(u32),
    /// Readout line.
    Measure(u32),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Drive(i) => write!(f, "d{i}"),
            Channel::Control(i) => write!(f, "u{i}"),
            Channel::Measure(i) => write!(f, "m{i}"),
        }
    }
}

/// Parametric pulse envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Waveform {
    /// Gaussian with a derivative (DRAG) quadrature component.
    Drag {
        /// Length in samples.
        duration: u64,
        /// Peak amplitude.
        amp: f64,
        /// Gaussian width in samples.
        sigma: f64,
        /// Derivative-component coefficient.
        beta: f64,
        /// Rotation axis angle in the drive frame.
        angle: f64,
    },
    /// Plain Gaussian.
    Gaussian {
        /// Length in samples.
        duration: u64,
        /// Peak amplitude.
        amp: f64,
        /// Gaussian width in samples.
        sigma: f64,
        /// Rotation axis angle in the drive frame.
        angle: f64,
    },
}

impl Waveform {
    /// Length in samples.
    pub fn duration(&self) -> u64 {
        match self {
            Waveform::Drag { duration, .. } | Waveform::Gaussian { duration, .. } => *duration,
        }
    }

    /// Peak amplitude.
    pub fn amp(&self) -> f64 {
        match self {
            Waveform::Drag { amp, .. } | Waveform::Gaussian { amp, .. } => *amp,
        }
    }

    /// Gaussian width in samples.
    pub fn sigma(&self) -> f64 {
        match self {
            Waveform::Drag { sigma, .. } | Waveform::Gaussian { sigma, .. } => *sigma,
        }
    }

    /// Rotation axis angle.
    pub fn angle(&self) -> f64 {
        match self {
            Waveform::Drag { angle, .. } | Waveform::Gaussian { angle, .. } => *angle,
        }
    }

    /// DRAG coefficient (zero for a plain Gaussian).
    pub fn beta(&self) -> f64 {
        match self {
            Waveform::Drag { beta, .. } => *beta,
            Waveform::Gaussian { .. } => 0.0,
        }
    }

    /// Area under the Gaussian envelope, `amp · σ · √(2π)`.
    pub fn area(&self) -> f64 {
        self.amp() * self.sigma() * (2.0 * std::f64::consts::PI).sqrt()
    }
}

/// One operation on a pulse channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PulseOp {
    /// Play a waveform.
    Play {
        /// Envelope to play.
        waveform: Waveform,
        /// Target channel.
        channel: Channel,
    },
    /// Advance the channel frame phase (radians).
    ShiftPhase {
        /// Phase increment.
        phase: f64,
        /// Target channel.
        channel: Channel,
    },
    /// Set the channel carrier frequency (Hz).
    SetFrequency {
        /// Absolute frequency.
        frequency: f64,
        /// Target channel.
        channel: Channel,
    },
    /// Idle the channel.
    Delay {
        /// Length in samples.
        duration: u64,
        /// Target channel.
        channel: Channel,
    },
}

impl PulseOp {
    /// Channel this operation acts on.
    pub fn channel(&self) -> Channel {
        match self {
            PulseOp::Play { channel, .. }
            | PulseOp::ShiftPhase { channel, .. }
            | PulseOp::SetFrequency { channel, .. }
            | PulseOp::Delay { channel, .. } => *channel,
        }
    }

    /// Samples consumed by this operation.
    pub fn duration(&self) -> u64 {
        match self {
            PulseOp::Play { waveform, .. } => waveform.duration(),
            PulseOp::Delay { duration, .. } => *duration,
            PulseOp::ShiftPhase { .. } | PulseOp::SetFrequency { .. } => 0,
        }
    }
}

/// An ordered, fully bound pulse sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Name of the schedule (gate name or stimulus label).
    pub name: String,
    /// Operations in execution order.
    pub ops: Vec<PulseOp>,
}

impl Schedule {
    /// Create an empty schedule.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: Vec::new(),
        }
    }

    /// Append a play operation.
    pub fn play(mut self, waveform: Waveform, channel: Channel) -> Self {
        self.ops.push(PulseOp::Play { waveform, channel });
        self
    }

    /// Append a phase shift.
    pub fn shift_phase(mut self, phase: f64, channel: Channel) -> Self {
        self.ops.push(PulseOp::ShiftPhase { phase, channel });
        self
    }

    /// Append a frequency change.
    pub fn set_frequency(mut self, frequency: f64, channel: Channel) -> Self {
        self.ops.push(PulseOp::SetFrequency { frequency, channel });
        self
    }

    /// Append a delay.
    pub fn delay(mut self, duration: u64, channel: Channel) -> Self {
        self.ops.push(PulseOp::Delay { duration, channel });
        self
    }

    /// Append all operations of another schedule.
    pub fn append(mut self, other: &Schedule) -> Self {
        self.ops.extend(other.ops.iter().cloned());
        self
    }

    /// Total length in samples, assuming operations run back to back.
    pub fn duration(&self) -> u64 {
        self.ops.iter().map(PulseOp::duration).sum()
    }

    /// Iterator over the waveforms played by this schedule.
    pub fn waveforms(&self) -> impl Iterator<Item = &Waveform> {
        self.ops.iter().filter_map(|op| match op {
            PulseOp::Play { waveform, .. } => Some(waveform),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(amp: f64) -> Waveform {
        Waveform::Drag {
            duration: 160,
            amp,
            sigma: 40.0,
            beta: 0.0,
            angle: 0.0,
        }
    }

    #[test]
    fn test_schedule_builder() {
        let ch = Channel::Control(1);
        let sched = Schedule::new("x12")
            .set_frequency(4.6e9, ch)
            .play(drag(0.14), ch)
            .shift_phase(-0.5, ch);

        assert_eq!(sched.ops.len(), 3);
        assert_eq!(sched.duration(), 160);
        assert_eq!(sched.waveforms().count(), 1);
        assert!(sched.ops.iter().all(|op| op.channel() == ch));
    }

    #[test]
    fn test_area() {
        let w = drag(0.14);
        let expected = 0.14 * 40.0 * (2.0 * std::f64::consts::PI).sqrt();
        assert!((w.area() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(Channel::Control(3).to_string(), "u3");
        assert_eq!(Channel::Drive(0).to_string(), "d0");
    }
}
