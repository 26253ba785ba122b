//! Device truths and program execution.
//!
//! A play on a control channel rotates the 1–2 subspace. The rotation
//! angle scales with the pulse area relative to the true π pulse, the
//! axis angle is the waveform angle plus the channel frame, and the axis
//! tilts out of the equator with the carrier detuning from the true 1–2
//! frequency and with the DRAG mismatch `β − β_opt`.

use std::f64::consts::{PI, TAU};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use qcal_hal::HalError;
use qcal_ir::{Channel, InstructionKind, PulseOp, Schedule, StimulusProgram, Waveform};

use crate::density::DensityMatrix;

/// Gaussian width the true π amplitude refers to.
pub const REFERENCE_SIGMA: f64 = 40.0;

/// Hidden parameters of one simulated qutrit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QutritDevice {
    /// Peak amplitude of a π pulse with σ = 40 samples.
    pub pi_amp: f64,
    /// True anharmonicity (Hz).
    pub anharmonicity: f64,
    /// DRAG coefficient that removes the phase error.
    pub beta_opt: f64,
    /// Axis tilt per unit of DRAG mismatch.
    pub drag_scale: f64,
    /// Depolarizing probability of the 1–2 block per EF pulse.
    pub depolarizing: f64,
    /// Splitting of the 1–2 line into two charge branches (Hz).
    pub charge_splitting: f64,
}

impl Default for QutritDevice {
    fn default() -> Self {
        Self {
            pi_amp: 0.14,
            anharmonicity: -330e6,
            beta_opt: 0.0,
            drag_scale: 0.05,
            depolarizing: 0.0,
            charge_splitting: 0.0,
        }
    }
}

impl QutritDevice {
    /// Set the true π amplitude.
    pub fn with_pi_amp(mut self, pi_amp: f64) -> Self {
        self.pi_amp = pi_amp;
        self
    }

    /// Set the true anharmonicity.
    pub fn with_anharmonicity(mut self, anharmonicity: f64) -> Self {
        self.anharmonicity = anharmonicity;
        self
    }

    /// Set the optimal DRAG coefficient.
    pub fn with_beta_opt(mut self, beta_opt: f64) -> Self {
        self.beta_opt = beta_opt;
        self
    }

    /// Set the per-pulse depolarizing probability.
    pub fn with_depolarizing(mut self, p: f64) -> Self {
        self.depolarizing = p;
        self
    }

    /// Split the 1–2 line into two branches `δ` apart.
    pub fn with_charge_splitting(mut self, delta: f64) -> Self {
        self.charge_splitting = delta;
        self
    }

    /// Rotation vector of one pulse on the 1–2 subspace.
    fn rotation(&self, waveform: &Waveform, frame: f64, detuning: f64, dt: f64) -> [f64; 3] {
        let theta = PI * waveform.amp() * waveform.sigma() / (self.pi_amp * REFERENCE_SIGMA);
        let effective_time = waveform.sigma() * TAU.sqrt() * dt;
        let phi = waveform.angle() + frame;

        let eps = match waveform {
            Waveform::Drag { beta, .. } => self.drag_scale * (beta - self.beta_opt),
            Waveform::Gaussian { .. } => 0.0,
        };
        let norm = (1.0 + eps * eps).sqrt();
        [
            theta * phi.cos() / norm,
            theta * phi.sin() / norm,
            theta * eps / norm + TAU * detuning * effective_time,
        ]
    }
}

/// Carrier state of one channel during a program.
#[derive(Debug, Clone, Copy)]
struct ChannelState {
    frequency: f64,
    frame: f64,
}

/// Runs one program on one branch of a device.
pub(crate) struct Executor<'a> {
    device: &'a QutritDevice,
    /// True 1–2 frequency of this branch.
    f12: f64,
    /// Carrier before any `SetFrequency`.
    nominal_f12: f64,
    dt: f64,
    channels: FxHashMap<Channel, ChannelState>,
    rho: DensityMatrix,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(device: &'a QutritDevice, f12: f64, nominal_f12: f64, dt: f64) -> Self {
        Self {
            device,
            f12,
            nominal_f12,
            dt,
            channels: FxHashMap::default(),
            rho: DensityMatrix::ground(),
        }
    }

    fn channel(&mut self, channel: Channel) -> &mut ChannelState {
        let nominal = self.nominal_f12;
        self.channels.entry(channel).or_insert(ChannelState {
            frequency: nominal,
            frame: 0.0,
        })
    }

    fn play_schedule(&mut self, schedule: &Schedule) {
        for op in &schedule.ops {
            match op {
                PulseOp::SetFrequency { frequency, channel } => {
                    self.channel(*channel).frequency = *frequency;
                }
                PulseOp::ShiftPhase { phase, channel } => {
                    self.channel(*channel).frame += *phase;
                }
                PulseOp::Play {
                    waveform,
                    channel: channel @ Channel::Control(_),
                } => {
                    let state = *self.channel(*channel);
                    let r = self.device.rotation(
                        waveform,
                        state.frame,
                        state.frequency - self.f12,
                        self.dt,
                    );
                    self.rho.apply_ef_rotation(r);
                    self.rho.depolarize_ef(self.device.depolarizing);
                }
                PulseOp::Play { .. } | PulseOp::Delay { .. } => {}
            }
        }
    }

    /// Execute up to the first measurement and return the state there.
    pub(crate) fn run(mut self, program: &StimulusProgram) -> Result<DensityMatrix, HalError> {
        for inst in &program.instructions {
            match &inst.kind {
                InstructionKind::Gate(gate) if gate.is_ef() => {
                    let schedule = program
                        .calibration(gate)
                        .map_err(|e| HalError::InvalidProgram(e.to_string()))?;
                    self.play_schedule(schedule);
                }
                InstructionKind::Gate(_) => self.rho.apply_x01(),
                InstructionKind::Pulse(schedule) => self.play_schedule(schedule),
                InstructionKind::Measure => return Ok(self.rho),
                InstructionKind::Barrier => {}
            }
        }
        Err(HalError::InvalidProgram(format!(
            "program '{}' has no measurement",
            program.name
        )))
    }
}

/// State at measurement, averaged over the charge branches.
pub(crate) fn simulate(
    device: &QutritDevice,
    program: &StimulusProgram,
    f01: f64,
    nominal_f12: f64,
    dt: f64,
) -> Result<DensityMatrix, HalError> {
    let f12 = f01 + device.anharmonicity;
    if device.charge_splitting == 0.0 {
        return Executor::new(device, f12, nominal_f12, dt).run(program);
    }
    let half = device.charge_splitting / 2.0;
    let low = Executor::new(device, f12 - half, nominal_f12, dt).run(program)?;
    let high = Executor::new(device, f12 + half, nominal_f12, dt).run(program)?;
    Ok(low.mix(&high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_ir::{NativeGate, QubitId};

    const DT: f64 = 2.0e-9 / 9.0;
    const F01: f64 = 4.9e9;

    fn drag(amp: f64, beta: f64, angle: f64) -> Waveform {
        Waveform::Drag {
            duration: 160,
            amp,
            sigma: 40.0,
            beta,
            angle,
        }
    }

    fn ef_program(schedule: Schedule) -> StimulusProgram {
        let mut prog = StimulusProgram::new("t", QubitId(0));
        prog.x().pulse(schedule).x().measure();
        prog
    }

    fn excited(device: &QutritDevice, schedule: Schedule) -> f64 {
        let prog = ef_program(schedule);
        let rho = simulate(device, &prog, F01, F01 + device.anharmonicity, DT).unwrap();
        1.0 - rho.population(0)
    }

    #[test]
    fn test_rabi_signal() {
        let device = QutritDevice::default().with_pi_amp(0.15);
        for amp in [-0.3, -0.1, 0.0, 0.05, 0.15, 0.22] {
            let p = excited(
                &device,
                Schedule::new("rabi").play(drag(amp, 0.0, 0.0), Channel::Control(0)),
            );
            let expected = 0.5 - 0.5 * (PI * amp / 0.15).cos();
            assert!((p - expected).abs() < 1e-9, "amp {amp}: {p} vs {expected}");
        }
    }

    #[test]
    fn test_drag_pair_signal() {
        let device = QutritDevice::default().with_beta_opt(-1.0);
        let ch = Channel::Control(0);
        for beta in [-4.0, -1.0, 0.5, 3.0] {
            let mut schedule = Schedule::new("pairs");
            for _ in 0..3 {
                schedule = schedule
                    .play(drag(0.14, beta, 0.0), ch)
                    .play(drag(0.14, beta, PI), ch);
            }
            let eps: f64 = 0.05 * (beta + 1.0);
            let expected = (2.0 * 3.0 * eps.atan()).sin().powi(2);
            let p = excited(&device, schedule);
            assert!((p - expected).abs() < 1e-9, "beta {beta}: {p} vs {expected}");
        }
    }

    #[test]
    fn test_detuning_reduces_transfer() {
        let device = QutritDevice::default();
        let ch = Channel::Control(0);
        let pulse = Waveform::Gaussian {
            duration: 1120,
            amp: 0.01,
            sigma: 280.0,
            angle: 0.0,
        };
        let at = |detuning: f64| {
            excited(
                &device,
                Schedule::new("spectroscopy")
                    .set_frequency(F01 + device.anharmonicity + detuning, ch)
                    .play(pulse.clone(), ch),
            )
        };
        let on = at(0.0);
        assert!((on - 0.5).abs() < 1e-9);
        assert!(at(5e6) < on);
        assert!((at(3e6) - at(-3e6)).abs() < 1e-12);
    }

    #[test]
    fn test_frame_shift_rotates_axis() {
        let device = QutritDevice::default();
        let ch = Channel::Control(0);
        // sx, a π frame shift, then sx about the reversed axis
        let schedule = Schedule::new("frame")
            .play(drag(0.07, 0.0, 0.0), ch)
            .shift_phase(PI, ch)
            .play(drag(0.07, 0.0, 0.0), ch);
        assert!(excited(&device, schedule) < 1e-12);
    }

    #[test]
    fn test_charge_splitting_averages_branches() {
        let device = QutritDevice::default().with_charge_splitting(2e6);
        let ch = Channel::Control(0);
        let schedule = Schedule::new("pi").play(drag(0.14, 0.0, 0.0), ch);
        let p = excited(&device, schedule);
        assert!(p < 1.0 && p > 0.9);
    }

    #[test]
    fn test_missing_calibration() {
        let mut prog = StimulusProgram::new("t", QubitId(0));
        prog.x().gate(NativeGate::X12).x().measure();
        let err = simulate(&QutritDevice::default(), &prog, F01, F01 - 330e6, DT).unwrap_err();
        assert!(matches!(err, HalError::InvalidProgram(_)));
    }

    #[test]
    fn test_missing_measurement() {
        let mut prog = StimulusProgram::new("t", QubitId(0));
        prog.x();
        let err = simulate(&QutritDevice::default(), &prog, F01, F01 - 330e6, DT).unwrap_err();
        assert!(matches!(err, HalError::InvalidProgram(_)));
    }
}
