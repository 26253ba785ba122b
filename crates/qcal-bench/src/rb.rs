//! Randomized Benchmarking (RB) on the 1–2 transition.
//!
//! Each sequence starts from the identity, applies `length` random group
//! elements and, in full-group mode, closes with the adjoint of their
//! product so the ideal sequence is the identity. Every element is emitted
//! as a fixed five-gate native decomposition.
//!
//! Circuits are wrapped with a 0–1 `X` at both ends to move population into
//! and out of the manifold, and a barrier follows every decomposed step.
//!
//! Fidelity = 1 − EPC, with EPC = (1 − p) / 2 for the decay parameter p.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use qcal_ir::{NativeGate, ProgramMetadata, QubitId, StimulusProgram};

use crate::BenchmarkResult;
use crate::clifford::{Clifford, NUM_CLIFFORDS, Unitary2, decompose, sequence_unitary};
use crate::error::{BenchError, BenchResult};

/// Group sampled by the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RbMode {
    /// Uniform single-qubit Clifford elements with an inverting final step.
    #[default]
    Standard,
    /// Two uniform angles per step, no closing step.
    Polar,
}

impl RbMode {
    /// Name used in program names and reports.
    pub fn name(&self) -> &'static str {
        match self {
            RbMode::Standard => "standard",
            RbMode::Polar => "polar",
        }
    }
}

/// Configuration for an RB experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct RbConfig {
    /// Sequence lengths.
    pub lengths: Vec<u32>,
    /// Random sequences per length.
    pub num_samples: u32,
    /// Generator seed.
    pub seed: u64,
    /// Sampling mode.
    pub mode: RbMode,
}

impl Default for RbConfig {
    fn default() -> Self {
        Self {
            lengths: default_lengths(1, 100, 15),
            num_samples: 5,
            seed: 123,
            mode: RbMode::Standard,
        }
    }
}

/// `num` integer lengths evenly spaced over `[min, max]` (truncated).
pub fn default_lengths(min: u32, max: u32, num: usize) -> Vec<u32> {
    match num {
        0 => vec![],
        1 => vec![min],
        _ => {
            let step = (f64::from(max) - f64::from(min)) / (num - 1) as f64;
            let mut lengths: Vec<u32> = (0..num)
                .map(|i| (f64::from(min) + step * i as f64) as u32)
                .collect();
            // the endpoint is exact, not accumulated
            lengths[num - 1] = max;
            lengths
        }
    }
}

/// One synthesized sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RbSequence {
    /// Number of random elements.
    pub length: u32,
    /// Native gates of each step, in time order.
    pub steps: Vec<Vec<NativeGate>>,
}

impl RbSequence {
    /// All native gates, flattened.
    pub fn gates(&self) -> impl Iterator<Item = &NativeGate> {
        self.steps.iter().flatten()
    }

    /// Product of all gates on the 1–2 subspace.
    pub fn unitary(&self) -> Unitary2 {
        sequence_unitary(self.gates())
    }

    /// Wrap into a program: `X`, the steps each followed by a barrier, `X`,
    /// measure.
    pub fn to_program(&self, name: impl Into<String>, qubit: QubitId) -> StimulusProgram {
        let mut prog = StimulusProgram::new(name, qubit);
        prog.x();
        for step in &self.steps {
            for gate in step {
                prog.gate(gate.clone());
            }
            prog.barrier();
        }
        prog.x().measure();
        prog
    }
}

/// Full-group sequence: `length` random Cliffords, then the adjoint of
/// their product. A zero-length sequence still carries the (trivial)
/// adjoint step.
pub fn standard_sequence<R: Rng + ?Sized>(length: u32, rng: &mut R) -> BenchResult<RbSequence> {
    let mut composed = Unitary2::identity();
    let mut steps = Vec::with_capacity(length as usize + 1);

    for _ in 0..length {
        let element = Clifford::new(rng.gen_range(0..NUM_CLIFFORDS)).unitary();
        composed = element.mul(&composed);
        steps.push(decompose(&element)?);
    }
    steps.push(decompose(&composed.dagger())?);

    Ok(RbSequence { length, steps })
}

/// Native gates of one polar step.
pub fn polar_step(angle1: f64, angle2: f64) -> Vec<NativeGate> {
    vec![
        NativeGate::Rz12(angle1),
        NativeGate::X12,
        NativeGate::Rz12(angle2 - angle1),
        NativeGate::X12,
        NativeGate::Rz12(-angle2),
    ]
}

/// Polar sequence: two uniform angles in `[−π, π]` per step.
pub fn polar_sequence<R: Rng + ?Sized>(length: u32, rng: &mut R) -> RbSequence {
    let steps = (0..length)
        .map(|_| {
            let a1 = rng.gen_range(-PI..=PI);
            let a2 = rng.gen_range(-PI..=PI);
            polar_step(a1, a2)
        })
        .collect();
    RbSequence { length, steps }
}

/// Synthesize one sequence in the given mode.
pub fn synthesize<R: Rng + ?Sized>(
    mode: RbMode,
    length: u32,
    rng: &mut R,
) -> BenchResult<RbSequence> {
    match mode {
        RbMode::Standard => standard_sequence(length, rng),
        RbMode::Polar => Ok(polar_sequence(length, rng)),
    }
}

/// Build all RB programs for a configuration, samples outermost.
///
/// Metadata carries the length as `xval` and the sample index.
pub fn generate_programs(config: &RbConfig, qubit: QubitId) -> BenchResult<Vec<StimulusProgram>> {
    if config.lengths.is_empty() {
        return Err(BenchError::InvalidConfig("no sequence lengths".into()));
    }
    if config.num_samples == 0 {
        return Err(BenchError::InvalidConfig("num_samples must be positive".into()));
    }

    let mut rng = SmallRng::seed_from_u64(config.seed);
    let mut programs = Vec::with_capacity(config.lengths.len() * config.num_samples as usize);
    for sample in 0..config.num_samples {
        for &length in &config.lengths {
            let seq = synthesize(config.mode, length, &mut rng)?;
            let name = format!("rb_{}_{length}_{sample}", config.mode.name());
            let metadata = ProgramMetadata::at(f64::from(length)).with_sample(sample);
            programs.push(seq.to_program(name, qubit).with_metadata(metadata));
        }
    }

    debug!(
        "Generated {} {} RB programs (seed {})",
        programs.len(),
        config.mode.name(),
        config.seed
    );
    Ok(programs)
}

/// Log-linear estimate of `A · p^m + B` with `B` pinned at 0.5.
///
/// Returns `(A, p, B)`. Used as a starting point for the full fit.
pub fn fit_rb_decay(data: &[(u32, f64)]) -> (f64, f64, f64) {
    let b_guess = 0.5;
    if data.len() < 3 {
        return (0.5, 1.0, b_guess);
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut n = 0.0;

    for &(m, prob) in data {
        let shifted = prob - b_guess;
        if shifted > 0.001 {
            let x = f64::from(m);
            let y = shifted.ln();
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
            n += 1.0;
        }
    }

    let denom = n * sum_xx - sum_x * sum_x;
    if n < 2.0 || denom.abs() < f64::EPSILON {
        return (0.5, 1.0, b_guess);
    }

    // y = ln(A) + m · ln(p)
    let ln_p = (n * sum_xy - sum_x * sum_y) / denom;
    let ln_a = (sum_y - ln_p * sum_x) / n;

    (ln_a.exp().clamp(0.0, 1.0), ln_p.exp().clamp(0.0, 1.0), b_guess)
}

/// Error per Clifford, `(d − 1)(1 − p) / d` with `d = 2`.
pub fn error_per_clifford(p: f64) -> f64 {
    (1.0 - p) / 2.0
}

/// Create an RB benchmark result.
pub fn rb_result(
    mode: RbMode,
    qubit: u32,
    epc: f64,
    decay_param: f64,
    lengths: &[u32],
) -> BenchmarkResult {
    BenchmarkResult::new(format!("rb12_{}", mode.name()), qubit, 1.0 - epc, "gate_fidelity")
        .with_metric("error_per_clifford", epc)
        .with_metric("decay_parameter", decay_param)
        .with_metric(
            "max_sequence_length",
            u64::from(lengths.iter().copied().max().unwrap_or(0)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_lengths() {
        let lengths = default_lengths(1, 100, 15);
        assert_eq!(lengths.len(), 15);
        assert_eq!(lengths[0], 1);
        assert_eq!(lengths[1], 8);
        assert_eq!(*lengths.last().unwrap(), 100);
    }

    #[test]
    fn test_zero_length_is_adjoint_of_identity() {
        let mut rng = SmallRng::seed_from_u64(7);
        let seq = standard_sequence(0, &mut rng).unwrap();
        assert_eq!(seq.steps.len(), 1);
        assert_eq!(
            seq.steps[0],
            vec![
                NativeGate::Rz12(0.0),
                NativeGate::SX12,
                NativeGate::Rz12(PI),
                NativeGate::SX12,
                NativeGate::Rz12(-PI),
            ]
        );
        assert!(seq.unitary().is_identity_up_to_phase(1e-9));
    }

    #[test]
    fn test_polar_zero_angles() {
        let step = polar_step(0.0, 0.0);
        assert_eq!(
            step,
            vec![
                NativeGate::Rz12(0.0),
                NativeGate::X12,
                NativeGate::Rz12(0.0),
                NativeGate::X12,
                NativeGate::Rz12(0.0),
            ]
        );
        assert!(sequence_unitary(&step).is_identity_up_to_phase(1e-12));
    }

    #[test]
    fn test_polar_has_no_closing_step() {
        let mut rng = SmallRng::seed_from_u64(1);
        let seq = polar_sequence(4, &mut rng);
        assert_eq!(seq.steps.len(), 4);
        assert!(polar_sequence(0, &mut rng).steps.is_empty());
    }

    #[test]
    fn test_program_layout() {
        let mut rng = SmallRng::seed_from_u64(3);
        let seq = standard_sequence(2, &mut rng).unwrap();
        let prog = seq.to_program("rb", QubitId(0));
        // X + 3 steps × (5 gates + barrier) + X + measure
        assert_eq!(prog.len(), 1 + 3 * 6 + 2);
        assert_eq!(prog.instructions[0].as_gate(), Some(&NativeGate::X));
        assert!(prog.instructions[6].is_barrier());
        assert!(prog.instructions.last().unwrap().is_measure());
    }

    #[test]
    fn test_generate_programs_is_reproducible() {
        let config = RbConfig {
            lengths: vec![1, 5, 10],
            num_samples: 2,
            ..RbConfig::default()
        };
        let a = generate_programs(&config, QubitId(0)).unwrap();
        let b = generate_programs(&config, QubitId(0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
        assert_eq!(a[3].metadata.xval, 1.0);
        assert_eq!(a[3].metadata.sample, Some(1));
    }

    #[test]
    fn test_empty_lengths_rejected() {
        let config = RbConfig {
            lengths: vec![],
            ..RbConfig::default()
        };
        assert!(generate_programs(&config, QubitId(0)).is_err());
    }

    #[test]
    fn test_fit_rb_decay() {
        let data: Vec<(u32, f64)> = [1u32, 2, 4, 8, 16, 32]
            .iter()
            .map(|&m| (m, 0.5 * 0.98f64.powi(m as i32) + 0.5))
            .collect();
        let (a, p, b) = fit_rb_decay(&data);
        assert!((p - 0.98).abs() < 1e-9);
        assert!((a - 0.5).abs() < 1e-9);
        assert_eq!(b, 0.5);
    }

    #[test]
    fn test_error_per_clifford() {
        assert!(error_per_clifford(1.0).abs() < 1e-12);
        assert!((error_per_clifford(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rb_result() {
        let result = rb_result(RbMode::Polar, 2, 0.001, 0.998, &[1, 8, 100]);
        assert_eq!(result.qubit, 2);
        assert!((result.value - 0.999).abs() < 1e-12);
        assert_eq!(result.name, "rb12_polar");
        assert_eq!(result.metrics["max_sequence_length"], 100);
    }

    proptest! {
        #[test]
        fn standard_sequence_composes_to_identity(seed in any::<u64>(), length in 0u32..40) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let seq = standard_sequence(length, &mut rng).unwrap();
            prop_assert_eq!(seq.steps.len(), length as usize + 1);
            prop_assert!(seq.unitary().is_identity_up_to_phase(1e-8));
        }
    }
}
