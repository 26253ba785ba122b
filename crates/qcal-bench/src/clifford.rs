//! Single-qubit unitaries, the Clifford group and native-gate decomposition.
//!
//! The 24 Clifford elements are enumerated as H/S words. Any element (or
//! any product of elements) is turned into native gates through a fixed
//! five-gate Euler factorization:
//!
//! ```text
//! U ∝ RZ(φ − π) · SX · RZ(θ + π) · SX · RZ(λ)
//! ```
//!
//! with the angles read off the SU(2)-normalized matrix.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex64;

use qcal_ir::NativeGate;

use crate::error::{BenchError, BenchResult};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A 2x2 complex matrix acting on the 1–2 subspace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unitary2 {
    m: [[Complex64; 2]; 2],
}

impl Unitary2 {
    /// Build from rows.
    pub const fn new(m: [[Complex64; 2]; 2]) -> Self {
        Self { m }
    }

    /// Identity.
    pub const fn identity() -> Self {
        Self::new([[ONE, ZERO], [ZERO, ONE]])
    }

    /// Hadamard.
    pub fn h() -> Self {
        let v = Complex64::new(FRAC_1_SQRT_2, 0.0);
        Self::new([[v, v], [v, -v]])
    }

    /// Phase gate S.
    pub fn s() -> Self {
        Self::new([[ONE, ZERO], [ZERO, Complex64::i()]])
    }

    /// Pauli X (π rotation).
    pub fn x() -> Self {
        Self::new([[ZERO, ONE], [ONE, ZERO]])
    }

    /// Square root of X (π/2 rotation).
    pub fn sx() -> Self {
        let a = Complex64::new(0.5, 0.5);
        let b = Complex64::new(0.5, -0.5);
        Self::new([[a, b], [b, a]])
    }

    /// `RZ(θ) = diag(e^{−iθ/2}, e^{iθ/2})`.
    pub fn rz(theta: f64) -> Self {
        Self::new([
            [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
            [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
        ])
    }

    /// Matrix element.
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.m[row][col]
    }

    /// Matrix product `self · other`.
    pub fn mul(&self, other: &Unitary2) -> Unitary2 {
        let mut out = [[ZERO; 2]; 2];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = self.m[i][0] * other.m[0][j] + self.m[i][1] * other.m[1][j];
            }
        }
        Unitary2 { m: out }
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Unitary2 {
        Unitary2::new([
            [self.m[0][0].conj(), self.m[1][0].conj()],
            [self.m[0][1].conj(), self.m[1][1].conj()],
        ])
    }

    /// Determinant.
    pub fn det(&self) -> Complex64 {
        self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0]
    }

    /// Rescale to unit determinant.
    pub fn to_su2(&self) -> BenchResult<Unitary2> {
        let det = self.det();
        if (det.norm() - 1.0).abs() > 1e-6 {
            return Err(BenchError::NotUnitary(format!("|det| = {}", det.norm())));
        }
        let scale = det.sqrt().inv();
        let mut out = self.m;
        for row in &mut out {
            for cell in row.iter_mut() {
                *cell *= scale;
            }
        }
        Ok(Unitary2 { m: out })
    }

    /// Check if the matrix equals `other` up to a global phase.
    pub fn equiv(&self, other: &Unitary2, tol: f64) -> bool {
        // |tr(A† B)| = 2 iff A ∝ B for unitaries
        let p = self.dagger().mul(other);
        ((p.m[0][0] + p.m[1][1]).norm() - 2.0).abs() < tol
    }

    /// Check if the matrix is the identity up to a global phase.
    pub fn is_identity_up_to_phase(&self, tol: f64) -> bool {
        self.equiv(&Unitary2::identity(), tol)
    }
}

/// Euler angles of the five-gate factorization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    /// Polar angle.
    pub theta: f64,
    /// Final phase.
    pub phi: f64,
    /// Initial phase.
    pub lambda: f64,
}

impl EulerAngles {
    /// Read the angles off a unitary.
    pub fn from_unitary(u: &Unitary2) -> BenchResult<Self> {
        let su = u.to_su2()?;
        let (u00, u10, u11) = (su.get(0, 0), su.get(1, 0), su.get(1, 1));
        let theta = 2.0 * u10.norm().atan2(u00.norm());
        let phi = u11.arg() + u10.arg();
        let lambda = u11.arg() - u10.arg();
        Ok(Self { theta, phi, lambda })
    }

    /// Native gates `rz12(λ) sx12 rz12(θ+π) sx12 rz12(φ−π)`, in time order.
    pub fn to_gates(self) -> Vec<NativeGate> {
        vec![
            NativeGate::Rz12(self.lambda),
            NativeGate::SX12,
            NativeGate::Rz12(self.theta + PI),
            NativeGate::SX12,
            NativeGate::Rz12(self.phi - PI),
        ]
    }
}

/// Decompose a unitary into the five native gates.
pub fn decompose(u: &Unitary2) -> BenchResult<Vec<NativeGate>> {
    Ok(EulerAngles::from_unitary(u)?.to_gates())
}

/// Matrix of a native gate on the 1–2 subspace.
///
/// `X` acts on the 0–1 transition and has no representation here.
pub fn gate_unitary(gate: &NativeGate) -> Option<Unitary2> {
    match gate {
        NativeGate::X => None,
        NativeGate::X12 => Some(Unitary2::x()),
        NativeGate::Y12 => Some(Unitary2::new([
            [ZERO, -Complex64::i()],
            [Complex64::i(), ZERO],
        ])),
        NativeGate::SX12 => Some(Unitary2::sx()),
        NativeGate::SY12 => {
            let a = Complex64::new(0.5, 0.5);
            Some(Unitary2::new([[a, -a], [a, a]]))
        }
        NativeGate::Rz12(theta) => Some(Unitary2::rz(*theta)),
    }
}

/// Product of a gate sequence in time order (later gates on the left).
pub fn sequence_unitary<'a>(gates: impl IntoIterator<Item = &'a NativeGate>) -> Unitary2 {
    gates
        .into_iter()
        .filter_map(gate_unitary)
        .fold(Unitary2::identity(), |acc, g| g.mul(&acc))
}

#[derive(Debug, Clone, Copy)]
enum Primitive {
    H,
    S,
}

/// H/S words for the 24 group elements; the first letter acts first.
const CLIFFORD_WORDS: [&[Primitive]; 24] = {
    use Primitive::{H, S};
    [
        &[],
        &[H],
        &[S],
        &[H, S],
        &[S, H],
        &[S, S],
        &[H, S, H],
        &[H, S, S],
        &[S, H, S],
        &[S, S, H],
        &[S, S, S],
        &[H, S, H, S],
        &[H, S, S, H],
        &[H, S, S, S],
        &[S, H, S, S],
        &[S, S, H, S],
        &[H, S, H, S, S],
        &[H, S, S, H, S],
        &[S, H, S, S, H],
        &[S, H, S, S, S],
        &[S, S, H, S, S],
        &[H, S, H, S, S, H],
        &[H, S, H, S, S, S],
        &[H, S, S, H, S, S],
    ]
};

/// Number of single-qubit Clifford elements.
pub const NUM_CLIFFORDS: usize = CLIFFORD_WORDS.len();

/// A single-qubit Clifford element (index 0..24).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Clifford {
    index: usize,
}

impl Clifford {
    /// Element by index, wrapping modulo 24.
    pub fn new(index: usize) -> Self {
        Self {
            index: index % NUM_CLIFFORDS,
        }
    }

    /// Index in the table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Unitary representative.
    pub fn unitary(&self) -> Unitary2 {
        CLIFFORD_WORDS[self.index]
            .iter()
            .map(|p| match p {
                Primitive::H => Unitary2::h(),
                Primitive::S => Unitary2::s(),
            })
            .fold(Unitary2::identity(), |acc, g| g.mul(&acc))
    }

    /// Find the element equal to `u` up to phase.
    pub fn find(u: &Unitary2) -> Option<Self> {
        (0..NUM_CLIFFORDS)
            .map(Self::new)
            .find(|c| c.unitary().equiv(u, 1e-9))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_24_distinct_elements() {
        let mats: Vec<Unitary2> = (0..NUM_CLIFFORDS).map(|i| Clifford::new(i).unitary()).collect();
        for i in 0..mats.len() {
            for j in (i + 1)..mats.len() {
                assert!(!mats[i].equiv(&mats[j], 1e-9), "elements {i} and {j} coincide");
            }
        }
    }

    #[test]
    fn test_table_is_closed() {
        for i in 0..NUM_CLIFFORDS {
            let a = Clifford::new(i).unitary();
            assert!(Clifford::find(&a.dagger()).is_some(), "inverse of {i} missing");
            for j in 0..NUM_CLIFFORDS {
                let b = Clifford::new(j).unitary();
                assert!(Clifford::find(&a.mul(&b)).is_some(), "{i}·{j} not in table");
            }
        }
    }

    #[test]
    fn test_identity_decomposes_to_zero_angles() {
        let angles = EulerAngles::from_unitary(&Unitary2::identity()).unwrap();
        assert!(angles.theta.abs() < 1e-12);
        assert!(angles.phi.abs() < 1e-12);
        assert!(angles.lambda.abs() < 1e-12);

        let gates = angles.to_gates();
        assert_eq!(gates[0], NativeGate::Rz12(0.0));
        assert_eq!(gates[2], NativeGate::Rz12(PI));
        assert_eq!(gates[4], NativeGate::Rz12(-PI));
    }

    #[test]
    fn test_decomposition_reproduces_every_clifford() {
        for i in 0..NUM_CLIFFORDS {
            let u = Clifford::new(i).unitary();
            let gates = decompose(&u).unwrap();
            assert_eq!(gates.len(), 5);
            assert!(sequence_unitary(&gates).equiv(&u, 1e-9), "element {i}");
        }
    }

    #[test]
    fn test_decomposition_of_generic_unitary() {
        let u = Unitary2::rz(0.3).mul(&Unitary2::sx()).mul(&Unitary2::rz(-1.1));
        let gates = decompose(&u).unwrap();
        assert!(sequence_unitary(&gates).equiv(&u, 1e-9));
    }

    #[test]
    fn test_non_unitary_is_rejected() {
        let m = Unitary2::new([[ONE, ONE], [ONE, ONE]]);
        assert!(matches!(decompose(&m), Err(BenchError::NotUnitary(_))));
    }

    #[test]
    fn test_gate_unitaries() {
        // sx12 · sx12 = x12 up to phase
        let sx2 = Unitary2::sx().mul(&Unitary2::sx());
        assert!(sx2.equiv(&Unitary2::x(), 1e-12));
        assert!(gate_unitary(&NativeGate::X).is_none());
        let sy = gate_unitary(&NativeGate::SY12).unwrap();
        let y = gate_unitary(&NativeGate::Y12).unwrap();
        assert!(sy.mul(&sy).equiv(&y, 1e-12));
    }
}
