//! Three-level density-matrix engine.

use num_complex::Complex64;

type Matrix3 = [[Complex64; 3]; 3];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

fn identity() -> Matrix3 {
    [[ONE, ZERO, ZERO], [ZERO, ONE, ZERO], [ZERO, ZERO, ONE]]
}

fn mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[ZERO; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn dagger(a: &Matrix3) -> Matrix3 {
    let mut out = [[ZERO; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[j][i].conj();
        }
    }
    out
}

/// Mixed state of one transmon truncated to its three lowest levels.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMatrix {
    rho: Matrix3,
}

impl Default for DensityMatrix {
    fn default() -> Self {
        Self::ground()
    }
}

impl DensityMatrix {
    /// `|0⟩⟨0|`.
    pub fn ground() -> Self {
        let mut rho = [[ZERO; 3]; 3];
        rho[0][0] = ONE;
        Self { rho }
    }

    /// Population of a level.
    pub fn population(&self, level: usize) -> f64 {
        self.rho[level][level].re.clamp(0.0, 1.0)
    }

    /// Populations of levels 0, 1 and 2.
    pub fn populations(&self) -> [f64; 3] {
        [self.population(0), self.population(1), self.population(2)]
    }

    /// Trace (1 up to rounding).
    pub fn trace(&self) -> f64 {
        (0..3).map(|i| self.rho[i][i].re).sum()
    }

    fn conjugate(&mut self, u: &Matrix3) {
        self.rho = mul(&mul(u, &self.rho), &dagger(u));
    }

    /// Ideal π rotation on the 0–1 transition.
    pub fn apply_x01(&mut self) {
        let mi = Complex64::new(0.0, -1.0);
        let u = [[ZERO, mi, ZERO], [mi, ZERO, ZERO], [ZERO, ZERO, ONE]];
        self.conjugate(&u);
    }

    /// Rotation of the 1–2 subspace by `|r|` about the axis `r / |r|`,
    /// `exp(−i/2 · r·σ)` with `|1⟩` as the upper pole.
    pub fn apply_ef_rotation(&mut self, r: [f64; 3]) {
        let angle = (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt();
        if angle < 1e-15 {
            return;
        }
        let (nx, ny, nz) = (r[0] / angle, r[1] / angle, r[2] / angle);
        let (s, c) = (angle / 2.0).sin_cos();

        let mut u = identity();
        u[1][1] = Complex64::new(c, -s * nz);
        u[1][2] = Complex64::new(-s * ny, -s * nx);
        u[2][1] = Complex64::new(s * ny, -s * nx);
        u[2][2] = Complex64::new(c, s * nz);
        self.conjugate(&u);
    }

    /// Depolarize the 1–2 block with probability `p`.
    ///
    /// The block relaxes toward its maximally mixed state of equal trace;
    /// coherences with level 0 shrink by `1 − p`.
    pub fn depolarize_ef(&mut self, p: f64) {
        if p <= 0.0 {
            return;
        }
        let p = p.min(1.0);
        let half_trace = (self.rho[1][1].re + self.rho[2][2].re) / 2.0;
        for i in 0..3 {
            for j in 0..3 {
                if i == 0 && j == 0 {
                    continue;
                }
                self.rho[i][j] *= 1.0 - p;
                if i == j {
                    self.rho[i][j] += Complex64::new(p * half_trace, 0.0);
                }
            }
        }
    }

    /// Element-wise average of two states.
    pub fn mix(&self, other: &DensityMatrix) -> DensityMatrix {
        let mut rho = self.rho;
        for (i, row) in rho.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (*cell + other.rho[i][j]) * 0.5;
            }
        }
        DensityMatrix { rho }
    }
}
