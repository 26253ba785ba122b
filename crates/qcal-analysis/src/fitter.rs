//! Bounded least-squares curve fitting.
//!
//! Parameters are found with a Nelder-Mead simplex whose vertices are
//! projected onto the parameter box. Several starting points may be
//! given; the best result is polished with one more restart from its own
//! optimum. Standard errors come from the numeric Jacobian of the weighted
//! residuals, scaled by the reduced χ².

use tracing::debug;

use crate::data::{CurveData, CurvePoint};
use crate::error::{AnalysisError, AnalysisResult};

/// Simplex minimizer over a box.
#[derive(Debug, Clone)]
pub struct NelderMead {
    bounds: Vec<(f64, f64)>,
    tolerance: f64,
    x_tolerance: f64,
    max_iterations: usize,
}

/// Minimum found by [`NelderMead::minimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best parameters.
    pub params: Vec<f64>,
    /// Cost at `params`.
    pub cost: f64,
    /// Iterations used.
    pub iterations: usize,
    /// Whether the tolerance was reached.
    pub converged: bool,
}

impl NelderMead {
    /// Create a minimizer over the given bounds.
    pub fn new(bounds: Vec<(f64, f64)>) -> Self {
        Self {
            bounds,
            tolerance: 1e-10,
            x_tolerance: 1e-8,
            max_iterations: 5000,
        }
    }

    /// Set the relative tolerance on the cost spread of the simplex
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Set the relative tolerance on the vertex spread of the simplex
    pub fn with_x_tolerance(mut self, tol: f64) -> Self {
        self.x_tolerance = tol;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Number of parameters.
    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    fn project(&self, params: &[f64]) -> Vec<f64> {
        params
            .iter()
            .zip(&self.bounds)
            .map(|(&p, &(lo, hi))| p.clamp(lo, hi))
            .collect()
    }

    fn init_simplex(&self, center: &[f64]) -> Vec<Vec<f64>> {
        let mut simplex = vec![self.project(center)];
        for i in 0..self.dim() {
            let mut vertex = simplex[0].clone();
            let (lo, hi) = self.bounds[i];
            let mut delta = if vertex[i].abs() < 1e-10 {
                0.05 * (hi - lo).min(10.0)
            } else {
                0.05 * vertex[i].abs()
            };
            // step inward when the start sits on the upper bound
            if vertex[i] + delta > hi {
                delta = -delta;
            }
            vertex[i] += delta;
            simplex.push(self.project(&vertex));
        }
        simplex
    }

    /// Both the cost spread and the vertex spread must be within tolerance.
    fn converged(&self, simplex: &[Vec<f64>], costs: &[f64]) -> bool {
        let best = costs[0];
        let worst = costs[costs.len() - 1];
        let tol = self.tolerance;
        let flat = (worst - best).abs() <= tol * (best.abs() + tol);
        if !flat {
            return false;
        }
        let max_dist = simplex[1..]
            .iter()
            .map(|v| {
                v.iter()
                    .zip(&simplex[0])
                    .map(|(a, b)| (a - b).abs() / (b.abs() + 1.0))
                    .fold(0.0, f64::max)
            })
            .fold(0.0, f64::max);
        max_dist <= self.x_tolerance
    }

    /// Minimize `cost` starting from `start`. Non-finite costs count as +∞.
    pub fn minimize<F>(&self, cost: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |p: &[f64]| {
            let c = cost(p);
            if c.is_finite() { c } else { f64::INFINITY }
        };
        let n = self.dim();
        let mut simplex = self.init_simplex(start);
        let mut costs: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;

            let mut order: Vec<usize> = (0..simplex.len()).collect();
            order.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            costs = order.iter().map(|&i| costs[i]).collect();

            if self.converged(&simplex, &costs) {
                converged = true;
                break;
            }

            let mut centroid = vec![0.0; n];
            for vertex in &simplex[..n] {
                for (c, v) in centroid.iter_mut().zip(vertex) {
                    *c += v / n as f64;
                }
            }
            let toward = |coef: f64| -> Vec<f64> {
                let pt: Vec<f64> = centroid
                    .iter()
                    .zip(&simplex[n])
                    .map(|(c, w)| c + coef * (c - w))
                    .collect();
                self.project(&pt)
            };

            let reflected = toward(1.0);
            let fr = eval(&reflected);
            if fr < costs[0] {
                let expanded = toward(2.0);
                let fe = eval(&expanded);
                if fe < fr {
                    simplex[n] = expanded;
                    costs[n] = fe;
                } else {
                    simplex[n] = reflected;
                    costs[n] = fr;
                }
                continue;
            }
            if fr < costs[n - 1] {
                simplex[n] = reflected;
                costs[n] = fr;
                continue;
            }

            let (contracted, threshold) = if fr < costs[n] {
                (toward(0.5), fr)
            } else {
                (toward(-0.5), costs[n])
            };
            let fc = eval(&contracted);
            if fc < threshold {
                simplex[n] = contracted;
                costs[n] = fc;
                continue;
            }

            // shrink toward the best vertex
            let best = simplex[0].clone();
            for i in 1..=n {
                let pt: Vec<f64> = best
                    .iter()
                    .zip(&simplex[i])
                    .map(|(b, v)| b + 0.5 * (v - b))
                    .collect();
                simplex[i] = self.project(&pt);
                costs[i] = eval(&simplex[i]);
            }
        }

        let best = (0..costs.len())
            .min_by(|&a, &b| costs[a].total_cmp(&costs[b]))
            .unwrap_or(0);
        Minimum {
            params: simplex[best].clone(),
            cost: costs[best],
            iterations,
            converged,
        }
    }
}

/// Result of a weighted least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    /// Best-fit parameters.
    pub params: Vec<f64>,
    /// One-sigma standard errors, when the covariance is well defined.
    pub stderr: Option<Vec<f64>>,
    /// Weighted residual sum of squares.
    pub cost: f64,
    /// Reduced χ².
    pub reduced_chisq: f64,
    /// Degrees of freedom.
    pub dof: usize,
}

/// Weighted least-squares fit of `model(x, params)` to curve data.
#[derive(Debug, Clone)]
pub struct CurveFitter {
    bounds: Vec<(f64, f64)>,
    tolerance: f64,
    max_iterations: usize,
}

impl CurveFitter {
    /// Create a fitter for parameters within `bounds`.
    pub fn new(bounds: Vec<(f64, f64)>) -> Self {
        Self {
            bounds,
            tolerance: 1e-10,
            max_iterations: 5000,
        }
    }

    /// Set maximum simplex iterations per start.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Fit `model(x, params)` from each starting point and keep the best.
    pub fn fit<M>(
        &self,
        model: M,
        data: &CurveData,
        starts: &[Vec<f64>],
    ) -> AnalysisResult<FitOutcome>
    where
        M: Fn(f64, &[f64]) -> f64,
    {
        self.fit_points(|pt, p| model(pt.x, p), data, starts)
    }

    /// Like [`fit`](Self::fit), for models that also depend on the point's
    /// series or repetition count.
    pub fn fit_points<M>(
        &self,
        model: M,
        data: &CurveData,
        starts: &[Vec<f64>],
    ) -> AnalysisResult<FitOutcome>
    where
        M: Fn(&CurvePoint, &[f64]) -> f64,
    {
        let k = self.bounds.len();
        if data.len() <= k {
            return Err(AnalysisError::InsufficientData {
                needed: k + 1,
                got: data.len(),
            });
        }
        if starts.is_empty() {
            return Err(AnalysisError::FitFailed("no starting point".into()));
        }
        for (lo, hi) in &self.bounds {
            if !(lo <= hi) {
                return Err(AnalysisError::FitFailed(format!(
                    "empty parameter bound [{lo}, {hi}]"
                )));
            }
        }

        let residuals = |p: &[f64]| -> Vec<f64> {
            data.points
                .iter()
                .map(|pt| (pt.y - model(pt, p)) / pt.sigma.max(1e-12))
                .collect()
        };
        let cost = |p: &[f64]| residuals(p).iter().map(|r| r * r).sum::<f64>();

        let nm = NelderMead::new(self.bounds.clone())
            .with_tolerance(self.tolerance)
            .with_max_iterations(self.max_iterations);

        let mut best: Option<Minimum> = None;
        for start in starts {
            let m = nm.minimize(&cost, start);
            if best.as_ref().is_none_or(|b| m.cost < b.cost) {
                best = Some(m);
            }
        }
        let Some(first) = best else {
            return Err(AnalysisError::FitFailed("no starting point".into()));
        };
        let polished = nm.minimize(&cost, &first.params);
        let best = if polished.cost <= first.cost { polished } else { first };

        if !best.cost.is_finite() {
            return Err(AnalysisError::FitFailed("cost is not finite".into()));
        }

        let dof = data.len() - k;
        let reduced_chisq = best.cost / dof as f64;
        let stderr = covariance(&residuals, &best.params, &self.bounds).map(|cov| {
            cov.iter()
                .enumerate()
                .map(|(i, row)| (row[i] * reduced_chisq).max(0.0).sqrt())
                .collect()
        });

        debug!(
            "Fit converged={} after {} iterations: chisq_red={:.4}",
            best.converged, best.iterations, reduced_chisq
        );

        Ok(FitOutcome {
            params: best.params,
            stderr,
            cost: best.cost,
            reduced_chisq,
            dof,
        })
    }
}

/// `(JᵀJ)⁻¹` of the residual Jacobian, `None` if singular.
fn covariance<R>(residuals: &R, params: &[f64], bounds: &[(f64, f64)]) -> Option<Vec<Vec<f64>>>
where
    R: Fn(&[f64]) -> Vec<f64>,
{
    let k = params.len();
    let r0 = residuals(params);
    let mut jac = vec![vec![0.0; k]; r0.len()];
    for j in 0..k {
        let h = 1e-6 * params[j].abs().max(1e-6 * (bounds[j].1 - bounds[j].0).abs().max(1e-9));
        let mut plus = params.to_vec();
        let mut minus = params.to_vec();
        plus[j] += h;
        minus[j] -= h;
        let (rp, rm) = (residuals(&plus), residuals(&minus));
        for (i, row) in jac.iter_mut().enumerate() {
            row[j] = (rp[i] - rm[i]) / (2.0 * h);
        }
    }

    let mut jtj = vec![vec![0.0; k]; k];
    for row in &jac {
        for a in 0..k {
            for b in 0..k {
                jtj[a][b] += row[a] * row[b];
            }
        }
    }
    invert(jtj)
}

/// Gauss-Jordan inverse with partial pivoting.
fn invert(mut m: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = m.len();
    let scale = m
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 * scale {
            return None;
        }
        m.swap(col, pivot);
        inv.swap(col, pivot);

        let p = m[col][col];
        for j in 0..n {
            m[col][j] /= p;
            inv[col][j] /= p;
        }
        for row in 0..n {
            if row != col {
                let factor = m[row][col];
                if factor != 0.0 {
                    for j in 0..n {
                        m[row][j] -= factor * m[col][j];
                        inv[row][j] -= factor * inv[col][j];
                    }
                }
            }
        }
    }
    Some(inv)
}
