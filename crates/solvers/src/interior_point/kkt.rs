//! The primal-dual Newton system and its regularization.
//!
//! ```text
//! [ W + Σ + δ_w I    Jᵀ     ] [ dw ]   [ -(∇φ + Jᵀλ) ]
//! [ J               -δ_c I  ] [ dλ ] = [ -c          ]
//! ```
//!
//! The matrix must have exactly `n` positive and `m` negative eigenvalues for
//! `dw` to be a descent direction on the null space of `J`. When it does not,
//! `δ_w` grows until it does and `δ_c` handles rank-deficient Jacobians.
//!
//! The inertia is read off a Cholesky factorization of `W + Σ + δ_w I` and of
//! the Schur complement `δ_c I + J (W + Σ + δ_w I)⁻¹ Jᵀ` whenever the first
//! one exists. Only an indefinite Hessian block falls back to counting
//! eigenvalues.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn, LU};
use tracing::warn;

const DELTA_W_FIRST: f64 = 1e-4;
const DELTA_W_MIN: f64 = 1e-20;
const DELTA_W_MAX: f64 = 1e40;
const DELTA_C: f64 = 1e-8;
const DELTA_C_MAX: f64 = 1.0;
const KAPPA_C: f64 = 10.0;
const KAPPA_W_MINUS: f64 = 1.0 / 3.0;
const KAPPA_W_PLUS: f64 = 8.0;
const KAPPA_W_PLUS_FIRST: f64 = 100.0;

/// Regularization memory carried between iterations.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Regularization {
    last_delta_w: f64,
}

/// A factored Newton matrix with the correct inertia.
pub(super) struct Factored {
    lu: LU<f64, Dyn, Dyn>,
    n: usize,
    pub delta_w: f64,
    pub delta_c: f64,
}

/// The regularization needed to obtain the correct inertia exceeded its cap.
#[derive(Debug, Clone, Copy)]
pub(super) struct Breakdown;

impl Regularization {
    /// Forms and factors the Newton matrix, regularizing as needed.
    ///
    /// `hessian` already includes the barrier term `Σ`.
    pub fn factor(
        &mut self,
        hessian: &DMatrix<f64>,
        jacobian: &DMatrix<f64>,
        mu: f64,
    ) -> Result<Factored, Breakdown> {
        if hessian.iter().chain(jacobian.iter()).any(|v| !v.is_finite()) {
            return Err(Breakdown);
        }

        let n = hessian.nrows();
        let scale = largest_entry(hessian).max(largest_entry(jacobian)).max(1.0);

        let mut delta_w = 0.0;
        let mut delta_c = 0.0;

        loop {
            match inertia(hessian, jacobian, delta_w, delta_c, scale) {
                Inertia::Correct => {
                    let lu = assemble(hessian, jacobian, delta_w, delta_c).lu();
                    if lu.is_invertible() {
                        if delta_w > 0.0 {
                            self.last_delta_w = delta_w;
                        }
                        return Ok(Factored {
                            lu,
                            n,
                            delta_w,
                            delta_c,
                        });
                    }
                    if delta_c == 0.0 {
                        delta_c = DELTA_C * mu.powf(0.25);
                    }
                }
                Inertia::RankDeficient => {
                    delta_c = if delta_c == 0.0 {
                        DELTA_C * mu.powf(0.25)
                    } else {
                        KAPPA_C * delta_c
                    };
                    if delta_c > DELTA_C_MAX {
                        warn!(delta_c, "Jacobian regularization exceeded its limit");
                        return Err(Breakdown);
                    }
                    continue;
                }
                Inertia::Singular if delta_c == 0.0 => {
                    delta_c = DELTA_C * mu.powf(0.25);
                }
                Inertia::Singular | Inertia::Wrong => {}
            }

            delta_w = if delta_w == 0.0 {
                if self.last_delta_w == 0.0 {
                    DELTA_W_FIRST
                } else {
                    (KAPPA_W_MINUS * self.last_delta_w).max(DELTA_W_MIN)
                }
            } else if self.last_delta_w == 0.0 {
                KAPPA_W_PLUS_FIRST * delta_w
            } else {
                KAPPA_W_PLUS * delta_w
            };

            if delta_w > DELTA_W_MAX {
                warn!(delta_w, "Hessian regularization exceeded its limit");
                return Err(Breakdown);
            }
        }
    }
}

impl Factored {
    /// Solves for `(dw, dλ)` given the two right-hand-side blocks.
    pub fn solve(&self, top: &DVector<f64>, bottom: &DVector<f64>) -> Option<(DVector<f64>, DVector<f64>)> {
        let m = bottom.len();
        let mut rhs = DVector::zeros(self.n + m);
        rhs.rows_mut(0, self.n).copy_from(top);
        rhs.rows_mut(self.n, m).copy_from(bottom);

        let sol = self.lu.solve(&rhs)?;
        if sol.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some((sol.rows(0, self.n).into_owned(), sol.rows(self.n, m).into_owned()))
    }
}

/// Least-squares estimate of the constraint multipliers,
/// `argmin_λ ‖g + Jᵀλ‖₂`, where `g` is the gradient net of bound multipliers.
///
/// Returns `None` if the augmented system is singular.
pub(super) fn least_squares_multipliers(gradient: &DVector<f64>, jacobian: &DMatrix<f64>) -> Option<DVector<f64>> {
    let (m, n) = jacobian.shape();
    if m == 0 {
        return Some(DVector::zeros(0));
    }

    let matrix = assemble(&DMatrix::identity(n, n), jacobian, 0.0, 0.0);
    let mut rhs = DVector::zeros(n + m);
    rhs.rows_mut(0, n).copy_from(&(-gradient));

    let sol = matrix.lu().solve(&rhs)?;
    let lambda = sol.rows(n, m).into_owned();
    lambda.iter().all(|v| v.is_finite()).then_some(lambda)
}

fn assemble(hessian: &DMatrix<f64>, jacobian: &DMatrix<f64>, delta_w: f64, delta_c: f64) -> DMatrix<f64> {
    let n = hessian.nrows();
    let m = jacobian.nrows();
    let mut matrix = DMatrix::zeros(n + m, n + m);

    matrix.view_mut((0, 0), (n, n)).copy_from(hessian);
    matrix.view_mut((n, 0), (m, n)).copy_from(jacobian);
    matrix.view_mut((0, n), (n, m)).copy_from(&jacobian.transpose());
    for i in 0..n {
        matrix[(i, i)] += delta_w;
    }
    for i in 0..m {
        matrix[(n + i, n + i)] = -delta_c;
    }
    matrix
}

/// Outcome of an inertia test on the regularized Newton matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inertia {
    /// `n` positive and `m` negative eigenvalues.
    Correct,

    /// The Hessian block is positive definite but the Schur complement is
    /// not, so only `δ_c` needs to grow.
    RankDeficient,

    /// Some eigenvalues are zero at the scale of the unregularized matrix.
    Singular,

    /// Too many negative eigenvalues.
    Wrong,
}

/// Classifies the inertia of the matrix `assemble` would build.
///
/// `scale` is the largest entry of the unregularized blocks and sets the
/// tolerance below which an eigenvalue counts as zero.
fn inertia(hessian: &DMatrix<f64>, jacobian: &DMatrix<f64>, delta_w: f64, delta_c: f64, scale: f64) -> Inertia {
    let (m, n) = jacobian.shape();

    let mut shifted = hessian.clone();
    for i in 0..n {
        shifted[(i, i)] += delta_w;
    }
    let schur = if n == 0 {
        Some(DMatrix::zeros(m, m))
    } else {
        positive_definite(shifted).map(|chol| jacobian * chol.solve(&jacobian.transpose()))
    };

    if let Some(mut schur) = schur {
        if m == 0 {
            return Inertia::Correct;
        }
        for i in 0..m {
            schur[(i, i)] += delta_c;
        }
        return if positive_definite(schur).is_some() {
            Inertia::Correct
        } else {
            Inertia::RankDeficient
        };
    }

    let matrix = assemble(hessian, jacobian, delta_w, delta_c);
    let eigenvalues = matrix.symmetric_eigenvalues();
    let tol = f64::EPSILON * (n + m) as f64 * (scale + delta_w);

    let (mut positive, mut negative) = (0, 0);
    for &value in &eigenvalues {
        if value > tol {
            positive += 1;
        } else if value < -tol {
            negative += 1;
        } else {
            return Inertia::Singular;
        }
    }
    if positive == n && negative == m {
        Inertia::Correct
    } else {
        Inertia::Wrong
    }
}

/// Cholesky factor of a symmetric matrix whose pivots all clear a tolerance
/// relative to its largest diagonal entry, or `None` if the matrix is empty
/// or not safely positive definite.
fn positive_definite(matrix: DMatrix<f64>) -> Option<Cholesky<f64, Dyn>> {
    let dim = matrix.nrows();
    if dim == 0 {
        return None;
    }

    let tol = f64::EPSILON * dim as f64 * matrix.diagonal().amax();
    let chol = Cholesky::new(matrix)?;
    chol.l_dirty().diagonal().iter().all(|&l| l * l > tol).then_some(chol)
}

fn largest_entry(matrix: &DMatrix<f64>) -> f64 {
    if matrix.is_empty() { 0.0 } else { matrix.amax() }
}
