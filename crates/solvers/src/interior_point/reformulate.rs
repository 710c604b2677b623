//! Internal form of a [`NonlinearProgram`].
//!
//! The solver works on `w = [x_free, s]`:
//!
//! - variables with `x_l == x_u` are removed and held at their fixed value
//! - each inequality row `g_l <= g(x) <= g_u` gets a slack `s` bounded by
//!   `[g_l, g_u]` and becomes the equality `g(x) - s = 0`
//! - each equality row becomes `g(x) - g_l = 0`
//!
//! so every constraint seen by the Newton system is an equality `c(w) = 0`
//! and every inequality lives in a simple bound on `w`.

use nalgebra::{DMatrix, DVector};
use trajopt_core::{EvalError, NonlinearProgram};

use super::Error;

#[derive(Debug, Clone, Copy)]
enum Row {
    Equality(f64),
    Slack(usize),
}

#[derive(Debug, Clone)]
pub(super) struct Reformulation {
    free: Vec<usize>,
    template: Vec<f64>,
    rows: Vec<Row>,
    num_slacks: usize,
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl Reformulation {
    pub(super) fn new<P: NonlinearProgram + ?Sized>(problem: &P) -> Result<Self, Error> {
        let n = problem.num_variables();
        let m = problem.num_constraints();
        let (x_lower, x_upper) = problem.variable_bounds();
        let (g_lower, g_upper) = problem.constraint_bounds();

        check_len("variable lower bounds", n, x_lower.len())?;
        check_len("variable upper bounds", n, x_upper.len())?;
        check_len("constraint lower bounds", m, g_lower.len())?;
        check_len("constraint upper bounds", m, g_upper.len())?;

        let mut free = Vec::with_capacity(n);
        let mut template = vec![0.0; n];
        let mut lower = Vec::with_capacity(n + m);
        let mut upper = Vec::with_capacity(n + m);

        for i in 0..n {
            let (l, u) = (x_lower[i], x_upper[i]);
            check_bounds("variable", i, l, u)?;
            if l == u {
                template[i] = l;
            } else {
                free.push(i);
                lower.push(l);
                upper.push(u);
            }
        }

        let mut rows = Vec::with_capacity(m);
        let mut num_slacks = 0;
        let (mut slack_lower, mut slack_upper) = (Vec::new(), Vec::new());

        for i in 0..m {
            let (l, u) = (g_lower[i], g_upper[i]);
            check_bounds("constraint", i, l, u)?;
            if l == u {
                rows.push(Row::Equality(l));
            } else {
                rows.push(Row::Slack(num_slacks));
                num_slacks += 1;
                slack_lower.push(l);
                slack_upper.push(u);
            }
        }

        lower.extend(slack_lower);
        upper.extend(slack_upper);

        Ok(Self {
            free,
            template,
            rows,
            num_slacks,
            lower: DVector::from_vec(lower),
            upper: DVector::from_vec(upper),
        })
    }

    /// Number of internal variables.
    pub(super) fn dim(&self) -> usize {
        self.free.len() + self.num_slacks
    }

    /// Number of constraint rows.
    pub(super) fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub(super) fn lower(&self) -> &DVector<f64> {
        &self.lower
    }

    pub(super) fn upper(&self) -> &DVector<f64> {
        &self.upper
    }

    /// Maps an internal point back to the full variable vector.
    pub(super) fn expand(&self, w: &DVector<f64>) -> Vec<f64> {
        let mut x = self.template.clone();
        for (k, &i) in self.free.iter().enumerate() {
            x[i] = w[k];
        }
        x
    }

    /// Builds an internal point from a full variable vector, with every
    /// slack set to zero.
    pub(super) fn restrict(&self, x: &[f64]) -> DVector<f64> {
        let mut w = DVector::zeros(self.dim());
        for (k, &i) in self.free.iter().enumerate() {
            w[k] = x[i];
        }
        w
    }

    /// Sets each slack to the value of its constraint function.
    pub(super) fn fill_slacks(&self, w: &mut DVector<f64>, g: &DVector<f64>) {
        let offset = self.free.len();
        for (i, row) in self.rows.iter().enumerate() {
            if let Row::Slack(j) = *row {
                w[offset + j] = g[i];
            }
        }
    }

    pub(super) fn objective<P: NonlinearProgram + ?Sized>(
        &self,
        problem: &P,
        w: &DVector<f64>,
    ) -> Result<f64, EvalError> {
        let f = problem.objective(&self.expand(w))?;
        if f.is_finite() {
            Ok(f)
        } else {
            Err(EvalError::NonFinite {
                quantity: "objective",
            })
        }
    }

    /// Evaluates the raw constraint functions `g(x)`.
    pub(super) fn raw_constraints<P: NonlinearProgram + ?Sized>(
        &self,
        problem: &P,
        w: &DVector<f64>,
    ) -> Result<DVector<f64>, EvalError> {
        let g = problem.constraints(&self.expand(w))?;
        check_eval_len("constraints", self.num_rows(), g.len())?;
        if g.iter().all(|v| v.is_finite()) {
            Ok(g)
        } else {
            Err(EvalError::NonFinite {
                quantity: "constraints",
            })
        }
    }

    /// Evaluates the internal equality residuals `c(w)`.
    pub(super) fn constraints<P: NonlinearProgram + ?Sized>(
        &self,
        problem: &P,
        w: &DVector<f64>,
    ) -> Result<DVector<f64>, EvalError> {
        let mut c = self.raw_constraints(problem, w)?;
        let offset = self.free.len();
        for (i, row) in self.rows.iter().enumerate() {
            c[i] -= match *row {
                Row::Equality(target) => target,
                Row::Slack(j) => w[offset + j],
            };
        }
        Ok(c)
    }

    pub(super) fn gradient<P: NonlinearProgram + ?Sized>(
        &self,
        problem: &P,
        w: &DVector<f64>,
    ) -> Result<DVector<f64>, EvalError> {
        let full = problem.gradient(&self.expand(w))?;
        check_eval_len("objective gradient", self.template.len(), full.len())?;
        let mut grad = DVector::zeros(self.dim());
        for (k, &i) in self.free.iter().enumerate() {
            grad[k] = full[i];
        }
        Ok(grad)
    }

    pub(super) fn jacobian<P: NonlinearProgram + ?Sized>(
        &self,
        problem: &P,
        w: &DVector<f64>,
    ) -> Result<DMatrix<f64>, EvalError> {
        let full = problem.jacobian(&self.expand(w))?;
        let (m, n) = (self.num_rows(), self.template.len());
        check_eval_len("constraint Jacobian", m * n, full.nrows() * full.ncols())?;
        check_eval_len("constraint Jacobian columns", n, full.ncols())?;

        let mut jac = DMatrix::zeros(m, self.dim());
        for (k, &i) in self.free.iter().enumerate() {
            jac.set_column(k, &full.column(i));
        }
        let offset = self.free.len();
        for (i, row) in self.rows.iter().enumerate() {
            if let Row::Slack(j) = *row {
                jac[(i, offset + j)] = -1.0;
            }
        }
        Ok(jac)
    }

    /// Hessian of the Lagrangian in internal variables.
    ///
    /// Slacks enter the constraints linearly, so their rows and columns are
    /// zero.
    pub(super) fn hessian<P: NonlinearProgram + ?Sized>(
        &self,
        problem: &P,
        w: &DVector<f64>,
        multipliers: &DVector<f64>,
    ) -> Result<DMatrix<f64>, EvalError> {
        let full = problem.hessian(&self.expand(w), 1.0, multipliers.as_slice())?;
        let n = self.template.len();
        check_eval_len("Hessian rows", n, full.nrows())?;
        check_eval_len("Hessian columns", n, full.ncols())?;

        let mut hess = DMatrix::zeros(self.dim(), self.dim());
        for (a, &i) in self.free.iter().enumerate() {
            for (b, &j) in self.free.iter().enumerate() {
                hess[(a, b)] = full[(i, j)];
            }
        }
        if hess.iter().all(|v| v.is_finite()) {
            Ok(hess)
        } else {
            Err(EvalError::NonFinite {
                quantity: "Hessian",
            })
        }
    }
}

fn check_len(quantity: &'static str, expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::Dimension {
            quantity,
            expected,
            actual,
        })
    }
}

fn check_eval_len(quantity: &'static str, expected: usize, actual: usize) -> Result<(), EvalError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EvalError::Dimension {
            quantity,
            expected,
            actual,
        })
    }
}

fn check_bounds(kind: &'static str, index: usize, lower: f64, upper: f64) -> Result<(), Error> {
    let valid = lower <= upper
        && lower < f64::INFINITY
        && upper > f64::NEG_INFINITY
        && (lower != upper || lower.is_finite());

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidBounds {
            kind,
            index,
            lower,
            upper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dmatrix;

    /// x0 fixed at 2, x1 free in [0, 1], one equality row and one inequality.
    struct Small;

    impl NonlinearProgram for Small {
        fn num_variables(&self) -> usize {
            2
        }

        fn num_constraints(&self) -> usize {
            2
        }

        fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![2.0, 0.0], vec![2.0, 1.0])
        }

        fn constraint_bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![3.0, 0.0], vec![3.0, f64::INFINITY])
        }

        fn objective(&self, x: &[f64]) -> Result<f64, EvalError> {
            Ok(x[0] * x[1])
        }

        fn gradient(&self, x: &[f64]) -> Result<DVector<f64>, EvalError> {
            Ok(DVector::from_vec(vec![x[1], x[0]]))
        }

        fn constraints(&self, x: &[f64]) -> Result<DVector<f64>, EvalError> {
            Ok(DVector::from_vec(vec![x[0] + x[1], x[1] * x[1]]))
        }

        fn jacobian(&self, x: &[f64]) -> Result<DMatrix<f64>, EvalError> {
            Ok(dmatrix![1.0, 1.0; 0.0, 2.0 * x[1]])
        }

        fn hessian(&self, _x: &[f64], sigma: f64, lambda: &[f64]) -> Result<DMatrix<f64>, EvalError> {
            Ok(dmatrix![0.0, sigma; sigma, 2.0 * lambda[1]])
        }
    }

    #[test]
    fn eliminates_fixed_variables_and_adds_slacks() {
        let reform = Reformulation::new(&Small).unwrap();

        assert_eq!(reform.dim(), 2);
        assert_eq!(reform.lower().as_slice(), &[0.0, 0.0]);
        assert_eq!(reform.upper().as_slice(), &[1.0, f64::INFINITY]);

        let w = DVector::from_vec(vec![0.5, 0.1]);
        assert_eq!(reform.expand(&w), vec![2.0, 0.5]);

        let c = reform.constraints(&Small, &w).unwrap();
        assert_eq!(c.as_slice(), &[2.5 - 3.0, 0.25 - 0.1]);

        let jac = reform.jacobian(&Small, &w).unwrap();
        assert_eq!(jac, dmatrix![1.0, 0.0; 1.0, -1.0]);

        let hess = reform
            .hessian(&Small, &w, &DVector::from_vec(vec![0.0, 3.0]))
            .unwrap();
        assert_eq!(hess, dmatrix![6.0, 0.0; 0.0, 0.0]);
    }

    #[test]
    fn rejects_crossed_bounds() {
        struct Crossed;

        impl NonlinearProgram for Crossed {
            fn num_variables(&self) -> usize {
                1
            }
            fn num_constraints(&self) -> usize {
                0
            }
            fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>) {
                (vec![1.0], vec![0.0])
            }
            fn constraint_bounds(&self) -> (Vec<f64>, Vec<f64>) {
                (vec![], vec![])
            }
            fn objective(&self, _x: &[f64]) -> Result<f64, EvalError> {
                Ok(0.0)
            }
            fn gradient(&self, _x: &[f64]) -> Result<DVector<f64>, EvalError> {
                Ok(DVector::zeros(1))
            }
            fn constraints(&self, _x: &[f64]) -> Result<DVector<f64>, EvalError> {
                Ok(DVector::zeros(0))
            }
            fn jacobian(&self, _x: &[f64]) -> Result<DMatrix<f64>, EvalError> {
                Ok(DMatrix::zeros(0, 1))
            }
            fn hessian(&self, _x: &[f64], _s: f64, _l: &[f64]) -> Result<DMatrix<f64>, EvalError> {
                Ok(DMatrix::zeros(1, 1))
            }
        }

        let error = Reformulation::new(&Crossed).unwrap_err();
        assert!(matches!(
            error,
            Error::InvalidBounds {
                kind: "variable",
                index: 0,
                ..
            }
        ));
    }
}
