use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use trajopt_core::{Dynamics, EvalError, PointJacobian};

use super::evaluator::Evaluator;

/// How the dynamics are enforced across each mesh interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// `x₁ - x₀ - h/2 (f₀ + f₁) = 0`.
    #[default]
    Trapezoidal,

    /// Compressed Hermite–Simpson: Simpson quadrature with a Hermite
    /// interpolated midpoint state, `x₁ - x₀ - h/6 (f₀ + 4 f_c + f₁) = 0`.
    HermiteSimpson,
}

/// One end of a mesh interval.
#[derive(Debug, Clone, Copy)]
pub struct Node<'x> {
    pub time: f64,
    pub state: &'x [f64],
    pub control: &'x [f64],

    /// `∂t/∂θ` for each free time variable `θ`.
    pub time_sensitivity: &'x [f64],
}

/// A mesh interval with the dynamics already evaluated at both ends.
#[derive(Debug, Clone, Copy)]
pub struct Interval<'x> {
    pub start: Node<'x>,
    pub end: Node<'x>,
    pub start_derivative: &'x [f64],
    pub end_derivative: &'x [f64],
}

impl Interval<'_> {
    fn step(&self) -> f64 {
        self.end.time - self.start.time
    }

    /// `∂h/∂θ` for each free time variable.
    fn step_sensitivity(&self) -> Vec<f64> {
        self.end
            .time_sensitivity
            .iter()
            .zip(self.start.time_sensitivity)
            .map(|(end, start)| end - start)
            .collect()
    }

    fn midpoint(&self, f0: &DVector<f64>, f1: &DVector<f64>) -> (f64, DVector<f64>, DVector<f64>) {
        let h = self.step();
        let x0 = DVector::from_column_slice(self.start.state);
        let x1 = DVector::from_column_slice(self.end.state);
        let u0 = DVector::from_column_slice(self.start.control);
        let u1 = DVector::from_column_slice(self.end.control);

        let time = 0.5 * (self.start.time + self.end.time);
        let state = (x0 + x1) * 0.5 + (f0 - f1) * (h / 8.0);
        let control = (u0 + u1) * 0.5;
        (time, state, control)
    }
}

/// Partial derivatives of one interval's defect.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectJacobian {
    /// `∂d/∂x` at the start and end nodes.
    pub state: [DMatrix<f64>; 2],

    /// `∂d/∂u` at the start and end nodes.
    pub control: [DMatrix<f64>; 2],

    /// `∂d/∂θ`, one column per free time variable.
    pub time: DMatrix<f64>,
}

impl Scheme {
    /// Evaluates the defect of one interval.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the midpoint evaluation fails.
    pub fn defect<D: Dynamics>(
        self,
        eval: &Evaluator<'_, D>,
        interval: &Interval<'_>,
    ) -> Result<Vec<f64>, EvalError> {
        let h = interval.step();
        let f0 = DVector::from_column_slice(interval.start_derivative);
        let f1 = DVector::from_column_slice(interval.end_derivative);

        let quadrature = match self {
            Self::Trapezoidal => (&f0 + &f1) * (h / 2.0),
            Self::HermiteSimpson => {
                let (tc, xc, uc) = interval.midpoint(&f0, &f1);
                let fc = DVector::from_vec(eval.derivative(tc, xc.as_slice(), uc.as_slice())?);
                (&f0 + fc * 4.0 + &f1) * (h / 6.0)
            }
        };

        Ok(interval
            .end
            .state
            .iter()
            .zip(interval.start.state)
            .zip(quadrature.iter())
            .map(|((x1, x0), q)| x1 - x0 - q)
            .collect())
    }

    /// Differentiates the defect of one interval given the dynamics
    /// Jacobians at its two nodes.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the midpoint evaluation fails.
    pub fn defect_jacobian<D: Dynamics>(
        self,
        eval: &Evaluator<'_, D>,
        interval: &Interval<'_>,
        start: &PointJacobian,
        end: &PointJacobian,
    ) -> Result<DefectJacobian, EvalError> {
        let nx = interval.start.state.len();
        let identity = DMatrix::<f64>::identity(nx, nx);
        let h = interval.step();
        let dh = interval.step_sensitivity();
        let dt0 = interval.start.time_sensitivity;
        let dt1 = interval.end.time_sensitivity;
        let f0 = DVector::from_column_slice(interval.start_derivative);
        let f1 = DVector::from_column_slice(interval.end_derivative);

        match self {
            Self::Trapezoidal => {
                let half = h / 2.0;
                let sum = &f0 + &f1;
                let time = DMatrix::from_fn(nx, dh.len(), |i, j| {
                    -dh[j] / 2.0 * sum[i]
                        - half * (start.time[i] * dt0[j] + end.time[i] * dt1[j])
                });
                Ok(DefectJacobian {
                    state: [
                        -&identity - &start.state * half,
                        &identity - &end.state * half,
                    ],
                    control: [-&start.control * half, -&end.control * half],
                    time,
                })
            }
            Self::HermiteSimpson => {
                let (tc, xc, uc) = interval.midpoint(&f0, &f1);
                let (xs, us) = (xc.as_slice(), uc.as_slice());
                let fc = DVector::from_vec(eval.derivative(tc, xs, us)?);
                let mid = eval.dynamics_jacobian(tc, xs, us)?;
                let eighth = h / 8.0;
                let sixth = h / 6.0;
                let dtc: Vec<f64> = dt0.iter().zip(dt1).map(|(a, b)| 0.5 * (a + b)).collect();

                // Sensitivities of the midpoint state.
                let xc_x0 = &identity * 0.5 + &start.state * eighth;
                let xc_u0 = &start.control * eighth;
                let xc_x1 = &identity * 0.5 - &end.state * eighth;
                let xc_u1 = -&end.control * eighth;
                let xc_time = DMatrix::from_fn(nx, dh.len(), |i, j| {
                    dh[j] / 8.0 * (f0[i] - f1[i])
                        + eighth * (start.time[i] * dt0[j] - end.time[i] * dt1[j])
                });

                // Sensitivities of the midpoint derivative.
                let fc_x0 = &mid.state * xc_x0;
                let fc_u0 = &mid.state * xc_u0 + &mid.control * 0.5;
                let fc_x1 = &mid.state * xc_x1;
                let fc_u1 = &mid.state * xc_u1 + &mid.control * 0.5;
                let mut fc_time = &mid.state * xc_time;
                for (j, mut column) in fc_time.column_iter_mut().enumerate() {
                    column.axpy(dtc[j], &mid.time, 1.0);
                }

                let simpson = &f0 + &fc * 4.0 + &f1;
                let time = DMatrix::from_fn(nx, dh.len(), |i, j| {
                    -dh[j] / 6.0 * simpson[i]
                        - sixth
                            * (start.time[i] * dt0[j] + 4.0 * fc_time[(i, j)] + end.time[i] * dt1[j])
                });

                Ok(DefectJacobian {
                    state: [
                        -&identity - (&start.state + fc_x0 * 4.0) * sixth,
                        &identity - (fc_x1 * 4.0 + &end.state) * sixth,
                    ],
                    control: [
                        -(&start.control + fc_u0 * 4.0) * sixth,
                        -(fc_u1 * 4.0 + &end.control) * sixth,
                    ],
                    time,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use trajopt_core::{Bounds, Phase, dynamics};

    fn phase() -> Phase {
        let mut builder = Phase::builder("scheme");
        builder
            .add_state("position", Bounds::unbounded(), Bounds::unbounded(), Bounds::unbounded())
            .unwrap()
            .add_state("speed", Bounds::unbounded(), Bounds::unbounded(), Bounds::unbounded())
            .unwrap()
            .add_control("force", Bounds::unbounded())
            .unwrap();
        builder.build().unwrap()
    }

    /// Defect as a function of the packed vector `[x0, u0, x1, u1, tf]` with
    /// `t0 = 0` fixed and nodes at `τ = 0.25` and `τ = 0.5`.
    fn packed_defect<D: Dynamics>(scheme: Scheme, eval: &Evaluator<'_, D>, v: &[f64]) -> Vec<f64> {
        let tf = v[6];
        let (tau0, tau1) = (0.25, 0.5);
        let start = Node {
            time: tau0 * tf,
            state: &v[0..2],
            control: &v[2..3],
            time_sensitivity: &[tau0],
        };
        let end = Node {
            time: tau1 * tf,
            state: &v[3..5],
            control: &v[5..6],
            time_sensitivity: &[tau1],
        };
        let f0 = eval.derivative(start.time, start.state, start.control).unwrap();
        let f1 = eval.derivative(end.time, end.state, end.control).unwrap();
        let interval = Interval {
            start,
            end,
            start_derivative: &f0,
            end_derivative: &f1,
        };
        scheme.defect(eval, &interval).unwrap()
    }

    fn check_against_finite_differences(scheme: Scheme) {
        let phase = phase();
        let nonlinear = dynamics::from_fn(|t: f64, x: &[f64], u: &[f64]| {
            vec![x[1] * (1.0 + 0.1 * t), u[0] - x[0] * x[1].sin()]
        });
        let eval = Evaluator::new(&nonlinear, &phase);
        let v = [0.3, -0.7, 1.2, 0.5, 0.4, -0.9, 2.0];

        let tf = v[6];
        let start = Node {
            time: 0.25 * tf,
            state: &v[0..2],
            control: &v[2..3],
            time_sensitivity: &[0.25],
        };
        let end = Node {
            time: 0.5 * tf,
            state: &v[3..5],
            control: &v[5..6],
            time_sensitivity: &[0.5],
        };
        let f0 = eval.derivative(start.time, start.state, start.control).unwrap();
        let f1 = eval.derivative(end.time, end.state, end.control).unwrap();
        let j0 = eval.dynamics_jacobian(start.time, start.state, start.control).unwrap();
        let j1 = eval.dynamics_jacobian(end.time, end.state, end.control).unwrap();
        let interval = Interval {
            start,
            end,
            start_derivative: &f0,
            end_derivative: &f1,
        };
        let jac = scheme.defect_jacobian(&eval, &interval, &j0, &j1).unwrap();

        let column = |k: usize| -> Vec<f64> {
            let h = 1e-6;
            let mut plus = v;
            let mut minus = v;
            plus[k] += h;
            minus[k] -= h;
            packed_defect(scheme, &eval, &plus)
                .iter()
                .zip(packed_defect(scheme, &eval, &minus))
                .map(|(p, m)| (p - m) / (2.0 * h))
                .collect()
        };

        for i in 0..2 {
            for (k, analytic) in [
                (0, jac.state[0][(i, 0)]),
                (1, jac.state[0][(i, 1)]),
                (2, jac.control[0][(i, 0)]),
                (3, jac.state[1][(i, 0)]),
                (4, jac.state[1][(i, 1)]),
                (5, jac.control[1][(i, 0)]),
                (6, jac.time[(i, 0)]),
            ] {
                assert_relative_eq!(analytic, column(k)[i], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn trapezoidal_jacobian_matches_finite_differences() {
        check_against_finite_differences(Scheme::Trapezoidal);
    }

    #[test]
    fn hermite_simpson_jacobian_matches_finite_differences() {
        check_against_finite_differences(Scheme::HermiteSimpson);
    }

    #[test]
    fn hermite_simpson_is_exact_for_cubic_states() {
        // x = t³ has ẋ = 3t², which Simpson's rule integrates exactly.
        let mut builder = Phase::builder("cubic");
        builder
            .add_state("x", Bounds::unbounded(), Bounds::unbounded(), Bounds::unbounded())
            .unwrap();
        let phase = builder.build().unwrap();
        let cubic = dynamics::from_fn(|t: f64, _x: &[f64], _u: &[f64]| vec![3.0 * t * t]);
        let eval = Evaluator::new(&cubic, &phase);

        let interval = Interval {
            start: Node {
                time: 1.0,
                state: &[1.0],
                control: &[],
                time_sensitivity: &[],
            },
            end: Node {
                time: 2.0,
                state: &[8.0],
                control: &[],
                time_sensitivity: &[],
            },
            start_derivative: &[3.0],
            end_derivative: &[12.0],
        };

        let simpson = Scheme::HermiteSimpson.defect(&eval, &interval).unwrap();
        let trapezoid = Scheme::Trapezoidal.defect(&eval, &interval).unwrap();

        assert_relative_eq!(simpson[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(trapezoid[0], 7.0 - 7.5);
    }

    #[test]
    fn deserializes_snake_case_names() {
        let scheme: Scheme = serde_json::from_str(r#""hermite_simpson""#).unwrap();
        assert_eq!(scheme, Scheme::HermiteSimpson);
        assert_eq!(Scheme::default(), Scheme::Trapezoidal);
    }
}
