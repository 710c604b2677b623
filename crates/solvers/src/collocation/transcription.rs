use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;
use trajopt_core::{
    Dynamics, EvalError, NonlinearProgram, Phase, Trajectory,
    phase::{CostKind, VariableInfo},
};

use crate::finite_difference;

use super::{
    AssemblyError, Config, Scheme, TranscriptionError, assemble,
    evaluator::Evaluator,
    guess,
    layout::{Layout, TimeSlot},
    mesh::Mesh,
    scheme::{Interval, Node},
};

/// A phase transcribed into a finite nonlinear program.
///
/// Variables follow [`Layout`]. Constraint rows are, in order: one defect
/// block of `nx` rows per mesh interval, the path-constraint outputs at each
/// mesh point, and, when both `t0` and `tf` are free, the duration row
/// `tf - t0 ≥ 0`.
///
/// Defect and path Jacobians are exact given the point Jacobians of the
/// callbacks. The objective gradient and the Hessian of the Lagrangian are
/// formed by central differences over small per-interval and per-point
/// element functions, so each difference only perturbs the handful of
/// variables an element depends on.
pub struct Transcription<'a, D> {
    eval: Evaluator<'a, D>,
    phase: &'a Phase,
    mesh: Mesh,
    layout: Layout,
    scheme: Scheme,
    parallel: bool,

    /// `∂t_k/∂θ` at each mesh point for the free time variables `θ`.
    sensitivities: Vec<Vec<f64>>,
}

impl<'a, D: Dynamics + Sync> Transcription<'a, D> {
    /// Transcribes `phase` on a uniform mesh.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptionError::DegenerateMesh`] if the config asks for
    /// zero mesh intervals.
    pub fn new(dynamics: &'a D, phase: &'a Phase, config: &Config) -> Result<Self, TranscriptionError> {
        let mesh = Mesh::uniform(config.mesh_intervals)?;
        let layout = Layout::new(phase, mesh.num_points());

        let sensitivities = mesh
            .points()
            .iter()
            .map(|&tau| {
                let mut sens = Vec::with_capacity(2);
                if let TimeSlot::Free(_) = layout.initial_time() {
                    sens.push(1.0 - tau);
                }
                if let TimeSlot::Free(_) = layout.final_time() {
                    sens.push(tau);
                }
                sens
            })
            .collect();

        let transcription = Self {
            eval: Evaluator::new(dynamics, phase),
            phase,
            mesh,
            layout,
            scheme: config.scheme,
            parallel: config.parallel,
            sensitivities,
        };
        debug!(
            phase = phase.name(),
            points = transcription.mesh.num_points(),
            variables = transcription.num_variables(),
            constraints = transcription.num_constraints(),
            scheme = ?transcription.scheme,
            "transcribed phase"
        );
        Ok(transcription)
    }

    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// A starting point for the NLP, interpolated from `guess` if given and
    /// built from the phase bounds otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptionError::GuessMismatch`] if `guess` cannot be
    /// mapped onto the phase.
    pub fn initial_guess(&self, guess: Option<&Trajectory>) -> Result<Vec<f64>, TranscriptionError> {
        match guess {
            Some(trajectory) => guess::from_trajectory(self.phase, &self.mesh, &self.layout, trajectory),
            None => Ok(guess::from_bounds(self.phase, &self.mesh, &self.layout)),
        }
    }

    /// Maps an NLP vector back to a trajectory sampled at the mesh points.
    ///
    /// # Errors
    ///
    /// Returns an [`AssemblyError`] if `x` does not match the layout.
    pub fn assemble(&self, x: &[f64]) -> Result<Trajectory, AssemblyError> {
        assemble::trajectory(self.phase, &self.mesh, &self.layout, x)
    }

    fn num_defect_rows(&self) -> usize {
        self.mesh.num_intervals() * self.layout.num_states()
    }

    fn num_path_rows(&self) -> usize {
        self.mesh.num_points() * self.eval.num_path_outputs()
    }

    fn has_duration_row(&self) -> bool {
        self.sensitivities.first().is_some_and(|sens| sens.len() == 2)
    }

    fn node<'x>(&'x self, x: &'x [f64], k: usize) -> Node<'x> {
        let (t0, tf) = self.layout.times(x);
        Node {
            time: t0 + self.mesh.points()[k] * (tf - t0),
            state: self.layout.states(x, k),
            control: self.layout.controls(x, k),
            time_sensitivity: &self.sensitivities[k],
        }
    }

    fn point_derivatives(&self, x: &[f64]) -> Result<Vec<Vec<f64>>, EvalError> {
        map_indexed(self.parallel, self.mesh.num_points(), |k| {
            let node = self.node(x, k);
            self.eval.derivative(node.time, node.state, node.control)
        })
    }

    /// Defect of interval `k`, evaluating the dynamics at both of its nodes.
    fn defect(&self, x: &[f64], k: usize) -> Result<Vec<f64>, EvalError> {
        let (start, end) = (self.node(x, k), self.node(x, k + 1));
        let f0 = self.eval.derivative(start.time, start.state, start.control)?;
        let f1 = self.eval.derivative(end.time, end.state, end.control)?;
        self.scheme.defect(
            &self.eval,
            &Interval {
                start,
                end,
                start_derivative: &f0,
                end_derivative: &f1,
            },
        )
    }

    fn final_time_weight(&self) -> f64 {
        self.phase
            .costs()
            .iter()
            .filter(|term| matches!(term.kind(), CostKind::FinalTime))
            .map(|term| term.weight())
            .sum()
    }

    fn has_running_cost(&self) -> bool {
        self.phase
            .costs()
            .iter()
            .any(|term| !matches!(term.kind(), CostKind::FinalTime))
    }

    /// Weighted sum of the integrands of every integral cost term.
    fn running_cost(&self, node: &Node<'_>) -> f64 {
        let (t, x, u) = (node.time, node.state, node.control);
        self.phase
            .costs()
            .iter()
            .map(|term| {
                let value = match term.kind() {
                    CostKind::FinalTime => return 0.0,
                    CostKind::ControlEffort => u.iter().map(|v| v * v).sum(),
                    CostKind::StateTracking { state, reference } => self
                        .phase
                        .state_index(state)
                        .map_or(0.0, |i| (x[i] - reference(t)).powi(2)),
                    CostKind::Integral(integrand) => integrand(t, x, u),
                };
                term.weight() * value
            })
            .sum()
    }

    /// Trapezoidal quadrature of the running cost over interval `k`.
    fn interval_cost(&self, x: &[f64], k: usize) -> f64 {
        let (start, end) = (self.node(x, k), self.node(x, k + 1));
        0.5 * (end.time - start.time) * (self.running_cost(&start) + self.running_cost(&end))
    }
}

impl<D: Dynamics + Sync> NonlinearProgram for Transcription<'_, D> {
    fn num_variables(&self) -> usize {
        self.layout.num_variables()
    }

    fn num_constraints(&self) -> usize {
        self.num_defect_rows() + self.num_path_rows() + usize::from(self.has_duration_row())
    }

    fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.num_variables();
        let mut lower = vec![f64::NEG_INFINITY; n];
        let mut upper = vec![f64::INFINITY; n];
        let last = self.mesh.num_points() - 1;

        for k in 0..=last {
            let pick = |info: &VariableInfo| match k {
                0 => info.initial(),
                k if k == last => info.final_bounds(),
                _ => info.range(),
            };
            for (i, state) in self.phase.states().iter().enumerate() {
                let bounds = pick(state);
                let index = self.layout.state_index(k, i);
                (lower[index], upper[index]) = (bounds.lower(), bounds.upper());
            }
            for (j, control) in self.phase.controls().iter().enumerate() {
                let bounds = pick(control);
                let index = self.layout.control_index(k, j);
                (lower[index], upper[index]) = (bounds.lower(), bounds.upper());
            }
        }

        // A fixed time tightens the bound on the free one.
        let (initial, final_) = (self.phase.initial_time(), self.phase.final_time());
        if let TimeSlot::Free(i) = self.layout.initial_time() {
            lower[i] = initial.lower();
            upper[i] = match self.layout.final_time() {
                TimeSlot::Fixed(tf) => initial.upper().min(tf),
                TimeSlot::Free(_) => initial.upper(),
            };
        }
        if let TimeSlot::Free(i) = self.layout.final_time() {
            lower[i] = match self.layout.initial_time() {
                TimeSlot::Fixed(t0) => final_.lower().max(t0),
                TimeSlot::Free(_) => final_.lower(),
            };
            upper[i] = final_.upper();
        }

        (lower, upper)
    }

    fn constraint_bounds(&self) -> (Vec<f64>, Vec<f64>) {
        let mut lower = vec![0.0; self.num_defect_rows()];
        let mut upper = lower.clone();

        for _ in 0..self.mesh.num_points() {
            for info in self.phase.path_constraints() {
                lower.extend(info.bounds().iter().map(|b| b.lower()));
                upper.extend(info.bounds().iter().map(|b| b.upper()));
            }
        }
        if self.has_duration_row() {
            lower.push(0.0);
            upper.push(f64::INFINITY);
        }

        (lower, upper)
    }

    fn objective(&self, x: &[f64]) -> Result<f64, EvalError> {
        let (_, tf) = self.layout.times(x);
        let mut total = self.final_time_weight() * tf;
        if self.has_running_cost() {
            total += (0..self.mesh.num_intervals())
                .map(|k| self.interval_cost(x, k))
                .sum::<f64>();
        }
        Ok(total)
    }

    fn gradient(&self, x: &[f64]) -> Result<DVector<f64>, EvalError> {
        let mut grad = DVector::zeros(x.len());
        if let TimeSlot::Free(i) = self.layout.final_time() {
            grad[i] += self.final_time_weight();
        }
        if !self.has_running_cost() {
            return Ok(grad);
        }

        let elements = map_indexed(self.parallel, self.mesh.num_intervals(), |k| {
            let indices = self.layout.local_indices(k..k + 2);
            let mut scratch = x.to_vec();
            let values = finite_difference::gradient(
                |x| Ok::<_, EvalError>(self.interval_cost(x, k)),
                &mut scratch,
                &indices,
            )?;
            Ok((indices, values))
        })?;

        for (indices, values) in elements {
            for (i, value) in indices.into_iter().zip(values) {
                grad[i] += value;
            }
        }
        Ok(grad)
    }

    fn constraints(&self, x: &[f64]) -> Result<DVector<f64>, EvalError> {
        let derivatives = self.point_derivatives(x)?;
        let defects = map_indexed(self.parallel, self.mesh.num_intervals(), |k| {
            self.scheme.defect(
                &self.eval,
                &Interval {
                    start: self.node(x, k),
                    end: self.node(x, k + 1),
                    start_derivative: &derivatives[k],
                    end_derivative: &derivatives[k + 1],
                },
            )
        })?;
        let paths = if self.eval.num_path_outputs() > 0 {
            map_indexed(self.parallel, self.mesh.num_points(), |k| {
                let node = self.node(x, k);
                self.eval.path(node.time, node.state, node.control)
            })?
        } else {
            Vec::new()
        };

        let mut values: Vec<f64> = defects.into_iter().chain(paths).flatten().collect();
        if self.has_duration_row() {
            let (t0, tf) = self.layout.times(x);
            values.push(tf - t0);
        }
        Ok(DVector::from_vec(values))
    }

    fn jacobian(&self, x: &[f64]) -> Result<DMatrix<f64>, EvalError> {
        let nx = self.layout.num_states();
        let nu = self.layout.num_controls();
        let np = self.eval.num_path_outputs();
        let time_columns = self.layout.time_indices();
        let mut jac = DMatrix::zeros(self.num_constraints(), self.num_variables());

        let points = map_indexed(self.parallel, self.mesh.num_points(), |k| {
            let node = self.node(x, k);
            let derivative = self.eval.derivative(node.time, node.state, node.control)?;
            let jacobian = self.eval.dynamics_jacobian(node.time, node.state, node.control)?;
            Ok((derivative, jacobian))
        })?;
        let defects = map_indexed(self.parallel, self.mesh.num_intervals(), |k| {
            let interval = Interval {
                start: self.node(x, k),
                end: self.node(x, k + 1),
                start_derivative: &points[k].0,
                end_derivative: &points[k + 1].0,
            };
            self.scheme
                .defect_jacobian(&self.eval, &interval, &points[k].1, &points[k + 1].1)
        })?;

        for (k, block) in defects.iter().enumerate() {
            let row = k * nx;
            for side in 0..2 {
                let point = k + side;
                jac.view_mut((row, self.layout.state_index(point, 0)), (nx, nx))
                    .copy_from(&block.state[side]);
                if nu > 0 {
                    jac.view_mut((row, self.layout.control_index(point, 0)), (nx, nu))
                        .copy_from(&block.control[side]);
                }
            }
            for (j, &col) in time_columns.iter().enumerate() {
                jac.view_mut((row, col), (nx, 1)).copy_from(&block.time.column(j));
            }
        }

        if np > 0 {
            let paths = map_indexed(self.parallel, self.mesh.num_points(), |k| {
                let node = self.node(x, k);
                self.eval.path_jacobian(node.time, node.state, node.control)
            })?;
            for (k, block) in paths.iter().enumerate() {
                let row = self.num_defect_rows() + k * np;
                jac.view_mut((row, self.layout.state_index(k, 0)), (np, nx))
                    .copy_from(&block.state);
                if nu > 0 {
                    jac.view_mut((row, self.layout.control_index(k, 0)), (np, nu))
                        .copy_from(&block.control);
                }
                for (&col, &sens) in time_columns.iter().zip(&self.sensitivities[k]) {
                    jac.view_mut((row, col), (np, 1)).copy_from(&(&block.time * sens));
                }
            }
        }

        if self.has_duration_row() {
            let row = self.num_constraints() - 1;
            jac[(row, time_columns[0])] = -1.0;
            jac[(row, time_columns[1])] = 1.0;
        }

        Ok(jac)
    }

    fn hessian(
        &self,
        x: &[f64],
        objective_factor: f64,
        multipliers: &[f64],
    ) -> Result<DMatrix<f64>, EvalError> {
        let nx = self.layout.num_states();
        let np = self.eval.num_path_outputs();
        let intervals = self.mesh.num_intervals();
        let sigma = if self.has_running_cost() {
            objective_factor
        } else {
            0.0
        };

        // Elements `0..intervals` are interval defects plus running cost;
        // the rest are path constraints at each mesh point.
        let num_elements = intervals + if np > 0 { self.mesh.num_points() } else { 0 };
        let elements = map_indexed(self.parallel, num_elements, |e| {
            if e < intervals {
                let weights = &multipliers[e * nx..(e + 1) * nx];
                if sigma == 0.0 && weights.iter().all(|&w| w == 0.0) {
                    return Ok(None);
                }
                let indices = self.layout.local_indices(e..e + 2);
                let mut scratch = x.to_vec();
                let hess = finite_difference::hessian(
                    |x: &[f64]| -> Result<f64, EvalError> {
                        let defect = self.defect(x, e)?;
                        let constraint_part: f64 = weights.iter().zip(&defect).map(|(w, d)| w * d).sum();
                        Ok(sigma * self.interval_cost(x, e) + constraint_part)
                    },
                    &mut scratch,
                    &indices,
                )?;
                Ok(Some((indices, hess)))
            } else {
                let k = e - intervals;
                let start = self.num_defect_rows() + k * np;
                let weights = &multipliers[start..start + np];
                if weights.iter().all(|&w| w == 0.0) {
                    return Ok(None);
                }
                let indices = self.layout.local_indices(k..k + 1);
                let mut scratch = x.to_vec();
                let hess = finite_difference::hessian(
                    |x: &[f64]| -> Result<f64, EvalError> {
                        let node = self.node(x, k);
                        let values = self.eval.path(node.time, node.state, node.control)?;
                        Ok(weights.iter().zip(&values).map(|(w, g)| w * g).sum())
                    },
                    &mut scratch,
                    &indices,
                )?;
                Ok(Some((indices, hess)))
            }
        })?;

        let n = self.num_variables();
        let mut hess = DMatrix::zeros(n, n);
        for (indices, local) in elements.into_iter().flatten() {
            for (a, &i) in indices.iter().enumerate() {
                for (b, &j) in indices.iter().enumerate() {
                    hess[(i, j)] += local[(a, b)];
                }
            }
        }
        Ok(hess)
    }
}

/// Maps `f` over `0..count`, on the rayon pool when `parallel` is set.
///
/// Results are returned in index order and the first error by index wins,
/// so the outcome does not depend on `parallel`.
fn map_indexed<T, F>(parallel: bool, count: usize, f: F) -> Result<Vec<T>, EvalError>
where
    T: Send,
    F: Fn(usize) -> Result<T, EvalError> + Sync + Send,
{
    let results: Vec<Result<T, EvalError>> = if parallel {
        (0..count).into_par_iter().map(f).collect()
    } else {
        (0..count).map(f).collect()
    };
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use trajopt_core::{Bounds, CostTerm, constraint, dynamics};

    fn phase(initial_time: Bounds) -> Phase {
        let mut builder = Phase::builder("transcription");
        builder
            .set_time_bounds(initial_time, [1.0, 4.0])
            .unwrap()
            .add_state("position", [-5.0, 5.0], 0.0, 1.0)
            .unwrap()
            .add_state("speed", [-5.0, 5.0], 0.0, 0.0)
            .unwrap()
            .add_control("force", [-10.0, 10.0])
            .unwrap()
            .add_cost(CostTerm::final_time("time"))
            .unwrap()
            .add_cost(CostTerm::control_effort("effort").with_weight(0.1))
            .unwrap()
            .add_path_constraint(
                "power",
                constraint::from_fn(1, |t: f64, x: &[f64], u: &[f64]| vec![x[1] * u[0] + t]),
                vec![Bounds::at_most(2.0)],
            )
            .unwrap();
        builder.build().unwrap()
    }

    fn config(intervals: usize, scheme: Scheme) -> Config {
        Config {
            mesh_intervals: intervals,
            scheme,
            ..Config::default()
        }
    }

    fn point(n: usize) -> Vec<f64> {
        (0..n).map(|i| 0.3 + 0.17 * (i as f64).sin()).collect()
    }

    fn nonlinear(t: f64, x: &[f64], u: &[f64]) -> Vec<f64> {
        vec![x[1], u[0] - 0.2 * x[1] * x[1].abs() + 0.1 * t]
    }

    #[test]
    fn sizes_follow_the_layout() {
        let phase = phase(Bounds::fixed(0.0));
        let dynamics = dynamics::from_fn(nonlinear);
        let nlp = Transcription::new(&dynamics, &phase, &config(4, Scheme::Trapezoidal)).unwrap();

        assert_eq!(nlp.num_variables(), 5 * 3 + 1);
        assert_eq!(nlp.num_constraints(), 4 * 2 + 5);

        let (lower, upper) = nlp.variable_bounds();
        assert_eq!((lower[0], upper[0]), (0.0, 0.0));
        assert_eq!((lower[3], upper[3]), (-5.0, 5.0));
        assert_eq!((lower[12], upper[12]), (1.0, 1.0));
        assert_eq!((lower[15], upper[15]), (1.0, 4.0));

        let (lower, upper) = nlp.constraint_bounds();
        assert_eq!(lower.len(), 13);
        assert_eq!((lower[8], upper[8]), (f64::NEG_INFINITY, 2.0));
    }

    #[test]
    fn zero_intervals_is_rejected() {
        let phase = phase(Bounds::fixed(0.0));
        let dynamics = dynamics::from_fn(nonlinear);

        assert!(matches!(
            Transcription::new(&dynamics, &phase, &config(0, Scheme::Trapezoidal)),
            Err(TranscriptionError::DegenerateMesh)
        ));
    }

    #[test]
    fn both_free_times_add_a_duration_row() {
        let phase = phase(Bounds::new(0.0, 1.0));
        let dynamics = dynamics::from_fn(nonlinear);
        let nlp = Transcription::new(&dynamics, &phase, &config(2, Scheme::Trapezoidal)).unwrap();
        let mut x = point(nlp.num_variables());
        let n = x.len();
        (x[n - 2], x[n - 1]) = (0.5, 2.0);

        let g = nlp.constraints(&x).unwrap();

        assert_eq!(g.len(), 2 * 2 + 3 + 1);
        assert_relative_eq!(g[g.len() - 1], 1.5);
    }

    fn check_jacobian(scheme: Scheme) {
        let phase = phase(Bounds::new(0.0, 0.5));
        let dynamics = dynamics::from_fn(nonlinear);
        let nlp = Transcription::new(&dynamics, &phase, &config(3, scheme)).unwrap();
        let mut x = point(nlp.num_variables());
        let n = x.len();
        (x[n - 2], x[n - 1]) = (0.2, 2.5);

        let jac = nlp.jacobian(&x).unwrap();

        for j in 0..n {
            let h = 1e-6;
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[j] += h;
            minus[j] -= h;
            let column = (nlp.constraints(&plus).unwrap() - nlp.constraints(&minus).unwrap()) / (2.0 * h);
            for i in 0..nlp.num_constraints() {
                assert_relative_eq!(jac[(i, j)], column[i], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn trapezoidal_jacobian_matches_finite_differences() {
        check_jacobian(Scheme::Trapezoidal);
    }

    #[test]
    fn hermite_simpson_jacobian_matches_finite_differences() {
        check_jacobian(Scheme::HermiteSimpson);
    }

    #[test]
    fn gradient_includes_final_time_and_effort() {
        let phase = phase(Bounds::fixed(0.0));
        let dynamics = dynamics::from_fn(nonlinear);
        let nlp = Transcription::new(&dynamics, &phase, &config(2, Scheme::Trapezoidal)).unwrap();
        let x = point(nlp.num_variables());

        let grad = nlp.gradient(&x).unwrap();

        for j in 0..x.len() {
            let h = 1e-6;
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[j] += h;
            minus[j] -= h;
            let fd = (nlp.objective(&plus).unwrap() - nlp.objective(&minus).unwrap()) / (2.0 * h);
            assert_relative_eq!(grad[j], fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn hessian_matches_differenced_lagrangian_gradient() {
        let phase = phase(Bounds::fixed(0.0));
        let dynamics = dynamics::from_fn(nonlinear);
        let nlp = Transcription::new(&dynamics, &phase, &config(2, Scheme::HermiteSimpson)).unwrap();
        let x = point(nlp.num_variables());
        let lambda: Vec<f64> = (0..nlp.num_constraints()).map(|i| 0.5 - 0.1 * i as f64).collect();
        let sigma = 2.0;

        let hess = nlp.hessian(&x, sigma, &lambda).unwrap();

        let lagrangian_gradient = |x: &[f64]| {
            let jac = nlp.jacobian(x).unwrap();
            nlp.gradient(x).unwrap() * sigma + jac.transpose() * DVector::from_column_slice(&lambda)
        };
        for j in 0..x.len() {
            let h = 1e-5;
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[j] += h;
            minus[j] -= h;
            let column = (lagrangian_gradient(&plus) - lagrangian_gradient(&minus)) / (2.0 * h);
            for i in 0..x.len() {
                assert_relative_eq!(hess[(i, j)], column[i], epsilon = 1e-3);
            }
        }
        assert_relative_eq!(hess.clone(), hess.transpose());
    }

    #[test]
    fn parallel_and_serial_evaluations_are_identical() {
        let phase = phase(Bounds::new(0.0, 0.5));
        let dynamics = dynamics::from_fn(nonlinear);
        let parallel = Transcription::new(&dynamics, &phase, &config(6, Scheme::HermiteSimpson)).unwrap();
        let serial = Transcription::new(
            &dynamics,
            &phase,
            &Config {
                parallel: false,
                ..config(6, Scheme::HermiteSimpson)
            },
        )
        .unwrap();
        let mut x = point(parallel.num_variables());
        let n = x.len();
        (x[n - 2], x[n - 1]) = (0.1, 3.0);
        let lambda = vec![0.25; parallel.num_constraints()];

        assert_eq!(parallel.constraints(&x).unwrap(), serial.constraints(&x).unwrap());
        assert_eq!(parallel.jacobian(&x).unwrap(), serial.jacobian(&x).unwrap());
        assert_eq!(parallel.gradient(&x).unwrap(), serial.gradient(&x).unwrap());
        assert_eq!(
            parallel.hessian(&x, 1.0, &lambda).unwrap(),
            serial.hessian(&x, 1.0, &lambda).unwrap()
        );
    }
}
