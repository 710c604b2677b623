use super::*;

use approx::assert_relative_eq;
use thiserror::Error;
use trajopt_core::{Bounds, CostTerm, EvalError, PhaseBuilder, constraint, dynamics};

/// Minimum time for a unit move with `|u| ≤ 50`: `2 √(1 / 50)`.
const BANG_BANG_TIME: f64 = 0.282_842_712_474_619;

fn sliding_mass_builder() -> PhaseBuilder {
    let mut builder = Phase::builder("sliding_mass");
    builder
        .set_time_bounds(0.0, [0.0, 5.0])
        .unwrap()
        .add_state("position", [-5.0, 5.0], 0.0, 1.0)
        .unwrap()
        .add_state("speed", [-50.0, 50.0], 0.0, 0.0)
        .unwrap()
        .add_control("force", [-50.0, 50.0])
        .unwrap()
        .add_cost(CostTerm::final_time("final_time"))
        .unwrap();
    builder
}

fn double_integrator(_t: f64, x: &[f64], u: &[f64]) -> Vec<f64> {
    vec![x[1], u[0]]
}

fn config(intervals: usize, scheme: Scheme) -> Config {
    Config {
        mesh_intervals: intervals,
        scheme,
        ..Config::default()
    }
}

fn final_time(solution: &Solution) -> f64 {
    solution.trajectory.final_time().unwrap()
}

#[test]
fn minimum_time_trapezoidal() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);

    let solution = solve_unobserved(&dynamics, &phase, &config(20, Scheme::Trapezoidal)).unwrap();

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(final_time(&solution), BANG_BANG_TIME, max_relative = 0.05);
    assert_relative_eq!(solution.objective, final_time(&solution), epsilon = 1e-9);
    assert!(solution.constraint_violation <= 1e-6);

    let position = solution.trajectory.state("position").unwrap();
    assert!(position.windows(2).all(|w| w[1] >= w[0] - 1e-6));
}

#[test]
fn minimum_time_hermite_simpson() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);

    let solution = solve_unobserved(&dynamics, &phase, &config(20, Scheme::HermiteSimpson)).unwrap();

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(final_time(&solution), BANG_BANG_TIME, max_relative = 0.05);
}

#[test]
fn fixed_endpoints_are_reproduced_exactly() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);

    let solution = solve_unobserved(&dynamics, &phase, &config(10, Scheme::Trapezoidal)).unwrap();

    let samples = solution.trajectory.samples();
    assert_eq!(samples.len(), 11);
    assert_eq!(samples[0].time, 0.0);
    assert_eq!(samples[0].state, vec![0.0, 0.0]);
    assert_eq!(samples[10].state, vec![1.0, 0.0]);
}

#[test]
fn speed_limit_path_constraint_slows_the_move() {
    // Accelerate to the limit in 0.1, cruise for 0.1, and brake in 0.1.
    let mut builder = sliding_mass_builder();
    builder
        .add_path_constraint(
            "speed_limit",
            constraint::from_fn(1, |_t, x: &[f64], _u: &[f64]| vec![x[1]]),
            vec![Bounds::at_most(5.0)],
        )
        .unwrap();
    let phase = builder.build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);

    let solution = solve_unobserved(&dynamics, &phase, &config(30, Scheme::Trapezoidal)).unwrap();

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(final_time(&solution), 0.3, max_relative = 0.05);
    let speed = solution.trajectory.state("speed").unwrap();
    assert!(speed.iter().all(|&v| v <= 5.0 + 1e-6));
}

#[test]
fn minimum_effort_with_fixed_final_time() {
    // u = 6 - 12t is optimal and costs 12.
    let mut builder = Phase::builder("min_effort");
    builder
        .set_time_bounds(0.0, 1.0)
        .unwrap()
        .add_state("position", [-5.0, 5.0], 0.0, 1.0)
        .unwrap()
        .add_state("speed", [-50.0, 50.0], 0.0, 0.0)
        .unwrap()
        .add_control("force", [-50.0, 50.0])
        .unwrap()
        .add_cost(CostTerm::control_effort("effort"))
        .unwrap();
    let phase = builder.build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);

    let solution = solve_unobserved(&dynamics, &phase, &config(20, Scheme::HermiteSimpson)).unwrap();

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.objective, 12.0, max_relative = 0.02);
    let force = solution.trajectory.control("force").unwrap();
    assert_relative_eq!(force[0], 6.0, max_relative = 0.1);
    assert_relative_eq!(force[20], -6.0, max_relative = 0.1);
}

#[test]
fn zero_intervals_fail_before_solving() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);

    let result = solve_unobserved(&dynamics, &phase, &config(0, Scheme::Trapezoidal));

    assert!(matches!(
        result,
        Err(Error::Transcription(TranscriptionError::DegenerateMesh))
    ));
}

#[test]
fn observer_can_stop_the_solve() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);
    let mut seen = 0;

    let solution = solve(
        &dynamics,
        &phase,
        &config(10, Scheme::Trapezoidal),
        |event: &Event<'_>| {
            seen += 1;
            (event.iter == 3).then_some(Action::StopEarly)
        },
    )
    .unwrap();

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.iters, 3);
    assert_eq!(seen, 4);
    assert_eq!(solution.trajectory.len(), 11);
}

#[test]
fn cancelled_token_stops_before_iterating() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);
    let token = CancelToken::new();
    token.cancel();

    let solution = Study::new(&dynamics, &phase)
        .with_config(config(10, Scheme::Trapezoidal))
        .with_cancel_token(token)
        .solve_unobserved()
        .unwrap();

    assert_eq!(solution.status, Status::Cancelled);
    assert_eq!(solution.iters, 0);
}

#[derive(Debug, Error)]
#[error("model exploded")]
struct Exploded;

struct Fragile;

impl Dynamics for Fragile {
    type Error = Exploded;

    fn derivative(&self, _t: f64, x: &[f64], u: &[f64]) -> Result<Vec<f64>, Exploded> {
        if u[0] > 0.0 { Err(Exploded) } else { Ok(vec![x[1], u[0]]) }
    }
}

#[test]
fn callback_failure_carries_the_iterate_as_a_trajectory() {
    let phase = sliding_mass_builder().build().unwrap();
    // The force guess is zero, so the first differenced Jacobian steps into
    // the failing region.
    let result = solve_unobserved(&Fragile, &phase, &config(4, Scheme::Trapezoidal));

    match result {
        Err(Error::Evaluation {
            iter,
            trajectory,
            source,
        }) => {
            assert_eq!(iter, 0);
            assert_eq!(trajectory.len(), 5);
            assert_eq!(trajectory.control_names(), &["force"]);
            assert!(matches!(source, EvalError::Callback(_)));
        }
        other => panic!("expected an evaluation error, got {other:?}"),
    }
}

#[test]
fn warm_start_reaches_the_same_optimum() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);
    let config = config(12, Scheme::Trapezoidal);

    let cold = solve_unobserved(&dynamics, &phase, &config).unwrap();
    let warm = Study::new(&dynamics, &phase)
        .with_config(config)
        .with_guess(&cold.trajectory)
        .solve_unobserved()
        .unwrap();

    assert_eq!(warm.status, Status::Converged);
    assert_relative_eq!(final_time(&warm), final_time(&cold), max_relative = 1e-3);
}

#[test]
fn guess_with_unknown_names_is_rejected() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);
    let unrelated = Trajectory::new(
        "unrelated",
        vec!["angle".into()],
        vec![],
        vec![trajopt_core::Sample {
            time: 1.0,
            state: vec![0.0],
            control: vec![],
        }],
    )
    .unwrap();

    let result = Study::new(&dynamics, &phase)
        .with_guess(&unrelated)
        .solve_unobserved();

    assert!(matches!(
        result,
        Err(Error::Transcription(TranscriptionError::GuessMismatch { .. }))
    ));
}

#[test]
fn invalid_solver_config_is_reported() {
    let phase = sliding_mass_builder().build().unwrap();
    let dynamics = dynamics::from_fn(double_integrator);
    let mut config = config(4, Scheme::Trapezoidal);
    config.solver.max_iters = 0;

    let result = solve_unobserved(&dynamics, &phase, &config);

    assert!(matches!(
        result,
        Err(Error::Solver(interior_point::Error::InvalidConfig(_)))
    ));
}
