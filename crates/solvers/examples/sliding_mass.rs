//! Minimum-time move of a sliding mass.
//!
//! A unit mass starts at rest at `x = 0` and must come to rest at `x = 1`
//! with `|F| ≤ 50`. The optimal control is bang-bang and the minimum time is
//! `2 √(1/50) ≈ 0.2828`.
//!
//! # Usage
//!
//! ```text
//! cargo run --example sliding_mass
//! cargo run --example sliding_mass -- hermite_simpson 40
//! RUST_LOG=debug cargo run --example sliding_mass
//! ```
//!
//! The solution is written to `sliding_mass_solution.sto` in the current
//! directory.

use std::{convert::Infallible, error::Error};

use tracing::info;
use tracing_subscriber::EnvFilter;
use trajopt_core::{CostTerm, Dynamics, Phase, PointJacobian, trajectory::storage};
use trajopt_solvers::collocation::{self, Config, Event, Scheme};

const OUTPUT: &str = "sliding_mass_solution.sto";

/// `m ẍ = F` with `x = [position, speed]` and `u = [force]`.
struct SlidingMass {
    mass: f64,
}

impl Dynamics for SlidingMass {
    type Error = Infallible;

    fn derivative(&self, _t: f64, x: &[f64], u: &[f64]) -> Result<Vec<f64>, Infallible> {
        Ok(vec![x[1], u[0] / self.mass])
    }

    fn jacobian(&self, _t: f64, _x: &[f64], _u: &[f64]) -> Option<Result<PointJacobian, Infallible>> {
        let mut jac = PointJacobian::zeros(2, 2, 1);
        jac.state[(0, 1)] = 1.0;
        jac.control[(1, 0)] = 1.0 / self.mass;
        Some(Ok(jac))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let scheme = match std::env::args().nth(1).as_deref() {
        None | Some("trapezoidal") => Scheme::Trapezoidal,
        Some("hermite_simpson") => Scheme::HermiteSimpson,
        Some(other) => {
            eprintln!("Unknown scheme: {other}");
            eprintln!("Usage: sliding_mass [trapezoidal|hermite_simpson] [intervals]");
            std::process::exit(1);
        }
    };
    let mesh_intervals = std::env::args()
        .nth(2)
        .as_deref()
        .map(str::parse::<usize>)
        .transpose()?
        .unwrap_or(20);

    let mut builder = Phase::builder("sliding_mass");
    builder
        .set_time_bounds(0.0, [0.0, 5.0])?
        .add_state("position", [-5.0, 5.0], 0.0, 1.0)?
        .add_state("speed", [-50.0, 50.0], 0.0, 0.0)?
        .add_control("force", [-50.0, 50.0])?
        .add_cost(CostTerm::final_time("final_time"))?;
    let phase = builder.build()?;

    let config = Config {
        mesh_intervals,
        scheme,
        ..Config::default()
    };
    let solution = collocation::solve(
        &SlidingMass { mass: 1.0 },
        &phase,
        &config,
        |event: &Event<'_>| {
            if event.iter % 5 == 0 {
                info!(
                    iter = event.iter,
                    objective = event.objective,
                    constraint_violation = event.constraint_violation,
                    "iterate"
                );
            }
            None
        },
    )?;

    println!("status:         {}", solution.status);
    println!("iterations:     {}", solution.iters);
    println!("final time:     {:.6}", solution.objective);
    println!("bang-bang time: {:.6}", 2.0 * (1.0_f64 / 50.0).sqrt());

    storage::write(&solution.trajectory, OUTPUT)?;
    println!("wrote {OUTPUT}");

    Ok(())
}
