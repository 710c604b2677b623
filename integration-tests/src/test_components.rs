//! A sliding mass with optional viscous friction, written with `uom`.
//!
//! States are `[position (m), speed (m/s)]` and the single control is the
//! applied force in newtons.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use trajopt_core::{CostTerm, Dynamics, Phase, PointJacobian, ProblemError};
use uom::{
    si::{
        Quantity, ISQ, SI,
        acceleration::meter_per_second_squared,
        f64::{Acceleration, Force, Frequency, Length, Mass, Velocity},
        force::newton,
        frequency::hertz,
        length::meter,
        mass::kilogram,
        velocity::meter_per_second,
    },
    typenum::{N1, P1, Z0},
};

/// Viscous friction coefficient: force per unit speed (N·s/m or kg/s).
pub type Damping = Quantity<ISQ<Z0, P1, N1, Z0, Z0, Z0, Z0>, SI<f64>, f64>;

/// `m ẍ = F - c ẋ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlidingMass {
    pub mass: Mass,
    pub damping: Damping,
}

impl SlidingMass {
    /// A frictionless mass.
    pub fn new(mass: Mass) -> Self {
        Self {
            mass,
            damping: Force::new::<newton>(0.0) / Velocity::new::<meter_per_second>(1.0),
        }
    }

    /// Adds viscous friction of `coefficient` N·s/m.
    #[must_use]
    pub fn with_damping(mut self, coefficient: f64) -> Self {
        self.damping = Force::new::<newton>(coefficient) / Velocity::new::<meter_per_second>(1.0);
        self
    }

    fn acceleration(&self, speed: Velocity, force: Force) -> Acceleration {
        (force - self.damping * speed) / self.mass
    }
}

impl Dynamics for SlidingMass {
    type Error = Infallible;

    fn derivative(&self, _t: f64, x: &[f64], u: &[f64]) -> Result<Vec<f64>, Infallible> {
        let speed = Velocity::new::<meter_per_second>(x[1]);
        let force = Force::new::<newton>(u[0]);
        let acceleration = self.acceleration(speed, force);

        Ok(vec![
            speed.get::<meter_per_second>(),
            acceleration.get::<meter_per_second_squared>(),
        ])
    }

    fn jacobian(&self, _t: f64, _x: &[f64], _u: &[f64]) -> Option<Result<PointJacobian, Infallible>> {
        let friction: Frequency = self.damping / self.mass;

        let mut jac = PointJacobian::zeros(2, 2, 1);
        jac.state[(0, 1)] = 1.0;
        jac.state[(1, 1)] = -friction.get::<hertz>();
        jac.control[(1, 0)] = 1.0 / self.mass.get::<kilogram>();
        Some(Ok(jac))
    }
}

/// The limits of a point-to-point move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Move {
    /// Distance travelled in meters.
    pub distance: f64,

    /// Largest force magnitude in newtons.
    pub max_force: f64,

    /// Largest speed magnitude in m/s.
    pub max_speed: f64,

    /// Latest admissible final time in seconds.
    pub max_duration: f64,
}

impl Default for Move {
    fn default() -> Self {
        Self {
            distance: 1.0,
            max_force: 50.0,
            max_speed: 50.0,
            max_duration: 5.0,
        }
    }
}

impl Move {
    /// Minimum time for a frictionless move of `mass` without a speed limit.
    pub fn bang_bang_time(&self, mass: Mass) -> f64 {
        let distance = Length::new::<meter>(self.distance);
        let acceleration: Acceleration = Force::new::<newton>(self.max_force) / mass;
        2.0 * (distance.get::<meter>() / acceleration.get::<meter_per_second_squared>()).sqrt()
    }

    /// Builds a minimum-time phase that starts and ends at rest.
    ///
    /// # Errors
    ///
    /// Returns a [`ProblemError`] if the limits are inconsistent.
    pub fn minimum_time_phase(&self) -> Result<Phase, ProblemError> {
        let reach = 5.0 * self.distance.abs().max(1.0);

        let mut builder = Phase::builder("sliding_mass");
        builder
            .set_time_bounds(0.0, [0.0, self.max_duration])?
            .add_state("position", [-reach, reach], 0.0, self.distance)?
            .add_state("speed", [-self.max_speed, self.max_speed], 0.0, 0.0)?
            .add_control("force", [-self.max_force, self.max_force])?
            .add_cost(CostTerm::final_time("final_time"))?;
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn friction_opposes_motion() {
        let model = SlidingMass::new(Mass::new::<kilogram>(2.0)).with_damping(4.0);

        let dxdt = model.derivative(0.0, &[0.0, 1.0], &[10.0]).unwrap();

        assert_relative_eq!(dxdt[0], 1.0);
        assert_relative_eq!(dxdt[1], 3.0);
    }

    #[test]
    fn analytic_jacobian_matches_the_model() {
        let model = SlidingMass::new(Mass::new::<kilogram>(2.0)).with_damping(4.0);

        let jac = model.jacobian(0.0, &[0.0, 1.0], &[10.0]).unwrap().unwrap();

        assert_relative_eq!(jac.state[(1, 1)], -2.0);
        assert_relative_eq!(jac.control[(1, 0)], 0.5);
        assert_eq!(jac.time.iter().copied().sum::<f64>(), 0.0);
    }

    #[test]
    fn bang_bang_time_for_the_default_move() {
        let time = Move::default().bang_bang_time(Mass::new::<kilogram>(1.0));
        assert_relative_eq!(time, 0.282_842_712_474_619, epsilon = 1e-12);
    }
}
