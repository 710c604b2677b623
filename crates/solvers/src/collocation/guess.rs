//! Starting points for the NLP.

use trajopt_core::{Phase, Trajectory};

use super::{
    TranscriptionError,
    layout::{Layout, TimeSlot},
    mesh::Mesh,
};

/// Builds a guess from the phase bounds alone.
///
/// Each state and control moves linearly from a representative of its
/// initial bounds to a representative of its final bounds.
pub fn from_bounds(phase: &Phase, mesh: &Mesh, layout: &Layout) -> Vec<f64> {
    let (t0, tf) = time_guess(phase);
    let mut x = vec![0.0; layout.num_variables()];

    for (k, &tau) in mesh.points().iter().enumerate() {
        for (i, state) in phase.states().iter().enumerate() {
            let start = state.initial().representative();
            let end = state.final_bounds().representative();
            x[layout.state_index(k, i)] = start + tau * (end - start);
        }
        for (j, control) in phase.controls().iter().enumerate() {
            let start = control.initial().representative();
            let end = control.final_bounds().representative();
            x[layout.control_index(k, j)] = start + tau * (end - start);
        }
    }

    set_times(&mut x, layout, t0, tf);
    x
}

/// Builds a guess by interpolating a trajectory, such as a previous
/// solution, at the mesh points.
///
/// Free times are taken from the trajectory's first and last samples. States
/// and controls are matched by name.
///
/// # Errors
///
/// Returns [`TranscriptionError::GuessMismatch`] if the trajectory is empty,
/// spans no time, or lacks a state or control of the phase.
pub fn from_trajectory(
    phase: &Phase,
    mesh: &Mesh,
    layout: &Layout,
    guess: &Trajectory,
) -> Result<Vec<f64>, TranscriptionError> {
    let (Some(first), Some(last)) = (guess.initial_time(), guess.final_time()) else {
        return Err(mismatch("guess trajectory is empty"));
    };
    let t0 = match layout.initial_time() {
        TimeSlot::Fixed(t) => t,
        TimeSlot::Free(_) => first,
    };
    let tf = match layout.final_time() {
        TimeSlot::Fixed(t) => t,
        TimeSlot::Free(_) => last,
    };
    if tf <= t0 {
        return Err(mismatch(format!("guess spans [{t0}, {tf}]")));
    }

    let position = |names: &[String], name: &str, kind: &str| {
        names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| mismatch(format!("guess has no {kind} `{name}`")))
    };
    let states = phase
        .state_names()
        .map(|name| position(guess.state_names(), name, "state"))
        .collect::<Result<Vec<_>, _>>()?;
    let controls = phase
        .control_names()
        .map(|name| position(guess.control_names(), name, "control"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut x = vec![0.0; layout.num_variables()];
    for (k, &tau) in mesh.points().iter().enumerate() {
        let sample = guess
            .interpolate(t0 + tau * (tf - t0))
            .ok_or_else(|| mismatch("guess trajectory is empty"))?;
        for (i, &source) in states.iter().enumerate() {
            x[layout.state_index(k, i)] = sample.state[source];
        }
        for (j, &source) in controls.iter().enumerate() {
            x[layout.control_index(k, j)] = sample.control[source];
        }
    }

    set_times(&mut x, layout, t0, tf);
    Ok(x)
}

fn mismatch(reason: impl Into<String>) -> TranscriptionError {
    TranscriptionError::GuessMismatch {
        reason: reason.into(),
    }
}

fn set_times(x: &mut [f64], layout: &Layout, t0: f64, tf: f64) {
    if let TimeSlot::Free(i) = layout.initial_time() {
        x[i] = t0;
    }
    if let TimeSlot::Free(i) = layout.final_time() {
        x[i] = tf;
    }
}

/// Representative initial and final times, ordered so that `t0 < tf`.
fn time_guess(phase: &Phase) -> (f64, f64) {
    let initial = phase.initial_time();
    let final_ = phase.final_time();
    let t0 = initial.representative();
    let tf = final_.representative();
    if t0 < tf {
        return (t0, tf);
    }

    // Out of order: start as early as the bounds allow.
    let t0 = if initial.lower().is_finite() {
        initial.lower()
    } else {
        tf - 1.0
    };
    let tf = if t0 < tf { tf } else { final_.upper().min(t0 + 1.0) };
    (t0, tf)
}
