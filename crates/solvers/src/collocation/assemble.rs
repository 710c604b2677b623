//! Maps an NLP vector back onto the mesh as a [`Trajectory`].

use trajopt_core::{Phase, Sample, Trajectory};

use super::{AssemblyError, layout::Layout, mesh::Mesh};

/// Builds one sample per mesh point from the NLP vector `x`.
///
/// Free initial and final times are read from `x`; fixed ones come from the
/// phase.
///
/// # Errors
///
/// Returns an [`AssemblyError`] if `x` does not match the layout or the
/// samples are not in time order.
pub fn trajectory(
    phase: &Phase,
    mesh: &Mesh,
    layout: &Layout,
    x: &[f64],
) -> Result<Trajectory, AssemblyError> {
    if x.len() != layout.num_variables() {
        return Err(AssemblyError::Length {
            expected: layout.num_variables(),
            actual: x.len(),
        });
    }

    let (t0, tf) = layout.times(x);
    let samples = mesh
        .points()
        .iter()
        .enumerate()
        .map(|(k, tau)| Sample {
            time: t0 + tau * (tf - t0),
            state: layout.states(x, k).to_vec(),
            control: layout.controls(x, k).to_vec(),
        })
        .collect();

    Trajectory::new(
        phase.name(),
        phase.state_names().map(str::to_owned).collect(),
        phase.control_names().map(str::to_owned).collect(),
        samples,
    )
    .map_err(AssemblyError::Trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;

    use trajopt_core::Bounds;

    fn phase() -> Phase {
        let mut builder = Phase::builder("assembled");
        builder
            .set_time_bounds([0.0, 1.0], [1.0, 3.0])
            .unwrap()
            .add_state("x", Bounds::unbounded(), Bounds::unbounded(), Bounds::unbounded())
            .unwrap()
            .add_control("u", Bounds::unbounded())
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn free_times_set_sample_times() {
        let phase = phase();
        let mesh = Mesh::uniform(2).unwrap();
        let layout = Layout::new(&phase, mesh.num_points());
        let x = [10.0, 11.0, 20.0, 21.0, 30.0, 31.0, 1.0, 3.0];

        let traj = trajectory(&phase, &mesh, &layout, &x).unwrap();

        assert_eq!(traj.name(), "assembled");
        assert_eq!(traj.times(), vec![1.0, 2.0, 3.0]);
        assert_eq!(traj.state("x"), Some(vec![10.0, 20.0, 30.0]));
        assert_eq!(traj.control("u"), Some(vec![11.0, 21.0, 31.0]));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let phase = phase();
        let mesh = Mesh::uniform(2).unwrap();
        let layout = Layout::new(&phase, mesh.num_points());

        assert_eq!(
            trajectory(&phase, &mesh, &layout, &[0.0; 3]),
            Err(AssemblyError::Length {
                expected: 8,
                actual: 3
            })
        );
    }

    #[test]
    fn reversed_times_are_rejected() {
        let phase = phase();
        let mesh = Mesh::uniform(1).unwrap();
        let layout = Layout::new(&phase, mesh.num_points());

        let result = trajectory(&phase, &mesh, &layout, &[0.0, 0.0, 0.0, 0.0, 2.0, 1.0]);

        assert!(matches!(result, Err(AssemblyError::Trajectory(_))));
    }
}
