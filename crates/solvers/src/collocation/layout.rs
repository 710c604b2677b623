use std::ops::Range;

use trajopt_core::Phase;

/// Where the initial or final time lives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSlot {
    /// Fixed by the phase bounds.
    Fixed(f64),

    /// A decision variable at this index.
    Free(usize),
}

impl TimeSlot {
    /// The time value for the NLP vector `x`.
    #[must_use]
    pub fn value(self, x: &[f64]) -> f64 {
        match self {
            Self::Fixed(t) => t,
            Self::Free(i) => x[i],
        }
    }

    #[must_use]
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Fixed(_) => None,
            Self::Free(i) => Some(i),
        }
    }
}

/// Layout of the NLP variable vector.
///
/// The vector holds one block `[x_k, u_k]` per mesh point, followed by `t0`
/// if it is free and then `tf` if it is free.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    num_states: usize,
    num_controls: usize,
    num_points: usize,
    initial_time: TimeSlot,
    final_time: TimeSlot,
}

impl Layout {
    #[must_use]
    pub fn new(phase: &Phase, num_points: usize) -> Self {
        let num_states = phase.num_states();
        let num_controls = phase.num_controls();
        let mut next = num_points * (num_states + num_controls);

        let mut slot = |bounds: trajopt_core::Bounds| {
            if bounds.is_fixed() {
                TimeSlot::Fixed(bounds.lower())
            } else {
                next += 1;
                TimeSlot::Free(next - 1)
            }
        };
        let initial_time = slot(phase.initial_time());
        let final_time = slot(phase.final_time());

        Self {
            num_states,
            num_controls,
            num_points,
            initial_time,
            final_time,
        }
    }

    #[must_use]
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    #[must_use]
    pub fn num_controls(&self) -> usize {
        self.num_controls
    }

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Total length of the NLP vector.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.num_points * self.point_width() + self.time_indices().len()
    }

    #[must_use]
    pub fn initial_time(&self) -> TimeSlot {
        self.initial_time
    }

    #[must_use]
    pub fn final_time(&self) -> TimeSlot {
        self.final_time
    }

    /// Indices of the free time variables, `t0` first.
    #[must_use]
    pub fn time_indices(&self) -> Vec<usize> {
        [self.initial_time, self.final_time]
            .into_iter()
            .filter_map(TimeSlot::index)
            .collect()
    }

    /// `(t0, tf)` for the NLP vector `x`.
    #[must_use]
    pub fn times(&self, x: &[f64]) -> (f64, f64) {
        (self.initial_time.value(x), self.final_time.value(x))
    }

    /// Number of slots per mesh point.
    #[must_use]
    pub fn point_width(&self) -> usize {
        self.num_states + self.num_controls
    }

    /// Index range of the block for mesh point `k`.
    #[must_use]
    pub fn point(&self, k: usize) -> Range<usize> {
        let start = k * self.point_width();
        start..start + self.point_width()
    }

    #[must_use]
    pub fn state_index(&self, k: usize, i: usize) -> usize {
        k * self.point_width() + i
    }

    #[must_use]
    pub fn control_index(&self, k: usize, j: usize) -> usize {
        k * self.point_width() + self.num_states + j
    }

    #[must_use]
    pub fn states<'x>(&self, x: &'x [f64], k: usize) -> &'x [f64] {
        let start = k * self.point_width();
        &x[start..start + self.num_states]
    }

    #[must_use]
    pub fn controls<'x>(&self, x: &'x [f64], k: usize) -> &'x [f64] {
        let start = k * self.point_width() + self.num_states;
        &x[start..start + self.num_controls]
    }

    /// Indices that a function of the given mesh points can depend on: their
    /// blocks followed by the free time variables.
    #[must_use]
    pub fn local_indices(&self, points: Range<usize>) -> Vec<usize> {
        points
            .flat_map(|k| self.point(k))
            .chain(self.time_indices())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use trajopt_core::Bounds;

    fn phase(final_time: Bounds) -> Phase {
        let mut builder = Phase::builder("layout");
        builder
            .set_time_bounds(0.0, final_time)
            .unwrap()
            .add_state("x", [-1.0, 1.0], 0.0, Bounds::unbounded())
            .unwrap()
            .add_state("v", Bounds::unbounded(), Bounds::unbounded(), Bounds::unbounded())
            .unwrap()
            .add_control("u", [-1.0, 1.0])
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn free_final_time_follows_point_blocks() {
        let layout = Layout::new(&phase(Bounds::new(1.0, 2.0)), 3);

        assert_eq!(layout.num_variables(), 3 * 3 + 1);
        assert_eq!(layout.initial_time(), TimeSlot::Fixed(0.0));
        assert_eq!(layout.final_time(), TimeSlot::Free(9));
        assert_eq!(layout.point(1), 3..6);
        assert_eq!(layout.state_index(2, 1), 7);
        assert_eq!(layout.control_index(2, 0), 8);
        assert_eq!(layout.local_indices(1..3), vec![3, 4, 5, 6, 7, 8, 9]);

        let x: Vec<f64> = (0..10).map(f64::from).collect();
        assert_eq!(layout.states(&x, 1), &[3.0, 4.0]);
        assert_eq!(layout.controls(&x, 1), &[5.0]);
        assert_eq!(layout.times(&x), (0.0, 9.0));
    }

    #[test]
    fn fixed_times_add_no_variables() {
        let layout = Layout::new(&phase(Bounds::fixed(2.0)), 2);

        assert_eq!(layout.num_variables(), 6);
        assert!(layout.time_indices().is_empty());
        assert_eq!(layout.times(&[0.0; 6]), (0.0, 2.0));
    }
}
