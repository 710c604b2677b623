//! Time-stamped state and control samples.

pub mod storage;

/// One sample of a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub state: Vec<f64>,
    pub control: Vec<f64>,
}

/// An ordered time series of named states and controls.
///
/// Samples are stored in increasing time order and every sample has one value
/// per state name and one per control name.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    name: String,
    state_names: Vec<String>,
    control_names: Vec<String>,
    samples: Vec<Sample>,
}

impl Trajectory {
    /// Creates a trajectory, checking sample widths and time ordering.
    ///
    /// # Errors
    ///
    /// Returns a description of the first inconsistent sample.
    pub fn new(
        name: impl Into<String>,
        state_names: Vec<String>,
        control_names: Vec<String>,
        samples: Vec<Sample>,
    ) -> Result<Self, String> {
        for (i, sample) in samples.iter().enumerate() {
            if sample.state.len() != state_names.len() {
                return Err(format!(
                    "sample {i} has {} states, expected {}",
                    sample.state.len(),
                    state_names.len()
                ));
            }
            if sample.control.len() != control_names.len() {
                return Err(format!(
                    "sample {i} has {} controls, expected {}",
                    sample.control.len(),
                    control_names.len()
                ));
            }
        }
        if let Some(i) = samples.windows(2).position(|w| w[1].time < w[0].time) {
            return Err(format!("sample {} is earlier than sample {i}", i + 1));
        }

        Ok(Self {
            name: name.into(),
            state_names,
            control_names,
            samples,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state_names(&self) -> &[String] {
        &self.state_names
    }

    #[must_use]
    pub fn control_names(&self) -> &[String] {
        &self.control_names
    }

    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample times in order.
    #[must_use]
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// The named state over time, or `None` if no such state exists.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.state_names.iter().position(|n| n == name)?;
        Some(self.samples.iter().map(|s| s.state[i]).collect())
    }

    /// The named control over time, or `None` if no such control exists.
    #[must_use]
    pub fn control(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.control_names.iter().position(|n| n == name)?;
        Some(self.samples.iter().map(|s| s.control[i]).collect())
    }

    #[must_use]
    pub fn initial_time(&self) -> Option<f64> {
        self.samples.first().map(|s| s.time)
    }

    #[must_use]
    pub fn final_time(&self) -> Option<f64> {
        self.samples.last().map(|s| s.time)
    }

    /// Linearly interpolates states and controls at `time`.
    ///
    /// Times outside the sampled interval clamp to the nearest end. Returns
    /// `None` for an empty trajectory.
    #[must_use]
    pub fn interpolate(&self, time: f64) -> Option<Sample> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        if time <= first.time {
            return Some(Sample { time, ..first.clone() });
        }
        if time >= last.time {
            return Some(Sample { time, ..last.clone() });
        }

        // `time` is strictly inside, so a bracketing pair exists.
        let upper = self.samples.partition_point(|s| s.time <= time);
        let (a, b) = (&self.samples[upper - 1], &self.samples[upper]);
        let span = b.time - a.time;
        let w = if span > 0.0 { (time - a.time) / span } else { 0.0 };
        let lerp = |x: &[f64], y: &[f64]| -> Vec<f64> {
            x.iter().zip(y).map(|(p, q)| p + w * (q - p)).collect()
        };

        Some(Sample {
            time,
            state: lerp(&a.state, &b.state),
            control: lerp(&a.control, &b.control),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn ramp() -> Trajectory {
        Trajectory::new(
            "ramp",
            vec!["x".into()],
            vec!["u".into()],
            vec![
                Sample {
                    time: 0.0,
                    state: vec![0.0],
                    control: vec![1.0],
                },
                Sample {
                    time: 2.0,
                    state: vec![4.0],
                    control: vec![-1.0],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn named_columns() {
        let t = ramp();

        assert_eq!(t.state("x"), Some(vec![0.0, 4.0]));
        assert_eq!(t.control("u"), Some(vec![1.0, -1.0]));
        assert_eq!(t.state("u"), None);
        assert_eq!(t.times(), vec![0.0, 2.0]);
    }

    #[test]
    fn interpolates_and_clamps() {
        let t = ramp();

        let mid = t.interpolate(0.5).unwrap();
        assert_relative_eq!(mid.state[0], 1.0);
        assert_relative_eq!(mid.control[0], 0.5);

        let after = t.interpolate(10.0).unwrap();
        assert_relative_eq!(after.time, 10.0);
        assert_relative_eq!(after.state[0], 4.0);
    }

    #[test]
    fn rejects_inconsistent_samples() {
        let bad_width = Trajectory::new(
            "bad",
            vec!["x".into()],
            vec![],
            vec![Sample {
                time: 0.0,
                state: vec![],
                control: vec![],
            }],
        );
        assert!(bad_width.is_err());

        let unordered = Trajectory::new(
            "bad",
            vec![],
            vec![],
            vec![
                Sample {
                    time: 1.0,
                    state: vec![],
                    control: vec![],
                },
                Sample {
                    time: 0.0,
                    state: vec![],
                    control: vec![],
                },
            ],
        );
        assert!(unordered.is_err());
    }
}
