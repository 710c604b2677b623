use super::TranscriptionError;

/// Collocation points over normalized time `[0, 1]`.
///
/// Point `k` maps to `t0 + τ_k (tf - t0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    points: Vec<f64>,
}

impl Mesh {
    /// Creates `intervals + 1` uniformly spaced points.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptionError::DegenerateMesh`] if `intervals` is zero.
    pub fn uniform(intervals: usize) -> Result<Self, TranscriptionError> {
        if intervals == 0 {
            return Err(TranscriptionError::DegenerateMesh);
        }
        let points = (0..=intervals)
            .map(|k| k as f64 / intervals as f64)
            .collect();
        Ok(Self { points })
    }

    /// Normalized times `τ_k`, starting at 0 and ending at 1.
    #[must_use]
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn num_intervals(&self) -> usize {
        self.points.len() - 1
    }

    /// Normalized times at the start and end of interval `k`.
    #[must_use]
    pub fn interval(&self, k: usize) -> [f64; 2] {
        [self.points[k], self.points[k + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_points_span_unit_interval() {
        let mesh = Mesh::uniform(4).unwrap();

        assert_eq!(mesh.num_points(), 5);
        assert_eq!(mesh.num_intervals(), 4);
        assert_eq!(mesh.points(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(mesh.interval(1), [0.25, 0.5]);
    }

    #[test]
    fn zero_intervals_is_degenerate() {
        assert_eq!(Mesh::uniform(0), Err(TranscriptionError::DegenerateMesh));
    }
}
