use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::ProblemError;

/// An inclusive interval `[lower, upper]` of admissible values.
///
/// Unbounded ends are represented by `±∞`. Bounds can be written in either
/// of two equivalent forms, both in code and in configuration files:
///
/// - explicit: [`Bounds::new`], [`Bounds::fixed`], [`Bounds::unbounded`], or a
///   `{ lower = .., upper = .. }` table where a missing key is unbounded
/// - compact: an array `[lower, upper]`, `[value]` (fixed), or `[]` (unbounded)
///
/// `[v]` means exactly `Bounds::fixed(v)` and `[lo, hi]` means exactly
/// `Bounds::new(lo, hi)`. There is no other difference between the forms.
///
/// Construction never fails; ordering and `NaN` are checked when the bounds
/// are handed to a [`PhaseBuilder`](super::PhaseBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundsRepr", into = "BoundsRepr")]
pub struct Bounds {
    lower: f64,
    upper: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Bounds that admit exactly one value.
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Bounds that admit every value.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    #[must_use]
    pub fn at_least(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    #[must_use]
    pub fn at_most(upper: f64) -> Self {
        Self::new(f64::NEG_INFINITY, upper)
    }

    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.lower == f64::NEG_INFINITY && self.upper == f64::INFINITY
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Returns `true` if every value admitted by `self` is admitted by `outer`.
    #[must_use]
    pub fn is_within(&self, outer: &Bounds) -> bool {
        outer.lower <= self.lower && self.upper <= outer.upper
    }

    /// Replaces each unbounded end with the corresponding end of `outer`.
    #[must_use]
    pub fn inherit(&self, outer: &Bounds) -> Self {
        Self {
            lower: if self.lower == f64::NEG_INFINITY {
                outer.lower
            } else {
                self.lower
            },
            upper: if self.upper == f64::INFINITY {
                outer.upper
            } else {
                self.upper
            },
        }
    }

    /// A representative value used to seed initial guesses.
    ///
    /// The midpoint when both ends are finite, the finite end when only one
    /// is, and zero when the bounds are unbounded.
    #[must_use]
    pub fn representative(&self) -> f64 {
        match (self.lower.is_finite(), self.upper.is_finite()) {
            (true, true) => 0.5 * (self.lower + self.upper),
            (true, false) => self.lower,
            (false, true) => self.upper,
            (false, false) => 0.0,
        }
    }

    /// Checks that neither end is `NaN` and that `lower <= upper`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.lower.is_nan() || self.upper.is_nan() {
            return Err("bound is NaN".into());
        }
        if self.lower > self.upper {
            return Err(format!(
                "lower bound {} exceeds upper bound {}",
                self.lower, self.upper
            ));
        }
        Ok(())
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

impl From<f64> for Bounds {
    fn from(value: f64) -> Self {
        Self::fixed(value)
    }
}

impl From<[f64; 1]> for Bounds {
    fn from([value]: [f64; 1]) -> Self {
        Self::fixed(value)
    }
}

impl From<[f64; 2]> for Bounds {
    fn from([lower, upper]: [f64; 2]) -> Self {
        Self::new(lower, upper)
    }
}

impl From<(f64, f64)> for Bounds {
    fn from((lower, upper): (f64, f64)) -> Self {
        Self::new(lower, upper)
    }
}

impl From<RangeInclusive<f64>> for Bounds {
    fn from(range: RangeInclusive<f64>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

impl TryFrom<&[f64]> for Bounds {
    type Error = ProblemError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        match *values {
            [] => Ok(Self::unbounded()),
            [value] => Ok(Self::fixed(value)),
            [lower, upper] => Ok(Self::new(lower, upper)),
            _ => Err(ProblemError::CompactBounds { len: values.len() }),
        }
    }
}

/// Serialized forms accepted for [`Bounds`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BoundsRepr {
    Compact(Vec<f64>),
    Explicit {
        #[serde(default = "neg_infinity", skip_serializing_if = "is_neg_infinity")]
        lower: f64,
        #[serde(default = "infinity", skip_serializing_if = "is_infinity")]
        upper: f64,
    },
}

impl TryFrom<BoundsRepr> for Bounds {
    type Error = ProblemError;

    fn try_from(repr: BoundsRepr) -> Result<Self, Self::Error> {
        match repr {
            BoundsRepr::Compact(values) => Self::try_from(values.as_slice()),
            BoundsRepr::Explicit { lower, upper } => Ok(Self::new(lower, upper)),
        }
    }
}

impl From<Bounds> for BoundsRepr {
    fn from(bounds: Bounds) -> Self {
        if bounds.is_fixed() && bounds.lower.is_finite() {
            Self::Compact(vec![bounds.lower])
        } else {
            Self::Explicit {
                lower: bounds.lower,
                upper: bounds.upper,
            }
        }
    }
}

fn neg_infinity() -> f64 {
    f64::NEG_INFINITY
}

fn infinity() -> f64 {
    f64::INFINITY
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_neg_infinity(value: &f64) -> bool {
    *value == f64::NEG_INFINITY
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_infinity(value: &f64) -> bool {
    *value == f64::INFINITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_and_explicit_forms_are_equivalent() {
        assert_eq!(Bounds::from([0.0]), Bounds::fixed(0.0));
        assert_eq!(Bounds::from([-50.0, 50.0]), Bounds::new(-50.0, 50.0));

        let empty: &[f64] = &[];
        assert_eq!(Bounds::try_from(empty).unwrap(), Bounds::unbounded());

        let too_many: &[f64] = &[1.0, 2.0, 3.0];
        assert!(matches!(
            Bounds::try_from(too_many),
            Err(ProblemError::CompactBounds { len: 3 })
        ));
    }

    #[test]
    fn inherit_fills_only_unbounded_ends() {
        let range = Bounds::new(-5.0, 5.0);

        assert_eq!(Bounds::at_most(1.0).inherit(&range), Bounds::new(-5.0, 1.0));
        assert_eq!(Bounds::unbounded().inherit(&range), range);
        assert_eq!(Bounds::fixed(2.0).inherit(&range), Bounds::fixed(2.0));
    }

    #[test]
    fn representative_prefers_finite_information() {
        assert_eq!(Bounds::new(0.0, 5.0).representative(), 2.5);
        assert_eq!(Bounds::at_least(3.0).representative(), 3.0);
        assert_eq!(Bounds::at_most(-1.0).representative(), -1.0);
        assert_eq!(Bounds::unbounded().representative(), 0.0);
    }

    #[test]
    fn validate_rejects_reversed_and_nan() {
        assert!(Bounds::new(1.0, 0.0).validate().is_err());
        assert!(Bounds::new(f64::NAN, 0.0).validate().is_err());
        assert!(Bounds::fixed(1.0).validate().is_ok());
    }

    #[test]
    fn deserializes_both_forms_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            compact: Bounds,
            singleton: Bounds,
            explicit: Bounds,
            half_open: Bounds,
        }

        let doc: Doc = toml::from_str(
            r"
            compact = [-50.0, 50.0]
            singleton = [0.0]
            explicit = { lower = -5.0, upper = 5.0 }
            half_open = { lower = 0.0 }
            ",
        )
        .expect("valid toml");

        assert_eq!(doc.compact, Bounds::new(-50.0, 50.0));
        assert_eq!(doc.singleton, Bounds::fixed(0.0));
        assert_eq!(doc.explicit, Bounds::new(-5.0, 5.0));
        assert_eq!(doc.half_open, Bounds::at_least(0.0));
    }

    #[test]
    fn json_round_trip_keeps_infinite_ends() {
        let bounds = Bounds::at_most(3.0);

        let json = serde_json::to_string(&bounds).unwrap();
        assert_eq!(json, r#"{"upper":3.0}"#);

        let back: Bounds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bounds);
    }
}
