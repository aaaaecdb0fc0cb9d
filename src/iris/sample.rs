use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{FEATURE_COUNT, FEATURE_NAMES, IrisFeatures};

/// Inclusive bounds for one synthesized measurement.
///
/// Stored as `f64` so config files keep the short decimal form (`4.3`, not
/// `4.300000190734863`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn sample(&self, rng: &mut impl Rng) -> f32 {
        let raw = if self.min == self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        };
        round_one_decimal(raw).clamp(self.min, self.max) as f32
    }

    fn contains(&self, value: f32) -> bool {
        value >= self.min as f32 && value <= self.max as f32
    }
}

/// Per-feature ranges used when synthesizing a plausible sample.
///
/// Defaults follow the observed extremes of the iris dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRanges {
    #[serde(default = "default_sepal_length")]
    pub sepal_length: FeatureRange,
    #[serde(default = "default_sepal_width")]
    pub sepal_width: FeatureRange,
    #[serde(default = "default_petal_length")]
    pub petal_length: FeatureRange,
    #[serde(default = "default_petal_width")]
    pub petal_width: FeatureRange,
}

impl Default for SampleRanges {
    fn default() -> Self {
        Self {
            sepal_length: default_sepal_length(),
            sepal_width: default_sepal_width(),
            petal_length: default_petal_length(),
            petal_width: default_petal_width(),
        }
    }
}

impl SampleRanges {
    fn as_array(&self) -> [FeatureRange; FEATURE_COUNT] {
        [
            self.sepal_length,
            self.sepal_width,
            self.petal_length,
            self.petal_width,
        ]
    }

    /// Check that every range is finite and ordered.
    pub fn validate(&self) -> Result<(), String> {
        for (name, range) in FEATURE_NAMES.iter().zip(self.as_array()) {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(format!("{name} range must be finite"));
            }
            if range.min > range.max {
                return Err(format!(
                    "{name} range is inverted ({} > {})",
                    range.min, range.max
                ));
            }
        }
        Ok(())
    }

    /// Return true when every feature lies within its range.
    pub fn contains(&self, features: &IrisFeatures) -> bool {
        self.as_array()
            .iter()
            .zip(features.to_vector())
            .all(|(range, value)| range.contains(value))
    }
}

/// Draw each feature uniformly from its range, rounded to one decimal place.
pub fn random_sample(ranges: &SampleRanges, rng: &mut impl Rng) -> IrisFeatures {
    IrisFeatures {
        sepal_length: ranges.sepal_length.sample(rng),
        sepal_width: ranges.sepal_width.sample(rng),
        petal_length: ranges.petal_length.sample(rng),
        petal_width: ranges.petal_width.sample(rng),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn default_sepal_length() -> FeatureRange {
    FeatureRange::new(4.3, 7.9)
}

fn default_sepal_width() -> FeatureRange {
    FeatureRange::new(2.0, 4.4)
}

fn default_petal_length() -> FeatureRange {
    FeatureRange::new(1.0, 6.9)
}

fn default_petal_width() -> FeatureRange {
    FeatureRange::new(0.1, 2.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn is_one_decimal(value: f32) -> bool {
        ((value * 10.0).round() - value * 10.0).abs() < 1e-3
    }

    #[test]
    fn samples_stay_within_default_ranges() {
        let ranges = SampleRanges::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let sample = random_sample(&ranges, &mut rng);
            assert!(ranges.contains(&sample), "{sample:?} out of range");
            assert!(sample.to_vector().into_iter().all(is_one_decimal));
        }
    }

    #[test]
    fn same_seed_gives_same_sample() {
        let ranges = SampleRanges::default();
        let a = random_sample(&ranges, &mut StdRng::seed_from_u64(42));
        let b = random_sample(&ranges, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_range_returns_its_value() {
        let ranges = SampleRanges {
            petal_width: FeatureRange::new(1.5, 1.5),
            ..SampleRanges::default()
        };
        let sample = random_sample(&ranges, &mut StdRng::seed_from_u64(1));
        assert_eq!(sample.petal_width, 1.5);
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let ranges = SampleRanges {
            sepal_width: FeatureRange::new(4.4, 2.0),
            ..SampleRanges::default()
        };
        let err = ranges.validate().unwrap_err();
        assert!(err.contains("sepal_width"));
        assert!(SampleRanges::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_finite_bounds() {
        let ranges = SampleRanges {
            petal_length: FeatureRange::new(f64::NAN, 6.9),
            ..SampleRanges::default()
        };
        assert!(ranges.validate().unwrap_err().contains("petal_length"));

        let ranges = SampleRanges {
            sepal_length: FeatureRange::new(4.3, f64::INFINITY),
            ..SampleRanges::default()
        };
        assert_eq!(
            ranges.validate().unwrap_err(),
            "sepal_length range must be finite"
        );
    }

    #[test]
    fn ranges_serialize_as_short_decimals() {
        let text = toml::to_string(&SampleRanges::default()).unwrap();
        assert!(text.contains("min = 4.3"), "{text}");
        assert!(text.contains("max = 2.5"), "{text}");
        assert!(!text.contains("0000"), "{text}");
    }

    #[test]
    fn partial_toml_keeps_default_ranges() {
        let ranges: SampleRanges = toml::from_str("[petal_width]\nmin = 0.5\nmax = 1.0\n").unwrap();
        assert_eq!(ranges.petal_width, FeatureRange::new(0.5, 1.0));
        assert_eq!(ranges.sepal_length, default_sepal_length());
    }
}
