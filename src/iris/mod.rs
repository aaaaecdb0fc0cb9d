//! Iris feature vectors and the species lookup table shared by every binary.

mod sample;

pub use sample::{FeatureRange, SampleRanges, random_sample};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of measurements in a feature vector.
pub const FEATURE_COUNT: usize = 4;

/// Feature names in classifier column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["sepal_length", "sepal_width", "petal_length", "petal_width"];

/// Label shown for class ids outside the lookup table.
pub const UNKNOWN_SPECIES_LABEL: &str = "Unknown ❓";

/// The four iris measurements, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrisFeatures {
    pub sepal_length: f32,
    pub sepal_width: f32,
    pub petal_length: f32,
    pub petal_width: f32,
}

/// Rejected feature vector.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("{name} must be a finite number")]
    NonFinite { name: &'static str },
}

impl IrisFeatures {
    /// Return the features in classifier column order.
    pub fn to_vector(&self) -> [f32; FEATURE_COUNT] {
        [
            self.sepal_length,
            self.sepal_width,
            self.petal_length,
            self.petal_width,
        ]
    }

    /// Build features from a vector in classifier column order.
    pub fn from_vector(values: [f32; FEATURE_COUNT]) -> Self {
        let [sepal_length, sepal_width, petal_length, petal_width] = values;
        Self {
            sepal_length,
            sepal_width,
            petal_length,
            petal_width,
        }
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        for (name, value) in FEATURE_NAMES.into_iter().zip(self.to_vector()) {
            if !value.is_finite() {
                return Err(FeatureError::NonFinite { name });
            }
        }
        Ok(())
    }
}

/// Iris species predicted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Setosa = 0,
    Versicolor = 1,
    Virginica = 2,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Setosa, Species::Versicolor, Species::Virginica];

    /// Map an integer class label returned by the service.
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Self::Setosa),
            1 => Some(Self::Versicolor),
            2 => Some(Self::Virginica),
            _ => None,
        }
    }

    pub fn label(self) -> i64 {
        self as i64
    }

    /// Lowercase identifier used in model files.
    pub fn id(self) -> &'static str {
        match self {
            Self::Setosa => "setosa",
            Self::Versicolor => "versicolor",
            Self::Virginica => "virginica",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Setosa => "Setosa 🌱",
            Self::Versicolor => "Versicolor 🌿",
            Self::Virginica => "Virginica 🌸",
        }
    }
}

/// Display name for a class label, falling back to [`UNKNOWN_SPECIES_LABEL`].
pub fn species_label(label: i64) -> &'static str {
    Species::from_label(label)
        .map(Species::display_name)
        .unwrap_or(UNKNOWN_SPECIES_LABEL)
}
