// Types module - Data structures for audio features
//
// A feature vector is the fixed-length fingerprint of one recording: the mean
// of each MFCC coefficient over every STFT frame.

use serde::ser::{Serialize, Serializer};

use crate::error::ClassifyError;

/// Number of MFCC coefficients in a feature vector
pub const FEATURE_LEN: usize = 40;

/// Mean MFCCs of one recording
///
/// The length is fixed by the type, so a `FeatureVector` always holds exactly
/// `FEATURE_LEN` values. Values are unbounded reals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_LEN]);

impl FeatureVector {
    pub fn new(values: [f32; FEATURE_LEN]) -> Self {
        Self(values)
    }

    /// Build from a slice, rejecting any length other than `FEATURE_LEN`
    pub fn from_slice(values: &[f32]) -> Result<Self, ClassifyError> {
        let array: [f32; FEATURE_LEN] = values.try_into().map_err(|_| {
            ClassifyError::inference(format!(
                "feature vector must have {} values, got {}",
                FEATURE_LEN,
                values.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        FEATURE_LEN
    }

    /// Reshape into a single-row batch `[1, FEATURE_LEN]`
    pub fn into_batch(self) -> FeatureBatch {
        FeatureBatch::from_vectors(&[self])
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// Row-major batch of feature vectors, shape `[rows, FEATURE_LEN]`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    rows: usize,
    data: Vec<f32>,
}

impl FeatureBatch {
    pub fn from_vectors(vectors: &[FeatureVector]) -> Self {
        let mut data = Vec::with_capacity(vectors.len() * FEATURE_LEN);
        for vector in vectors {
            data.extend_from_slice(vector.as_slice());
        }
        Self {
            rows: vectors.len(),
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, FEATURE_LEN]
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let start = index * FEATURE_LEN;
        Some(&self.data[start..start + FEATURE_LEN])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
