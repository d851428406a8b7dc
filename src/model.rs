//! The duration model: a dictionary vectorizer feeding a linear regression.
//!
//! The pipeline only sees the [`DurationModel`] trait. The artifact on disk
//! is a bincode-encoded `(DictVectorizer, LinearRegression)` pair.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{Result, ScoringError};
use crate::records::FeatureMap;

/// Anything that maps categorical feature sets to predicted durations.
///
/// Implementations must return exactly one prediction per record, in order.
pub trait DurationModel {
    fn predict(&self, records: &[FeatureMap]) -> Result<Vec<f64>>;
}

/// Sparse feature row: `(column, value)` pairs.
pub type SparseRow = Vec<(usize, f64)>;

/// One-hot encodes `field=value` pairs against a fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DictVectorizer {
    feature_names: Vec<String>,
    vocabulary: HashMap<String, usize>,
}

impl DictVectorizer {
    pub const SEPARATOR: char = '=';

    pub fn new(feature_names: Vec<String>) -> Self {
        let vocabulary = feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            feature_names,
            vocabulary,
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    /// Encodes each record; features outside the vocabulary are ignored.
    pub fn transform(&self, records: &[FeatureMap]) -> Vec<SparseRow> {
        records
            .iter()
            .map(|record| {
                record
                    .iter()
                    .filter_map(|(field, value)| {
                        let name = format!("{field}{}{value}", Self::SEPARATOR);
                        self.vocabulary.get(&name).map(|&col| (col, 1.0))
                    })
                    .collect()
            })
            .collect()
    }
}

impl From<Vec<String>> for DictVectorizer {
    fn from(feature_names: Vec<String>) -> Self {
        Self::new(feature_names)
    }
}

impl From<DictVectorizer> for Vec<String> {
    fn from(vectorizer: DictVectorizer) -> Self {
        vectorizer.feature_names
    }
}

/// Ordinary least squares weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegression {
    pub fn predict_row(&self, row: &[(usize, f64)]) -> f64 {
        row.iter()
            .filter_map(|&(col, value)| self.coef.get(col).map(|w| w * value))
            .fold(self.intercept, |acc, term| acc + term)
    }
}

/// Vectorizer and regression loaded from a single artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDurationModel {
    pub vectorizer: DictVectorizer,
    pub regression: LinearRegression,
}

impl LinearDurationModel {
    pub fn new(vectorizer: DictVectorizer, regression: LinearRegression) -> Result<Self> {
        if regression.coef.len() != vectorizer.len() {
            return Err(ScoringError::ModelLoad {
                path: "<memory>".to_string(),
                reason: format!(
                    "{} coefficients for {} features",
                    regression.coef.len(),
                    vectorizer.len()
                ),
            });
        }
        Ok(Self {
            vectorizer,
            regression,
        })
    }

    /// Reads the artifact at `path`.
    ///
    /// # Errors
    ///
    /// [`ScoringError::ModelLoad`] if the file is missing, cannot be decoded,
    /// or its coefficient count does not match the vocabulary.
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ScoringError::model_load(path, e))?;
        let (vectorizer, regression): (DictVectorizer, LinearRegression) =
            bincode::deserialize(&bytes).map_err(|e| ScoringError::model_load(path, e))?;

        let model = Self::new(vectorizer, regression).map_err(|e| match e {
            ScoringError::ModelLoad { reason, .. } => ScoringError::model_load(path, reason),
            other => other,
        })?;

        info!(features = model.vectorizer.len(), "Model loaded");
        Ok(model)
    }

    /// Writes the artifact in the format [`LinearDurationModel::load`] reads.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(&(&self.vectorizer, &self.regression))
            .map_err(|e| ScoringError::model_load(path, e))?;
        std::fs::write(path, bytes).map_err(|e| ScoringError::model_load(path, e))
    }
}

impl DurationModel for LinearDurationModel {
    fn predict(&self, records: &[FeatureMap]) -> Result<Vec<f64>> {
        Ok(self
            .vectorizer
            .transform(records)
            .iter()
            .map(|row| self.regression.predict_row(row))
            .collect())
    }
}
