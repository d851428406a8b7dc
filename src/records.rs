//! Row types flowing through the scoring pipeline.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// Categorical feature set handed to the model, keyed by column name.
pub type FeatureMap = BTreeMap<String, String>;

/// One row of the raw input table.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    /// Position in the unfiltered input table.
    pub row_index: usize,
    pub ride_id: Option<String>,
    pub pickup_datetime: Option<NaiveDateTime>,
    pub dropoff_datetime: Option<NaiveDateTime>,
    /// Raw categorical values; `None` is null.
    pub categorical: BTreeMap<String, Option<f64>>,
}

impl TripRecord {
    pub fn new(
        row_index: usize,
        pickup_datetime: Option<NaiveDateTime>,
        dropoff_datetime: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            row_index,
            ride_id: None,
            pickup_datetime,
            dropoff_datetime,
            categorical: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, field: &str, value: Option<f64>) -> Self {
        self.categorical.insert(field.to_string(), value);
        self
    }
}

/// The raw input table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripTable {
    pub categorical_fields: Vec<String>,
    pub records: Vec<TripRecord>,
}

impl TripTable {
    pub fn new(categorical_fields: Vec<String>, records: Vec<TripRecord>) -> Self {
        Self {
            categorical_fields,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A trip that survived preparation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    pub row_index: usize,
    pub ride_id: Option<String>,
    pub duration_minutes: f64,
    pub features: FeatureMap,
}

/// Output of the data preparer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedTable {
    pub categorical_fields: Vec<String>,
    pub records: Vec<PreparedRecord>,
}

impl PreparedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feature sets in row order, as fed to the model.
    pub fn feature_maps(&self) -> Vec<FeatureMap> {
        self.records.iter().map(|r| r.features.clone()).collect()
    }
}

/// One row of the persisted result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub ride_id: String,
    pub predicted_duration: f64,
}
