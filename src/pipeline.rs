//! Scoring pipeline: read, prepare, predict, write.

use tracing::info;

use crate::config::JobConfig;
use crate::error::{Result, ScoringError};
use crate::model::{DurationModel, LinearDurationModel};
use crate::paths::{Locations, PathResolver};
use crate::prepare::{DEFAULT_CATEGORICAL, assign_ride_ids, prepare, ride_id};
use crate::records::Prediction;
use crate::report::{RunSummary, log_preview, log_summary, report_mean};
use crate::storage::{BlobStore, StorageAdapter, read_table, write_table};

/// Scores one (year, month) partition against an injected store and model.
pub struct ScoringPipeline<S, M> {
    paths: PathResolver,
    store: S,
    model: M,
    categorical: Vec<String>,
}

impl<S: BlobStore, M: DurationModel> ScoringPipeline<S, M> {
    pub fn new(paths: PathResolver, store: S, model: M) -> Self {
        Self {
            paths,
            store,
            model,
            categorical: DEFAULT_CATEGORICAL.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_categorical(mut self, fields: Vec<String>) -> Self {
        self.categorical = fields;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolves the partition's locations and scores it.
    pub async fn run(&self, year: i32, month: i32) -> Result<Vec<Prediction>> {
        let locations = self.paths.resolve(year, month)?;
        self.score(year, month, &locations).await
    }

    /// Scores the partition at already-resolved locations.
    ///
    /// The output is written once, after every prediction is in hand; any
    /// failure before that leaves the output location untouched.
    #[tracing::instrument(skip(self, locations), fields(input = %locations.input))]
    pub async fn score(
        &self,
        year: i32,
        month: i32,
        locations: &Locations,
    ) -> Result<Vec<Prediction>> {
        let mut raw = read_table(&self.store, &locations.input, &self.categorical).await?;
        info!(rows = raw.len(), "Input table loaded");

        assign_ride_ids(&mut raw, year, month);
        let prepared = prepare(&raw, &self.categorical);

        let features = prepared.feature_maps();
        let durations = self.model.predict(&features)?;
        if durations.len() != features.len() {
            return Err(ScoringError::Prediction {
                expected: features.len(),
                got: durations.len(),
            });
        }

        let mean = report_mean(&durations);

        let predictions: Vec<Prediction> = prepared
            .records
            .iter()
            .zip(durations)
            .map(|(record, predicted_duration)| Prediction {
                ride_id: record
                    .ride_id
                    .clone()
                    .unwrap_or_else(|| ride_id(year, month, record.row_index)),
                predicted_duration,
            })
            .collect();
        log_preview(&predictions);

        write_table(&self.store, &predictions, &locations.output).await?;

        log_summary(&RunSummary {
            year,
            month,
            input: locations.input.clone(),
            output: locations.output.clone(),
            rows_read: raw.len(),
            rows_scored: predictions.len(),
            mean_predicted_duration: mean,
        });

        Ok(predictions)
    }
}

/// Runs a full job with the production store and the model artifact named
/// in `config`.
///
/// Locations are resolved before the model is loaded, so a bad template is
/// reported even when the artifact is also missing.
pub async fn run_job(config: &JobConfig, year: i32, month: i32) -> Result<Vec<Prediction>> {
    let paths = PathResolver::new(config);
    let locations = paths.resolve(year, month)?;
    info!(input = %locations.input, output = %locations.output, "Locations resolved");

    let model = LinearDurationModel::load(&config.model_path)?;
    let store = StorageAdapter::new(config);

    ScoringPipeline::new(paths, store, model)
        .score(year, month, &locations)
        .await
}
