//! Run reporting.
//!
//! Nothing in here can fail a run: reporting problems are logged and dropped.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::records::Prediction;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Summary of one scoring run, logged when the run finishes.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub year: i32,
    pub month: i32,
    pub input: String,
    pub output: String,
    pub rows_read: usize,
    pub rows_scored: usize,
    pub mean_predicted_duration: Option<f64>,
}

impl RunSummary {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read.saturating_sub(self.rows_scored)
    }
}

/// Logs the mean predicted duration.
pub fn report_mean(predictions: &[f64]) -> Option<f64> {
    let mean = mean(predictions);
    match mean {
        Some(value) => info!(
            mean_duration = value,
            count = predictions.len(),
            "predicted mean duration"
        ),
        None => warn!("No predictions; mean duration undefined"),
    }
    mean
}

/// Logs the run summary as JSON.
pub fn log_summary(summary: &RunSummary) {
    match serde_json::to_string(summary) {
        Ok(json) => info!(rows_dropped = summary.rows_dropped(), summary = %json, "Run complete"),
        Err(e) => warn!(error = %e, "Could not serialize run summary"),
    }
}

/// Number of predictions shown by [`log_preview`].
pub const PREVIEW_ROWS: usize = 5;

/// The leading predictions, at most [`PREVIEW_ROWS`].
pub fn preview(predictions: &[Prediction]) -> &[Prediction] {
    &predictions[..predictions.len().min(PREVIEW_ROWS)]
}

/// Logs the row count and the first few predictions as a single event.
pub fn log_preview(predictions: &[Prediction]) {
    match serde_json::to_string(preview(predictions)) {
        Ok(head) => debug!(rows = predictions.len(), head = %head, "Predictions ready"),
        Err(e) => warn!(error = %e, "Could not serialize prediction preview"),
    }
}
