//! Batch scoring of taxi trip durations.
//!
//! Reads one month of trip records, keeps trips lasting between one and
//! sixty minutes, predicts their duration with a linear model over pickup
//! and dropoff zones, and writes `(ride_id, predicted_duration)` as Parquet.

pub mod codec;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod prepare;
pub mod records;
pub mod report;
pub mod storage;

pub use config::JobConfig;
pub use error::{Result, ScoringError};
pub use pipeline::{ScoringPipeline, run_job};
