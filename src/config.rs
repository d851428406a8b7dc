//! Job configuration, read once at process start.
//!
//! Nothing below the binary entry point touches the environment directly:
//! [`JobConfig`] is built once and handed to the path resolver and storage
//! adapter.

use std::path::PathBuf;

/// Remote URL template used when `INPUT_FILE_PATTERN` is unset.
pub const DEFAULT_INPUT_PATTERN: &str =
    "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_{year:04d}-{month:02d}.parquet";

/// Object-store template used when `OUTPUT_FILE_PATTERN` is unset.
pub const DEFAULT_OUTPUT_PATTERN: &str = "s3://nyc-duration-prediction-alexey/taxi_type=fhv/year={year:04d}/month={month:02d}/predictions.parquet";

/// Local model artifact read at startup.
pub const DEFAULT_MODEL_PATH: &str = "model.bin";

/// Bucket that both the overridden read path and the write path address.
pub const DATA_BUCKET: &str = "nyc-duration";

/// Where prediction tables are written.
///
/// The write path never consults the environment: it always targets a local
/// S3-compatible emulator with fixed demo credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
}

impl WriteTarget {
    // FIXME: demo credentials and a localhost endpoint, whatever the read path is configured with.
    pub fn demo() -> Self {
        Self {
            endpoint_url: "http://localhost:4566".to_string(),
            access_key_id: "abc".to_string(),
            secret_access_key: "xyz".to_string(),
            region: "eu-west-1".to_string(),
            bucket: DATA_BUCKET.to_string(),
        }
    }
}

/// Everything a scoring run needs from its environment.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_file_pattern: String,
    pub output_file_pattern: String,
    /// When set, input locations are keys in [`DATA_BUCKET`] behind this endpoint.
    pub s3_endpoint_url: Option<String>,
    pub model_path: PathBuf,
    pub write_target: WriteTarget,
}

impl JobConfig {
    /// Builds the config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    ///
    /// An empty `S3_ENDPOINT_URL` counts as unset. Empty patterns are kept
    /// as given.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            input_file_pattern: lookup("INPUT_FILE_PATTERN")
                .unwrap_or_else(|| DEFAULT_INPUT_PATTERN.to_string()),
            output_file_pattern: lookup("OUTPUT_FILE_PATTERN")
                .unwrap_or_else(|| DEFAULT_OUTPUT_PATTERN.to_string()),
            s3_endpoint_url: lookup("S3_ENDPOINT_URL").filter(|url| !url.is_empty()),
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            write_target: WriteTarget::demo(),
        }
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> JobConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        JobConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]);

        assert_eq!(config.input_file_pattern, DEFAULT_INPUT_PATTERN);
        assert_eq!(config.output_file_pattern, DEFAULT_OUTPUT_PATTERN);
        assert_eq!(config.s3_endpoint_url, None);
        assert_eq!(config.model_path, PathBuf::from("model.bin"));
    }

    #[test]
    fn test_overrides_are_picked_up() {
        let config = config_from(&[
            ("INPUT_FILE_PATTERN", "in/{year}-{month}.parquet"),
            ("OUTPUT_FILE_PATTERN", "out/{year}-{month}.parquet"),
            ("S3_ENDPOINT_URL", "http://localstack:4566"),
            ("MODEL_PATH", "/models/lin_reg.bin"),
        ]);

        assert_eq!(config.input_file_pattern, "in/{year}-{month}.parquet");
        assert_eq!(config.output_file_pattern, "out/{year}-{month}.parquet");
        assert_eq!(
            config.s3_endpoint_url.as_deref(),
            Some("http://localstack:4566")
        );
        assert_eq!(config.model_path, PathBuf::from("/models/lin_reg.bin"));
    }

    #[test]
    fn test_empty_endpoint_counts_as_unset() {
        let config = config_from(&[("S3_ENDPOINT_URL", "")]);
        assert_eq!(config.s3_endpoint_url, None);
    }

    #[test]
    fn test_write_target_ignores_read_override() {
        let config = config_from(&[("S3_ENDPOINT_URL", "http://elsewhere:9000")]);

        assert_eq!(config.write_target, WriteTarget::demo());
        assert_eq!(config.write_target.endpoint_url, "http://localhost:4566");
        assert_eq!(config.write_target.region, "eu-west-1");
        assert_eq!(config.write_target.bucket, "nyc-duration");
    }
}
