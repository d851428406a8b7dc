//! Reading and writing tables on local disk, HTTP(S) or S3-compatible storage.
//!
//! [`BlobStore`] moves raw bytes; [`read_table`] and [`write_table`] add the
//! Parquet codec on top. [`StorageAdapter`] is the production store.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use crate::codec::{decode_trips, encode_predictions};
use crate::config::{DATA_BUCKET, JobConfig, WriteTarget};
use crate::error::{Result, ScoringError};
use crate::fetch::{BasicClient, fetch_bytes};
use crate::records::{Prediction, TripTable};

/// Byte-level access to wherever tables live.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, location: &str) -> Result<Bytes>;
    async fn put(&self, location: &str, body: Vec<u8>) -> Result<()>;
}

/// Reads and decodes the trip table at `location`.
pub async fn read_table<S: BlobStore + ?Sized>(
    store: &S,
    location: &str,
    categorical: &[String],
) -> Result<TripTable> {
    let bytes = store.get(location).await?;
    decode_trips(location, bytes, categorical)
}

/// Encodes `predictions` as Parquet and stores them at `location`.
pub async fn write_table<S: BlobStore + ?Sized>(
    store: &S,
    predictions: &[Prediction],
    location: &str,
) -> Result<()> {
    let body = encode_predictions(location, predictions)?;
    store.put(location, body).await
}

/// Splits `s3://bucket/key` into its parts.
pub fn parse_s3_url(location: &str) -> Option<(&str, &str)> {
    let (bucket, key) = location.strip_prefix("s3://")?.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}

/// Object key for `location`: the key part of an `s3://` URL, otherwise the
/// location itself.
pub fn object_key(location: &str) -> &str {
    parse_s3_url(location)
        .map(|(_, key)| key)
        .unwrap_or(location)
}

/// Key inside [`DATA_BUCKET`] for `location`. Only an
/// `s3://nyc-duration/` prefix is stripped; anything else is used verbatim.
pub fn data_key(location: &str) -> &str {
    match parse_s3_url(location) {
        Some((DATA_BUCKET, key)) => key,
        _ => location,
    }
}

fn is_http(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Where a read is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRoute<'a> {
    S3 { bucket: &'a str, key: &'a str },
    Http,
    Local,
}

/// Production store.
///
/// Reads go to the `S3_ENDPOINT_URL` override when configured and otherwise
/// follow the location's scheme. Writes always go to the [`WriteTarget`].
pub struct StorageAdapter {
    read_endpoint: Option<String>,
    write_target: WriteTarget,
    http: BasicClient,
}

impl StorageAdapter {
    pub fn new(config: &JobConfig) -> Self {
        Self {
            read_endpoint: config.s3_endpoint_url.clone(),
            write_target: config.write_target.clone(),
            http: BasicClient::new(),
        }
    }

    /// Picks the source for `location`. With an endpoint override every
    /// read targets [`DATA_BUCKET`], whatever the location's scheme.
    pub fn read_route<'a>(&self, location: &'a str) -> ReadRoute<'a> {
        if self.read_endpoint.is_some() {
            return ReadRoute::S3 {
                bucket: DATA_BUCKET,
                key: data_key(location),
            };
        }
        if is_http(location) {
            return ReadRoute::Http;
        }
        match parse_s3_url(location) {
            Some((bucket, key)) => ReadRoute::S3 { bucket, key },
            None => ReadRoute::Local,
        }
    }

    /// Bucket and key a write of `location` lands in.
    pub fn write_route<'a>(&'a self, location: &'a str) -> (&'a str, &'a str) {
        (self.write_target.bucket.as_str(), object_key(location))
    }

    async fn read_client(&self) -> aws_sdk_s3::Client {
        let base = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&base);
        if let Some(endpoint) = &self.read_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        aws_sdk_s3::Client::from_conf(builder.build())
    }

    fn write_client(&self) -> aws_sdk_s3::Client {
        let target = &self.write_target;
        let credentials = Credentials::new(
            &target.access_key_id,
            &target.secret_access_key,
            None,
            None,
            "ride-duration-demo",
        );
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(target.region.clone()))
            .endpoint_url(&target.endpoint_url)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        aws_sdk_s3::Client::from_conf(config)
    }
}

async fn get_object(
    client: &aws_sdk_s3::Client,
    location: &str,
    bucket: &str,
    key: &str,
) -> Result<Bytes> {
    let resp = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| ScoringError::storage(location, e))?;

    let body = resp
        .body
        .collect()
        .await
        .map_err(|e| ScoringError::storage(location, e))?;

    Ok(body.into_bytes())
}

#[async_trait]
impl BlobStore for StorageAdapter {
    #[tracing::instrument(skip(self))]
    async fn get(&self, location: &str) -> Result<Bytes> {
        match self.read_route(location) {
            ReadRoute::S3 { bucket, key } => {
                debug!(
                    bucket,
                    key,
                    endpoint_override = self.read_endpoint.is_some(),
                    "Reading from S3"
                );
                let client = self.read_client().await;
                get_object(&client, location, bucket, key).await
            }
            ReadRoute::Http => fetch_bytes(&self.http, location)
                .await
                .map_err(|e| ScoringError::storage(location, e)),
            ReadRoute::Local => std::fs::read(location)
                .map(Bytes::from)
                .map_err(|e| ScoringError::storage(location, e)),
        }
    }

    #[tracing::instrument(skip(self, body), fields(bytes = body.len()))]
    async fn put(&self, location: &str, body: Vec<u8>) -> Result<()> {
        let (bucket, key) = self.write_route(location);

        self.write_client()
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/vnd.apache.parquet")
            .send()
            .await
            .map_err(|e| ScoringError::storage(location, e))?;

        info!(bucket, key, "Predictions uploaded");
        Ok(())
    }
}
