//! HTTP download of remote input tables.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Request, Response};
use tracing::debug;

/// Executes prepared HTTP requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Plain client with no authentication.
#[derive(Default)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.0.execute(req).await
    }
}

/// GETs `url` and returns the body. Non-2xx responses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> anyhow::Result<Bytes> {
    let req = Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    let body = resp.bytes().await?;

    debug!(url, bytes = body.len(), "Remote table downloaded");
    Ok(body)
}
