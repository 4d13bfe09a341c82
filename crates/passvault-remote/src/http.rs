//! REST implementation of the remote collection.
//!
//! Talks to `{base_url}/vault` with bearer-token auth. Idempotent calls
//! (GET, PUT, DELETE) retry with exponential backoff on transient failures;
//! POST is never retried so a slow server cannot end up with duplicates.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::error::RemoteError;
use crate::types::{ApiErrorBody, RecordBody, SealedRecord};
use crate::RemoteCollection;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const COLLECTION_PATH: &str = "/vault";

/// Configuration for [`HttpCollection`].
#[derive(Debug, Clone)]
pub struct HttpCollectionConfig {
    /// API base address, e.g. `https://vault.example.com/api`.
    pub base_url: String,
    /// Per-request timeout. Default: 10 seconds.
    pub timeout: Duration,
    /// Retry attempts for idempotent calls. Default: 2.
    pub max_retries: u32,
    /// First backoff step; doubles per attempt. Default: 500ms.
    pub retry_base_delay: Duration,
}

impl HttpCollectionConfig {
    /// Configuration with default timeouts for the given base address.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

/// Remote collection reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCollection {
    base_url: String,
    max_retries: u32,
    retry_base_delay: Duration,
    client: reqwest::Client,
}

impl HttpCollection {
    /// Build a client for the configured collection.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Config`] if the base URL is empty or not
    /// `http(s)`, or [`RemoteError::Network`] if the HTTP client cannot be
    /// built.
    pub fn new(cfg: HttpCollectionConfig) -> Result<Self, RemoteError> {
        let base_url = cfg.base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(RemoteError::Config("missing API base URL".to_owned()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::Config(format!(
                "API base URL must start with http:// or https:// (got '{base_url}')"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(if cfg.timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                cfg.timeout
            })
            .user_agent(concat!("passvault/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url,
            max_retries: cfg.max_retries,
            retry_base_delay: cfg.retry_base_delay,
            client,
        })
    }

    /// The normalized base address (no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}{COLLECTION_PATH}", self.base_url)
    }

    fn record_url(&self, id: &str) -> String {
        format!(
            "{}{COLLECTION_PATH}/{}",
            self.base_url,
            urlencoding::encode(id)
        )
    }

    /// Send one logical request, retrying idempotent methods on transient
    /// failures. Returns the response body text on success.
    async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&RecordBody>,
        record_id: Option<&str>,
    ) -> Result<String, RemoteError> {
        let retries = if method == Method::POST {
            0
        } else {
            self.max_retries
        };
        let mut attempt = 0;

        loop {
            debug!(%method, url, attempt, "remote collection request");
            let mut req = self.client.request(method.clone(), url).bearer_auth(token);
            if let Some(b) = body {
                req = req.json(b);
            }

            let result = match req.send().await {
                Ok(resp) => classify(resp, record_id).await,
                Err(e) if e.is_timeout() => Err(RemoteError::Timeout),
                Err(e) => Err(RemoteError::Network(e)),
            };

            match result {
                Err(err) if attempt < retries && err.is_transient() => {
                    debug!(%method, url, attempt, error = %err, "retrying remote collection request");
                    sleep_with_jitter(self.retry_base_delay, attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait::async_trait]
impl RemoteCollection for HttpCollection {
    async fn list(&self, token: &str) -> Result<Vec<SealedRecord>, RemoteError> {
        let text = self
            .send(Method::GET, &self.collection_url(), token, None, None)
            .await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn create(&self, token: &str, body: &RecordBody) -> Result<(), RemoteError> {
        self.send(Method::POST, &self.collection_url(), token, Some(body), None)
            .await?;
        Ok(())
    }

    async fn update(&self, token: &str, id: &str, body: &RecordBody) -> Result<(), RemoteError> {
        self.send(Method::PUT, &self.record_url(id), token, Some(body), Some(id))
            .await?;
        Ok(())
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), RemoteError> {
        self.send(Method::DELETE, &self.record_url(id), token, None, Some(id))
            .await?;
        Ok(())
    }
}

async fn classify(resp: reqwest::Response, record_id: Option<&str>) -> Result<String, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.text().await?);
    }

    let error_text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&error_text)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    match (status, record_id) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            Err(RemoteError::Unauthorized(message))
        }
        (StatusCode::NOT_FOUND, Some(id)) => Err(RemoteError::NotFound { id: id.to_owned() }),
        _ => Err(RemoteError::Api {
            status: status.as_u16(),
            message,
        }),
    }
}

async fn sleep_with_jitter(base: Duration, attempt: u32) {
    #[allow(clippy::cast_possible_truncation)]
    let base_ms = (base.as_millis() as u64).saturating_mul(2u64.saturating_pow(attempt));
    let jitter = base_ms.saturating_mul(jitter_permille()) / 3000;
    tokio::time::sleep(Duration::from_millis(base_ms.saturating_add(jitter))).await;
}

/// Cheap non-cryptographic value in `0..1000` for backoff jitter.
fn jitter_permille() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    u64::from(nanos % 1000)
}
