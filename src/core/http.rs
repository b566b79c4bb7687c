// ─── Content Fetcher ───
// Shared HTTP access: one pooled client, per-call timeout, bounded retry.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

const APP_USER_AGENT: &str = concat!("YonixLauncher/", env!("CARGO_PKG_VERSION"));

/// Tunables for the shared HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Extra attempts after the first one for transient failures.
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: APP_USER_AGENT.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            retries: 2,
            retry_backoff_ms: 250,
            pool_max_idle_per_host: 25,
            pool_idle_timeout_secs: 30,
        }
    }
}

pub fn build_http_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(settings.user_agent.clone())
        .default_headers(default_headers)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .pool_max_idle_per_host(settings.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(settings.pool_idle_timeout_secs))
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// Single GET with timeout and retry. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    retries: u32,
    backoff: Duration,
}

impl Fetcher {
    pub fn new(settings: &HttpSettings) -> LauncherResult<Self> {
        Ok(Self {
            client: build_http_client(settings)?,
            retries: settings.retries,
            backoff: Duration::from_millis(settings.retry_backoff_ms),
        })
    }

    pub fn from_client(client: Client, retries: u32, backoff: Duration) -> Self {
        Self {
            client,
            retries,
            backoff,
        }
    }

    /// Same pool, different per-request timeout (large runtime archives).
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url`, retrying connection errors, timeouts, 5xx and 429.
    ///
    /// Non-success answers that are not retryable come back as `DownloadFailed`.
    pub async fn get(&self, url: &str) -> LauncherResult<Response> {
        self.get_with_timeout(url, None).await
    }

    pub async fn get_with_timeout(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> LauncherResult<Response> {
        let attempts = self.retries + 1;
        let mut last_error: Option<LauncherError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff * 2_u32.saturating_pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.get(url);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let err = LauncherError::DownloadFailed {
                        url: url.to_string(),
                        status: status.as_u16(),
                    };
                    if !is_retryable_status(status) {
                        return Err(err);
                    }
                    debug!("GET {} answered {} (attempt {})", url, status, attempt + 1);
                    last_error = Some(err);
                }
                Err(source) => {
                    debug!("GET {} failed (attempt {}): {}", url, attempt + 1, source);
                    last_error = Some(source.into());
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        warn!("Giving up on {} after {} attempts", url, attempts);
        Err(LauncherError::NetworkTransient {
            url: url.to_string(),
            attempts,
            message,
        })
    }

    pub async fn get_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn get_text(&self, url: &str) -> LauncherResult<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    /// Fetch and parse a JSON document. Malformed bodies surface as `ManifestParse`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> LauncherResult<T> {
        let raw = self.get_text(url).await?;
        parse_json(url, &raw)
    }

    /// Stream the body of `url` into `dest`, returning the number of bytes written.
    pub async fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> LauncherResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.get_with_timeout(url, timeout).await?;
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;

        let mut stream = response.bytes_stream();
        let mut written = 0_u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| LauncherError::io(dest, e))?;

        Ok(written)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

pub fn parse_json<T: DeserializeOwned>(source_name: &str, raw: &str) -> LauncherResult<T> {
    serde_json::from_str(raw).map_err(|e| LauncherError::ManifestParse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_a_manifest_parse_error() {
        let err = parse_json::<serde_json::Value>("catalog", "{not json").unwrap_err();
        assert!(matches!(err, LauncherError::ManifestParse { .. }));
        assert!(err.to_string().contains("catalog"));
    }

    #[test]
    fn only_server_errors_and_throttling_are_retried() {
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
    }
}
