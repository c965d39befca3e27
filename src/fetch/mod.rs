mod client;
mod basic;
mod retry;
#[cfg(test)]
pub(crate) mod testing;

pub use client::HttpClient;
pub use basic::BasicClient;
pub use retry::RetryPolicy;

use anyhow::{Context, Result, bail};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue, RETRY_AFTER};
use serde_json::Value;
use tracing::{debug, warn};

/// GETs `url`, retrying rate limiting, server errors and connection failures
/// according to `policy`. `bearer` is sent as an `Authorization` header.
pub async fn fetch_bytes_with<C: HttpClient>(
    client: &C,
    url: &str,
    bearer: Option<&str>,
    policy: &RetryPolicy,
) -> Result<Vec<u8>> {
    let url: reqwest::Url = url.parse().with_context(|| format!("invalid url {url}"))?;
    let mut attempt = 0u32;

    loop {
        let mut req = reqwest::Request::new(reqwest::Method::GET, url.clone());
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = bearer {
            req.headers_mut().insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("bearer token is not a valid header value")?,
            );
        }

        match client.execute(req).await {
            Ok(resp) if resp.status().is_success() => {
                return Ok(resp.bytes().await?.to_vec());
            }
            Ok(resp) => {
                let status = resp.status();
                if RetryPolicy::should_retry(status) && attempt < policy.max_retries {
                    attempt += 1;
                    let retry_after = resp
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok());
                    let delay = policy.delay(attempt, retry_after, chrono::Utc::now());
                    warn!(%url, %status, attempt, ?delay, "Retrying request");
                    tokio::time::sleep(delay).await;
                    continue;
                }

                let body = resp.text().await.unwrap_or_default();
                bail!("GET {url} returned status {status}: {body}");
            }
            Err(e) if (e.is_connect() || e.is_timeout()) && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                warn!(%url, error = %e, attempt, ?delay, "Retrying request");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("GET {url} failed"));
            }
        }
    }
}

pub async fn fetch_json_with<C: HttpClient>(
    client: &C,
    url: &str,
    bearer: Option<&str>,
    policy: &RetryPolicy,
) -> Result<Value> {
    let bytes = fetch_bytes_with(client, url, bearer, policy).await?;
    serde_json::from_slice(&bytes).with_context(|| format!("response from {url} is not JSON"))
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Reads a dataset from a local path or an `http(s)` URL.
pub async fn read_source(source: &str) -> Result<Vec<u8>> {
    if is_url(source) {
        debug!(source, "Downloading source");
        return fetch_bytes_with(&BasicClient::new(), source, None, &RetryPolicy::default()).await;
    }

    debug!(source, "Reading source file");
    tokio::fs::read(source)
        .await
        .with_context(|| format!("failed to read {source}"))
}

pub async fn load_json_source(source: &str) -> Result<Value> {
    let bytes = read_source(source).await?;
    serde_json::from_slice(&bytes).with_context(|| format!("{source} is not valid JSON"))
}
