use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use serde::de::IgnoredAny;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ConfigError};
use crate::http_cache::{ResponseCache, cache_key};

const AUTH_HEADER: &str = "X-Auth-Token";
const USER_AGENT_VALUE: &str = "standings-edge/0.1";
const ERROR_SNIPPET_CHARS: usize = 200;
const MAX_RETRY_WAIT_SECS: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: f64,
}

impl RetryPolicy {
    /// Wait before the retry that follows `attempt` (zero-based).
    ///
    /// A usable `Retry-After` wins; otherwise `backoff^(attempt + 1)` seconds.
    /// Either way the wait is capped at `MAX_RETRY_WAIT_SECS`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<f64>) -> Duration {
        let secs = retry_after
            .filter(|s| s.is_finite() && *s >= 0.0)
            .unwrap_or_else(|| self.backoff.powi(attempt as i32 + 1));
        Duration::from_secs_f64(secs.min(MAX_RETRY_WAIT_SECS).max(0.0))
    }
}

struct AttemptError {
    error: anyhow::Error,
    retry_after: Option<f64>,
}

impl AttemptError {
    fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

/// Blocking JSON client for the standings provider.
///
/// Credentials and the response cache are injected; nothing is read from the
/// environment here.
pub struct ApiClient {
    http: Client,
    token: Option<String>,
    base_url: String,
    retry: RetryPolicy,
    cache: Box<dyn ResponseCache>,
}

impl ApiClient {
    pub fn new(cfg: ClientConfig, cache: Box<dyn ResponseCache>) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            token: cfg.token,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                max_retries: cfg.max_retries.max(1),
                backoff: cfg.backoff,
            },
            cache,
        })
    }

    /// GETs `path` under the base URL and returns the raw JSON body.
    pub fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let token = self.token.as_deref().ok_or(ConfigError::MissingToken)?;
        let url = format!("{}{}", self.base_url, path);
        let key = cache_key(&url, query);
        if let Some(body) = self.cache.get(&key) {
            debug!(%key, "cache hit");
            return Ok(body);
        }

        let mut last_err = None;
        for attempt in 0..self.retry.max_retries {
            match self.send_once(&url, query, token) {
                Ok(body) => {
                    self.cache.put(&key, body.clone());
                    return Ok(body);
                }
                Err(failure) => {
                    let is_last = attempt + 1 == self.retry.max_retries;
                    if !is_last {
                        let wait = self.retry.delay_for(attempt, failure.retry_after);
                        warn!(
                            %url,
                            attempt = attempt + 1,
                            wait_secs = wait.as_secs_f64(),
                            "request failed, retrying: {:#}",
                            failure.error
                        );
                        thread::sleep(wait);
                    }
                    last_err = Some(failure.error);
                }
            }
        }

        let err = last_err.unwrap_or_else(|| anyhow!("request was never attempted"));
        Err(err.context(format!(
            "giving up on {url} after {} attempts",
            self.retry.max_retries
        )))
    }

    fn send_once(&self, url: &str, query: &[(&str, &str)], token: &str) -> Result<String, AttemptError> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .header(AUTH_HEADER, token)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .map_err(|e| AttemptError::new(anyhow::Error::new(e).context("request failed")))?;

        let status = resp.status();
        let is_html = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/html"));
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError {
                error: anyhow!("http 429: rate limit reached"),
                retry_after,
            });
        }

        let body = resp
            .text()
            .map_err(|e| AttemptError::new(anyhow::Error::new(e).context("failed reading body")))?;

        if status.is_client_error() || status.is_server_error() {
            return Err(AttemptError::new(anyhow!(describe_http_error(status, is_html, &body))));
        }

        serde_json::from_str::<IgnoredAny>(&body)
            .map_err(|e| AttemptError::new(anyhow::Error::new(e).context("invalid json body")))?;
        Ok(body)
    }
}

fn describe_http_error(status: StatusCode, is_html: bool, body: &str) -> String {
    if is_html {
        return format!(
            "http {status}: provider returned an HTML error page; check the API key and endpoint"
        );
    }
    let message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("message")
            .or_else(|| v.get("error"))
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
    });
    let detail = message.unwrap_or_else(|| {
        body.trim()
            .replace(['\n', '\r'], " ")
            .chars()
            .take(ERROR_SNIPPET_CHARS)
            .collect::<String>()
    });
    format!("http {status}: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_cache::MemoryCache;

    fn offline_config(token: Option<&str>) -> ClientConfig {
        ClientConfig {
            token: token.map(|t| t.to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
            max_retries: 1,
            backoff: 1.0,
        }
    }

    #[test]
    fn retry_after_wins_over_backoff() {
        let policy = RetryPolicy {
            max_retries: 4,
            backoff: 2.0,
        };
        assert_eq!(policy.delay_for(0, Some(5.0)), Duration::from_secs(5));
        assert_eq!(policy.delay_for(0, None), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2, None), Duration::from_secs(8));
        assert_eq!(policy.delay_for(1, Some(-1.0)), Duration::from_secs(4));
        assert_eq!(policy.delay_for(1, Some(f64::NAN)), Duration::from_secs(4));
    }

    #[test]
    fn waits_are_capped() {
        let policy = RetryPolicy {
            max_retries: 4,
            backoff: 5.0,
        };
        let cap = Duration::from_secs_f64(MAX_RETRY_WAIT_SECS);
        assert_eq!(policy.delay_for(0, Some(1e20)), cap);
        assert_eq!(policy.delay_for(0, Some(86_400.0)), cap);
        assert_eq!(policy.delay_for(0, Some(f64::INFINITY)), Duration::from_secs(5));
        assert_eq!(policy.delay_for(9, None), cap);
        assert_eq!(policy.delay_for(2000, None), cap);
    }

    #[test]
    fn missing_token_fails_before_request() {
        let client = ApiClient::new(offline_config(None), Box::new(MemoryCache::new(Duration::from_secs(60))))
            .unwrap();
        let err = client.get_json("/competitions/PL/standings", &[]).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn cached_body_skips_the_network() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.put("http://127.0.0.1:9/competitions/PL/standings", "{\"standings\":[]}".to_string());
        let client = ApiClient::new(offline_config(Some("t")), Box::new(cache)).unwrap();
        let body = client.get_json("/competitions/PL/standings", &[]).unwrap();
        assert_eq!(body, "{\"standings\":[]}");
    }

    #[test]
    fn error_description_prefers_provider_message() {
        let msg = describe_http_error(
            StatusCode::FORBIDDEN,
            false,
            r#"{"message":"The resource you are looking for is restricted.","errorCode":403}"#,
        );
        assert_eq!(msg, "http 403 Forbidden: The resource you are looking for is restricted.");
        let html = describe_http_error(StatusCode::BAD_GATEWAY, true, "<html></html>");
        assert!(html.contains("HTML error page"));
        let raw = describe_http_error(StatusCode::INTERNAL_SERVER_ERROR, false, "oops\nbad");
        assert_eq!(raw, "http 500 Internal Server Error: oops bad");
    }
}
