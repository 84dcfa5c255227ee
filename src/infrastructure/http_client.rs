//! Rate-limited HTTP client
//!
//! One long-lived `reqwest::Client` shared by every call in a run. Each request attempt
//! first waits on a global token bucket (`governor`), so the total request rate stays
//! under the store's ceiling no matter how many workers are active.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::infrastructure::config::{ApiConfig, HttpConfig};
use crate::infrastructure::retry_policy::RetryPolicy;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Throttled (HTTP 429) for {url}")]
    Throttled {
        url: String,
        retry_after: Option<Duration>,
    },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },
}

impl HttpError {
    /// HTTP status carried by the error, if the server answered
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Throttled { .. } => Some(429),
            _ => None,
        }
    }

    /// Connection and timeout failures; status-based retries are decided by the policy
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }

    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            // reqwest embeds the full request URL in its message
            Self::Transport {
                url: url.to_string(),
                message: error.without_url().to_string(),
            }
        }
    }
}

/// Query parameters whose values never appear in errors or logs
const SECRET_QUERY_KEYS: [&str; 1] = ["key"];
const REDACTED: &str = "REDACTED";

/// Render `url` with secret query values masked
pub fn redacted_url(url: &Url) -> String {
    let is_secret = |name: &str| SECRET_QUERY_KEYS.contains(&name);
    if !url.query_pairs().any(|(name, _)| is_secret(&name)) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if is_secret(&name) {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();
    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    limiter: Arc<DirectRateLimiter>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn new(http: &HttpConfig, api: &ApiConfig) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(http.timeout())
            .user_agent(api.user_agent.clone())
            .gzip(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| HttpError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(build_quota(
                http.requests_per_window,
                http.window(),
            ))),
            policy: RetryPolicy::from_config(http),
        })
    }

    /// GET `url` and return the body of a 2xx response.
    ///
    /// Transient failures are retried per the [`RetryPolicy`]. A 429 is returned at once as
    /// [`HttpError::Throttled`]; any other non-success status is terminal.
    /// Errors and log lines carry the URL with secret query values masked.
    pub async fn fetch(&self, url: &str) -> Result<String, HttpError> {
        let parsed = Url::parse(url).map_err(|_| {
            let without_query = url.split_once('?').map_or(url, |(base, _)| base);
            HttpError::InvalidUrl(without_query.to_string())
        })?;
        let shown = redacted_url(&parsed);
        let url = shown.as_str();
        let mut attempt = 1;

        loop {
            self.limiter.until_ready().await;
            debug!("🌐 GET (attempt {}/{}) {}", attempt, self.policy.max_attempts, url);

            let error = match self.client.get(parsed.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) => HttpError::from_reqwest(url, e),
                        }
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(HttpError::Throttled {
                            url: url.to_string(),
                            retry_after: retry_after(&response),
                        });
                    } else if self.policy.is_retryable_status(status.as_u16()) {
                        HttpError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        }
                    } else {
                        return Err(HttpError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                }
                Err(e) => HttpError::from_reqwest(url, e),
            };

            if !self.policy.has_attempts_left(attempt) {
                warn!("❌ Giving up after {} attempts: {}", attempt, error);
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                "⚠️ {} (attempt {}/{}), retrying in {:?}",
                error, attempt, self.policy.max_attempts, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn build_quota(requests_per_window: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(requests_per_window).unwrap_or(NonZeroU32::MIN);
    let period = window / burst.get();
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
