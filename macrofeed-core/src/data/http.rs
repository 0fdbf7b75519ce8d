//! Blocking HTTP fetch with retries and the per-host circuit breaker.
//!
//! Every HTTP-backed source goes through `HttpFetcher::get_text`, so retry
//! policy, timeouts and ban handling live in one place.

use super::circuit_breaker::CircuitBreaker;
use super::provider::SourceError;
use super::settings::SourceSettings;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound on a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

pub struct HttpFetcher {
    client: Client,
    breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with the settings' default user agent.
    pub fn new(settings: &SourceSettings, breaker: Arc<CircuitBreaker>) -> Result<Self, SourceError> {
        Self::with_user_agent(settings, breaker, &settings.user_agent)
    }

    pub fn with_user_agent(
        settings: &SourceSettings,
        breaker: Arc<CircuitBreaker>,
        user_agent: &str,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| SourceError::Misconfigured(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            breaker,
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// GET `url` and return the body as text.
    pub fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let host = host_of(url)?;

        if !self.breaker.is_allowed(&host) {
            return Err(SourceError::CircuitBreakerTripped { host });
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.breaker.is_allowed(&host) {
                return Err(SourceError::CircuitBreakerTripped { host });
            }

            let resp = match self.client.get(url).send() {
                Ok(resp) => resp,
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        self.breaker.record_failure(&host);
                        last_error = Some(SourceError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(SourceError::NetworkUnreachable(e.to_string()));
                }
            };

            let status = resp.status();

            if status == StatusCode::FORBIDDEN {
                self.breaker.trip(&host);
                return Err(SourceError::CircuitBreakerTripped { host });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                self.breaker.record_failure(&host);
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(SourceError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(SourceError::AuthenticationRequired(format!(
                    "{host} requires authentication"
                )));
            }

            if status == StatusCode::NOT_FOUND {
                return Err(SourceError::NotFound {
                    url: url.to_string(),
                });
            }

            if status.is_server_error() {
                self.breaker.record_failure(&host);
                last_error = Some(SourceError::Http {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
                continue;
            }

            if !status.is_success() {
                return Err(SourceError::Http {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = resp
                .text()
                .map_err(|e| SourceError::ResponseFormatChanged(format!("unreadable body: {e}")))?;
            self.breaker.record_success(&host);
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| SourceError::Other("max retries exceeded".into())))
    }
}

/// `base * 2^(attempt - 1)`, saturating and capped at `MAX_BACKOFF`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

fn host_of(url: &str) -> Result<String, SourceError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| SourceError::Misconfigured(format!("invalid URL '{url}': {e}")))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| SourceError::Misconfigured(format!("URL has no host: {url}")))
}
