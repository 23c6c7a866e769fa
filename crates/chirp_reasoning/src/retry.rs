//! Backoff and retry for calls to `llama-server`.
//!
//! The server answers 503 with an `unavailable_error` body while weights are
//! still loading, and again when every slot is busy. Both clear up on their
//! own, as do 429/5xx responses and dropped connections. Anything else in
//! the 4xx range is a bad request and fails at once.

use anyhow::Result;
use rand::Rng;
use reqwest::{Response, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Delay while the server reports it is loading the model. Loading a
    /// multi-gigabyte model takes seconds, not milliseconds.
    pub loading_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            loading_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// How a failed attempt should be treated.
#[derive(Debug, PartialEq, Eq)]
enum Failure {
    /// 503 while the model is still loading.
    Loading,
    Transient(String),
    Fatal(String),
}

fn classify(status: StatusCode, body: &str) -> Failure {
    let detail = format!("{}: {}", status, body.chars().take(200).collect::<String>());
    if status == StatusCode::SERVICE_UNAVAILABLE && body.to_lowercase().contains("loading model") {
        return Failure::Loading;
    }
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => Failure::Transient(detail),
        s if s.is_server_error() => Failure::Transient(detail),
        _ => Failure::Fatal(detail),
    }
}

/// Run `operation` until it yields a 2xx response, a non-retryable status,
/// or `max_attempts` runs out.
pub async fn with_retry<F, Fut>(config: &RetryConfig, url: &str, operation: F) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response>>,
{
    let mut backoff = config.initial_delay;
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=config.max_attempts {
        let wait = match operation().await {
            Ok(response) if response.status().is_success() => {
                if attempt > 1 {
                    tracing::info!(url, attempt, "llama.cpp request succeeded after retry");
                }
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                match classify(status, &body) {
                    Failure::Fatal(detail) => {
                        anyhow::bail!("llama.cpp {} rejected request ({})", url, detail)
                    }
                    Failure::Loading => {
                        tracing::info!(url, attempt, "llama.cpp is still loading the model, waiting");
                        last_error = "model still loading".to_string();
                        config.loading_delay
                    }
                    Failure::Transient(detail) => {
                        tracing::warn!(
                            url,
                            attempt,
                            max = config.max_attempts,
                            "llama.cpp returned {}",
                            detail
                        );
                        last_error = detail;
                        backoff
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    url,
                    attempt,
                    max = config.max_attempts,
                    "llama.cpp unreachable: {:#}",
                    e
                );
                last_error = format!("{:#}", e);
                backoff
            }
        };

        if attempt < config.max_attempts {
            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..100));
            tokio::time::sleep(wait + jitter).await;
            backoff = (backoff * 2).min(config.max_delay);
        }
    }

    anyhow::bail!(
        "llama.cpp {} failed after {} attempts: {}",
        url,
        config.max_attempts,
        last_error
    )
}
