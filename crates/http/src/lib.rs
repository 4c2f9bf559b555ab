//! Shared blocking HTTP plumbing for the vendor clients.
//!
//! Both vendor APIs sit behind flaky gateways; reads go through a
//! bounded retry loop with exponential backoff. Writes that create
//! resources use the no-retry path: a timed-out create may still have
//! landed, and retrying it risks a duplicate.

use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::warn;

#[derive(Debug)]
pub enum HttpError {
    /// Network-level failure (DNS, connect, timeout).
    Transport(String),
    /// Non-success response after retries were exhausted (or for a
    /// status that is not retried).
    Status { status: u16, body: String },
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status { status, body } => {
                let body = body.chars().take(200).collect::<String>();
                write!(f, "http {status}: {body}")
            }
        }
    }
}

impl std::error::Error for HttpError {}

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Blocking client wrapper with retry on transient failures.
pub struct RetryingClient {
    http: reqwest::blocking::Client,
    /// Label for log lines ("evo", "bsale").
    source: String,
    max_retries: u32,
}

impl RetryingClient {
    pub fn new(http: reqwest::blocking::Client, source: impl Into<String>) -> Self {
        Self { http, source: source.into(), max_retries: DEFAULT_MAX_RETRIES }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn inner(&self) -> &reqwest::blocking::Client {
        &self.http
    }

    /// Execute a request, retrying network errors, 5xx, and 429 with
    /// exponential backoff (1s, 2s, 4s). Other 4xx fail immediately.
    /// Returns the response body text on 2xx.
    pub fn execute(&self, build: impl Fn() -> reqwest::blocking::RequestBuilder) -> Result<String, HttpError> {
        let mut last_err: Option<HttpError> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.backoff_for(&last_err, attempt);
                warn!(source = %self.source, attempt, backoff_secs = backoff.as_secs(),
                      "retrying request");
                thread::sleep(backoff);
            }
            match self.send_once(build()) {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if !is_retryable(&e) {
                        return Err(e);
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| HttpError::Transport("retries exhausted".into())))
    }

    /// One-shot execution for non-idempotent requests.
    pub fn execute_no_retry(
        &self,
        build: impl FnOnce() -> reqwest::blocking::RequestBuilder,
    ) -> Result<String, HttpError> {
        self.send_once(build())
    }

    fn send_once(&self, request: reqwest::blocking::RequestBuilder) -> Result<String, HttpError> {
        let response = request.send().map_err(|e| HttpError::Transport(e.to_string()))?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().map_err(|e| HttpError::Transport(e.to_string()))?;
        if status.is_success() {
            return Ok(body);
        }
        // Stash the server's pacing hint for the backoff computation.
        if status.as_u16() == 429 {
            if let Some(secs) = retry_after {
                return Err(HttpError::Status {
                    status: 429,
                    body: format!("retry-after={secs};{body}"),
                });
            }
        }
        Err(HttpError::Status { status: status.as_u16(), body })
    }

    fn backoff_for(&self, last_err: &Option<HttpError>, attempt: u32) -> Duration {
        if let Some(HttpError::Status { status: 429, body }) = last_err {
            if let Some(rest) = body.strip_prefix("retry-after=") {
                if let Some((secs, _)) = rest.split_once(';') {
                    if let Ok(secs) = secs.parse::<u64>() {
                        return Duration::from_secs(secs.min(30));
                    }
                }
            }
        }
        Duration::from_secs(1u64 << (attempt - 1).min(4))
    }
}

fn is_retryable(err: &HttpError) -> bool {
    match err {
        HttpError::Transport(_) => true,
        HttpError::Status { status, .. } => *status >= 500 || *status == 429,
    }
}
