//! Which network failures are worth another attempt.
//!
//! Nothing in the core retries. Callers that want to, such as
//! `catalog refresh --retry`, wrap the operation in [`with_retry`].

use log::{debug, warn};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const MAX_RETRIES: usize = 3;
pub const RETRY_DELAY_MS: u64 = 1000;

/// An HTTP answer that will not change on a second try.
#[derive(Debug, Error)]
pub enum NonRetryableError {
    #[error("{url} was not found (HTTP 404)")]
    NotFound { url: String },
    #[error("{url} refused access (HTTP {})", status.as_u16())]
    Denied { url: String, status: StatusCode },
    #[error("{url} is rate limiting requests (HTTP 429); wait before trying again")]
    RateLimited { url: String },
    #[error("{url} rejected the request (HTTP {})", status.as_u16())]
    Rejected { url: String, status: StatusCode },
}

/// `Ok(())` for statuses a retry might fix (5xx and anything not a 4xx).
pub fn classify_status(status: StatusCode, url: &str) -> Result<(), NonRetryableError> {
    let url = url.to_string();
    match status {
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound { url }),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(NonRetryableError::Denied { url, status })
        }
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::RateLimited { url }),
        s if s.is_client_error() => Err(NonRetryableError::Rejected { url, status }),
        _ => Ok(()),
    }
}

/// Convert a reqwest failure, replacing permanent HTTP statuses with a
/// [`NonRetryableError`]. Transport errors stay retryable.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    let url = error.url().map(|u| u.to_string()).unwrap_or_default();
    match error.status().map(|s| classify_status(s, &url)) {
        Some(Err(permanent)) => permanent.into(),
        _ => error.into(),
    }
}

pub fn is_retryable_error(e: &anyhow::Error) -> bool {
    e.chain()
        .all(|cause| cause.downcast_ref::<NonRetryableError>().is_none())
}

/// Run `operation` up to `attempts` times, sleeping `delay` in between.
/// A non-retryable error ends the loop at once.
pub async fn with_retry<F, Fut, T>(
    what: &str,
    attempts: usize,
    delay: Duration,
    operation: F,
) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retryable_error(&err) {
            debug!("{}: giving up, {:#}", what, err);
            return Err(err);
        }
        if attempt == attempts {
            return Err(err.context(format!("{} failed {} time(s)", what, attempts)));
        }
        warn!(
            "{} failed (attempt {}/{}): {:#}; retrying in {:?}",
            what, attempt, attempts, err, delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
