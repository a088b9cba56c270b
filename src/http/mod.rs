//! The shared HTTP client, download progress and retry classification.

mod client;
mod progress;
mod retry;

pub use client::{HttpClient, is_not_found};
pub use progress::ProgressObserver;
pub use retry::{
    MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, check_retryable, classify_status,
    is_retryable_error, with_retry,
};
