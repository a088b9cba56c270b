//! Bounded wait for the loader's sentinel file.

use anyhow::Result;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::ModError;
use crate::runtime::Runtime;

pub const DEFAULT_SENTINEL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Clonable cancellation signal shared between a deployment and its caller.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SentinelWait {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SENTINEL_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SentinelWait {
    /// Poll until `sentinel` exists.
    ///
    /// Fails with [`ModError::DeploymentTimeout`] once `timeout` has passed
    /// and with [`ModError::DeploymentCancelled`] when `cancel` fires.
    #[tracing::instrument(skip(self, runtime, cancel))]
    pub async fn wait<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        sentinel: &Path,
        cancel: &CancelToken,
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            if runtime.exists(sentinel) {
                debug!("Sentinel {:?} found after {:?}", sentinel, started.elapsed());
                return Ok(());
            }
            if cancel.is_cancelled() {
                return Err(ModError::DeploymentCancelled {
                    sentinel: sentinel.to_path_buf(),
                }
                .into());
            }
            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(ModError::DeploymentTimeout {
                    sentinel: sentinel.to_path_buf(),
                    waited,
                }
                .into());
            }

            let nap = self.poll_interval.min(self.timeout - waited);
            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    fn quick() -> SentinelWait {
        SentinelWait {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_wait_returns_once_sentinel_appears() {
        let mut runtime = MockRuntime::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        runtime
            .expect_exists()
            .returning(move |_| counter.fetch_add(1, Ordering::SeqCst) >= 2);

        quick()
            .wait(&runtime, Path::new("/game/doorstop_config.ini"), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("doorstop_config.ini");

        let err = quick()
            .wait(&RealRuntime, &sentinel, &CancelToken::new())
            .await
            .unwrap_err();

        match classify(&err) {
            Some(ModError::DeploymentTimeout { sentinel: path, waited }) => {
                assert_eq!(path, &sentinel);
                assert!(*waited >= Duration::from_millis(200));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_is_cancellable() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("doorstop_config.ini");
        let cancel = CancelToken::new();
        let wait = SentinelWait {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = wait.wait(&RealRuntime, &sentinel, &cancel).await.unwrap_err();

        assert!(matches!(
            classify(&err),
            Some(ModError::DeploymentCancelled { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
