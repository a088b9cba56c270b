//! Download progress reporting.

/// Receives percentage-complete updates while a download streams.
///
/// Calls happen inline between chunks, so implementations should return
/// quickly; they cannot influence the transfer.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, percent: u8);
}

impl<F> ProgressObserver for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent)
    }
}

/// Turns byte counts into de-duplicated percentage updates.
pub(crate) struct ProgressTracker<'a> {
    total: Option<u64>,
    observer: Option<&'a dyn ProgressObserver>,
    last: Option<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(total: Option<u64>, observer: Option<&'a dyn ProgressObserver>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            observer,
            last: None,
        }
    }

    pub(crate) fn advance(&mut self, received: u64) {
        let (Some(total), Some(observer)) = (self.total, self.observer) else {
            return;
        };
        let percent = (received.min(total) * 100 / total) as u8;
        if self.last != Some(percent) {
            self.last = Some(percent);
            observer.on_progress(percent);
        }
    }
}
