use std::time::Duration;
use std::{fmt, sync::Arc};

use tokio::sync::Notify;
use tokio::time::timeout;

/// Upper bound for any sink state a test waits on.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification fired by a [`crate::test_utils::test_sink_wrapper::TestSinkWrapper`] once a
/// registered condition holds.
#[derive(Clone)]
pub struct TimedNotify {
    notify: Arc<Notify>,
}

impl TimedNotify {
    pub fn new(notify: Arc<Notify>) -> Self {
        Self { notify }
    }

    /// Waits for the notification.
    ///
    /// # Panics
    ///
    /// Panics if [`DEFAULT_NOTIFY_TIMEOUT`] elapses first.
    pub async fn notified(&self) {
        if timeout(DEFAULT_NOTIFY_TIMEOUT, self.notify.notified())
            .await
            .is_err()
        {
            panic!(
                "sink condition not reached within {DEFAULT_NOTIFY_TIMEOUT:?}, \
                 the engine stopped delivering or the condition is wrong"
            );
        }
    }
}

impl fmt::Debug for TimedNotify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedNotify").finish_non_exhaustive()
    }
}
