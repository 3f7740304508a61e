//! Hardware watchdog feeding

use std::time::Duration;

use tracing::{debug, trace};

/// Shortest timeout a watchdog is armed with
pub const MIN_TIMEOUT: Duration = Duration::from_secs(5);
/// Default feeding period
pub const DEFAULT_FEED_INTERVAL: Duration = Duration::from_secs(2);

/// A watchdog timer that resets the device unless fed in time
pub trait Watchdog: Send {
    /// Arm with `timeout`
    fn arm(&mut self, timeout: Duration);

    fn feed(&mut self);
}

/// Arm `watchdog` and feed it every `interval`, forever
pub async fn feed_forever(mut watchdog: Box<dyn Watchdog>, timeout: Duration, interval: Duration) {
    let timeout = timeout.max(MIN_TIMEOUT);
    let interval = interval.max(Duration::from_millis(1));
    debug!("Arming watchdog: timeout {:?}, feeding every {:?}", timeout, interval);
    watchdog.arm(timeout);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        watchdog.feed();
    }
}

/// Watchdog with nothing behind it; feeds are traced
#[derive(Debug, Default)]
pub struct LogWatchdog {
    feeds: u64,
}

impl LogWatchdog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Watchdog for LogWatchdog {
    fn arm(&mut self, timeout: Duration) {
        debug!("Watchdog armed ({:?})", timeout);
    }

    fn feed(&mut self) {
        self.feeds += 1;
        trace!("Watchdog fed ({} times)", self.feeds);
    }
}
