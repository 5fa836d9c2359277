use std::time::Duration;
use tokio::time::Instant;
use tokio::time::{Interval, interval_at};

pub(crate) struct Clock {
    inner: Interval,
}

impl Clock {
    /// A clock whose first tick fires one cadence from now.
    pub(crate) fn new(cadence: Duration) -> Self {
        let inner = interval_at(Instant::now() + cadence, cadence);
        Self { inner }
    }

    pub(crate) async fn tick(&mut self) {
        self.inner.tick().await;
    }
}
