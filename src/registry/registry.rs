use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::{
    error::StopwatchError,
    stopwatch::{Stopwatch, StopwatchBuilder, StopwatchId},
};

pub const DEFAULT_IDLE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Maps session identifiers to live stopwatches and evicts the ones
/// nobody watches anymore.
pub struct Registry {
    watches: DashMap<StopwatchId, Arc<Stopwatch>>,
    idle_after: Duration,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_AFTER)
    }
}

impl Registry {
    /// `idle_after` is how long a stopwatch may sit without observers
    /// before a sweep evicts it.
    pub fn new(idle_after: Duration) -> Self {
        Self {
            watches: DashMap::new(),
            idle_after,
        }
    }

    /// Builds a stopwatch from the given builder and registers it under
    /// its id.
    pub fn create(&self, builder: StopwatchBuilder) -> Result<Arc<Stopwatch>, StopwatchError> {
        let stopwatch = Arc::new(builder.build()?);
        self.watches
            .insert(stopwatch.id().to_owned(), Arc::clone(&stopwatch));
        debug!(id = %stopwatch.id(), "stopwatch registered");
        Ok(stopwatch)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Stopwatch>> {
        self.watches.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Stopwatch>> {
        self.watches.remove(id).map(|(_, stopwatch)| stopwatch)
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Removes every stopwatch that has had zero observers for longer
    /// than the idle threshold. Returns how many were evicted.
    pub fn sweep_idle(&self) -> usize {
        let now = Instant::now();
        let stale: Vec<StopwatchId> = self
            .watches
            .iter()
            .filter(|entry| {
                let stopwatch = entry.value();
                stopwatch.observer_count() == 0
                    && stopwatch
                        .idle_since()
                        .is_some_and(|idle| now.duration_since(idle) > self.idle_after)
            })
            .map(|entry| entry.key().clone())
            .collect();

        for id in &stale {
            self.watches.remove(id);
            debug!(%id, "idle stopwatch evicted");
        }
        stale.len()
    }

    /// Sweeps on a fixed period, forever. Meant to be spawned by the
    /// embedding process and aborted on shutdown.
    pub async fn run_sweeper(&self, period: Duration) {
        loop {
            tokio::time::sleep(period).await;
            self.sweep_idle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{BoxError, Observer};

    struct NullObserver;

    #[async_trait::async_trait]
    impl Observer for NullObserver {
        async fn on_time(&self, _elapsed: Duration) -> Result<(), BoxError> {
            Ok(())
        }

        async fn on_reset(&self) -> Result<(), BoxError> {
            Ok(())
        }

        async fn on_observer_count_changed(&self, _count: usize) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn created_stopwatches_are_retrievable() -> anyhow::Result<()> {
        let registry = Registry::default();
        let stopwatch = registry.create(StopwatchBuilder::new())?;

        assert_eq!(registry.len(), 1);
        let found = registry.get(stopwatch.id()).expect("stopwatch not found");
        assert_eq!(found.id(), stopwatch.id());
        assert!(registry.get("no-such-id").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn sweep_evicts_only_idle_stopwatches() -> anyhow::Result<()> {
        let registry = Registry::new(Duration::from_millis(50));

        let watched = registry.create(StopwatchBuilder::new())?;
        watched.add(Arc::new(NullObserver)).await;
        let abandoned = registry.create(StopwatchBuilder::new())?;
        let abandoned_id = abandoned.id().to_owned();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(registry.sweep_idle(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&abandoned_id).is_none());
        assert!(registry.get(watched.id()).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn stopwatch_becomes_sweepable_once_abandoned() -> anyhow::Result<()> {
        let registry = Registry::new(Duration::from_millis(50));
        let stopwatch = registry.create(StopwatchBuilder::new())?;

        let observer: Arc<dyn Observer> = Arc::new(NullObserver);
        stopwatch.add(Arc::clone(&observer)).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        // still watched, the earlier idle period does not count
        assert_eq!(registry.sweep_idle(), 0);

        stopwatch.remove(&observer).await;
        assert_eq!(registry.sweep_idle(), 0);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(registry.sweep_idle(), 1);
        assert!(registry.is_empty());
        Ok(())
    }
}
