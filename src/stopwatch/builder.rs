use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::StopwatchError,
    stopwatch::{IdSource, Stopwatch, UuidIds},
};

pub const DEFAULT_EMISSION_INTERVAL: Duration = Duration::from_millis(150);

#[derive(Clone)]
pub struct StopwatchBuilder {
    emission_interval: Duration,
    ids: Arc<dyn IdSource>,
}

impl Default for StopwatchBuilder {
    fn default() -> Self {
        Self {
            emission_interval: DEFAULT_EMISSION_INTERVAL,
            ids: Arc::new(UuidIds),
        }
    }
}

impl StopwatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cadence of the periodic elapsed-time samples, fixed for the
    /// lifetime of the stopwatch.
    pub fn with_emission_interval(mut self, interval: Duration) -> Self {
        self.emission_interval = interval;
        self
    }

    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn build(self) -> Result<Stopwatch, StopwatchError> {
        if self.emission_interval.is_zero() {
            return Err(StopwatchError::InvalidInterval);
        }
        Ok(Stopwatch::new(
            self.ids.generate(),
            self.emission_interval,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stopwatch::StopwatchId;

    struct FixedIds;

    impl IdSource for FixedIds {
        fn generate(&self) -> StopwatchId {
            "watch-1".to_owned()
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = StopwatchBuilder::new()
            .with_emission_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(StopwatchError::InvalidInterval)));
    }

    #[test]
    fn id_source_is_injectable() {
        let stopwatch = StopwatchBuilder::new()
            .with_id_source(Arc::new(FixedIds))
            .build()
            .unwrap();
        assert_eq!(stopwatch.id(), "watch-1");
    }

    #[test]
    fn defaults_apply() {
        let stopwatch = StopwatchBuilder::new().build().unwrap();
        assert_eq!(stopwatch.emission_interval(), DEFAULT_EMISSION_INTERVAL);
        assert!(!stopwatch.id().is_empty());
    }
}
