use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Something that wants to listen to a stopwatch.
///
/// Errors returned by any of these methods are contained at the dispatch
/// site: they are logged and never stop delivery to the other observers.
#[async_trait::async_trait]
pub trait Observer: Send + Sync + 'static {
    /// Called on every periodic time sample and on the final sample when
    /// the stopwatch stops. The stopwatch waits for all observers before
    /// handling the next sample, so this must not block; an implementation
    /// that forwards the value elsewhere has to buffer internally.
    async fn on_time(&self, elapsed: Duration) -> Result<(), BoxError>;

    /// Called once per reset. May block; the stopwatch waits for every
    /// observer to acknowledge the reset before `reset` returns.
    async fn on_reset(&self) -> Result<(), BoxError>;

    /// Called when the number of registered observers changes. Blocking,
    /// delivered at least once per change.
    async fn on_observer_count_changed(&self, count: usize) -> Result<(), BoxError>;
}
