use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::{
    observer::Observer,
    stopwatch::{StopwatchBuilder, StopwatchId, clock::Clock},
};

/// A shared stopwatch that broadcasts its elapsed time to a dynamic set
/// of observers.
///
/// While running, an emission loop samples the elapsed time on a fixed
/// cadence and a paired dispatch loop fans each sample out to every
/// registered observer, in registration order. `stop` pauses the time and
/// guarantees the final sample has reached all observers before it
/// returns; a later `start` resumes from the paused time.
///
/// All operations are safe to call concurrently. Commands arriving in an
/// invalid state (`start` while running, `stop` while stopped, removing an
/// unknown observer) are silently ignored rather than reported as errors,
/// so racing controllers of the same stopwatch cannot fail each other.
pub struct Stopwatch {
    id: StopwatchId,
    emission_interval: Duration,
    running: AtomicBool,
    state: tokio::sync::Mutex<State>,
    shared: Arc<Shared>,
}

/// State machine guarded by the state mutex: holds the handles of the
/// current run cycle, if any. Start, stop and reset serialize on it, so
/// only one caller can win a transition.
#[derive(Default)]
struct State {
    cycle: Option<RunCycle>,
}

/// Handles of one run cycle. The channels behind them are created fresh
/// on every start, never reused across cycles.
struct RunCycle {
    stop_signal: async_channel::Sender<()>,
    dispatch: JoinHandle<()>,
}

/// The parts both loops and the callers touch.
struct Shared {
    observers: Mutex<Vec<Arc<dyn Observer>>>,
    times: Mutex<Times>,
    idle_since: Mutex<Option<Instant>>,
}

#[derive(Default, Clone, Copy)]
struct Times {
    /// Last computed elapsed time.
    current: Duration,
    /// Elapsed time frozen by the last stop, the anchor the next start
    /// resumes from. Only a completed stop transition updates it.
    stop: Duration,
}

/// One elapsed-time sample flowing from the emission loop to the dispatch
/// loop. `Last` carries the frozen stop value and terminates the cycle.
enum Sample {
    Tick(Duration),
    Last(Duration),
}

impl Stopwatch {
    pub fn builder() -> StopwatchBuilder {
        StopwatchBuilder::new()
    }

    pub(crate) fn new(id: StopwatchId, emission_interval: Duration) -> Self {
        Self {
            id,
            emission_interval,
            running: AtomicBool::new(false),
            state: tokio::sync::Mutex::new(State::default()),
            shared: Arc::new(Shared {
                observers: Mutex::new(Vec::new()),
                times: Mutex::new(Times::default()),
                // the observer set starts out empty
                idle_since: Mutex::new(Some(Instant::now())),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn emission_interval(&self) -> Duration {
        self.emission_interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Last computed elapsed time. Updated on every emitted sample while
    /// running, frozen once `stop` returns.
    pub fn current_time(&self) -> Duration {
        self.shared.times().current
    }

    /// Elapsed time at the last stop, zero after a reset.
    pub fn stop_time(&self) -> Duration {
        self.shared.times().stop
    }

    /// Instant since which the stopwatch has had no observers, `None`
    /// while at least one is registered. Consumed by eviction policies
    /// such as [`Registry::sweep_idle`](crate::registry::Registry::sweep_idle).
    pub fn idle_since(&self) -> Option<Instant> {
        *self.shared.idle()
    }

    /// Starts the stopwatch, resuming from the last stop time. Spawns the
    /// emission and dispatch loops for this run cycle. Already running is
    /// a no-op, so concurrent starts leave exactly one cycle alive.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if self.is_running() {
            return;
        }

        let resume_from = self.shared.times().stop;
        let started = Instant::now();
        let (samples_tx, samples_rx) = async_channel::bounded(1);
        let (stop_signal, stop_rx) = async_channel::bounded(1);

        tokio::spawn(emission_loop(
            Arc::clone(&self.shared),
            resume_from,
            started,
            self.emission_interval,
            samples_tx,
            stop_rx,
        ));
        let dispatch = tokio::spawn(dispatch_loop(Arc::clone(&self.shared), samples_rx));

        state.cycle = Some(RunCycle {
            stop_signal,
            dispatch,
        });
        self.running.store(true, Ordering::Release);
        debug!(id = %self.id, resume_from = ?resume_from, "stopwatch started");
    }

    /// Stops the stopwatch, pausing the time. Blocks until the final
    /// elapsed time has been computed and delivered to every observer, so
    /// a `stop_time` read right after this returns sees the final value.
    /// Not running is a no-op.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if !self.is_running() {
            return;
        }

        if let Some(cycle) = state.cycle.take() {
            let _ = cycle.stop_signal.send(()).await;
            // the dispatch loop only ends after fanning out the final sample
            let _ = cycle.dispatch.await;
        }
        self.running.store(false, Ordering::Release);
        debug!(id = %self.id, stop_time = ?self.stop_time(), "stopwatch stopped");
    }

    /// Resets the elapsed time to zero, stopping the stopwatch first if it
    /// is running. Every observer is told about the reset and the call
    /// only returns once all of them have acknowledged it.
    pub async fn reset(&self) {
        self.stop().await;

        *self.shared.times() = Times::default();
        for observer in self.shared.snapshot() {
            if let Err(err) = observer.on_reset().await {
                warn!(id = %self.id, error = %err, "observer failed to handle reset");
            }
        }
        debug!(id = %self.id, "stopwatch reset");
    }

    /// Registers an observer. It will receive every sample emitted from
    /// now on, after the already registered observers.
    pub async fn add(&self, observer: Arc<dyn Observer>) {
        let count = {
            let mut observers = self.shared.lock_observers();
            observers.push(observer);
            *self.shared.idle() = None;
            observers.len()
        };
        self.notify_count_changed(count).await;
    }

    /// Unregisters an observer by identity. Unknown observers are ignored.
    pub async fn remove(&self, observer: &Arc<dyn Observer>) {
        let count = {
            let mut observers = self.shared.lock_observers();
            let before = observers.len();
            observers.retain(|registered| !same_observer(registered, observer));
            if observers.len() == before {
                return;
            }
            if observers.is_empty() {
                *self.shared.idle() = Some(Instant::now());
            }
            observers.len()
        };
        self.notify_count_changed(count).await;
    }

    pub fn observer_count(&self) -> usize {
        self.shared.lock_observers().len()
    }

    async fn notify_count_changed(&self, count: usize) {
        for observer in self.shared.snapshot() {
            if let Err(err) = observer.on_observer_count_changed(count).await {
                warn!(id = %self.id, error = %err, "observer failed to handle count change");
            }
        }
    }
}

/// Observer identity ignores trait object metadata, two handles to the
/// same allocation always compare equal.
fn same_observer(a: &Arc<dyn Observer>, b: &Arc<dyn Observer>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl Shared {
    fn lock_observers(&self) -> MutexGuard<'_, Vec<Arc<dyn Observer>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn times(&self) -> MutexGuard<'_, Times> {
        self.times.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn idle(&self) -> MutexGuard<'_, Option<Instant>> {
        self.idle_since.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Observers registered right now, in registration order. Dispatch
    /// works on this snapshot so observer callbacks run without the lock.
    fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.lock_observers().clone()
    }

    async fn fan_out_time(&self, elapsed: Duration) {
        for observer in self.snapshot() {
            if let Err(err) = observer.on_time(elapsed).await {
                warn!(error = %err, "observer failed to handle time sample, skipping it");
            }
        }
    }
}

/// Samples the elapsed time on the configured cadence and feeds the
/// dispatch loop. On the stop signal it freezes the final elapsed time as
/// the stop time, emits it as the last sample and terminates.
async fn emission_loop(
    shared: Arc<Shared>,
    resume_from: Duration,
    started: Instant,
    cadence: Duration,
    samples: async_channel::Sender<Sample>,
    stop_signal: async_channel::Receiver<()>,
) {
    let mut clock = Clock::new(cadence);
    loop {
        tokio::select! {
            _ = clock.tick() => {
                let elapsed = resume_from + started.elapsed();
                shared.times().current = elapsed;
                trace!(?elapsed, "time sample");
                if samples.send(Sample::Tick(elapsed)).await.is_err() {
                    return;
                }
            }
            _ = stop_signal.recv() => {
                let elapsed = resume_from + started.elapsed();
                *shared.times() = Times { current: elapsed, stop: elapsed };
                let _ = samples.send(Sample::Last(elapsed)).await;
                return;
            }
        }
    }
}

/// Fans every sample out to the observers registered at that moment.
/// Terminates after delivering the last sample of the cycle.
async fn dispatch_loop(shared: Arc<Shared>, samples: async_channel::Receiver<Sample>) {
    while let Ok(sample) = samples.recv().await {
        match sample {
            Sample::Tick(elapsed) => shared.fan_out_time(elapsed).await,
            Sample::Last(elapsed) => {
                shared.fan_out_time(elapsed).await;
                return;
            }
        }
    }
}
