use std::time::Duration;

use async_channel::TrySendError;
use tracing::warn;

use crate::{
    error::StopwatchError,
    observer::{BoxError, Observer},
};

/// Outbound side of a transport adapter: anything that can carry a text
/// frame to a remote subscriber, e.g. a websocket connection.
#[async_trait::async_trait]
pub trait TimeSink: Send + Sync + 'static {
    async fn send_text(&self, frame: String) -> Result<(), BoxError>;
}

/// Observer that forwards time samples to a [`TimeSink`] as text frames.
///
/// Time frames are `time:<ms>`; a reset is reported as `time:0`; observer
/// count changes as `watchers:<count>`. Samples go through a bounded buffer
/// so `on_time` never blocks the stopwatch: when the buffer is full the
/// newest sample is dropped, a remote subscriber only misses one
/// intermediate reading and catches up on the next.
pub struct SinkObserver {
    frames: async_channel::Sender<String>,
}

impl SinkObserver {
    /// Creates the observer and spawns the forwarding task that drains
    /// buffered frames into the sink. The task stops on the first sink
    /// error or when the observer is dropped.
    pub fn spawn<S: TimeSink>(sink: S) -> Self {
        let (frames, buffered) = async_channel::bounded(1);
        tokio::spawn(forward_frames(sink, buffered));
        Self { frames }
    }
}

async fn forward_frames<S: TimeSink>(sink: S, buffered: async_channel::Receiver<String>) {
    while let Ok(frame) = buffered.recv().await {
        if let Err(err) = sink.send_text(frame).await {
            warn!(error = %err, "failed to write frame to sink, stopping forwarder");
            return;
        }
    }
}

#[async_trait::async_trait]
impl Observer for SinkObserver {
    async fn on_time(&self, elapsed: Duration) -> Result<(), BoxError> {
        let frame = format!("time:{}", elapsed.as_millis());
        match self.frames.try_send(frame) {
            // a full buffer drops the newest sample, never blocks
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(StopwatchError::SinkClosed.into()),
        }
    }

    async fn on_reset(&self) -> Result<(), BoxError> {
        self.frames
            .send("time:0".to_owned())
            .await
            .map_err(|_| StopwatchError::SinkClosed.into())
    }

    async fn on_observer_count_changed(&self, count: usize) -> Result<(), BoxError> {
        self.frames
            .send(format!("watchers:{count}"))
            .await
            .map_err(|_| StopwatchError::SinkClosed.into())
    }
}
