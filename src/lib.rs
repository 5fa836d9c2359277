//! A shared, observable stopwatch.
//!
//! One logical stopwatch, many concurrent observers: any number of callers
//! can start, pause, resume and reset the same [`Stopwatch`] while every
//! registered [`Observer`] receives elapsed-time samples in order. A
//! [`Registry`] keeps stopwatches addressable by session id and evicts the
//! ones nobody watches anymore.

pub mod error;
pub mod observer;
pub mod registry;
pub mod stopwatch;

pub use error::StopwatchError;
pub use observer::{BoxError, ControlCommand, Observer, SinkObserver, TimeSink};
pub use registry::Registry;
pub use stopwatch::{
    DEFAULT_EMISSION_INTERVAL, IdSource, Stopwatch, StopwatchBuilder, StopwatchId, UuidIds,
};
