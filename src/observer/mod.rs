pub mod control;
pub mod observer;
pub mod sink;

pub use control::ControlCommand;
pub use observer::{BoxError, Observer};
pub use sink::{SinkObserver, TimeSink};
