pub mod builder;
mod clock;
pub mod ids;
pub mod stopwatch;

pub type StopwatchId = String;

pub use builder::{DEFAULT_EMISSION_INTERVAL, StopwatchBuilder};
pub use ids::{IdSource, UuidIds};
pub use stopwatch::Stopwatch;
