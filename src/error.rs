use thiserror::Error;

#[derive(Error, Debug)]
pub enum StopwatchError {
    #[error("emission interval must be greater than zero")]
    InvalidInterval,
    #[error("sink closed, frames can no longer be delivered")]
    SinkClosed,
}
