use crate::timer::TimerId;
use thiserror::Error;

/// Errors raised by the timer service and registry.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("timer {0} is not known to the timer service")]
    UnknownTimer(TimerId),

    #[error("timer {0} already exists in the timer service")]
    DuplicateTimer(TimerId),

    #[error("host job queue is closed")]
    QueueClosed,

    #[error("failed to spawn timer service thread: {0}")]
    Spawn(#[from] std::io::Error),
}
