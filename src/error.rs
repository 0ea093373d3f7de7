use std::io;

use thiserror::Error;

/// Error a command completes with when it does not succeed.
///
/// Commands never surface these from `submit` or `close`; callers observe them
/// only through the command's `CompletionHandle`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MiniRedisCommandError {
    /// The disconnected buffer was full when the command had to be queued.
    #[error("request queue size exceeded: {capacity}, commands are not accepted until the queue size drops")]
    QueueFull { capacity: usize },

    #[error("currently not connected, commands are rejected")]
    NotConnected,

    #[error("endpoint is closed")]
    EndpointClosed,

    #[error("command was cancelled")]
    Cancelled,

    /// The writer refused the command synchronously. The writer's error is
    /// available as the `source()`.
    #[error("failed to write command")]
    Write(#[from] MiniRedisWriteError),

    /// The server answered with an error frame.
    #[error("server error: {0}")]
    Server(String),
}

/// Synchronous failure of a `CommandWriter`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MiniRedisWriteError {
    #[error("connection reset by peer")]
    Disconnect,

    #[error("transport buffer is full")]
    Backpressure,

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<io::Error> for MiniRedisWriteError {
    fn from(err: io::Error) -> Self {
        MiniRedisWriteError::Io(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum MiniRedisConfigError {
    #[error("request queue size must be positive, got {0}")]
    InvalidQueueSize(usize),

    #[error("transport buffer size must be positive, got {0}")]
    InvalidBufferSize(usize),

    #[error("unknown disconnected behavior: {0}")]
    UnknownBehavior(String),

    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}
