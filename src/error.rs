//! Error types for the STRAND runtime.

/// Result type alias for STRAND operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the STRAND runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The task's cancel flag was set before its result was written.
    #[error("task was cancelled")]
    TaskCancelled,

    /// The computation frame was torn down before a result could be read.
    #[error("coroutine frame was destroyed")]
    CoroutineDestroyed,

    /// Operation on a consumed handle or an already-read result.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The computation failed with a host-level fault (a panic).
    #[error("task failed: {0}")]
    UnknownError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Executor error
    #[error("executor error: {0}")]
    Executor(String),

    /// Runtime not enabled
    #[error("runtime not enabled - call strand_rs::enable_runtime() first")]
    NotEnabled,

    /// Runtime already initialized
    #[error("runtime already initialized")]
    AlreadyInitialized,
}

impl Error {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create an executor error
    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    /// Create an invalid-operation error
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        Error::InvalidOperation(msg.into())
    }

    /// Create an unknown error from a fault description
    pub fn unknown<S: Into<String>>(msg: S) -> Self {
        Error::UnknownError(msg.into())
    }
}
