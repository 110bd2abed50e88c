//! Error types for the gatehouse core.

use thiserror::Error;

/// Main error type for gatehouse operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The bounded queue refused a submission at capacity.
    ///
    /// This is the only failure the core originates itself. Callers must
    /// treat it as "try again later" or drop the request; it is never
    /// retried internally.
    #[error("Request queue is full ({waiting} tasks already waiting)")]
    QueueFull {
        /// Number of tasks waiting when the submission was refused
        waiting: usize,
    },

    /// Allocation of a pooled handle failed
    #[error("Resource allocation error: {0}")]
    Allocation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A failure from a caller-supplied transport, carried through the core
    /// with its `Display` and `source` chain untouched
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wrap a transport failure for transit through the core.
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport(Box::new(err))
    }
}

/// Result type alias for gatehouse operations.
pub type Result<T> = std::result::Result<T, Error>;
