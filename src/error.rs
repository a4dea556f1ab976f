//! Error types for hostpush

use thiserror::Error;

/// Main error type for hostpush
#[derive(Debug, Error)]
pub enum PushError {
    /// Configuration file unreadable or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// SSH connection could not be established
    #[error("SSH connection error: {0}")]
    Connection(String),

    /// Password authentication failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A `{{name}}` placeholder referenced a variable absent from the
    /// merged mapping
    #[error("no variable with key: {key}")]
    MissingVariable { key: String },

    /// A shell command exited with a non-zero status
    #[error("command `{command}` exited with status {exit_status}")]
    CommandFailed { command: String, exit_status: u32 },

    /// File transfer to the remote host failed
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Command type declared in the schema but not implemented
    #[error("Unsupported command: {0}")]
    Unsupported(String),

    /// A spawned host task panicked or was cancelled before finishing
    #[error("Task failed: {0}")]
    Task(String),

    /// A host's command sequence aborted
    #[error("host {host} failed: {source}")]
    HostFailed {
        host: String,
        #[source]
        source: Box<PushError>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using PushError
pub type Result<T> = std::result::Result<T, PushError>;

impl PushError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        PushError::Config(msg.into())
    }

    /// Create a connection error from a string
    pub fn connection(msg: impl Into<String>) -> Self {
        PushError::Connection(msg.into())
    }

    /// Create an authentication error from a string
    pub fn auth(msg: impl Into<String>) -> Self {
        PushError::Authentication(msg.into())
    }

    /// Create a transfer error from a string
    pub fn transfer(msg: impl Into<String>) -> Self {
        PushError::Transfer(msg.into())
    }

    /// Wrap an error as a per-host failure for dispatcher diagnostics
    pub fn for_host(self, host: impl Into<String>) -> Self {
        PushError::HostFailed {
            host: host.into(),
            source: Box::new(self),
        }
    }
}
