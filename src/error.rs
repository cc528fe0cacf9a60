use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while tailing a log stream
#[derive(Error, Debug)]
pub enum TailError {
    /// Identity credential file is missing, unreadable or malformed
    #[error("credential error for {path}: {reason}")]
    Credential { path: String, reason: String },

    /// Connecting to a publisher endpoint failed
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    /// Disconnecting from a publisher endpoint failed
    #[error("disconnect from {endpoint} failed: {reason}")]
    Disconnect { endpoint: String, reason: String },

    /// Subscribing or unsubscribing a topic failed
    #[error("subscription change for topic {topic:?} failed: {reason}")]
    Subscribe { topic: String, reason: String },

    /// Transport-level receive failure
    #[error("receive error: {0}")]
    Receive(String),

    /// Generic transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// A required configuration value was not supplied
    #[error("missing required configuration: {0}")]
    MissingConfig(String),

    /// Configuration values that cannot be combined
    #[error("configuration conflict: {0}")]
    ConfigConflict(String),

    /// Operation not valid for the current consumption mode or state
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// The background receive task did not exit within the grace period
    #[error("receive task did not exit within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Result type alias for tail operations
pub type Result<T> = std::result::Result<T, TailError>;
