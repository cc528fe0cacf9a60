//! Runtime settings for a [`LogTail`](crate::LogTail).
//!
//! Selection of what to tail (endpoints, topics, credentials) is passed
//! to the constructor; this type only carries how the stream is consumed
//! and shut down.

use std::time::Duration;

/// Default capacity of the push-mode message channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default time teardown waits for the background receive task.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Consumption and shutdown settings.
///
/// # Example
///
/// ```
/// use logtalez::TailConfig;
/// use std::time::Duration;
///
/// let config = TailConfig::default()
///     .with_topic_delimiter(":")
///     .with_channel_capacity(256)
///     .with_shutdown_grace(Duration::from_millis(250));
/// assert_eq!(config.topic_delimiter.as_deref(), Some(":"));
/// ```
#[derive(Debug, Clone)]
pub struct TailConfig {
    // ---
    /// Separator between topic prefix and payload in a received frame.
    ///
    /// `None` (or an empty string) delivers frames unmodified.
    pub topic_delimiter: Option<String>,

    /// Messages buffered between the push-mode pump and its consumer.
    ///
    /// When full, the pump stops receiving until the consumer catches
    /// up. Values below 1 are treated as 1.
    pub channel_capacity: usize,

    /// Upper bound on how long teardown waits for the push-mode pump to
    /// unsubscribe, disconnect and exit.
    pub shutdown_grace: Duration,
}

impl Default for TailConfig {
    /// - `topic_delimiter`: none
    /// - `channel_capacity`: 64
    /// - `shutdown_grace`: 100ms
    fn default() -> Self {
        Self {
            topic_delimiter: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl TailConfig {
    /// Strip everything up to and including `delimiter` from pulled payloads.
    pub fn with_topic_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.topic_delimiter = Some(delimiter.into());
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// The configured delimiter, with `Some("")` folded into `None`.
    pub fn delimiter(&self) -> Option<&str> {
        self.topic_delimiter.as_deref().filter(|d| !d.is_empty())
    }
}
