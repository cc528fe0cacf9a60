//! Tail encrypted syslog streams published over pub/sub transports.
//!
//! Remote syslog forwarders publish every record under a `host.program`
//! topic on a CURVE-secured publish socket. This crate subscribes to the
//! hosts and programs an operator selects, authenticates both ends with
//! certificate files, and hands back the log lines with the transport
//! framing and topic prefix removed.
//!
//! ```no_run
//! # async fn example(transport: logtalez::TransportPtr) -> logtalez::Result<()> {
//! use logtalez::LogTailBuilder;
//!
//! let mut tail = LogTailBuilder::new()
//!     .transport(transport)
//!     .endpoints("tcp://logs1.example.com:24444,tcp://logs2.example.com:24444")
//!     .hosts("web1,web2")
//!     .programs("nginx")
//!     .server_cert("/etc/curve/server_cert")
//!     .client_cert("/etc/curve/client_cert")
//!     .topic_delimiter(":")
//!     .build()
//!     .await?;
//!
//! loop {
//!     let line = tail.read_payload().await?;
//!     println!("{}", String::from_utf8_lossy(&line));
//! }
//! # }
//! ```

// Import all sub modules once...
mod client;
mod credential;
mod domain;
mod error;
mod macros;
mod tail_builder;
mod tail_config;
mod topics;
mod transport;

pub mod payload;

pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use client::{LogMessage, LogTail, MessageStream};
pub use tail_builder::LogTailBuilder;
pub use tail_config::{TailConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_SHUTDOWN_GRACE};

pub use credential::{CurveKey, IdentityCredential, SecretKey};
pub use error::{Result, TailError};

pub use topics::{
    //
    build_endpoints,
    build_topic_list,
    build_topics,
    Endpoint,
    Topic,
};

// --- public re-exports
pub use domain::{
    //
    Frame,
    SocketPtr,
    SubscriberSocket,
    Transport,
    TransportPtr,
};

pub use transport::{
    //
    create_memory_transport,
    create_memory_transport_with_hub,
    MemoryHub,
    MemoryPublisher,
};

#[cfg(feature = "transport_zmq")]
pub use transport::create_zmq_transport;
