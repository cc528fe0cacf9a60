// src/transport/memory/mod.rs

//! In-memory transport implementation.
//!
//! A pure in-process stand-in for a network of syslog forwarders. It is
//! used by the crate's own tests and demos, and defines the reference
//! behaviour other transports approximate:
//!
//! - A publisher is bound to an endpoint together with its server
//!   credential. Connecting to an unbound endpoint fails.
//! - A subscriber that pins a different server key, or presents a
//!   client key the publisher does not allow, fails the handshake
//!   silently: `connect()` returns `Ok` and nothing is ever delivered.
//! - Topic filtering is prefix matching on the first frame.
//! - A publisher never blocks on a slow subscriber; once a
//!   subscriber's queue is full further messages to it are dropped.
//!
//! ## Non-Goals
//!
//! No wire format, no real cryptography, no reconnect logic.

mod transport;

pub use transport::{
    //
    create_memory_transport,
    create_memory_transport_with_hub,
    MemoryHub,
    MemoryPublisher,
};
