//! Transport implementations.
//!
//! Concrete implementations of the domain-level `Transport` and
//! `SubscriberSocket` traits. Optional transports are hidden behind
//! feature flags and exposed only through constructor functions.
//!
//! Client code must not depend on transport-specific types.

mod memory;

#[cfg(feature = "transport_zmq")]
mod zeromq;

pub use memory::{
    //
    create_memory_transport,
    create_memory_transport_with_hub,
    MemoryHub,
    MemoryPublisher,
};

#[cfg(feature = "transport_zmq")]
pub use zeromq::create_transport as create_zmq_transport;
