//! Domain layer public interface.
//!
//! Transport-independent abstractions the client is written against.
//! Concrete sockets live under `src/transport/`.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod socket;

pub use socket::{
    //
    Frame,
    SocketPtr,
    SubscriberSocket,
    Transport,
    TransportPtr,
};
