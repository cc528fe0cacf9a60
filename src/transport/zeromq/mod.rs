// src/transport/zeromq/mod.rs

//! ZeroMQ transport using the `zmq` crate (libzmq bindings).
//!
//! Sockets are `SUB` sockets secured with CURVE: the client key pair is
//! applied with `ZMQ_CURVE_PUBLICKEY`/`ZMQ_CURVE_SECRETKEY` and the
//! forwarder's key is pinned with `ZMQ_CURVE_SERVERKEY`. libzmq performs
//! the handshake and silently refuses publishers with another identity.
//!
//! libzmq sockets block the calling thread. To keep `recv_frame`
//! cancel-safe and off the runtime's worker threads, frames are taken
//! with `DONTWAIT` and the task sleeps when the socket has nothing
//! queued. The sleep doubles while the socket stays idle, from 1ms up
//! to 50ms, and resets on the next receive call.

mod transport;

pub use transport::create_transport;
