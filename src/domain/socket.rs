// src/domain/socket.rs

//! Subscriber socket domain abstractions.
//!
//! The pub/sub transport and its encryption handshake are black boxes to
//! the client. This module defines the seam: a [`Transport`] hands out
//! [`SubscriberSocket`]s, and a socket knows how to pin identities,
//! filter topics, attach to publishers and deliver frames.
//!
//! The in-memory transport is the reference implementation of these
//! semantics; the ZeroMQ transport maps them onto a libzmq SUB socket.

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    // ---
    CurveKey,
    Endpoint,
    IdentityCredential,
    Result,
    Topic,
};

/// One segment of a possibly multi-frame logical message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Frame contents.
    pub data: Bytes,

    /// `true` when further frames of the same message follow.
    pub more: bool,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>, more: bool) -> Self {
        Self {
            data: data.into(),
            more,
        }
    }
}

/// A subscriber-mode socket.
///
/// A socket is owned by exactly one task at a time, so methods take
/// `&mut self` and the trait only requires `Send`.
///
/// # Cancellation
///
/// [`recv_frame`](SubscriberSocket::recv_frame) must be cancel-safe:
/// dropping the future before it resolves must not lose a frame. The
/// push-mode pump races it against shutdown commands.
#[async_trait::async_trait]
pub trait SubscriberSocket: Send {
    // ---
    /// Apply the client key pair and pin the expected server public key.
    ///
    /// Must be called before [`connect`](SubscriberSocket::connect).
    /// Connections to a publisher presenting any other key fail the
    /// handshake inside the transport.
    async fn set_curve(&mut self, client: &IdentityCredential, server_key: &CurveKey)
        -> Result<()>;

    /// Add a topic filter. Duplicates are counted, like libzmq.
    async fn subscribe(&mut self, topic: &Topic) -> Result<()>;

    /// Remove one occurrence of a topic filter.
    async fn unsubscribe(&mut self, topic: &Topic) -> Result<()>;

    /// Attach to a publisher.
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<()>;

    /// Detach from a previously connected publisher.
    async fn disconnect(&mut self, endpoint: &Endpoint) -> Result<()>;

    /// Receive the next frame, waiting until one arrives.
    async fn recv_frame(&mut self) -> Result<Frame>;

    /// Release the socket. Further calls are not supported.
    async fn close(&mut self) -> Result<()>;
}

/// Owned, type-erased socket.
pub type SocketPtr = Box<dyn SubscriberSocket>;

/// A source of subscriber sockets.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in log lines (`"memory"`, `"zmq"`).
    fn name(&self) -> &str;

    /// Create a fresh, unconnected subscriber socket.
    async fn subscriber(&self) -> Result<SocketPtr>;
}

/// Shared transport pointer.
///
/// Cheap to clone; clones share the underlying context or hub.
pub type TransportPtr = Arc<dyn Transport>;
