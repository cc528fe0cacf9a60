// src/client/reader.rs

//! Pull-model consumption.

use bytes::Bytes;

use super::LogTail;
use crate::payload::strip_topic;
use crate::{Result, SubscriberSocket};

impl LogTail {
    // ---

    /// Receive one log record into `buf`.
    ///
    /// The payload (frame with its topic prefix removed) is copied to the
    /// start of `buf`. The return value is always the **payload length**,
    /// even when `buf` is shorter and only `buf.len()` bytes were copied.
    /// Size `buf` for the largest expected record (64 KiB is customary
    /// for syslog), or use [`read_payload`](Self::read_payload) to avoid
    /// truncation altogether.
    ///
    /// # Errors
    ///
    /// - [`TailError::Receive`](crate::TailError::Receive) from the transport
    /// - [`TailError::InvalidMode`](crate::TailError::InvalidMode) in push
    ///   mode or after teardown
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // ---
        let payload = self.read_payload().await?;

        let copied = payload.len().min(buf.len());
        buf[..copied].copy_from_slice(&payload[..copied]);

        Ok(payload.len())
    }

    /// Receive one log record and return its whole payload.
    ///
    /// Leading frames of a multi-frame message are discarded; the last
    /// frame is searched for the configured topic delimiter and
    /// everything after its first occurrence is returned. Without a
    /// delimiter, or when it does not occur, the frame is returned as is.
    pub async fn read_payload(&mut self) -> Result<Bytes> {
        // ---
        let socket = self.pull_socket("read")?;
        let frame = recv_last_frame(socket.as_mut()).await?;

        Ok(strip_topic(&frame, self.config.delimiter()))
    }
}

/// Receive a logical message and keep only its final frame.
///
/// A receive error mid-message drops the frames read so far.
async fn recv_last_frame(socket: &mut dyn SubscriberSocket) -> Result<Bytes> {
    // ---
    let mut frame = socket.recv_frame().await?;
    while frame.more {
        frame = socket.recv_frame().await?;
    }
    Ok(frame.data)
}
