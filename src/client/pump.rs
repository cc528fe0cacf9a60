// src/client/pump.rs

//! Push-model consumption.
//!
//! A single background task (the pump) owns the socket and loops:
//! receive every frame of one logical message, then publish the frames
//! onto a bounded channel. When the channel is full the pump waits, and
//! while it waits it does not receive; the transport's own queue absorbs
//! (or drops) whatever arrives in the meantime.
//!
//! Both waits are raced against a stop signal, so teardown never depends
//! on the consumer draining the channel or on a message arriving. When
//! the pump exits it hands the socket back through its `JoinHandle` so
//! teardown can unsubscribe and disconnect it.
//!
//! A receive error ends the pump. The channel closes and the consumer's
//! `recv()` returns `None`.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::LogTail;
use crate::payload::strip_topic;

#[allow(unused_imports)]
use crate::{
    // ---
    log_debug,
    log_error,
    log_warn,
    Result,
    SocketPtr,
    TailError,
};

/// One logical message as delivered by the transport.
///
/// Frames are kept as received: no delimiter stripping and no frames
/// discarded. For syslog forwarders the first frame carries
/// `<topic><delimiter><payload>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogMessage {
    frames: Vec<Bytes>,
}

impl LogMessage {
    pub fn new(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames
    }

    /// The first frame, which carries the topic prefix.
    pub fn first(&self) -> Option<&Bytes> {
        self.frames.first()
    }

    /// The first frame with its topic prefix stripped at `delimiter`.
    pub fn payload(&self, delimiter: Option<&str>) -> Option<Bytes> {
        self.first().map(|frame| strip_topic(frame, delimiter))
    }
}

/// Receiving half of a push-mode tail.
///
/// Yields messages in transport order until the tail is torn down or the
/// pump stops on a receive error.
pub struct MessageStream {
    rx: mpsc::Receiver<LogMessage>,
}

impl MessageStream {
    /// Wait for the next message. `None` once the pump has stopped.
    pub async fn recv(&mut self) -> Option<LogMessage> {
        self.rx.recv().await
    }

    pub fn into_inner(self) -> mpsc::Receiver<LogMessage> {
        self.rx
    }
}

/// Handle on a running pump.
pub(super) struct Pump {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<SocketPtr>,
}

impl Pump {
    pub(super) fn start(socket: SocketPtr, capacity: usize) -> (Self, MessageStream) {
        // ---
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(run(socket, tx, stop_rx));

        (Self { stop_tx, task }, MessageStream { rx })
    }

    /// Signal the pump and wait up to `grace` for it to return the socket.
    pub(super) async fn stop(self, grace: std::time::Duration) -> Result<SocketPtr> {
        // ---
        // Fails only when the pump already exited on its own.
        let _ = self.stop_tx.send(());

        let mut task = self.task;
        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(socket)) => Ok(socket),
            Ok(Err(join_err)) => Err(TailError::Transport(format!(
                "receive task failed: {join_err}"
            ))),
            Err(_) => {
                task.abort();
                log_warn!("receive task still running after {grace:?}, aborted");
                Err(TailError::ShutdownTimeout(grace))
            }
        }
    }
}

async fn run(
    mut socket: SocketPtr,
    out: mpsc::Sender<LogMessage>,
    mut stop: oneshot::Receiver<()>,
) -> SocketPtr {
    // ---
    log_debug!("pump started");

    let mut frames = Vec::new();

    loop {
        let frame = tokio::select! {
            biased;
            _ = &mut stop => break,
            frame = socket.recv_frame() => frame,
        };

        match frame {
            Ok(frame) => {
                frames.push(frame.data);
                if frame.more {
                    continue;
                }
            }
            Err(_err) => {
                log_error!("receive failed, stopping pump: {_err}");
                break;
            }
        }

        let message = LogMessage::new(std::mem::take(&mut frames));

        let permit = tokio::select! {
            biased;
            _ = &mut stop => break,
            permit = out.reserve() => permit,
        };

        match permit {
            Ok(permit) => permit.send(message),
            Err(_) => {
                log_debug!("message stream dropped, stopping pump");
                break;
            }
        }
    }

    log_debug!("pump stopped");
    socket
}

impl LogTail {
    // ---

    /// Switch to push mode and return the message stream.
    ///
    /// Spawns the pump on the current Tokio runtime; the socket belongs
    /// to it until [`teardown`](LogTail::teardown). Can only be called
    /// once per tail.
    ///
    /// # Errors
    ///
    /// [`TailError::InvalidMode`] when already in push mode or torn down.
    pub fn channel(&mut self) -> Result<MessageStream> {
        // ---
        match std::mem::replace(&mut self.mode, super::Mode::Closed) {
            super::Mode::Pull(socket) => {
                let (pump, stream) = Pump::start(socket, self.config.channel_capacity);
                self.mode = super::Mode::Push(pump);
                log_debug!("{}: switched to push mode", self.transport);
                Ok(stream)
            }
            super::Mode::Push(pump) => {
                self.mode = super::Mode::Push(pump);
                Err(TailError::InvalidMode("channel() already called".into()))
            }
            super::Mode::Closed => Err(super::closed_error()),
        }
    }
}
