// src/transport/zeromq/transport.rs

use std::sync::Arc;
use std::time::Duration;

#[allow(unused_imports)]
use crate::{
    // ---
    log_debug,
    CurveKey,
    Endpoint,
    Frame,
    IdentityCredential,
    Result,
    SocketPtr,
    SubscriberSocket,
    TailError,
    Topic,
    Transport,
    TransportPtr,
};

/// First sleep after a non-blocking receive finds nothing queued.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Longest sleep between receive attempts on an idle socket.
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Double the idle sleep, capped at [`MAX_POLL_INTERVAL`].
fn next_poll_interval(current: Duration) -> Duration {
    (current * 2).min(MAX_POLL_INTERVAL)
}

/// libzmq-backed subscriber socket.
struct ZmqSocket {
    socket: zmq::Socket,
}

fn transport_error(err: zmq::Error) -> TailError {
    TailError::Transport(err.to_string())
}

#[async_trait::async_trait]
impl SubscriberSocket for ZmqSocket {
    // ---
    async fn set_curve(
        &mut self,
        client: &IdentityCredential,
        server_key: &CurveKey,
    ) -> Result<()> {
        // ---
        let secret = client.require_secret()?;

        self.socket
            .set_curve_serverkey(server_key.as_bytes())
            .map_err(transport_error)?;
        self.socket
            .set_curve_publickey(client.public().as_bytes())
            .map_err(transport_error)?;
        self.socket
            .set_curve_secretkey(secret.as_bytes())
            .map_err(transport_error)?;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &Topic) -> Result<()> {
        // ---
        self.socket
            .set_subscribe(topic.as_bytes())
            .map_err(|err| TailError::Subscribe {
                topic: topic.to_string(),
                reason: err.to_string(),
            })
    }

    async fn unsubscribe(&mut self, topic: &Topic) -> Result<()> {
        // ---
        self.socket
            .set_unsubscribe(topic.as_bytes())
            .map_err(|err| TailError::Subscribe {
                topic: topic.to_string(),
                reason: err.to_string(),
            })
    }

    async fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        // ---
        self.socket
            .connect(endpoint.as_str())
            .map_err(|err| TailError::Connect {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            })
    }

    async fn disconnect(&mut self, endpoint: &Endpoint) -> Result<()> {
        // ---
        self.socket
            .disconnect(endpoint.as_str())
            .map_err(|err| TailError::Disconnect {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            })
    }

    async fn recv_frame(&mut self) -> Result<Frame> {
        // ---
        let mut idle = MIN_POLL_INTERVAL;

        loop {
            match self.socket.recv_bytes(zmq::DONTWAIT) {
                Ok(data) => {
                    let more = self
                        .socket
                        .get_rcvmore()
                        .map_err(|err| TailError::Receive(err.to_string()))?;
                    return Ok(Frame::new(data, more));
                }
                Err(zmq::Error::EAGAIN) => {
                    tokio::time::sleep(idle).await;
                    idle = next_poll_interval(idle);
                }
                Err(err) => return Err(TailError::Receive(err.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // ---
        // Drop unsent subscription traffic.
        self.socket.set_linger(0).map_err(transport_error)
    }
}

/// ZeroMQ transport sharing one libzmq context.
struct ZmqTransport {
    context: zmq::Context,
}

#[async_trait::async_trait]
impl Transport for ZmqTransport {
    fn name(&self) -> &str {
        "zmq"
    }

    async fn subscriber(&self) -> Result<SocketPtr> {
        // ---
        let socket = self.context.socket(zmq::SUB).map_err(transport_error)?;
        log_debug!("zmq: created SUB socket");
        Ok(Box::new(ZmqSocket { socket }))
    }
}

/// Create a ZeroMQ transport with a fresh libzmq context.
pub fn create_transport() -> TransportPtr {
    Arc::new(ZmqTransport {
        context: zmq::Context::new(),
    })
}
