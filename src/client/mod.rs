// src/client/mod.rs

//! The secure channel client.
//!
//! A [`LogTail`] owns exactly one subscriber socket together with the two
//! identity credentials it was opened with, the topics it subscribed and
//! the endpoints it connected. Logs are consumed in one of two ways:
//!
//! - **pull**: [`LogTail::read`] / [`LogTail::read_payload`] receive one
//!   logical message per call on the caller's task;
//! - **push**: [`LogTail::channel`] moves the socket into a background
//!   pump that feeds a bounded channel.
//!
//! The two are mutually exclusive. Once the pump owns the socket the
//! pull methods return [`TailError::InvalidMode`].
//!
//! [`LogTail::teardown`] unsubscribes every topic, disconnects every
//! endpoint in connection order and releases the socket and credentials.

mod pump;
mod reader;

pub use pump::{LogMessage, MessageStream};

use std::fmt;
use std::path::Path;

#[allow(unused_imports)]
use crate::{
    // ---
    log_debug,
    log_info,
    log_warn,
    Endpoint,
    IdentityCredential,
    Result,
    SocketPtr,
    SubscriberSocket,
    TailConfig,
    TailError,
    Topic,
    TransportPtr,
};

use pump::Pump;

enum Mode {
    /// Socket owned by the caller's task.
    Pull(SocketPtr),

    /// Socket owned by the background pump.
    Push(Pump),

    /// Torn down.
    Closed,
}

/// A running subscription to one or more log forwarders.
///
/// # Example
///
/// ```no_run
/// # use logtalez::{build_endpoints, build_topics, LogTail, TailConfig, TransportPtr};
/// # async fn example(transport: TransportPtr) -> logtalez::Result<()> {
/// let mut tail = LogTail::new(
///     &transport,
///     build_endpoints("tcp://host1.example.com:24444,tcp://host2.example.com:24444"),
///     build_topics("host1,host2", "sshd"),
///     "/home/example_user/.curve/server_cert",
///     "/home/example_user/.curve/my_cert",
///     TailConfig::default().with_topic_delimiter(":"),
/// )
/// .await?;
///
/// let mut buf = vec![0u8; 65536];
/// let n = tail.read(&mut buf).await?;
/// println!("{}", String::from_utf8_lossy(&buf[..n]));
///
/// tail.teardown().await?;
/// # Ok(())
/// # }
/// ```
pub struct LogTail {
    // ---
    transport: String,
    topics: Vec<Topic>,
    endpoints: Vec<Endpoint>,
    config: TailConfig,
    credentials: Option<(IdentityCredential, IdentityCredential)>,
    mode: Mode,
}

impl LogTail {
    // ---

    /// Open and connect a tail in one step.
    ///
    /// Equivalent to [`open`](Self::open) followed by
    /// [`connect`](Self::connect). If a connect fails the partially
    /// connected tail is dropped along with its socket; use the two-step
    /// form to keep it and tear it down explicitly.
    ///
    /// # Errors
    ///
    /// Any error from [`open`](Self::open) or [`connect`](Self::connect).
    pub async fn new(
        transport: &TransportPtr,
        endpoints: Vec<Endpoint>,
        topics: Vec<Topic>,
        server_cert_path: impl AsRef<Path>,
        client_cert_path: impl AsRef<Path>,
        config: TailConfig,
    ) -> Result<Self> {
        // ---
        let mut tail = Self::open(transport, topics, server_cert_path, client_cert_path, config).await?;
        tail.connect(endpoints).await?;
        Ok(tail)
    }

    /// Load credentials, create the socket and subscribe to `topics`.
    ///
    /// The client credential is loaded first, then the server
    /// credential; a failure in either returns before any socket exists.
    ///
    /// # Errors
    ///
    /// - [`TailError::Credential`] for a missing, unreadable or malformed
    ///   certificate, or a client certificate without a secret key
    /// - transport errors creating or configuring the socket
    pub async fn open(
        transport: &TransportPtr,
        topics: Vec<Topic>,
        server_cert_path: impl AsRef<Path>,
        client_cert_path: impl AsRef<Path>,
        config: TailConfig,
    ) -> Result<Self> {
        // ---
        let client = IdentityCredential::load(client_cert_path)?;
        client.require_secret()?;
        let server = IdentityCredential::load(server_cert_path)?;

        let mut socket = transport.subscriber().await?;
        socket.set_curve(&client, server.public()).await?;

        log_debug!(
            "{}: pinned server key {} for client key {}",
            transport.name(),
            server.public(),
            client.public()
        );

        for topic in &topics {
            socket.subscribe(topic).await?;
            log_debug!("{}: subscribed to {topic:?}", transport.name());
        }

        Ok(Self {
            transport: transport.name().to_string(),
            topics,
            endpoints: Vec::new(),
            config,
            credentials: Some((client, server)),
            mode: Mode::Pull(socket),
        })
    }

    /// Connect to each endpoint in order.
    ///
    /// Stops at the first failure. Endpoints connected before it stay
    /// connected and recorded, so [`teardown`](Self::teardown) still
    /// disconnects them.
    ///
    /// # Errors
    ///
    /// - [`TailError::Connect`] from the transport
    /// - [`TailError::InvalidMode`] once the socket has moved into push
    ///   mode or the tail has been torn down
    pub async fn connect(&mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Result<()> {
        // ---
        let socket = match &mut self.mode {
            Mode::Pull(socket) => socket,
            Mode::Push(_) => {
                return Err(TailError::InvalidMode(
                    "connect() not allowed after channel()".into(),
                ))
            }
            Mode::Closed => return Err(closed_error()),
        };

        for endpoint in endpoints {
            if let Err(err) = socket.connect(&endpoint).await {
                log_warn!("{}: {err}", self.transport);
                return Err(err);
            }
            log_debug!("{}: connected to {endpoint}", self.transport);
            self.endpoints.push(endpoint);
        }

        Ok(())
    }

    /// Unsubscribe, disconnect and release everything.
    ///
    /// In push mode the pump is stopped first and given at most
    /// [`TailConfig::shutdown_grace`] to hand the socket back.
    ///
    /// Calling this again after it has run is a no-op returning `Ok(())`.
    ///
    /// # Errors
    ///
    /// - [`TailError::Disconnect`] if the transport refuses a disconnect;
    ///   remaining endpoints are not attempted, the socket and
    ///   credentials are still released
    /// - [`TailError::ShutdownTimeout`] if the pump did not stop in time;
    ///   it is aborted and the socket dropped with it
    pub async fn teardown(&mut self) -> Result<()> {
        // ---
        let socket = match std::mem::replace(&mut self.mode, Mode::Closed) {
            Mode::Closed => {
                log_debug!("{}: teardown on a closed tail", self.transport);
                return Ok(());
            }
            Mode::Pull(socket) => Ok(socket),
            Mode::Push(pump) => pump.stop(self.config.shutdown_grace).await,
        };

        let result = match socket {
            Ok(mut socket) => {
                let released = release(socket.as_mut(), &self.topics, &self.endpoints).await;
                let closed = socket.close().await;
                released.and(closed)
            }
            Err(err) => Err(err),
        };

        self.credentials = None;

        match &result {
            Ok(()) => log_debug!("{}: torn down", self.transport),
            Err(err) => log_warn!("{}: teardown failed: {err}", self.transport),
        }

        result
    }

    /// Topics subscribed at open, in order.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Endpoints successfully connected, in connection order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// The client and server credentials, until teardown releases them.
    pub fn credentials(&self) -> Option<(&IdentityCredential, &IdentityCredential)> {
        self.credentials.as_ref().map(|(client, server)| (client, server))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.mode, Mode::Closed)
    }

    fn pull_socket(&mut self, op: &str) -> Result<&mut SocketPtr> {
        // ---
        match &mut self.mode {
            Mode::Pull(socket) => Ok(socket),
            Mode::Push(_) => Err(TailError::InvalidMode(format!(
                "{op}() not allowed after channel()"
            ))),
            Mode::Closed => Err(closed_error()),
        }
    }
}

impl fmt::Debug for LogTail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        let mode = match self.mode {
            Mode::Pull(_) => "pull",
            Mode::Push(_) => "push",
            Mode::Closed => "closed",
        };

        // Public keys only.
        let credentials = self
            .credentials
            .as_ref()
            .map(|(client, server)| (client.public(), server.public()));

        f.debug_struct("LogTail")
            .field("transport", &self.transport)
            .field("topics", &self.topics)
            .field("endpoints", &self.endpoints)
            .field("mode", &mode)
            .field("credentials", &credentials)
            .finish()
    }
}

fn closed_error() -> TailError {
    TailError::InvalidMode("tail has been torn down".into())
}

/// Unsubscribe every topic, then disconnect every endpoint in order.
///
/// Unsubscribe failures are logged and skipped. The first disconnect
/// failure stops the sequence and is returned.
async fn release(
    socket: &mut dyn SubscriberSocket,
    topics: &[Topic],
    endpoints: &[Endpoint],
) -> Result<()> {
    // ---
    for topic in topics {
        if let Err(_err) = socket.unsubscribe(topic).await {
            log_warn!("unsubscribe {topic:?}: {_err}");
        }
    }

    for endpoint in endpoints {
        socket.disconnect(endpoint).await?;
        log_debug!("disconnected from {endpoint}");
    }

    Ok(())
}
