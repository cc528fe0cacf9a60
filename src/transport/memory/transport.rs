// src/transport/memory/transport.rs

//! In-memory transport implementation.
//!
//! Concrete implementation of the domain-level `Transport` and
//! `SubscriberSocket` traits using in-process data structures only.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};

#[allow(unused_imports)]
use crate::{
    // ---
    log_debug,
    log_info,
    log_warn,
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

/// Messages queued per subscriber before the publisher starts dropping.
///
/// Mirrors libzmq's default receive high-water mark.
const PEER_QUEUE_DEPTH: usize = 1000;

type Message = Vec<Bytes>;

/// One connected subscriber, as seen by a publisher.
struct Peer {
    tx: mpsc::Sender<Message>,
}

/// A bound publisher endpoint.
struct Binding {
    endpoint: Endpoint,
    server_key: CurveKey,
    allowed_clients: RwLock<Option<Vec<CurveKey>>>,
    peers: RwLock<HashMap<u64, Peer>>,
}

impl Binding {
    /// Perform the simulated CURVE handshake.
    ///
    /// Returns `false` when the subscriber pinned another server key or
    /// the publisher does not allow its client key.
    async fn accepts(&self, client_key: &CurveKey, pinned_server: &CurveKey) -> bool {
        // ---
        if *pinned_server != self.server_key {
            return false;
        }

        match self.allowed_clients.read().await.as_ref() {
            Some(allowed) => allowed.contains(client_key),
            None => true,
        }
    }
}

/// Shared message bus for the in-memory transport.
///
/// Stands in for a set of forwarders and the network between them and
/// the subscribers. Publishers bound on a hub are reachable from every
/// socket created by a transport sharing that hub.
///
/// # Testing Only
///
/// Production code tails real forwarders through the ZeroMQ transport.
/// The hub exists so lifecycle and delivery behaviour can be exercised
/// without sockets or certificates on a network.
///
/// ```
/// # use logtalez::MemoryHub;
/// # async fn example() -> logtalez::Result<()> {
/// let hub = MemoryHub::new();
/// let transport = logtalez::create_memory_transport_with_hub(hub.clone());
/// # Ok(())
/// # }
/// ```
pub struct MemoryHub {
    // ---
    bindings: RwLock<HashMap<Endpoint, Arc<Binding>>>,
    next_peer_id: AtomicU64,
}

impl MemoryHub {
    /// Create a new, empty hub.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bind a publisher on `endpoint` that authenticates as `server`.
    ///
    /// # Errors
    ///
    /// [`TailError::Transport`] if the endpoint is malformed or already bound.
    pub async fn bind(
        self: &Arc<Self>,
        endpoint: impl Into<Endpoint>,
        server: &IdentityCredential,
    ) -> Result<MemoryPublisher> {
        // ---
        let endpoint = endpoint.into();
        validate_endpoint(&endpoint).map_err(TailError::Transport)?;

        let mut bindings = self.bindings.write().await;
        if bindings.contains_key(&endpoint) {
            return Err(TailError::Transport(format!(
                "address already in use: {endpoint}"
            )));
        }

        let binding = Arc::new(Binding {
            endpoint: endpoint.clone(),
            server_key: *server.public(),
            allowed_clients: RwLock::new(None),
            peers: RwLock::new(HashMap::new()),
        });
        bindings.insert(endpoint.clone(), binding.clone());

        log_debug!("memory hub: bound publisher on {endpoint}");

        Ok(MemoryPublisher {
            hub: self.clone(),
            binding,
        })
    }

    /// Number of live subscriber connections on `endpoint`.
    ///
    /// Sockets that failed the handshake are not counted.
    pub async fn connection_count(&self, endpoint: &str) -> usize {
        // ---
        let binding = self.bindings.read().await.get(&Endpoint::from(endpoint)).cloned();
        match binding {
            Some(binding) => binding.peers.read().await.len(),
            None => 0,
        }
    }

    /// Number of subscriber sockets ever created on this hub.
    pub fn sockets_created(&self) -> u64 {
        self.next_peer_id.load(Ordering::Relaxed) - 1
    }

    fn allocate_peer_id(&self) -> u64 {
        self.next_peer_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn attach(
        &self,
        endpoint: &Endpoint,
        peer_id: u64,
        tx: mpsc::Sender<Message>,
        client_key: &CurveKey,
        pinned_server: &CurveKey,
    ) -> Result<()> {
        // ---
        validate_endpoint(endpoint).map_err(|reason| TailError::Connect {
            endpoint: endpoint.to_string(),
            reason,
        })?;

        let binding = self.bindings.read().await.get(endpoint).cloned();
        let binding = binding.ok_or_else(|| TailError::Connect {
            endpoint: endpoint.to_string(),
            reason: "connection refused: nothing bound".into(),
        })?;

        if !binding.accepts(client_key, pinned_server).await {
            log_warn!("memory hub: CURVE handshake with {endpoint} failed, no messages will be delivered");
            return Ok(());
        }

        binding.peers.write().await.insert(peer_id, Peer { tx });
        Ok(())
    }

    async fn detach(&self, endpoint: &Endpoint, peer_id: u64) {
        // ---
        let binding = self.bindings.read().await.get(endpoint).cloned();
        if let Some(binding) = binding {
            binding.peers.write().await.remove(&peer_id);
        }
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            next_peer_id: AtomicU64::new(1),
        }
    }
}

/// A publisher bound on a [`MemoryHub`].
///
/// Plays the part of a remote syslog forwarder: every [`send`](Self::send)
/// fans the message out to all connected subscribers.
pub struct MemoryPublisher {
    hub: Arc<MemoryHub>,
    binding: Arc<Binding>,
}

impl MemoryPublisher {
    /// The endpoint this publisher is bound on.
    pub fn endpoint(&self) -> &Endpoint {
        &self.binding.endpoint
    }

    /// Only accept subscribers presenting one of these client keys.
    pub async fn allow_clients(&self, keys: impl IntoIterator<Item = CurveKey>) {
        // ---
        let keys: Vec<CurveKey> = keys.into_iter().collect();
        *self.binding.allowed_clients.write().await = Some(keys);
    }

    /// Publish one message made of `frames`.
    ///
    /// Returns the number of subscribers the message was queued for.
    /// Topic filtering happens on the subscriber side, so this counts
    /// every handshaken connection with room in its queue.
    pub async fn send(&self, frames: Vec<Bytes>) -> usize {
        // ---
        let mut queued = 0;
        let mut gone = Vec::new();

        {
            let peers = self.binding.peers.read().await;
            for (id, peer) in peers.iter() {
                match peer.tx.try_send(frames.clone()) {
                    Ok(()) => queued += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        log_debug!("{}: subscriber {id} queue full, dropping message", self.binding.endpoint);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => gone.push(*id),
                }
            }
        }

        if !gone.is_empty() {
            let mut peers = self.binding.peers.write().await;
            for id in gone {
                peers.remove(&id);
            }
        }

        queued
    }

    /// Publish a single-frame message.
    pub async fn send_frame(&self, frame: impl Into<Bytes>) -> usize {
        self.send(vec![frame.into()]).await
    }

    /// Number of handshaken subscribers.
    pub async fn peer_count(&self) -> usize {
        self.binding.peers.read().await.len()
    }

    /// Remove the binding. Connected subscribers stop receiving.
    pub async fn unbind(self) {
        // ---
        let mut bindings = self.hub.bindings.write().await;
        bindings.remove(&self.binding.endpoint);
        self.binding.peers.write().await.clear();

        log_debug!("memory hub: unbound {}", self.binding.endpoint);
    }
}

fn validate_endpoint(endpoint: &Endpoint) -> std::result::Result<(), String> {
    // ---
    match endpoint.as_str().split_once("://") {
        Some((scheme, address)) if !scheme.is_empty() && !address.is_empty() => Ok(()),
        _ => Err(format!("invalid endpoint {:?}", endpoint.as_str())),
    }
}

/// Subscriber socket on a [`MemoryHub`].
struct MemorySocket {
    // ---
    id: u64,
    hub: Arc<MemoryHub>,
    tx: mpsc::Sender<Message>,
    inbox: mpsc::Receiver<Message>,
    curve: Option<(CurveKey, CurveKey)>,
    subscriptions: Vec<Topic>,
    connected: Vec<Endpoint>,
    pending: VecDeque<Bytes>,
    closed: bool,
}

impl MemorySocket {
    fn new(hub: Arc<MemoryHub>) -> Self {
        // ---
        let (tx, inbox) = mpsc::channel(PEER_QUEUE_DEPTH);
        Self {
            id: hub.allocate_peer_id(),
            hub,
            tx,
            inbox,
            curve: None,
            subscriptions: Vec::new(),
            connected: Vec::new(),
            pending: VecDeque::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TailError::Transport("socket is closed".into()));
        }
        Ok(())
    }

    fn selects(&self, message: &Message) -> bool {
        match message.first() {
            Some(first) => self.subscriptions.iter().any(|t| t.matches(first)),
            None => false,
        }
    }

    fn next_pending(&mut self) -> Option<Frame> {
        let data = self.pending.pop_front()?;
        Some(Frame::new(data, !self.pending.is_empty()))
    }
}

#[async_trait::async_trait]
impl SubscriberSocket for MemorySocket {
    // ---
    async fn set_curve(
        &mut self,
        client: &IdentityCredential,
        server_key: &CurveKey,
    ) -> Result<()> {
        // ---
        self.ensure_open()?;
        client.require_secret()?;
        self.curve = Some((*client.public(), *server_key));
        Ok(())
    }

    async fn subscribe(&mut self, topic: &Topic) -> Result<()> {
        // ---
        self.ensure_open()?;
        self.subscriptions.push(topic.clone());
        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &Topic) -> Result<()> {
        // ---
        self.ensure_open()?;
        match self.subscriptions.iter().position(|t| t == topic) {
            Some(idx) => {
                self.subscriptions.remove(idx);
                Ok(())
            }
            None => Err(TailError::Subscribe {
                topic: topic.to_string(),
                reason: "not subscribed".into(),
            }),
        }
    }

    async fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        // ---
        self.ensure_open()?;
        let (client_key, server_key) = self.curve.ok_or_else(|| TailError::Connect {
            endpoint: endpoint.to_string(),
            reason: "no CURVE identity applied".into(),
        })?;

        self.hub
            .attach(endpoint, self.id, self.tx.clone(), &client_key, &server_key)
            .await?;
        self.connected.push(endpoint.clone());
        Ok(())
    }

    async fn disconnect(&mut self, endpoint: &Endpoint) -> Result<()> {
        // ---
        self.ensure_open()?;
        let idx = self
            .connected
            .iter()
            .position(|e| e == endpoint)
            .ok_or_else(|| TailError::Disconnect {
                endpoint: endpoint.to_string(),
                reason: "not connected".into(),
            })?;

        self.connected.remove(idx);
        if !self.connected.contains(endpoint) {
            self.hub.detach(endpoint, self.id).await;
        }
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<Frame> {
        // ---
        self.ensure_open()?;

        if let Some(frame) = self.next_pending() {
            return Ok(frame);
        }

        loop {
            // Cancel-safe: nothing is held across this await.
            let message = self
                .inbox
                .recv()
                .await
                .ok_or_else(|| TailError::Receive("inbox closed".into()))?;

            if self.selects(&message) {
                self.pending.extend(message);
                if let Some(frame) = self.next_pending() {
                    return Ok(frame);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // ---
        if self.closed {
            return Ok(());
        }

        for endpoint in std::mem::take(&mut self.connected) {
            self.hub.detach(&endpoint, self.id).await;
        }
        self.subscriptions.clear();
        self.pending.clear();
        self.closed = true;
        Ok(())
    }
}

/// In-memory transport.
///
/// Hands out sockets attached to a shared [`MemoryHub`].
struct MemoryTransport {
    hub: Arc<MemoryHub>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn subscriber(&self) -> Result<SocketPtr> {
        Ok(Box::new(MemorySocket::new(self.hub.clone())))
    }
}

/// Process-global hub used by [`create_memory_transport`].
static GLOBAL_HUB: OnceLock<Arc<MemoryHub>> = OnceLock::new();

/// Create an in-memory transport on the process-global hub.
///
/// For isolated parallel tests, use [`create_memory_transport_with_hub`].
pub fn create_memory_transport() -> (TransportPtr, Arc<MemoryHub>) {
    // ---
    let hub = GLOBAL_HUB.get_or_init(MemoryHub::new).clone();
    (create_memory_transport_with_hub(hub.clone()), hub)
}

/// Create an in-memory transport on `hub`.
pub fn create_memory_transport_with_hub(hub: Arc<MemoryHub>) -> TransportPtr {
    Arc::new(MemoryTransport { hub })
}
