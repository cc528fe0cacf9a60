//! Tail builder for creating running [`LogTail`] instances.
//!
//! Takes the selector strings an operator types (comma-delimited
//! endpoints, hosts, programs or explicit topics) and turns them into a
//! connected tail, with clear separation between required and optional
//! configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::{
    // ---
    build_endpoints,
    build_topic_list,
    build_topics,
    log_warn,
    Endpoint,
    LogTail,
    Result,
    TailConfig,
    TailError,
    TransportPtr,
};

/// Builder for [`LogTail`].
///
/// Required: [`transport`](Self::transport), [`endpoints`](Self::endpoints)
/// (or [`endpoint_list`](Self::endpoint_list)), [`server_cert`](Self::server_cert)
/// and [`client_cert`](Self::client_cert).
///
/// Topics come either from [`hosts`](Self::hosts)/[`programs`](Self::programs)
/// or from an explicit [`topics`](Self::topics) list, never both. With
/// neither, the tail subscribes to everything.
///
/// # Examples
///
/// ## Host and program selectors
/// ```no_run
/// # async fn example(transport: logtalez::TransportPtr) -> logtalez::Result<()> {
/// let tail = logtalez::LogTailBuilder::new()
///     .transport(transport)
///     .endpoints("tcp://logs.example.com:24444")
///     .hosts("web1,web2")
///     .programs("nginx,sshd")
///     .server_cert("/etc/curve/server_cert")
///     .client_cert("/etc/curve/client_cert")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// ## Explicit topics
/// ```no_run
/// # async fn example(transport: logtalez::TransportPtr) -> logtalez::Result<()> {
/// let tail = logtalez::LogTailBuilder::new()
///     .transport(transport)
///     .endpoints("tcp://logs.example.com:24444")
///     .topics("web1.nginx,db1")
///     .server_cert("/etc/curve/server_cert")
///     .client_cert("/etc/curve/client_cert")
///     .topic_delimiter(":")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct LogTailBuilder {
    transport: Option<TransportPtr>,
    endpoints: Option<Vec<Endpoint>>,
    hosts: Option<String>,
    programs: Option<String>,
    topics: Option<String>,
    server_cert: Option<PathBuf>,
    client_cert: Option<PathBuf>,
    config: TailConfig,
}

impl LogTailBuilder {
    /// Create a new tail builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport sockets are created on (required).
    pub fn transport(mut self, transport: TransportPtr) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set publisher endpoints from a comma-delimited list (required).
    ///
    /// An empty string is treated as not set.
    pub fn endpoints(mut self, endpoints: &str) -> Self {
        if !endpoints.is_empty() {
            self.endpoints = Some(build_endpoints(endpoints));
        }
        self
    }

    /// Set publisher endpoints from an already split list.
    pub fn endpoint_list(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Comma-delimited hostnames to tail.
    pub fn hosts(mut self, hosts: impl Into<String>) -> Self {
        self.hosts = Some(hosts.into());
        self
    }

    /// Comma-delimited program names to tail on each host.
    pub fn programs(mut self, programs: impl Into<String>) -> Self {
        self.programs = Some(programs.into());
        self
    }

    /// Comma-delimited explicit topic list.
    ///
    /// Cannot be combined with `hosts()` or `programs()`.
    pub fn topics(mut self, topics: impl Into<String>) -> Self {
        self.topics = Some(topics.into());
        self
    }

    /// Path to the forwarder's public certificate (required).
    pub fn server_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.server_cert = Some(path.into());
        self
    }

    /// Path to this client's certificate (required).
    ///
    /// The secret key is read from `<path>_secret` when that file exists.
    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(path.into());
        self
    }

    pub fn topic_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.config.topic_delimiter = Some(delimiter.into());
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Replace all runtime settings at once.
    pub fn config(mut self, config: TailConfig) -> Self {
        self.config = config;
        self
    }

    /// Load credentials, subscribe and connect (consumes self).
    ///
    /// # Errors
    ///
    /// - [`TailError::MissingConfig`] if a required value was not set
    /// - [`TailError::ConfigConflict`] if explicit topics are combined
    ///   with host or program selectors
    /// - anything [`LogTail::new`] returns
    pub async fn build(self) -> Result<LogTail> {
        // ---
        let transport = self
            .transport
            .ok_or_else(|| TailError::MissingConfig("transport".into()))?;
        let endpoints = self
            .endpoints
            .ok_or_else(|| TailError::MissingConfig("endpoints".into()))?;
        let server_cert = self
            .server_cert
            .ok_or_else(|| TailError::MissingConfig("server_cert".into()))?;
        let client_cert = self
            .client_cert
            .ok_or_else(|| TailError::MissingConfig("client_cert".into()))?;

        let hosts = self.hosts.unwrap_or_default();
        let programs = self.programs.unwrap_or_default();

        let topics = match self.topics {
            Some(_) if !hosts.is_empty() || !programs.is_empty() => {
                return Err(TailError::ConfigConflict(
                    "cannot combine explicit topics with hosts or programs".into(),
                ));
            }
            Some(topics) => build_topic_list(&topics),
            None => {
                if hosts.is_empty() && !programs.is_empty() {
                    log_warn!("programs {programs:?} ignored without hosts, subscribing to everything");
                }
                build_topics(&hosts, &programs)
            }
        };

        LogTail::new(
            &transport,
            endpoints,
            topics,
            server_cert,
            client_cert,
            self.config,
        )
        .await
    }
}
