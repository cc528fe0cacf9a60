// src/topics.rs

//! Topic and endpoint list construction.
//!
//! Remote forwarders publish every log record under a `host.program`
//! topic. Operators pick what to tail with comma-delimited host and
//! program selectors; this module turns those selectors into the
//! concrete subscription topics, and a comma-delimited endpoint string
//! into the ordered list of publishers to connect to.
//!
//! No trimming, validation or deduplication happens here. Callers hand
//! in well-formed selectors; bad endpoint addresses surface at connect
//! time.

use std::fmt;
use std::sync::Arc;

/// A subscription filter.
///
/// The transport delivers a message when its first frame starts with
/// the topic bytes. The empty topic matches everything.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic(pub Arc<str>);

impl Topic {
    /// The subscribe-all topic.
    pub fn all() -> Self {
        Topic(Arc::from(""))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Whether this topic selects `frame` (prefix match).
    pub fn matches(&self, frame: &[u8]) -> bool {
        frame.starts_with(self.as_bytes())
    }
}

impl<T> From<T> for Topic
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        Topic(value.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque publisher address such as `tcp://host1.example.com:24444`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint(pub Arc<str>);

impl Endpoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T> From<T> for Endpoint
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        Endpoint(value.into())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build subscription topics from host and program selectors.
///
/// - empty `hosts` → `[""]` (subscribe to everything, `programs` ignored)
/// - `programs` empty → one topic per host, verbatim
/// - otherwise → `host.program` for every pair, host-major order
///
/// ```
/// # use logtalez::{build_topics, Topic};
/// let topics = build_topics("h1,h2", "p1,p2");
/// let names: Vec<&str> = topics.iter().map(Topic::as_str).collect();
/// assert_eq!(names, ["h1.p1", "h1.p2", "h2.p1", "h2.p2"]);
/// ```
pub fn build_topics(hosts: &str, programs: &str) -> Vec<Topic> {
    // ---
    if hosts.is_empty() {
        return vec![Topic::all()];
    }

    let mut topics = Vec::new();

    for host in hosts.split(',') {
        if programs.is_empty() {
            topics.push(Topic::from(host));
            continue;
        }

        for program in programs.split(',') {
            topics.push(Topic::from(format!("{host}.{program}")));
        }
    }

    topics
}

/// Build a topic list from an explicit comma-delimited list.
///
/// This is the alternative to host/program selectors. An empty string
/// yields the subscribe-all topic, same as [`build_topics`] with no hosts.
pub fn build_topic_list(topics: &str) -> Vec<Topic> {
    // ---
    if topics.is_empty() {
        return vec![Topic::all()];
    }

    topics.split(',').map(Topic::from).collect()
}

/// Split a comma-delimited endpoint string, preserving order.
pub fn build_endpoints(endpoints: &str) -> Vec<Endpoint> {
    endpoints.split(',').map(Endpoint::from).collect()
}
