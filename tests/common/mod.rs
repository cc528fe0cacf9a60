// tests/common/mod.rs

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Once};

use logtalez::{
    // ---
    create_memory_transport_with_hub,
    IdentityCredential,
    MemoryHub,
    MemoryPublisher,
    TransportPtr,
};

pub fn cert(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("certs")
        .join(name)
}

pub fn server_cert() -> PathBuf {
    cert("server_cert")
}

pub fn client_cert() -> PathBuf {
    cert("client_cert")
}

/// A fresh hub with one forwarder bound on each of `endpoints`.
pub async fn forwarders(endpoints: &[&str]) -> (Arc<MemoryHub>, TransportPtr, Vec<MemoryPublisher>) {
    // ---
    let hub = MemoryHub::new();
    let server = IdentityCredential::load(server_cert()).expect("server cert fixture");

    let mut publishers = Vec::new();
    for endpoint in endpoints {
        publishers.push(hub.bind(*endpoint, &server).await.expect("bind failed"));
    }

    let transport = create_memory_transport_with_hub(hub.clone());
    (hub, transport, publishers)
}

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
