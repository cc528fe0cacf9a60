//! Tail two in-process forwarders through the memory transport.
//!
//! Uses the certificate fixtures under `tests/certs`. Run with
//! `RUST_LOG=logtalez=debug` to watch the lifecycle.

use std::path::PathBuf;
use std::time::Duration;

use logtalez::{
    // ---
    create_memory_transport,
    IdentityCredential,
    LogTailBuilder,
    Result,
};

fn cert(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("certs")
        .join(name)
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (transport, hub) = create_memory_transport();

    let server = IdentityCredential::load(cert("server_cert"))?;
    let web = hub.bind("inproc://web-forwarder", &server).await?;
    let db = hub.bind("inproc://db-forwarder", &server).await?;

    let mut tail = LogTailBuilder::new()
        .transport(transport)
        .endpoints("inproc://web-forwarder,inproc://db-forwarder")
        .hosts("web1,db1")
        .programs("nginx,postgres")
        .server_cert(cert("server_cert"))
        .client_cert(cert("client_cert"))
        .topic_delimiter(":")
        .build()
        .await?;

    println!("subscribed to {:?}", tail.topics());

    web.send_frame("web1.nginx:GET /index.html 200").await;
    web.send_frame("web1.sshd:never shown, not subscribed").await;
    db.send_frame("db1.postgres:checkpoint complete").await;

    // pull mode
    for _ in 0..2 {
        let line = tail.read_payload().await?;
        println!("pull: {}", String::from_utf8_lossy(&line));
    }

    // push mode
    let mut stream = tail.channel()?;
    web.send_frame("web1.nginx:POST /login 302").await;

    if let Ok(Some(message)) = tokio::time::timeout(Duration::from_secs(1), stream.recv()).await {
        let payload = message.payload(tail.config().delimiter()).unwrap_or_default();
        println!("push: {}", String::from_utf8_lossy(&payload));
    }

    tail.teardown().await?;
    println!("connections left: {}", hub.connection_count("inproc://web-forwarder").await);

    Ok(())
}
