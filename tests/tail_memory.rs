// tests/tail_memory.rs

mod common;

use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;

use logtalez::{
    // ---
    build_endpoints,
    build_topics,
    Endpoint,
    LogTail,
    LogTailBuilder,
    TailConfig,
    TailError,
    Topic,
};

use common::{client_cert, forwarders, init_logging, server_cert};

fn topics(names: &[&str]) -> Vec<Topic> {
    names.iter().map(|t| Topic::from(*t)).collect()
}

#[tokio::test]
async fn pull_read_returns_frames_unmodified_without_delimiter() {
    // ---
    init_logging();

    // ---
    // Arrange
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://test1"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://test1"),
        topics(&["topic1", "topic2"]),
        server_cert(),
        client_cert(),
        TailConfig::default(),
    )
    .await
    .expect("tail construction failed");

    let mut buf = vec![0u8; 65536];

    // ---
    // Act / Assert
    // ---
    publishers[0].send_frame("topic1:hello world").await;
    let n = tail.read(&mut buf).await.expect("read failed");
    assert_eq!(&buf[..n], b"topic1:hello world");

    publishers[0].send_frame("topic2:hello again").await;
    let n = tail.read(&mut buf).await.expect("read failed");
    assert_eq!(&buf[..n], b"topic2:hello again");

    tail.teardown().await.expect("teardown failed");
}

#[tokio::test]
async fn pull_read_strips_topic_prefix() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://strip"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://strip"),
        topics(&["topic1"]),
        server_cert(),
        client_cert(),
        TailConfig::default().with_topic_delimiter(":"),
    )
    .await
    .unwrap();

    publishers[0].send_frame("topic1:hello world").await;
    publishers[0].send_frame("topic1 without delimiter").await;

    let mut buf = vec![0u8; 1024];
    let n = tail.read(&mut buf).await.unwrap();
    assert_eq!(n, 11);
    assert_eq!(&buf[..n], b"hello world");

    let payload = tail.read_payload().await.unwrap();
    assert_eq!(payload, Bytes::from_static(b"topic1 without delimiter"));

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn pull_read_keeps_only_last_frame() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://multi"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://multi"),
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default().with_topic_delimiter(":"),
    )
    .await
    .unwrap();

    publishers[0]
        .send(vec![
            Bytes::from_static(b"web1.nginx"),
            Bytes::from_static(b"continuation"),
            Bytes::from_static(b"web1.nginx:GET /index.html"),
        ])
        .await;

    let payload = tail.read_payload().await.unwrap();
    assert_eq!(payload, Bytes::from_static(b"GET /index.html"));

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn short_buffer_truncates_but_reports_payload_length() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://short"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://short"),
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default().with_topic_delimiter(":"),
    )
    .await
    .unwrap();

    publishers[0].send_frame("topic1:hello world").await;

    let mut buf = [0u8; 5];
    let n = tail.read(&mut buf).await.unwrap();

    assert_eq!(n, 11);
    assert_eq!(&buf, b"hello");

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn unsubscribed_topics_are_never_delivered() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://filter"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://filter"),
        build_topics("web1", "nginx"),
        server_cert(),
        client_cert(),
        TailConfig::default().with_topic_delimiter(":"),
    )
    .await
    .unwrap();

    publishers[0].send_frame("web1.nginx:subscribed").await;
    publishers[0].send_frame("db1.postgres:not subscribed").await;

    let first = timeout(Duration::from_millis(100), tail.read_payload())
        .await
        .expect("timed out waiting for subscribed message")
        .unwrap();
    assert_eq!(first, Bytes::from_static(b"subscribed"));

    let nothing = timeout(Duration::from_millis(100), tail.read_payload()).await;
    assert!(nothing.is_err(), "unsubscribed message was delivered: {nothing:?}");

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn messages_from_all_endpoints_in_order() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://a", "inproc://b"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://a,inproc://b"),
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        tail.endpoints(),
        [Endpoint::from("inproc://a"), Endpoint::from("inproc://b")]
    );

    publishers[0].send_frame("from a").await;
    publishers[1].send_frame("from b").await;

    assert_eq!(tail.read_payload().await.unwrap(), Bytes::from_static(b"from a"));
    assert_eq!(tail.read_payload().await.unwrap(), Bytes::from_static(b"from b"));

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn teardown_is_idempotent() {
    // ---
    let (hub, transport, _publishers) = forwarders(&["inproc://twice"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://twice"),
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(hub.connection_count("inproc://twice").await, 1);
    assert!(tail.credentials().is_some());

    tail.teardown().await.unwrap();
    tail.teardown().await.unwrap();

    assert!(tail.is_closed());
    assert!(tail.credentials().is_none());
    assert_eq!(hub.connection_count("inproc://twice").await, 0);

    let mut buf = [0u8; 16];
    assert!(matches!(
        tail.read(&mut buf).await,
        Err(TailError::InvalidMode(_))
    ));
}

#[tokio::test]
async fn invalid_client_cert_creates_no_socket() {
    // ---
    let (hub, transport, _publishers) = forwarders(&["inproc://nocert"]).await;

    let result = LogTail::new(
        &transport,
        build_endpoints("inproc://nocert"),
        vec![Topic::all()],
        server_cert(),
        "/nonexistent/client_cert",
        TailConfig::default(),
    )
    .await;

    match result {
        Err(TailError::Credential { path, .. }) => assert_eq!(path, "/nonexistent/client_cert"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("construction unexpectedly succeeded"),
    }

    assert_eq!(hub.sockets_created(), 0);
    assert_eq!(hub.connection_count("inproc://nocert").await, 0);
}

#[tokio::test]
async fn client_cert_needs_secret_key() {
    // ---
    let (hub, transport, _publishers) = forwarders(&["inproc://nosecret"]).await;

    let dir = tempfile::tempdir().unwrap();
    let public_only = dir.path().join("client_cert");
    std::fs::copy(client_cert(), &public_only).unwrap();

    let result = LogTail::open(
        &transport,
        vec![Topic::all()],
        server_cert(),
        &public_only,
        TailConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(TailError::Credential { .. })));
    assert_eq!(hub.sockets_created(), 0);
}

#[tokio::test]
async fn connect_failure_leaves_earlier_endpoints_connected() {
    // ---
    let (hub, transport, _publishers) = forwarders(&["inproc://up"]).await;

    let mut tail = LogTail::open(
        &transport,
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default(),
    )
    .await
    .unwrap();

    let err = tail
        .connect(build_endpoints("inproc://up,inproc://down,inproc://never"))
        .await
        .unwrap_err();

    match err {
        TailError::Connect { endpoint, .. } => assert_eq!(endpoint, "inproc://down"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(tail.endpoints(), [Endpoint::from("inproc://up")]);
    assert_eq!(hub.connection_count("inproc://up").await, 1);

    tail.teardown().await.unwrap();
    assert_eq!(hub.connection_count("inproc://up").await, 0);
}

#[tokio::test]
async fn push_channel_delivers_raw_frames() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://push"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://push"),
        build_topics("web1", ""),
        server_cert(),
        client_cert(),
        TailConfig::default().with_topic_delimiter(":"),
    )
    .await
    .unwrap();

    let mut stream = tail.channel().unwrap();

    publishers[0].send_frame("web1.sshd:accepted publickey").await;
    publishers[0]
        .send(vec![Bytes::from_static(b"web1.nginx:GET /"), Bytes::from_static(b"extra")])
        .await;

    let first = timeout(Duration::from_millis(200), stream.recv())
        .await
        .expect("timed out")
        .expect("stream closed");
    assert_eq!(first.frames(), [Bytes::from_static(b"web1.sshd:accepted publickey")]);
    assert_eq!(
        first.payload(tail.config().delimiter()),
        Some(Bytes::from_static(b"accepted publickey"))
    );

    let second = timeout(Duration::from_millis(200), stream.recv())
        .await
        .expect("timed out")
        .expect("stream closed");
    assert_eq!(second.frames().len(), 2);

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn push_mode_excludes_pull_mode() {
    // ---
    let (_hub, transport, _publishers) = forwarders(&["inproc://modes"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://modes"),
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default(),
    )
    .await
    .unwrap();

    let _stream = tail.channel().unwrap();

    assert!(matches!(tail.read_payload().await, Err(TailError::InvalidMode(_))));
    assert!(matches!(tail.channel(), Err(TailError::InvalidMode(_))));
    assert!(matches!(
        tail.connect(build_endpoints("inproc://modes")).await,
        Err(TailError::InvalidMode(_))
    ));

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn teardown_stops_the_pump() {
    // ---
    let (hub, transport, _publishers) = forwarders(&["inproc://stop"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://stop"),
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default(),
    )
    .await
    .unwrap();

    let mut stream = tail.channel().unwrap();

    tail.teardown().await.expect("teardown failed");
    assert_eq!(hub.connection_count("inproc://stop").await, 0);

    let end = timeout(Duration::from_millis(200), stream.recv())
        .await
        .expect("stream did not close");
    assert!(end.is_none());

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn stalled_consumer_does_not_block_teardown() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://stall"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://stall"),
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default().with_channel_capacity(1),
    )
    .await
    .unwrap();

    let mut stream = tail.channel().unwrap();

    for i in 0..5 {
        publishers[0].send_frame(format!("line {i}")).await;
    }

    // let the pump fill the channel and park on the next reserve
    tokio::time::sleep(Duration::from_millis(50)).await;

    timeout(Duration::from_secs(1), tail.teardown())
        .await
        .expect("teardown blocked on a stalled consumer")
        .expect("teardown failed");

    let buffered = stream.recv().await.expect("buffered message lost");
    assert_eq!(buffered.frames(), [Bytes::from("line 0")]);
    assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn builder_tails_selected_hosts_and_programs() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://b1", "inproc://b2"]).await;

    let mut tail = LogTailBuilder::new()
        .transport(transport)
        .endpoints("inproc://b1,inproc://b2")
        .hosts("web1,web2")
        .programs("nginx,sshd")
        .server_cert(server_cert())
        .client_cert(client_cert())
        .topic_delimiter(":")
        .build()
        .await
        .expect("build failed");

    let names: Vec<&str> = tail.topics().iter().map(Topic::as_str).collect();
    assert_eq!(names, ["web1.nginx", "web1.sshd", "web2.nginx", "web2.sshd"]);

    publishers[1].send_frame("web2.sshd:session opened").await;
    assert_eq!(
        tail.read_payload().await.unwrap(),
        Bytes::from_static(b"session opened")
    );

    tail.teardown().await.unwrap();
}

#[tokio::test]
async fn message_stream_unwraps_to_receiver() {
    // ---
    let (_hub, transport, publishers) = forwarders(&["inproc://raw"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://raw"),
        vec![Topic::all()],
        server_cert(),
        client_cert(),
        TailConfig::default(),
    )
    .await
    .unwrap();

    let mut rx = tail.channel().unwrap().into_inner();
    publishers[0].send_frame("db1.postgres:vacuum done").await;

    let message = timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("timed out")
        .expect("stream closed");
    assert_eq!(message.into_frames(), [Bytes::from_static(b"db1.postgres:vacuum done")]);

    tail.teardown().await.unwrap();
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn debug_output_hides_secret_keys() {
    // ---
    let (_hub, transport, _publishers) = forwarders(&["inproc://debug"]).await;

    let mut tail = LogTail::new(
        &transport,
        build_endpoints("inproc://debug"),
        build_topics("web1", "nginx"),
        server_cert(),
        client_cert(),
        TailConfig::default(),
    )
    .await
    .unwrap();

    let shown = format!("{tail:?}");
    assert!(shown.contains("memory"));
    assert!(shown.contains("web1.nginx"));
    assert!(shown.contains("inproc://debug"));
    assert!(shown.contains("pull"));
    assert!(shown.contains("Yne@$w-vo<fVvi]a<NY6T1ed:M$fCG*[IaLV{hID"));
    assert!(!shown.contains("D:)Q[IlAW!ahhC2ac:9*A}h:p?([4%wOTJ%JR%cs"));

    tail.teardown().await.unwrap();
    assert!(format!("{tail:?}").contains("closed"));
}
