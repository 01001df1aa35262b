use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobdeck_client::{ClientEvent, ClientSettings, EventFeed, EventSink, FailureKind, FeedEvent};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<ClientEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<ClientEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: ClientEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn feed_for(server: &MockServer) -> EventFeed {
    EventFeed::new(&ClientSettings {
        base_url: server.uri(),
        reconnect_delay: Duration::from_millis(50),
        ..ClientSettings::default()
    })
    .expect("feed")
}

const SID: &str = "eio-session";
const OPEN: &str = "0{\"sid\":\"eio-session\",\"upgrades\":[\"websocket\"],\"pingInterval\":300,\"pingTimeout\":200,\"maxPayload\":1000000}";

/// Mounts the handshake, the namespace join and a session that closes on its last poll.
async fn mount_session(server: &MockServer, first_poll: &str) {
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("EIO", "4"))
        .and(query_param("transport", "polling"))
        .respond_with(ResponseTemplate::new(200).set_body_string(OPEN))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/socket.io/"))
        .and(query_param("sid", SID))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("sid", SID))
        .respond_with(ResponseTemplate::new(200).set_body_string(first_poll))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("sid", SID))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .with_priority(2)
        .mount(server)
        .await;
}

#[tokio::test]
async fn stream_once_joins_namespace_and_decodes_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/socket.io/"))
        .and(query_param("sid", SID))
        .and(body_string("40"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .with_priority(1)
        .mount(&server)
        .await;
    let poll = [
        "40{\"sid\":\"socket-1\"}",
        "42[\"connected\",{\"message\":\"Connected to server\"}]",
        "42[\"job_update\",{\"job_id\":4,\"status\":\"running\",\"progress\":12.5,\"phase\":\"Browser ready\"}]",
        "42[\"cnpj_update\",{\"job_id\":4,\"cnpj\":\"12.345.678/0001-90\",\"status\":\"success\",\"detail\":\"3 rows\"}]",
        "42[\"job_update\",{broken}]",
    ]
    .join("\u{1e}");
    mount_session(&server, &poll).await;

    let sink = TestSink::default();
    feed_for(&server)
        .stream_once(&sink, &CancellationToken::new())
        .await
        .expect("session");

    let events = sink.take();
    assert_eq!(events.len(), 3, "{events:?}");
    assert_eq!(events[0], ClientEvent::Feed(FeedEvent::Connected));
    match &events[1] {
        ClientEvent::Feed(FeedEvent::Job(update)) => {
            assert_eq!(update.job_id, 4);
            assert_eq!(update.status.as_deref(), Some("running"));
            assert_eq!(update.progress, Some(12.5));
            assert_eq!(update.phase.as_deref(), Some("Browser ready"));
        }
        other => panic!("unexpected {other:?}"),
    }
    match &events[2] {
        ClientEvent::Feed(FeedEvent::Item(item)) => {
            assert_eq!(item.job_id, Some(4));
            assert_eq!(item.item, "12.345.678/0001-90");
            assert_eq!(item.detail.as_deref(), Some("3 rows"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn server_ping_is_answered_with_pong() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/socket.io/"))
        .and(query_param("sid", SID))
        .and(body_string("3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_session(&server, "40{\"sid\":\"socket-1\"}\u{1e}2").await;

    let sink = TestSink::default();
    feed_for(&server)
        .stream_once(&sink, &CancellationToken::new())
        .await
        .expect("session");
    assert_eq!(sink.take(), vec![ClientEvent::Feed(FeedEvent::Connected)]);
}

#[tokio::test]
async fn stream_once_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let err = feed_for(&server)
        .stream_once(&sink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn refused_namespace_is_an_error() {
    let server = MockServer::start().await;
    mount_session(&server, "44{\"message\":\"Unauthorized\"}").await;

    let sink = TestSink::default();
    let err = feed_for(&server)
        .stream_once(&sink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected);
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn run_reports_disconnect_and_stops_on_cancel() {
    let server = MockServer::start().await;
    mount_session(&server, "40{\"sid\":\"socket-1\"}").await;

    let feed = feed_for(&server);
    let sink = TestSink::default();
    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        stopper.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), feed.run(&sink, cancel))
        .await
        .expect("feed stops after cancel");

    let events = sink.take();
    assert_eq!(events.first(), Some(&ClientEvent::Feed(FeedEvent::Connected)));
    assert!(events.contains(&ClientEvent::Feed(FeedEvent::Disconnected)));
}
