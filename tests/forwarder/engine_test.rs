//! Single-file behavior: filtering, skipping, fatal errors, cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use httpmock::prelude::*;
use url::Url;

use txt_feeder::config::ForwarderConfig;
use txt_feeder::forwarder::{Forwarder, ForwarderError};
use txt_feeder::sender::{InfluxSender, PointSink, SendError};

use super::{ago, append, line, spawn, wait_until, write_log, RecordingSink, WAIT};

const STAMP: &str = "2025-06-09T21:58:12Z";

#[tokio::test]
async fn forwards_candidate_lines_and_ignores_others() {
    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(
        dir.path(),
        "a.txt",
        &[
            "# header written by the logger".to_string(),
            line("host1", STAMP),
            "othermeasurement,host1,1,2".to_string(),
            String::new(),
            line("host2", STAMP),
        ],
        ago(60),
    );

    let running = spawn(&start, RecordingSink::default(), WAIT);
    let sink = running.sink.clone();
    assert!(wait_until(Duration::from_secs(2), || sink.sent().len() == 2).await);

    let stats = running.stop().await.unwrap();
    assert_eq!(sink.hosts(), vec!["host1", "host2"]);
    assert_eq!(
        sink.sent()[0],
        "mydatameasurement,host=host1 T1=1,T2=2,T3=3,T4=4,Pwr1=5,Pwr2=6,Pwr3=7,Pwr4=8,\
         LEDamp=9,LEDwidth=10,Threshold=11,V1=12,V2=13,V3=14,V4=15 1749506292000000000"
    );
    assert_eq!(stats.lines_read, 5);
    assert_eq!(stats.records_sent, 2);
    assert_eq!(stats.lines_skipped, 0);
    assert_eq!(stats.files_opened, 1);
}

#[tokio::test]
async fn wrong_field_count_is_skipped_not_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(
        dir.path(),
        "a.txt",
        &[
            "mydatameasurement,host1,1,2,3".to_string(),
            line("host1", STAMP),
            format!("{},16", line("host1", STAMP)),
            line("host2", STAMP),
        ],
        ago(60),
    );

    let running = spawn(&start, RecordingSink::default(), WAIT);
    let sink = running.sink.clone();
    assert!(wait_until(Duration::from_secs(2), || sink.sent().len() == 2).await);

    let stats = running.stop().await.unwrap();
    assert_eq!(sink.hosts(), vec!["host1", "host2"]);
    assert_eq!(stats.lines_skipped, 2);
}

#[tokio::test]
async fn malformed_timestamp_stops_the_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(
        dir.path(),
        "a.txt",
        &[
            line("host1", STAMP),
            line("host1", "2025-06-09 21:58:12"),
            line("host2", STAMP),
        ],
        ago(60),
    );

    let running = spawn(&start, RecordingSink::default(), WAIT);
    let sink = running.sink.clone();
    let err = running.join().await.unwrap_err();

    match err {
        ForwarderError::Malformed {
            line_number, line, ..
        } => {
            assert_eq!(line_number, 2);
            assert!(line.ends_with("2025-06-09 21:58:12"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(sink.hosts(), vec!["host1"]);
}

#[tokio::test]
async fn delivery_failure_stops_the_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(
        dir.path(),
        "a.txt",
        &[line("host1", STAMP), line("host2", STAMP), line("host3", STAMP)],
        ago(60),
    );

    let running = spawn(&start, RecordingSink::failing_from(1), WAIT);
    let sink = running.sink.clone();
    let err = running.join().await.unwrap_err();

    assert!(matches!(
        err,
        ForwarderError::Delivery {
            line_number: 2,
            source: SendError::Rejected { status: 500, .. },
            ..
        }
    ));
    assert_eq!(sink.hosts(), vec!["host1"]);
}

#[tokio::test]
async fn http_rejection_stops_the_run() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/write").query_param("db", "lab");
            then.status(400).body("{\"error\":\"partial write\"}");
        })
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(
        dir.path(),
        "a.txt",
        &[line("host1", STAMP), line("host2", STAMP)],
        ago(60),
    );

    let url = Url::parse(&server.url("/write?db=lab")).unwrap();
    let sender = InfluxSender::new(url, Duration::from_secs(5)).unwrap();
    let mut forwarder = Forwarder::new(&ForwarderConfig::default(), sender).with_wait_interval(WAIT);

    let err = tokio::time::timeout(Duration::from_secs(5), forwarder.run(&start))
        .await
        .unwrap()
        .unwrap_err();

    match err {
        ForwarderError::Delivery {
            line_number,
            source: SendError::Rejected { status, body },
            ..
        } => {
            assert_eq!(line_number, 1);
            assert_eq!(status, 400);
            assert!(body.contains("partial write"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_hits_async(1).await;
    assert_eq!(forwarder.stats().records_sent, 0);
}

#[tokio::test]
async fn picks_up_lines_appended_while_waiting() {
    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(dir.path(), "a.txt", &[line("host1", STAMP)], ago(60));

    let running = spawn(&start, RecordingSink::default(), WAIT);
    let sink = running.sink.clone();
    assert!(wait_until(Duration::from_secs(2), || sink.sent().len() == 1).await);

    append(&start, &format!("{}\n", line("host2", STAMP)), ago(30));
    assert!(wait_until(Duration::from_secs(2), || sink.sent().len() == 2).await);

    running.stop().await.unwrap();
    assert_eq!(sink.hosts(), vec!["host1", "host2"]);
}

#[tokio::test]
async fn partial_line_waits_for_its_newline() {
    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(dir.path(), "a.txt", &[], ago(60));
    let full = line("host1", STAMP);
    let (head, tail) = full.split_at(30);

    append(&start, head, ago(60));
    let running = spawn(&start, RecordingSink::default(), WAIT);
    let sink = running.sink.clone();

    // Several wait intervals pass with only the fragment on disk.
    tokio::time::sleep(WAIT * 4).await;
    assert!(sink.sent().is_empty());

    append(&start, &format!("{tail}\n"), ago(60));
    assert!(wait_until(Duration::from_secs(2), || sink.sent().len() == 1).await);

    let stats = running.stop().await.unwrap();
    assert_eq!(sink.hosts(), vec!["host1"]);
    assert_eq!(stats.lines_skipped, 0);
    assert_eq!(stats.lines_read, 1);
}

#[tokio::test]
async fn cancel_during_wait_returns_promptly() {
    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(dir.path(), "a.txt", &[line("host1", STAMP)], ago(60));

    let running = spawn(&start, RecordingSink::default(), Duration::from_secs(3600));
    let sink = running.sink.clone();
    assert!(wait_until(Duration::from_secs(2), || sink.sent().len() == 1).await);

    let started = std::time::Instant::now();
    let stats = running.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(stats.records_sent, 1);
}

/// Accepts a point and never answers.
#[derive(Debug, Default)]
struct StalledSink {
    attempts: AtomicUsize,
}

#[async_trait]
impl PointSink for StalledSink {
    async fn send(&self, _line_protocol: &str) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<Result<(), SendError>>().await
    }
}

#[tokio::test]
async fn cancel_during_send_abandons_it() {
    let dir = tempfile::TempDir::new().unwrap();
    let start = write_log(
        dir.path(),
        "a.txt",
        &[line("host1", STAMP), line("host2", STAMP)],
        ago(60),
    );

    let sink = Arc::new(StalledSink::default());
    let mut forwarder = Forwarder::new(&ForwarderConfig::default(), Arc::clone(&sink))
        .with_wait_interval(WAIT);
    let cancel = forwarder.cancellation_token();
    let handle = tokio::spawn(async move { forwarder.run(&start).await });

    assert!(wait_until(Duration::from_secs(2), || sink.attempts.load(Ordering::SeqCst) == 1).await);

    let started = std::time::Instant::now();
    cancel.cancel();
    let stats = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("send was not abandoned")
        .unwrap()
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(stats.records_sent, 0);
    assert_eq!(stats.lines_read, 1);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_start_file_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut forwarder = Forwarder::new(&ForwarderConfig::default(), RecordingSink::default());
    let err = forwarder
        .run(&dir.path().join("missing.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, ForwarderError::Watcher(_)));
}
