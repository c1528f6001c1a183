mod common;

use std::sync::Arc;
use std::time::Duration;

use relay_engine::{BufferStore, CycleReport, RelayError, SegmentFetcher, create_client};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::fast_config;

struct Fixture {
    _dir: tempfile::TempDir,
    buffer: BufferStore,
    fetcher: SegmentFetcher,
}

async fn fixture(server: &MockServer) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(fast_config(dir.path()));
    let buffer = BufferStore::new(config.buffer_path());
    buffer.reset().await.unwrap();

    let manifest_url = Url::parse(&format!("{}/live/playlist.m3u8", server.uri())).unwrap();
    let client = create_client(&config.http).unwrap();
    let fetcher = SegmentFetcher::new(client, manifest_url, buffer.clone(), config);

    Fixture {
        _dir: dir,
        buffer,
        fetcher,
    }
}

async fn mount_manifest(server: &MockServer, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path("/live/playlist.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
        .mount(server)
        .await;
}

async fn mount_segment(server: &MockServer, name: &str, body: &[u8], expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/live/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn duplicate_and_foreign_lines_are_not_fetched() {
    let server = MockServer::start().await;
    mount_manifest(&server, "seg1.aac\nseg2.aac\nseg1.aac\nother.txt\n").await;
    mount_segment(&server, "seg1.aac", b"one-", 1).await;
    mount_segment(&server, "seg2.aac", b"two", 1).await;
    mount_segment(&server, "other.txt", b"nope", 0).await;

    let mut fx = fixture(&server).await;
    let report = fx.fetcher.run_cycle(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        report,
        CycleReport {
            listed: 3,
            downloaded: 2,
            skipped: 1,
            failed: 0,
        }
    );
    assert_eq!(tokio::fs::read(fx.buffer.path()).await.unwrap(), b"one-two");
}

#[tokio::test]
async fn eleven_distinct_segments_keep_the_last_ten() {
    let server = MockServer::start().await;
    let names: Vec<String> = (1..=11).map(|i| format!("chunk{i:02}.aac")).collect();
    let manifest: String = names
        .iter()
        .map(|name| format!("{}/live/{name}\n", server.uri()))
        .collect();
    mount_manifest(&server, manifest).await;
    for name in &names {
        mount_segment(&server, name, b"x", 1).await;
    }

    let mut fx = fixture(&server).await;
    let report = fx.fetcher.run_cycle(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.downloaded, 11);
    let dedup = fx.fetcher.dedup();
    assert_eq!(dedup.len(), 10);
    let first = format!("{}/live/{}", server.uri(), names[0]);
    assert!(!dedup.contains(&first));
    for name in &names[1..] {
        assert!(dedup.contains(&format!("{}/live/{name}", server.uri())));
    }
    assert_eq!(fx.buffer.len().await.unwrap(), 11);
}

#[tokio::test]
async fn refreshed_manifest_only_downloads_new_segments() {
    let server = MockServer::start().await;
    mount_manifest(&server, "a.aac\nb.aac\n").await;
    mount_segment(&server, "a.aac", b"A", 1).await;
    mount_segment(&server, "b.aac", b"B", 1).await;

    let mut fx = fixture(&server).await;
    let token = CancellationToken::new();
    fx.fetcher.run_cycle(&token).await.unwrap();
    let second = fx.fetcher.run_cycle(&token).await.unwrap();

    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(tokio::fs::read(fx.buffer.path()).await.unwrap(), b"AB");
}

#[tokio::test]
async fn failed_segment_is_abandoned_and_the_next_one_still_appended() {
    let server = MockServer::start().await;
    mount_manifest(&server, "gone.aac\nok.aac\n").await;
    Mock::given(method("GET"))
        .and(path("/live/gone.aac"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_segment(&server, "ok.aac", b"OK", 1).await;

    let mut fx = fixture(&server).await;
    let token = CancellationToken::new();
    let first = fx.fetcher.run_cycle(&token).await.unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(first.downloaded, 1);

    // The failed segment is remembered and not retried.
    let second = fx.fetcher.run_cycle(&token).await.unwrap();
    assert_eq!(second.skipped, 2);
    assert_eq!(tokio::fs::read(fx.buffer.path()).await.unwrap(), b"OK");
}

#[tokio::test]
async fn manifest_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/playlist.m3u8"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut fx = fixture(&server).await;
    let err = fx
        .fetcher
        .run_cycle(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::HttpStatus { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn cancelled_cycle_returns_cancelled() {
    let server = MockServer::start().await;
    mount_manifest(&server, "a.aac\n").await;
    mount_segment(&server, "a.aac", b"A", 0).await;

    let mut fx = fixture(&server).await;
    let token = CancellationToken::new();
    token.cancel();

    let err = fx.fetcher.run_cycle(&token).await.unwrap_err();
    assert!(matches!(err, RelayError::Cancelled));
    assert_eq!(fx.buffer.len().await.unwrap(), 0);
}

#[tokio::test]
async fn run_loop_retries_and_exits_on_cancel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/playlist.m3u8"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fx = fixture(&server).await;
    let token = CancellationToken::new();
    let task = tokio::spawn(fx.fetcher.run(token.clone()));

    // Retries every 50ms, so several manifest requests arrive.
    let mut seen = 0;
    for _ in 0..500 {
        seen = server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0);
        if seen >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(seen >= 2, "expected manifest retries, saw {seen} requests");

    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("fetcher should exit promptly")
        .unwrap();
}
