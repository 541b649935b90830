//! Integration tests for the crawler
//!
//! These tests use wiremock to stand up HTTP servers for the real fetcher,
//! and an instrumented fetch service to check the orchestrator against an
//! on-disk store.

use async_trait::async_trait;
use https_parity::classify::{classify, Verdict};
use https_parity::config::{parse_config, CrawlerConfig, FetchConfig};
use https_parity::crawler::{
    run_crawl, Coordinator, FetchService, FetchSession, HttpFetcher, RankedDomain,
};
use https_parity::record::{ResponseRecord, Transcript, BLANK_PAGE, ERROR_PAGE};
use https_parity::storage::{ResultStore, SqliteStore};
use https_parity::FetchError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetch_config() -> FetchConfig {
    FetchConfig {
        navigation_timeout_ms: 5_000,
        ..FetchConfig::default()
    }
}

async fn fetch(config: FetchConfig, url: &str) -> Transcript {
    let fetcher = HttpFetcher::new(config);
    let session = fetcher.open_session().await.expect("session");
    let transcript = session.fetch(url).await;
    session.close().await;
    transcript
}

fn statuses(transcript: &Transcript) -> Vec<u16> {
    transcript.responses.iter().map(|r| r.status).collect()
}

async fn redirect(server: &MockServer, from: &str, status: u16, to: &str) {
    Mock::given(method("GET"))
        .and(path(from))
        .respond_with(ResponseTemplate::new(status).insert_header("location", to))
        .mount(server)
        .await;
}

async fn page(server: &MockServer, at: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_redirect_chain_recorded_in_order() {
    let server = MockServer::start().await;
    redirect(&server, "/", 301, "/start").await;
    redirect(&server, "/start", 302, "/home").await;
    page(&server, "/home", 200, "<html><body>home</body></html>").await;

    let transcript = fetch(fetch_config(), &format!("{}/", server.uri())).await;

    assert_eq!(statuses(&transcript), vec![301, 302, 200]);
    assert_eq!(transcript.final_url, format!("{}/home", server.uri()));
    assert_eq!(transcript.responses[0].status_text, "Moved Permanently");
    assert!(transcript.error.is_none());
    assert_eq!(transcript.screenshot_hash.as_ref().map(String::len), Some(16));
}

#[tokio::test]
async fn test_error_status_is_a_response_not_a_failure() {
    let server = MockServer::start().await;
    page(&server, "/", 503, "down for maintenance").await;

    let transcript = fetch(fetch_config(), &format!("{}/", server.uri())).await;

    assert_eq!(statuses(&transcript), vec![503]);
    assert!(transcript.error.is_none());
    assert!(https_parity::classify::homepage_failed(&transcript));
}

#[tokio::test]
async fn test_redirect_loop_ends_navigation() {
    let server = MockServer::start().await;
    redirect(&server, "/a", 301, "/b").await;
    redirect(&server, "/b", 302, "/a").await;

    let transcript = fetch(fetch_config(), &format!("{}/a", server.uri())).await;

    assert_eq!(statuses(&transcript), vec![301, 302]);
    assert_eq!(transcript.final_url, ERROR_PAGE);
    let error = transcript.error.expect("loop is a failure");
    assert!(!error.kind.eq(&https_parity::FailureKind::Timeout));
    assert!(error.message.contains("loop"));
}

#[tokio::test]
async fn test_redirect_limit_enforced() {
    let server = MockServer::start().await;
    redirect(&server, "/r1", 301, "/r2").await;
    redirect(&server, "/r2", 301, "/r3").await;
    redirect(&server, "/r3", 301, "/r4").await;
    page(&server, "/r4", 200, "end").await;

    let config = FetchConfig {
        max_redirects: 2,
        ..fetch_config()
    };
    let transcript = fetch(config, &format!("{}/r1", server.uri())).await;

    assert_eq!(statuses(&transcript), vec![301, 301, 301]);
    assert!(transcript.error.is_some());
    assert!(!transcript.is_timeout());
}

#[tokio::test]
async fn test_meta_refresh_followed() {
    let server = MockServer::start().await;
    page(
        &server,
        "/",
        200,
        r#"<html><head><meta http-equiv="refresh" content="0; url=/landing"></head></html>"#,
    )
    .await;
    page(&server, "/landing", 200, "<html>landed</html>").await;

    let transcript = fetch(fetch_config(), &format!("{}/", server.uri())).await;
    assert_eq!(statuses(&transcript), vec![200, 200]);
    assert_eq!(transcript.final_url, format!("{}/landing", server.uri()));

    let config = FetchConfig {
        follow_meta_refresh: false,
        ..fetch_config()
    };
    let transcript = fetch(config, &format!("{}/", server.uri())).await;
    assert_eq!(statuses(&transcript), vec![200]);
}

#[tokio::test]
async fn test_navigation_deadline_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = FetchConfig {
        navigation_timeout_ms: 300,
        ..FetchConfig::default()
    };
    let transcript = fetch(config, &format!("{}/", server.uri())).await;

    assert!(transcript.is_timeout());
    assert!(transcript.responses.is_empty());
    assert_eq!(transcript.final_url, BLANK_PAGE);
}

#[tokio::test]
async fn test_secure_leg_against_plain_server_never_loads() {
    let server = MockServer::start().await;
    page(&server, "/", 200, "plain").await;

    let secure = server.uri().replacen("http://", "https://", 1);
    let transcript = fetch(fetch_config(), &secure).await;

    assert!(transcript.responses.is_empty());
    assert_eq!(transcript.final_url, BLANK_PAGE);
    assert!(transcript.error.is_some());
}

#[tokio::test]
async fn test_run_crawl_end_to_end_and_resume() {
    let server = MockServer::start().await;
    page(&server, "/", 200, "<html>hello</html>").await;
    let host = server.uri().trim_start_matches("http://").to_string();

    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("domains.csv");
    std::fs::write(&list, format!("rank,domain\n1,{}\n", host)).unwrap();
    let store_name = dir.path().join("results");

    let config = parse_config(&format!(
        r#"
[crawler]
concurrency = 2
batch-size = 10
domain-list = '{}'

[fetch]
navigation-timeout-ms = 5000

[store]
name = '{}'
"#,
        list.display(),
        store_name.display()
    ))
    .unwrap();

    let summary = run_crawl(config.clone(), None).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.batches, 1);

    let store = SqliteStore::open(&config.store.path()).unwrap();
    let record = store.get(&host).unwrap();
    assert_eq!(statuses(&record.insecure), vec![200]);
    assert_eq!(record.secure.final_url, BLANK_PAGE);

    let result = classify(&record);
    assert_eq!(result.verdict, Verdict::Ok);
    assert_eq!(result.rule, "secure-never-loaded");
    store.close().unwrap();

    let summary = run_crawl(config, None).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.batches, 0);
}

/// Fetch service that counts concurrent fetches and sessions
#[derive(Default)]
struct Counters {
    fetches: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    sessions: AtomicUsize,
}

struct CountingFetcher(Arc<Counters>);
struct CountingSession(Arc<Counters>);

#[async_trait]
impl FetchService for CountingFetcher {
    type Session = CountingSession;

    async fn open_session(&self) -> Result<CountingSession, FetchError> {
        self.0.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(CountingSession(self.0.clone()))
    }
}

#[async_trait]
impl FetchSession for CountingSession {
    async fn fetch(&self, url: &str) -> Transcript {
        self.0.fetches.fetch_add(1, Ordering::SeqCst);
        let active = self.0.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.peak.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.0.active.fetch_sub(1, Ordering::SeqCst);
        Transcript::loaded(vec![ResponseRecord::new(200, "OK", url)], url, None)
    }

    async fn close(self) {}
}

fn ranked(n: usize) -> Vec<RankedDomain> {
    (1..=n)
        .map(|i| RankedDomain::new(i as u64, format!("d{}.test", i)))
        .collect()
}

#[tokio::test]
async fn test_sqlite_store_resumes_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("results.db");
    let config = CrawlerConfig {
        concurrency: 3,
        batch_size: 4,
        ..CrawlerConfig::default()
    };

    // First run stops after 6 of 10 domains
    let counters = Arc::new(Counters::default());
    let store = SqliteStore::open(&db).unwrap();
    let mut coordinator = Coordinator::new(config.clone(), CountingFetcher(counters.clone()), store);
    let summary = coordinator.run(ranked(10).into_iter().take(6)).await.unwrap();
    assert_eq!(summary.persisted, 6);
    assert_eq!(summary.batches, 2);
    assert!(counters.peak.load(Ordering::SeqCst) <= 6);
    coordinator.into_store().close().unwrap();

    // Second run picks up the rest
    let counters = Arc::new(Counters::default());
    let store = SqliteStore::open(&db).unwrap();
    let mut coordinator = Coordinator::new(config, CountingFetcher(counters.clone()), store);
    let summary = coordinator.run(ranked(10)).await.unwrap();
    assert_eq!(summary.skipped, 6);
    assert_eq!(summary.persisted, 4);
    assert_eq!(counters.fetches.load(Ordering::SeqCst), 8);
    assert_eq!(counters.sessions.load(Ordering::SeqCst), 1);

    let store = coordinator.into_store();
    assert_eq!(store.count().unwrap(), 10);
    let keys: Vec<String> = store.keys().map(|k| k.unwrap()).collect();
    assert_eq!(keys.len(), 10);
    for item in store.iter() {
        let (domain, record) = item.unwrap();
        assert_eq!(record.insecure.final_url, format!("http://{}", domain));
        assert_eq!(record.secure.final_url, format!("https://{}", domain));
    }
}
