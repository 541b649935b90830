//! Integration tests for the divergence report
//!
//! Records are written through the SQLite store, the way a crawl leaves
//! them, then scanned by the report with and without exception lists.

use https_parity::output::{load_exception_sets, run_report, ExceptionSet, Finding};
use https_parity::record::{FetchFailure, ResponseRecord, ResultRecord, Transcript};
use https_parity::storage::{MemoryStore, ResultStore, SqliteStore};
use https_parity::Verdict;

fn loaded(statuses: &[u16], final_url: &str) -> Transcript {
    let responses = statuses
        .iter()
        .map(|s| ResponseRecord::new(*s, "", final_url))
        .collect();
    Transcript::loaded(responses, final_url, Some("aaaabbbbccccdddd".to_string()))
}

/// A store holding one record per classifier outcome
fn populated(store: &mut impl ResultStore) {
    let records = [
        (
            "blank.com",
            ResultRecord::new(
                loaded(&[200], "http://blank.com/"),
                Transcript::failed(vec![], "about:blank", FetchFailure::other("refused")),
            ),
        ),
        (
            "broken.com",
            ResultRecord::new(
                loaded(&[200], "http://broken.com/"),
                loaded(&[503], "https://broken.com/"),
            ),
        ),
        (
            "example.com",
            ResultRecord::new(
                loaded(&[200], "http://example.com/"),
                loaded(&[200], "https://shop.example.com/"),
            ),
        ),
        (
            "moved.org",
            ResultRecord::new(
                loaded(&[301, 200], "http://moved.org/"),
                loaded(&[200], "https://moved.net/"),
            ),
        ),
        (
            "same.net",
            ResultRecord::new(
                loaded(&[301, 200], "http://www.same.net/index.html"),
                loaded(&[200], "https://same.net/"),
            ),
        ),
    ];
    for (domain, record) in &records {
        store.put(domain, record).unwrap();
    }
}

fn report(store: &impl ResultStore, exceptions: &[ExceptionSet]) -> (Vec<Finding>, https_parity::output::ReportSummary) {
    let mut findings = Vec::new();
    let summary = run_report(store, exceptions, |f| findings.push(f.clone()));
    (findings, summary)
}

#[test]
fn test_report_lists_suspicious_domains_in_key_order() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    populated(&mut store);

    let (findings, summary) = report(&store, &[]);
    let domains: Vec<&str> = findings.iter().map(|f| f.domain.as_str()).collect();

    assert_eq!(domains, vec!["example.com", "moved.org"]);
    assert!(findings
        .iter()
        .all(|f| f.classification.verdict == Verdict::Suspicious));
    assert_eq!(summary.scanned, 5);
    assert_eq!(summary.suspicious, 2);
    assert_eq!(summary.reported, 2);
}

#[test]
fn test_exception_list_suppresses_finding() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    std::fs::write(&first, "# reviewed\nexample.com\n").unwrap();
    std::fs::write(&second, "\n  unrelated.com \n").unwrap();

    let exceptions = load_exception_sets(&[first, second]).unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    populated(&mut store);

    let (findings, summary) = report(&store, &exceptions);

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].domain, "moved.org");
    assert_eq!(summary.suspicious, 2);
    assert_eq!(summary.suppressed_by_exception, 1);
}

#[test]
fn test_insecure_timeout_suppresses_finding() {
    let mut store = MemoryStore::new();
    store
        .put(
            "slow.com",
            &ResultRecord::new(
                Transcript::failed(
                    vec![ResponseRecord::new(200, "OK", "http://slow.com/")],
                    "http://slow.com/",
                    FetchFailure::timeout("Navigation timeout of 20000 ms exceeded"),
                ),
                loaded(&[200], "https://cdn.slow.net/"),
            ),
        )
        .unwrap();

    let (findings, summary) = report(&store, &[]);

    assert!(findings.is_empty());
    assert_eq!(summary.suspicious, 1);
    assert_eq!(summary.suppressed_by_timeout, 1);
}

#[test]
fn test_legacy_and_malformed_records() {
    let mut store = MemoryStore::new();
    populated(&mut store);

    // Older crawls wrote camelCase fields and a bare error message
    store.insert_raw(
        "legacy.com",
        r#"{"insecure":{"responses":[{"status":200,"statusText":"OK","url":"http://legacy.com/"}],"finalUrl":"http://legacy.com/","errorMessage":null},
            "secure":{"responses":[{"status":200,"statusText":"OK","url":"https://other.com/"}],"finalUrl":"https://other.com/","img_hash":"0011223344556677"}}"#,
    );
    store.insert_raw(
        "legacy-timeout.com",
        r#"{"insecure":{"responses":[],"finalUrl":"http://legacy-timeout.com/","errorMessage":"TimeoutError: Navigation timeout of 30000 ms exceeded"},
            "secure":{"responses":[{"status":200,"statusText":"OK","url":"https://x.com/"}],"finalUrl":"https://x.com/"}}"#,
    );
    store.insert_raw("corrupt.com", r#"{"insecure": 42}"#);
    store.insert_raw("truncated.com", r#"{"insecure":{"responses":["#);

    let (findings, summary) = report(&store, &[]);
    let domains: Vec<&str> = findings.iter().map(|f| f.domain.as_str()).collect();

    assert_eq!(domains, vec!["example.com", "legacy.com", "moved.org"]);
    assert_eq!(summary.malformed, 2);
    assert_eq!(summary.scanned, 7);
    assert_eq!(summary.suppressed_by_timeout, 1);

    let legacy = &findings[1];
    assert_eq!(legacy.record.secure.screenshot_hash.as_deref(), Some("0011223344556677"));
    assert!(legacy.to_string().contains("capture=0011223344556677"));
}

#[test]
fn test_exception_matches_mixed_case_store_key() {
    let mut store = MemoryStore::new();
    store
        .put(
            "Example.COM",
            &ResultRecord::new(
                loaded(&[200], "http://example.com/"),
                loaded(&[200], "https://shop.example.com/"),
            ),
        )
        .unwrap();
    let exceptions = vec![ExceptionSet::from_iter(["example.com"])];

    let (findings, summary) = report(&store, &exceptions);

    assert!(findings.is_empty());
    assert_eq!(summary.suppressed_by_exception, 1);
}

#[test]
fn test_undecodable_key_does_not_end_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.db");

    let mut store = SqliteStore::open(&path).unwrap();
    populated(&mut store);
    store.close().unwrap();

    // A damaged key between "broken.com" and "example.com"
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO results (domain, record, recorded_at) VALUES (CAST(X'632EFF' AS TEXT), '{}', '')",
        [],
    )
    .unwrap();
    drop(conn);

    let store = SqliteStore::open(&path).unwrap();
    let (findings, summary) = report(&store, &[]);
    let domains: Vec<&str> = findings.iter().map(|f| f.domain.as_str()).collect();

    assert_eq!(domains, vec!["example.com", "moved.org"]);
    assert_eq!(summary.scanned, 5);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.read_errors, 0);
}
