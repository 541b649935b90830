//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop, which:
//! - Admits domains from the ranked list in order, skipping completed ones
//! - Keeps at most `concurrency` domain tests in flight
//! - Rotates the fetch session every `batch-size` admitted domains
//! - Persists each domain's two legs as one record

use crate::config::{Config, CrawlerConfig};
use crate::crawler::source::{DomainSource, RankedDomain};
use crate::crawler::{FetchService, FetchSession, HttpFetcher};
use crate::record::{FetchFailure, ResultRecord};
use crate::storage::{ResultStore, SqliteStore};
use crate::url::Leg;
use crate::ParityError;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Domains already present in the store
    pub skipped: u64,
    /// Domains seen again while their first test was still in flight
    pub duplicates: u64,
    /// Domains whose test was started
    pub admitted: u64,
    /// Domains whose two legs both resolved
    pub completed: u64,
    /// Records written to the store
    pub persisted: u64,
    /// Records the store refused; retried by the next run
    pub write_failures: u64,
    /// Fetch sessions used
    pub batches: u64,
    /// Largest number of domain tests in flight at once
    pub peak_in_flight: usize,
    pub elapsed: Duration,
}

/// Fetches both legs of `domain` concurrently and pairs them up
pub async fn test_domain<S: FetchSession>(session: &S, domain: String) -> (String, ResultRecord) {
    let insecure_url = Leg::Insecure.url_for(&domain);
    let secure_url = Leg::Secure.url_for(&domain);

    let (insecure, secure) = tokio::join!(session.fetch(&insecure_url), session.fetch(&secure_url));

    (domain, ResultRecord::new(insecure, secure))
}

/// Main crawler coordinator structure
///
/// Owns everything one run mutates (store handle, counters, the set of
/// in-flight domains), so independent runs never share state.
pub struct Coordinator<F: FetchService, S: ResultStore> {
    config: CrawlerConfig,
    fetcher: F,
    store: S,
    stats: CrawlSummary,
    in_flight: HashSet<String>,
}

impl<F: FetchService, S: ResultStore> Coordinator<F, S> {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Concurrency, batch size and dry-run settings
    /// * `fetcher` - Source of fetch sessions
    /// * `store` - Result store checked for completed domains and written to
    pub fn new(config: CrawlerConfig, fetcher: F, store: S) -> Self {
        Self {
            config,
            fetcher,
            store,
            stats: CrawlSummary::default(),
            in_flight: HashSet::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Counters of the current (or last) run
    pub fn stats(&self) -> &CrawlSummary {
        &self.stats
    }

    /// Gives the store back, e.g. to close it or to run again
    pub fn into_store(self) -> S {
        self.store
    }

    /// Crawls every domain of `domains` until the sequence is exhausted
    ///
    /// Each batch opens a fresh fetch session, admits up to `batch-size`
    /// domains with at most `concurrency` in flight, then drains and closes
    /// the session before the next batch starts.
    pub async fn run<I>(&mut self, domains: I) -> Result<CrawlSummary, ParityError>
    where
        I: IntoIterator<Item = RankedDomain>,
    {
        let start = Instant::now();
        self.stats = CrawlSummary::default();
        let mut domains = domains.into_iter();

        tracing::info!(
            "Starting crawl (concurrency {}, batch size {}{})",
            self.config.concurrency,
            self.config.batch_size,
            if self.config.dry_run { ", dry run" } else { "" }
        );

        while let Some(first) = self.next_admissible(&mut domains) {
            let batch = self.stats.batches + 1;
            tracing::info!("Opening fetch session for batch {}", batch);
            let session = self.fetcher.open_session().await?;

            self.run_batch(&session, first, &mut domains).await;

            session.close().await;
            self.stats.batches = batch;

            let elapsed = start.elapsed();
            tracing::info!(
                "Batch {} drained: {} domains tested, {} skipped, {:.1}s elapsed ({:.2} domains/sec)",
                batch,
                self.stats.completed,
                self.stats.skipped,
                elapsed.as_secs_f64(),
                self.stats.completed as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
            );
        }

        self.stats.elapsed = start.elapsed();
        tracing::info!(
            "Crawl finished: {} tested, {} stored, {} skipped, {} write failures in {:?}",
            self.stats.completed,
            self.stats.persisted,
            self.stats.skipped,
            self.stats.write_failures,
            self.stats.elapsed
        );

        Ok(self.stats.clone())
    }

    /// Runs one batch against `session` and drains it
    async fn run_batch<D>(&mut self, session: &F::Session, first: RankedDomain, domains: &mut D)
    where
        D: Iterator<Item = RankedDomain>,
    {
        let mut pending = FuturesUnordered::new();
        let mut admitted = 0;
        let mut next = Some(first);

        while let Some(entry) = next {
            tracing::debug!("Admitting #{} {}", entry.rank, entry.domain);
            self.in_flight.insert(entry.domain.clone());
            pending.push(test_domain(session, entry.domain));
            admitted += 1;
            self.stats.admitted += 1;
            self.stats.peak_in_flight = self.stats.peak_in_flight.max(pending.len());

            // Pool full: wait for whichever test finishes first
            if pending.len() >= self.config.concurrency {
                if let Some((domain, record)) = pending.next().await {
                    self.complete(domain, record);
                }
            }

            next = if admitted < self.config.batch_size {
                self.next_admissible(domains)
            } else {
                None
            };
        }

        while let Some((domain, record)) = pending.next().await {
            self.complete(domain, record);
        }
    }

    /// Pulls domains until one needs testing
    fn next_admissible<D>(&mut self, domains: &mut D) -> Option<RankedDomain>
    where
        D: Iterator<Item = RankedDomain>,
    {
        for entry in domains.by_ref() {
            if self.in_flight.contains(&entry.domain) {
                tracing::debug!("Skipping {}: already in flight", entry.domain);
                self.stats.duplicates += 1;
                continue;
            }

            match self.store.has(&entry.domain) {
                Ok(true) => {
                    tracing::trace!("Skipping {}: already stored", entry.domain);
                    self.stats.skipped += 1;
                }
                Ok(false) => return Some(entry),
                Err(e) => {
                    tracing::warn!(
                        "Existence check failed for {}: {}; testing it anyway",
                        entry.domain,
                        e
                    );
                    return Some(entry);
                }
            }
        }
        None
    }

    /// Records a finished domain test
    fn complete(&mut self, domain: String, record: ResultRecord) {
        self.in_flight.remove(&domain);
        self.stats.completed += 1;

        tracing::debug!(
            "Domain test {}: {} ({} / {} responses{}{})",
            self.stats.completed,
            domain,
            record.insecure.responses.len(),
            record.secure.responses.len(),
            leg_note("insecure", record.insecure.error.as_ref()),
            leg_note("secure", record.secure.error.as_ref()),
        );

        if self.config.dry_run {
            return;
        }

        match self.store.put(&domain, &record) {
            Ok(()) => self.stats.persisted += 1,
            Err(e) => {
                self.stats.write_failures += 1;
                tracing::error!("Failed to store result for {}: {}", domain, e);
            }
        }
    }
}

fn leg_note(leg: &str, error: Option<&FetchFailure>) -> String {
    match error {
        Some(failure) => format!(", {} failed: {}", leg, failure.message),
        None => String::new(),
    }
}

/// Runs a complete crawl from configuration
///
/// Opens the store, streams the domain list through a [`Coordinator`] backed
/// by [`HttpFetcher`], and closes the store on every exit path. Ctrl-C stops
/// admission; domains in flight at that moment are absent from the store and
/// get retried by the next run.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `limit` - Stop after this many list entries
pub async fn run_crawl(config: Config, limit: Option<usize>) -> Result<CrawlSummary, ParityError> {
    let source = DomainSource::open(&config.crawler.domain_list)?;
    let domains = source
        .filter_map(|entry| match entry {
            Ok(domain) => Some(domain),
            Err(e) => {
                tracing::warn!("Skipping domain list entry: {}", e);
                None
            }
        })
        .take(limit.unwrap_or(usize::MAX));

    let store = SqliteStore::open(&config.store.path())?;
    let fetcher = HttpFetcher::new(config.fetch.clone());
    let mut coordinator = Coordinator::new(config.crawler.clone(), fetcher, store);

    let outcome = tokio::select! {
        result = coordinator.run(domains) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let summary = match outcome {
        Some(result) => result,
        None => {
            tracing::warn!("Interrupted; unfinished domains will be retried on the next run");
            Ok(coordinator.stats().clone())
        }
    };

    coordinator.into_store().close()?;
    summary
}
