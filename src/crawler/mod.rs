//! Crawler module for paired HTTP/HTTPS fetching
//!
//! This module contains the crawl side of the pipeline, including:
//! - The fetch capability (`FetchService` / `FetchSession`) and its HTTP implementation
//! - Meta refresh detection, so client-side redirects count as navigation
//! - The ranked domain list reader
//! - The bounded-concurrency, resumable crawl coordinator

mod coordinator;
mod fetcher;
mod parser;
mod source;

pub use coordinator::{run_crawl, test_domain, Coordinator, CrawlSummary};
pub use fetcher::{build_http_client, capture_hash, HttpFetcher, HttpSession};
pub use parser::extract_meta_refresh;
pub use source::{DomainSource, RankedDomain};

use crate::record::Transcript;
use crate::FetchError;
use async_trait::async_trait;

/// Something that can hand out fetch sessions
///
/// The coordinator opens one session per batch and closes it at the batch's
/// drain point, so anything a session accumulates is bounded by the batch size.
#[async_trait]
pub trait FetchService: Send + Sync {
    type Session: FetchSession;

    /// Allocates a fresh session
    async fn open_session(&self) -> Result<Self::Session, FetchError>;
}

/// A live fetch session
#[async_trait]
pub trait FetchSession: Send + Sync {
    /// Performs one navigation to `url` and returns its complete transcript
    ///
    /// Never fails: every navigation problem is captured in the transcript's
    /// `error` field. Implementations must enforce their own deadline.
    async fn fetch(&self, url: &str) -> Transcript;

    /// Tears the session down
    async fn close(self);
}
