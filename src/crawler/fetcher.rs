//! HTTP fetcher implementation
//!
//! This module navigates to a URL the way a browser tab would, using plain
//! HTTP requests:
//! - Building one HTTP client per session
//! - Following redirects by hand so every hop is recorded
//! - Following immediate meta refresh redirects
//! - Enforcing a deadline over the whole navigation
//! - Classifying failures and digesting the final page

use crate::config::FetchConfig;
use crate::crawler::parser::extract_meta_refresh;
use crate::crawler::{FetchService, FetchSession};
use crate::record::{FetchFailure, ResponseRecord, Transcript, BLANK_PAGE, ERROR_PAGE};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{redirect::Policy, Client};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

/// Length of the hex digest kept for a captured page
const CAPTURE_HASH_LEN: usize = 16;

/// Upper bound for establishing a connection, within the navigation deadline
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client for one fetch session
///
/// Redirects are disabled so the session can record each hop itself.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.navigation_timeout();

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// First 16 hex characters of the SHA-256 of `bytes`
pub fn capture_hash(bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    digest[..CAPTURE_HASH_LEN].to_string()
}

/// Fetch service backed by `reqwest`
pub struct HttpFetcher {
    config: FetchConfig,
    sessions_opened: AtomicU64,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            config,
            sessions_opened: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl FetchService for HttpFetcher {
    type Session = HttpSession;

    async fn open_session(&self) -> Result<HttpSession, FetchError> {
        let id = self.sessions_opened.fetch_add(1, Ordering::Relaxed) + 1;
        let client = build_http_client(&self.config)?;
        tracing::debug!("Opened HTTP session {}", id);
        Ok(HttpSession {
            id,
            client,
            config: self.config.clone(),
        })
    }
}

/// One HTTP session; dropping it releases its connection pool
pub struct HttpSession {
    id: u64,
    client: Client,
    config: FetchConfig,
}

/// What a navigation has observed so far
#[derive(Default)]
struct Navigation {
    responses: Vec<ResponseRecord>,
    current: Option<String>,
}

impl HttpSession {
    /// Follows `url` until a page loads, recording every response into `nav`
    ///
    /// Returns the final page body.
    async fn navigate(&self, url: &str, nav: &mut Navigation) -> Result<Vec<u8>, FetchFailure> {
        let mut current = Url::parse(url)
            .map_err(|e| FetchFailure::other(format!("Invalid URL {}: {}", url, e)))?;
        let mut visited = HashSet::new();
        let mut hops = 0;

        loop {
            if !visited.insert(current.as_str().to_string()) {
                return Err(FetchFailure::other(format!(
                    "Redirect loop detected at {}",
                    current
                )));
            }

            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(classify_error)?;

            let status = response.status();
            let response_url = response.url().to_string();
            nav.responses.push(ResponseRecord::new(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                response_url.as_str(),
            ));
            nav.current = Some(response_url);

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let next = match (status.is_redirection(), location) {
                (true, Some(location)) => Some(current.join(&location).map_err(|e| {
                    FetchFailure::other(format!("Invalid redirect target {:?}: {}", location, e))
                })?),
                _ => None,
            };

            let next = match next {
                Some(next) => next,
                None => {
                    let body = response.bytes().await.map_err(classify_error)?;
                    let refresh = if self.config.follow_meta_refresh && status.is_success() {
                        extract_meta_refresh(&String::from_utf8_lossy(&body), &current)
                    } else {
                        None
                    };
                    match refresh {
                        Some(target) => target,
                        None => return Ok(body.to_vec()),
                    }
                }
            };

            hops += 1;
            if hops > self.config.max_redirects {
                return Err(FetchFailure::other(format!(
                    "Too many redirects from {} (limit {})",
                    url, self.config.max_redirects
                )));
            }
            tracing::trace!("{} -> {}", current, next);
            current = next;
        }
    }
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn fetch(&self, url: &str) -> Transcript {
        let mut nav = Navigation::default();
        let deadline = self.config.navigation_timeout();

        let outcome = tokio::time::timeout(deadline, self.navigate(url, &mut nav)).await;
        match outcome {
            Ok(Ok(body)) => {
                tokio::time::sleep(self.config.settle_delay()).await;
                let final_url = nav.current.unwrap_or_else(|| url.to_string());
                Transcript::loaded(nav.responses, final_url, Some(capture_hash(&body)))
            }
            Ok(Err(failure)) => {
                tracing::debug!("Navigation to {} failed: {}", url, failure.message);
                let final_url = if nav.responses.is_empty() {
                    BLANK_PAGE
                } else {
                    ERROR_PAGE
                };
                Transcript::failed(nav.responses, final_url, failure)
            }
            Err(_) => {
                tracing::debug!("Navigation to {} timed out", url);
                let final_url = nav.current.unwrap_or_else(|| BLANK_PAGE.to_string());
                let failure = FetchFailure::timeout(format!(
                    "Navigation timeout of {} ms exceeded",
                    deadline.as_millis()
                ));
                Transcript::failed(nav.responses, final_url, failure)
            }
        }
    }

    async fn close(self) {
        tracing::debug!("Closed HTTP session {}", self.id);
    }
}

/// Maps a transport error onto a navigation failure
fn classify_error(error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::timeout(error.to_string())
    } else {
        let mut message = error.to_string();
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        FetchFailure::other(message)
    }
}
