//! URL handling module for HTTPS-Parity
//!
//! This module builds the two leg URLs for a domain, recognises the
//! browser-internal pages a failed navigation ends on, and reduces URLs to
//! their essence for cross-protocol comparison.

mod essence;

pub use essence::essence;

/// Prefixes of pages a browser shows when nothing real was loaded
const INTERNAL_PAGE_PREFIXES: &[&str] = &["about:", "chrome-error:", "chrome://"];

/// One of the two fetches composing a domain's test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    Insecure,
    Secure,
}

impl Leg {
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Insecure => "http",
            Self::Secure => "https",
        }
    }

    /// Homepage URL of `domain` for this leg
    ///
    /// # Examples
    ///
    /// ```
    /// use https_parity::url::Leg;
    ///
    /// assert_eq!(Leg::Insecure.url_for("example.com"), "http://example.com");
    /// assert_eq!(Leg::Secure.url_for("example.com"), "https://example.com");
    /// ```
    pub fn url_for(&self, domain: &str) -> String {
        format!("{}://{}", self.scheme(), domain)
    }
}

/// Returns true if `url` is a browser-internal blank or error page
///
/// An empty URL counts too: older records left it out when the navigation
/// never committed.
pub fn is_browser_internal(url: &str) -> bool {
    let url = url.trim();
    url.is_empty()
        || INTERNAL_PAGE_PREFIXES
            .iter()
            .any(|prefix| url.starts_with(prefix))
}
