//! Data model for paired fetch results
//!
//! # Components
//!
//! - `ResponseRecord`: one network response observed during a navigation
//! - `Transcript`: the complete outcome of one leg (HTTP or HTTPS)
//! - `ResultRecord`: both legs of one domain, the unit of persistence

mod result;
mod transcript;

pub use result::ResultRecord;
pub use transcript::{FailureKind, FetchFailure, ResponseRecord, Transcript};

/// Final URL of a navigation that never received a response
pub const BLANK_PAGE: &str = "about:blank";

/// Final URL of a navigation that failed after it had started loading
pub const ERROR_PAGE: &str = "chrome-error://chromewebdata/";
