use serde::{Deserialize, Serialize};

/// One network response observed while navigating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    #[serde(default, alias = "statusText")]
    pub status_text: String,
    #[serde(default)]
    pub url: String,
}

impl ResponseRecord {
    pub fn new(status: u16, status_text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            url: url.into(),
        }
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Classification of a failed navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The navigation did not finish before its deadline
    #[serde(rename = "navigation timeout", alias = "TimeoutError")]
    Timeout,
    #[default]
    #[serde(rename = "other")]
    #[serde(other)]
    Other,
}

/// A navigation failure, captured inline in the leg's transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    #[serde(default, alias = "name")]
    pub kind: FailureKind,
    #[serde(default)]
    pub message: String,
}

impl FetchFailure {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Other,
            message: message.into(),
        }
    }

    /// Recovers a failure from a bare error message written by older crawls
    fn from_legacy_message(message: String) -> Self {
        if message.to_ascii_lowercase().contains("timeout") {
            Self::timeout(message)
        } else {
            Self::other(message)
        }
    }
}

/// Captured outcome of fetching one URL
///
/// Responses are kept in observation order. A transcript is only ever handed
/// out complete; nothing observes it while the navigation is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TranscriptRepr")]
pub struct Transcript {
    pub responses: Vec<ResponseRecord>,
    pub final_url: String,
    pub error: Option<FetchFailure>,
    /// First 16 hex chars of the SHA-256 of the captured page
    pub screenshot_hash: Option<String>,
}

impl Transcript {
    /// A navigation that completed and was captured
    pub fn loaded(
        responses: Vec<ResponseRecord>,
        final_url: impl Into<String>,
        screenshot_hash: Option<String>,
    ) -> Self {
        Self {
            responses,
            final_url: final_url.into(),
            error: None,
            screenshot_hash,
        }
    }

    /// A navigation that ended in `error`, keeping whatever was observed first
    pub fn failed(
        responses: Vec<ResponseRecord>,
        final_url: impl Into<String>,
        error: FetchFailure,
    ) -> Self {
        Self {
            responses,
            final_url: final_url.into(),
            error: Some(error),
            screenshot_hash: None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(&self.error, Some(e) if e.kind == FailureKind::Timeout)
    }
}

/// Accepts every field spelling earlier crawls have written
#[derive(Deserialize)]
struct TranscriptRepr {
    responses: Vec<ResponseRecord>,
    #[serde(default, alias = "finalUrl")]
    final_url: Option<String>,
    #[serde(default)]
    error: Option<FetchFailure>,
    #[serde(default, alias = "errorMessage")]
    error_message: Option<String>,
    #[serde(default, alias = "img_hash", alias = "screenshotHash")]
    screenshot_hash: Option<String>,
}

impl From<TranscriptRepr> for Transcript {
    fn from(repr: TranscriptRepr) -> Self {
        let error = repr
            .error
            .or_else(|| repr.error_message.map(FetchFailure::from_legacy_message));

        Self {
            responses: repr.responses,
            final_url: repr.final_url.unwrap_or_default(),
            error,
            screenshot_hash: repr.screenshot_hash,
        }
    }
}
