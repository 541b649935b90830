//! Anomaly classification for paired fetch results
//!
//! [`classify`] is a pure function of its input record: it runs the ordered
//! rule chain in [`rules`] and attaches per-leg diagnostics.

pub mod rules;

pub use rules::{error_count, homepage_failed, is_timeout, Rule, DEFAULT_RULE, RULES};

use crate::record::ResultRecord;
use crate::url::essence;
use std::fmt;

/// Outcome of classifying one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verdict {
    Ok,
    Broken,
    Suspicious,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Broken => "BROKEN",
            Self::Suspicious => "SUSPICIOUS",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic metrics for one leg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegDiagnostics {
    pub response_count: usize,
    pub error_count: usize,
    pub homepage_failed: bool,
    pub essence: String,
}

/// Verdict plus the evidence behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    /// Name of the rule that decided the verdict
    pub rule: &'static str,
    pub insecure: LegDiagnostics,
    pub secure: LegDiagnostics,
}

/// Classifies a record against the rule chain, first match wins
///
/// # Examples
///
/// ```
/// use https_parity::{classify, ResponseRecord, ResultRecord, Transcript, Verdict};
///
/// let insecure = Transcript::loaded(
///     vec![ResponseRecord::new(200, "OK", "http://example.com/")],
///     "http://example.com/",
///     None,
/// );
/// let secure = Transcript::loaded(
///     vec![ResponseRecord::new(503, "Service Unavailable", "https://example.com/")],
///     "https://example.com/",
///     None,
/// );
///
/// let result = classify(&ResultRecord::new(insecure, secure));
/// assert_eq!(result.verdict, Verdict::Broken);
/// ```
pub fn classify(record: &ResultRecord) -> Classification {
    let (verdict, rule) = RULES
        .iter()
        .find(|rule| (rule.applies)(record))
        .map_or((Verdict::Ok, DEFAULT_RULE), |rule| (rule.verdict, rule.name));

    Classification {
        verdict,
        rule,
        insecure: diagnose(&record.insecure),
        secure: diagnose(&record.secure),
    }
}

fn diagnose(transcript: &crate::record::Transcript) -> LegDiagnostics {
    LegDiagnostics {
        response_count: transcript.responses.len(),
        error_count: error_count(transcript),
        homepage_failed: homepage_failed(transcript),
        essence: essence(&transcript.final_url),
    }
}
