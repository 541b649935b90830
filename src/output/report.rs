//! Suspicious-divergence report over a result store
//!
//! Scans every stored record in key order, classifies it, and hands each
//! reportable finding to a caller-supplied sink. A record that cannot be read
//! is logged and counted; the scan always continues.

use crate::classify::{classify, Classification, Verdict};
use crate::output::exceptions::{is_excepted, ExceptionSet};
use crate::record::{ResultRecord, Transcript};
use crate::storage::{ResultStore, StorageError};
use crate::ClassificationError;
use std::fmt;

/// One suspicious domain worth a human look
#[derive(Debug, Clone)]
pub struct Finding {
    pub domain: String,
    pub record: ResultRecord,
    pub classification: Classification,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diag = &self.classification;
        write!(f, "{} {}", diag.verdict, self.domain)?;
        write_leg(f, "http", &self.record.insecure, &diag.insecure)?;
        write_leg(f, "https", &self.record.secure, &diag.secure)
    }
}

fn write_leg(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    transcript: &Transcript,
    diag: &crate::classify::LegDiagnostics,
) -> fmt::Result {
    write!(
        f,
        " | {} {} responses={} errors={} homepage_failed={} capture={}",
        label,
        transcript.final_url,
        diag.response_count,
        diag.error_count,
        diag.homepage_failed,
        transcript.screenshot_hash.as_deref().unwrap_or("-")
    )
}

/// Counters for one report scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Records read and classified
    pub scanned: u64,
    /// Records classified SUSPICIOUS
    pub suspicious: u64,
    /// Findings handed to the sink
    pub reported: u64,
    /// Suspicious records whose domain is on an exception list
    pub suppressed_by_exception: u64,
    /// Suspicious records whose insecure leg timed out
    pub suppressed_by_timeout: u64,
    /// Records skipped because they could not be decoded
    pub malformed: u64,
    /// Store failures that ended or interrupted the scan
    pub read_errors: u64,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} Suspicious: {} (reported {}, excepted {}, timed out {}, malformed {})",
            self.scanned,
            self.suspicious,
            self.reported,
            self.suppressed_by_exception,
            self.suppressed_by_timeout,
            self.malformed
        )
    }
}

/// Runs the report over every record of `store`
///
/// A finding is emitted only for a SUSPICIOUS verdict whose domain is on no
/// exception list and whose insecure leg did not time out.
///
/// # Arguments
///
/// * `store` - Store to scan
/// * `exceptions` - Exception lists; a domain on any of them is suppressed
/// * `sink` - Called once per finding, in key order
///
/// # Returns
///
/// The scan counters
pub fn run_report<S, F>(store: &S, exceptions: &[ExceptionSet], mut sink: F) -> ReportSummary
where
    S: ResultStore + ?Sized,
    F: FnMut(&Finding),
{
    let mut summary = ReportSummary::default();

    for item in store.iter() {
        let (domain, record) = match item {
            Ok(entry) => entry,
            Err(e) if e.is_record_level() => {
                summary.malformed += 1;
                tracing::warn!("Skipping record: {}", ClassificationError::from(e));
                continue;
            }
            Err(e) => {
                summary.read_errors += 1;
                tracing::error!("Store read failed during report scan: {}", e);
                continue;
            }
        };

        summary.scanned += 1;
        let classification = classify(&record);
        tracing::trace!(
            "{}: {} by rule {}",
            domain,
            classification.verdict,
            classification.rule
        );

        if classification.verdict != Verdict::Suspicious {
            continue;
        }
        summary.suspicious += 1;

        if is_excepted(exceptions, &domain) {
            tracing::debug!("{} is suspicious but excepted", domain);
            summary.suppressed_by_exception += 1;
            continue;
        }
        if record.insecure.is_timeout() {
            tracing::debug!("{} is suspicious but its insecure leg timed out", domain);
            summary.suppressed_by_timeout += 1;
            continue;
        }

        summary.reported += 1;
        sink(&Finding {
            domain,
            record,
            classification,
        });
    }

    tracing::info!("Report scan finished: {}", summary);
    summary
}

impl From<StorageError> for ClassificationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Malformed { domain, reason } => Self::Malformed { domain, reason },
            other => Self::Unreadable(other.to_string()),
        }
    }
}
