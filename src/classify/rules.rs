//! Ordered anomaly rules
//!
//! Rules are evaluated top to bottom and the first one whose predicate holds
//! decides the verdict. Reordering entries in [`RULES`] changes precedence.

use crate::classify::Verdict;
use crate::record::{ResultRecord, Transcript};
use crate::url::{essence, is_browser_internal};

/// The insecure leg needs more responses than this before the redirect-shape
/// rule applies; the secure leg then has at least this many
const REDIRECT_SHAPE_MIN_RESPONSES: usize = 10;

/// One entry of the rule chain
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Stable identifier, reported alongside the verdict
    pub name: &'static str,
    pub applies: fn(&ResultRecord) -> bool,
    pub verdict: Verdict,
}

/// The rule chain, in priority order
pub const RULES: &[Rule] = &[
    Rule {
        name: "secure-never-loaded",
        applies: secure_never_loaded,
        verdict: Verdict::Ok,
    },
    Rule {
        name: "insecure-never-loaded",
        applies: insecure_never_loaded,
        verdict: Verdict::Ok,
    },
    Rule {
        name: "secure-homepage-failed",
        applies: secure_homepage_regressed,
        verdict: Verdict::Broken,
    },
    Rule {
        name: "upgrade-redirect-shape",
        applies: upgrade_redirect_shape,
        verdict: Verdict::Ok,
    },
    Rule {
        name: "destination-mismatch",
        applies: destinations_diverge,
        verdict: Verdict::Suspicious,
    },
];

/// Name reported when no rule in the chain matched
pub const DEFAULT_RULE: &str = "default";

/// Returns true if the homepage itself did not load
///
/// Redirects are skipped; the first non-redirect response is the homepage. A
/// transcript with no such response failed by definition.
pub fn homepage_failed(transcript: &Transcript) -> bool {
    transcript
        .responses
        .iter()
        .find(|r| !r.is_redirect())
        .map_or(true, |r| r.is_error())
}

/// Number of responses with an error status; diagnostic only
pub fn error_count(transcript: &Transcript) -> usize {
    transcript.responses.iter().filter(|r| r.is_error()).count()
}

/// Returns true if the leg ended on its navigation deadline
pub fn is_timeout(transcript: &Transcript) -> bool {
    transcript.is_timeout()
}

fn secure_never_loaded(record: &ResultRecord) -> bool {
    is_browser_internal(&record.secure.final_url)
}

fn insecure_never_loaded(record: &ResultRecord) -> bool {
    is_browser_internal(&record.insecure.final_url)
}

fn secure_homepage_regressed(record: &ResultRecord) -> bool {
    homepage_failed(&record.secure) && !homepage_failed(&record.insecure)
}

/// The insecure leg is the secure leg plus one leading redirect hop
fn upgrade_redirect_shape(record: &ResultRecord) -> bool {
    let insecure = &record.insecure.responses;
    let secure = &record.secure.responses;

    insecure.len() > REDIRECT_SHAPE_MIN_RESPONSES
        && secure.len() >= REDIRECT_SHAPE_MIN_RESPONSES
        && insecure.len() == secure.len() + 1
        && insecure[0].is_redirect()
}

fn destinations_diverge(record: &ResultRecord) -> bool {
    essence(&record.insecure.final_url) != essence(&record.secure.final_url)
}
