//! Statistics generation from a result store
//!
//! This module provides functionality for tallying stored records by verdict
//! and deciding rule, and for displaying the tally.

use crate::classify::{classify, Verdict};
use crate::storage::ResultStore;
use crate::ParityError;
use std::collections::BTreeMap;

/// Store statistics summary
#[derive(Debug, Clone, Default)]
pub struct StoreStatistics {
    /// Number of stored keys
    pub total_records: u64,

    /// Count of readable records by verdict
    pub by_verdict: BTreeMap<Verdict, u64>,

    /// Count of readable records by the rule that decided them
    pub by_rule: BTreeMap<&'static str, u64>,

    /// Records whose insecure leg hit its navigation deadline
    pub insecure_timeouts: u64,

    /// Records whose secure leg hit its navigation deadline
    pub secure_timeouts: u64,

    /// Records that could not be decoded
    pub malformed: u64,
}

/// Loads statistics from a store
///
/// # Arguments
///
/// * `store` - The store to scan
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully tallied statistics
/// * `Err(ParityError)` - The store itself could not be read
pub fn load_statistics<S: ResultStore + ?Sized>(store: &S) -> Result<StoreStatistics, ParityError> {
    let mut stats = StoreStatistics {
        total_records: store.count()?,
        ..StoreStatistics::default()
    };

    for item in store.iter() {
        let record = match item {
            Ok((_, record)) => record,
            Err(e) if e.is_record_level() => {
                tracing::debug!("{}", e);
                stats.malformed += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let classification = classify(&record);
        *stats.by_verdict.entry(classification.verdict).or_insert(0) += 1;
        *stats.by_rule.entry(classification.rule).or_insert(0) += 1;
        if record.insecure.is_timeout() {
            stats.insecure_timeouts += 1;
        }
        if record.secure.is_timeout() {
            stats.secure_timeouts += 1;
        }
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Result Store Statistics ===\n");

    println!("Records: {}", stats.total_records);
    if stats.malformed > 0 {
        println!("  Malformed: {}", stats.malformed);
    }
    println!();

    println!("Records by Verdict:");
    for (verdict, count) in &stats.by_verdict {
        println!(
            "  {}: {} ({:.1}%)",
            verdict,
            count,
            percentage(*count, stats.total_records)
        );
    }
    println!();

    println!("Records by Rule:");
    let mut rule_counts: Vec<_> = stats.by_rule.iter().collect();
    rule_counts.sort_by(|a, b| b.1.cmp(a.1));
    for (rule, count) in rule_counts {
        println!("  {}: {}", rule, count);
    }
    println!();

    println!("Timeouts:");
    println!("  Insecure leg: {}", stats.insecure_timeouts);
    println!("  Secure leg: {}", stats.secure_timeouts);
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
