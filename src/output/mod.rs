//! Output module for reports and store statistics
//!
//! This module handles:
//! - Loading the exception lists that suppress known divergences
//! - Scanning the store for suspicious records
//! - Tallying stored records by verdict

pub mod exceptions;
pub mod report;
pub mod stats;

pub use exceptions::{is_excepted, load_exception_sets, ExceptionSet};
pub use report::{run_report, Finding, ReportSummary};
pub use stats::{load_statistics, print_statistics, StoreStatistics};
