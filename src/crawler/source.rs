//! Ranked domain list reader
//!
//! Reads a two-column `rank,domain` list lazily, one line at a time, so
//! million-entry lists never sit in memory.

use crate::SourceError;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// One entry of the ranked domain list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedDomain {
    pub rank: u64,
    pub domain: String,
}

impl RankedDomain {
    pub fn new(rank: u64, domain: impl Into<String>) -> Self {
        Self {
            rank,
            domain: domain.into(),
        }
    }
}

/// Lazy iterator over a ranked domain list
pub struct DomainSource<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl DomainSource<BufReader<File>> {
    /// Opens the list at `path`
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> DomainSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for DomainSource<R> {
    type Item = Result<RankedDomain, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }
            return Some(parse_line(&line).ok_or_else(|| SourceError::Malformed {
                line: self.line_no,
                content: line.clone(),
            }));
        }
    }
}

fn parse_line(line: &str) -> Option<RankedDomain> {
    let (rank, domain) = line.split_once(',')?;
    let rank = rank.trim().parse().ok()?;
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();

    if domain.is_empty() || domain.contains(|c: char| c.is_whitespace() || c == ',' || c == '/') {
        return None;
    }
    Some(RankedDomain { rank, domain })
}
