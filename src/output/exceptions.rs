//! Operator-curated exception lists
//!
//! An exception list is a flat text file with one domain per line. Domains in
//! any loaded list are never reported as suspicious.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Immutable set of domains excluded from suspicious reporting
#[derive(Debug, Clone, Default)]
pub struct ExceptionSet {
    source: Option<PathBuf>,
    domains: HashSet<String>,
}

impl ExceptionSet {
    /// Loads an exception list from `path`
    ///
    /// # Arguments
    ///
    /// * `path` - File with one domain per line; blank lines and `#` comments
    ///   are ignored
    ///
    /// # Returns
    ///
    /// * `Ok(ExceptionSet)` - The loaded set
    /// * `Err(io::Error)` - The file could not be read
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let mut set = Self::from_reader(BufReader::new(File::open(path)?))?;
        set.source = Some(path.to_path_buf());
        tracing::info!(
            "Loaded {} exception domains from {}",
            set.len(),
            path.display()
        );
        Ok(set)
    }

    /// Reads an exception list from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut domains = HashSet::new();
        for line in reader.lines() {
            if let Some(domain) = normalize_line(&line?) {
                domains.insert(domain);
            }
        }
        Ok(Self {
            source: None,
            domains,
        })
    }

    /// Returns true if `domain` is listed, ignoring case and a trailing dot
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&normalize_domain(domain))
    }

    /// File the set was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExceptionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            source: None,
            domains: iter
                .into_iter()
                .filter_map(|d| normalize_line(&d.into()))
                .collect(),
        }
    }
}

/// Returns true if any of `sets` lists `domain`
pub fn is_excepted(sets: &[ExceptionSet], domain: &str) -> bool {
    sets.iter().any(|set| set.contains(domain))
}

/// Loads every configured exception list, in order
pub fn load_exception_sets(paths: &[PathBuf]) -> std::io::Result<Vec<ExceptionSet>> {
    paths.iter().map(|path| ExceptionSet::load(path)).collect()
}

fn normalize_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(normalize_domain(line))
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}
