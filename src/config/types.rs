use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for HTTPS-Parity
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub store: StoreConfig,
    pub report: ReportConfig,
}

/// Crawl orchestration configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of domains tested at once
    pub concurrency: usize,

    /// Domains admitted per fetch session before it is rotated
    pub batch_size: usize,

    /// Fetch but never persist
    pub dry_run: bool,

    /// Ranked `rank,domain` list to crawl
    pub domain_list: PathBuf,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            batch_size: 500,
            dry_run: false,
            domain_list: PathBuf::from("top-1m.csv"),
        }
    }
}

/// Per-leg fetch behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Deadline for one complete navigation (milliseconds)
    pub navigation_timeout_ms: u64,

    /// Pause after the page loads and before it is captured (milliseconds)
    pub settle_delay_ms: u64,

    /// Longest redirect chain followed before the navigation is abandoned
    pub max_redirects: usize,

    /// Treat `<meta http-equiv="refresh">` as a navigation step
    pub follow_meta_refresh: bool,

    /// User agent sent with every request
    pub user_agent: String,
}

impl FetchConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 20_000,
            settle_delay_ms: 0,
            max_redirects: 20,
            follow_meta_refresh: true,
            user_agent: format!("https-parity/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Result store location
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StoreConfig {
    /// Store name; the database file is `<name>.db`
    pub name: String,
}

impl StoreConfig {
    /// Path of the SQLite database backing this store
    pub fn path(&self) -> PathBuf {
        PathBuf::from(format!("{}.db", self.name))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "results".to_string(),
        }
    }
}

/// Report configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReportConfig {
    /// Flat files listing domains never reported as suspicious
    pub exception_lists: Vec<PathBuf>,
}

/// Command-line values that replace file settings before validation
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub concurrency: Option<usize>,
    pub batch_size: Option<usize>,
    pub store_name: Option<String>,
    pub domain_list: Option<PathBuf>,
    /// Only ever turns dry-run on
    pub dry_run: bool,
}

impl ConfigOverrides {
    /// Folds the overrides into `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.crawler.concurrency = concurrency;
        }
        if let Some(batch_size) = self.batch_size {
            config.crawler.batch_size = batch_size;
        }
        if let Some(name) = &self.store_name {
            config.store.name = name.clone();
        }
        if let Some(domain_list) = &self.domain_list {
            config.crawler.domain_list = domain_list.clone();
        }
        if self.dry_run {
            config.crawler.dry_run = true;
        }
    }
}
