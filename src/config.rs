use crate::pagination::PaginationConfig;
use std::env;
use tokio::sync::Semaphore;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: String, value: String },
    #[error("{name} must be at most {max}, got {value}")]
    TooLarge { name: String, value: usize, max: usize },
    #[error("expected key=value, got {0:?}")]
    InvalidPair(String),
}

/// Fetcher tuning: how many requests may be in flight and how many attempts each gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub concurrency: usize,
    pub max_retries: u32,
    pub pagination: PaginationConfig,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_retries: 3,
            pagination: PaginationConfig::default(),
        }
    }
}

impl FetcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "concurrency".into(),
                value: "0".into(),
            });
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::TooLarge {
                name: "concurrency".into(),
                value: self.concurrency,
                max: Semaphore::MAX_PERMITS,
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "max_retries".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }
}

/// Runtime configuration for the miner binary.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - MINER_CONCURRENCY (default: 5)
    /// - MINER_MAX_RETRIES (default: 3)
    /// - MINER_HTTP_TIMEOUT_SECS (default: 30)
    /// - MINER_USER_AGENT (default: page-miner/<version>)
    /// - MINER_PAGE_PARAM (default: pagina)
    /// - MINER_ITEMS_FIELD (default: dados)
    /// - MINER_LINKS_FIELD (default: links)
    /// - MINER_MIN_LINKS (default: 2)
    /// - MINER_MAX_PAGES (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FetcherConfig::default();
        let pagination = PaginationConfig {
            page_param: lookup("MINER_PAGE_PARAM").unwrap_or(defaults.pagination.page_param),
            items_field: lookup("MINER_ITEMS_FIELD").unwrap_or(defaults.pagination.items_field),
            links_field: lookup("MINER_LINKS_FIELD").unwrap_or(defaults.pagination.links_field),
            min_links: number(&lookup, "MINER_MIN_LINKS", defaults.pagination.min_links, true)?,
            max_pages: number(&lookup, "MINER_MAX_PAGES", defaults.pagination.max_pages, false)?,
        };
        let fetcher = FetcherConfig {
            concurrency: number(&lookup, "MINER_CONCURRENCY", defaults.concurrency, false)?,
            max_retries: number(&lookup, "MINER_MAX_RETRIES", defaults.max_retries, false)?,
            pagination,
        };
        let timeout_secs = number(&lookup, "MINER_HTTP_TIMEOUT_SECS", 30u64, false)?;
        let user_agent = lookup("MINER_USER_AGENT")
            .unwrap_or_else(|| format!("page-miner/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            fetcher,
            user_agent,
            timeout_secs,
        })
    }
}

fn number<F, T>(lookup: &F, name: &str, default: T, allow_zero: bool) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialEq + Default,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(v) if allow_zero || v != T::default() => Ok(v),
        _ => Err(ConfigError::InvalidNumber {
            name: name.to_string(),
            value: raw,
        }),
    }
}

/// Split a `key=value` argument.
pub fn parse_pair(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(ConfigError::InvalidPair(raw.to_string())),
    }
}
