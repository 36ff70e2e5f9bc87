// src/config/feed.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/feed.toml";

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_LIMIT: usize = 50;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 4;
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub api_base: String,
    pub poll_interval: Duration,
    pub latest_limit: usize,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub listen_addr: SocketAddr,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            latest_limit: DEFAULT_LIMIT,
            page_size: DEFAULT_LIMIT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .expect("default listen address must be valid"),
        }
    }
}

/// On-disk shape; every key optional so a file can override a subset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeedFile {
    api_base: Option<String>,
    poll_interval_secs: Option<u64>,
    latest_limit: Option<usize>,
    page_size: Option<usize>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    listen_addr: Option<String>,
}

impl FeedConfig {
    /// Load using env var + fallbacks, then apply per-field env overrides:
    /// 1) $FEED_CONFIG_PATH
    /// 2) config/feed.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
        } else {
            Self::default()
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing feed config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: FeedFile = toml::from_str(s)?;
        let mut cfg = Self::default();
        if let Some(v) = file.api_base {
            cfg.api_base = v;
        }
        if let Some(v) = file.poll_interval_secs {
            cfg.poll_interval = Duration::from_secs(v);
        }
        if let Some(v) = file.latest_limit {
            cfg.latest_limit = v;
        }
        if let Some(v) = file.page_size {
            cfg.page_size = v;
        }
        if let Some(v) = file.request_timeout_secs {
            cfg.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.connect_timeout_secs {
            cfg.connect_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.listen_addr {
            cfg.listen_addr = v
                .parse()
                .with_context(|| format!("listen_addr '{v}' is not a socket address"))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_var("FEED_API_BASE")? {
            self.api_base = v;
        }
        if let Some(v) = env_parse::<u64>("FEED_POLL_INTERVAL_SECS")? {
            self.poll_interval = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<usize>("FEED_LATEST_LIMIT")? {
            self.latest_limit = v;
        }
        if let Some(v) = env_parse::<usize>("FEED_PAGE_SIZE")? {
            self.page_size = v;
        }
        if let Some(v) = env_parse::<u64>("FEED_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("FEED_CONNECT_TIMEOUT_SECS")? {
            self.connect_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<SocketAddr>("FEED_LISTEN_ADDR")? {
            self.listen_addr = v;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.api_base = self.api_base.trim().trim_end_matches('/').to_string();
        if self.api_base.is_empty() {
            bail!("api_base must not be empty");
        }
        if self.poll_interval.is_zero() {
            bail!("poll interval must be greater than zero");
        }
        if self.latest_limit == 0 || self.page_size == 0 {
            bail!("latest_limit and page_size must be greater than zero");
        }
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            bail!("timeouts must be greater than zero");
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => bail!("{name} contains non-unicode data"),
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(name)?
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("{name}='{v}' is invalid"))
        })
        .transpose()
}
