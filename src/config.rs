use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/rumble-tools.toml";
pub const DEFAULT_HOST: &str = "https://rumble.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("rumble-tools/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

const EMBED_SUFFIX: &str = "/embed";
const OEMBED_SUFFIX: &str = "/api/Media/oembed.json";

/// Raw contents of the optional TOML config file. Every key is optional so a
/// partial file only overrides what it mentions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub max_body_bytes: Option<u64>,
}

/// Where the scraper points and how patient it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub host: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_body_bytes: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl SiteConfig {
    pub fn with_host(host: &str) -> Self {
        let mut config = Self::default();
        config.set_host(host);
        config
    }

    pub fn set_host(&mut self, host: &str) {
        self.host = normalize_host(host);
    }

    /// Base of every embedded-player address, e.g. `https://rumble.com/embed`.
    pub fn embed_base(&self) -> String {
        format!("{}{EMBED_SUFFIX}", self.host)
    }

    pub fn oembed_endpoint(&self) -> String {
        format!("{}{OEMBED_SUFFIX}", self.host)
    }

    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    fn apply(mut self, file: FileConfig) -> Self {
        if let Some(host) = file.host
            && !host.trim().is_empty()
        {
            self.set_host(&host);
        }
        if let Some(timeout) = file.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(agent) = file.user_agent
            && !agent.is_empty()
        {
            self.user_agent = agent;
        }
        if let Some(limit) = file.max_body_bytes {
            self.max_body_bytes = limit;
        }
        self
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('/').to_string()
}

pub fn read_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let cfg: FileConfig =
        toml::from_str(&content).with_context(|| format!("Parsing {}", path.display()))?;
    Ok(Some(cfg))
}

/// Missing files fall back to the defaults; a present but malformed file is
/// an error.
pub fn load_site_config_from(path: impl AsRef<Path>) -> Result<SiteConfig> {
    let path = path.as_ref();
    let defaults = SiteConfig::default();
    Ok(match read_file_config(path)? {
        Some(file) => defaults.apply(file),
        None => defaults,
    })
}
