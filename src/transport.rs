//! HTTP plumbing shared by every scraped entity.
//!
//! Channels, listing entries and video resolvers never talk to the network
//! directly. They hold a clone of [`Site`], which couples the configured host
//! with a [`Transport`] implementation. Production code uses
//! [`HttpTransport`] (blocking `ureq`); tests swap in an in-memory fake.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::debug;
use scraper::Html;
use serde_json::{Map, Value};

use crate::config::SiteConfig;

/// Query parameters appended to a GET request.
pub type Query<'a> = &'a [(&'a str, &'a str)];

/// Minimal blocking HTTP surface. Any transport error or non-2xx status must
/// come back as `Err`.
pub trait Transport: Send + Sync {
    fn get_text(&self, url: &str, query: Query<'_>) -> Result<String>;

    fn get_json(&self, url: &str, query: Query<'_>) -> Result<Value> {
        let body = self.get_text(url, query)?;
        serde_json::from_str(&body).with_context(|| format!("decoding JSON from {url}"))
    }
}

/// `ureq`-backed transport.
pub struct HttpTransport {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpTransport {
    pub fn new(config: &SiteConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str, query: Query<'_>) -> Result<String> {
        debug!("GET {url} {query:?}");
        let mut request = self.agent.get(url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().with_context(|| format!("requesting {url}"))?;

        // Read one byte past the limit so oversized bodies fail instead of
        // being truncated.
        let limit = self.max_body_bytes;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .with_context(|| format!("reading response body from {url}"))?;
        if bytes.len() as u64 > limit {
            bail!("response body from {url} exceeds {limit} bytes");
        }

        // Pages are always treated as UTF-8 regardless of the advertised
        // charset.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Host configuration plus the transport used to reach it. Cheap to clone.
#[derive(Clone)]
pub struct Site {
    config: Arc<SiteConfig>,
    transport: Arc<dyn Transport>,
}

impl Site {
    pub fn new(config: SiteConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// Builds a site that talks to the real network.
    pub fn connect(config: SiteConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(&config));
        Self::new(config, transport)
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn absolute_url(&self, path: &str) -> String {
        self.config.absolute_url(path)
    }

    pub fn channel_path(&self, channel_id: &str) -> String {
        format!("/c/{channel_id}")
    }

    /// Key used by the oEmbed endpoint for a given video token.
    pub fn embed_url(&self, video_id: &str) -> String {
        format!("{}/{video_id}/", self.config.embed_base())
    }

    /// Fetches `<host><path>` and parses it into an HTML tree.
    pub fn page(&self, path: &str) -> Result<Html> {
        let url = self.absolute_url(path);
        let body = self.transport.get_text(&url, &[])?;
        Ok(Html::parse_document(&body))
    }

    /// Queries the oEmbed endpoint for `embed_url`. Anything other than a
    /// JSON object is treated as a decode failure.
    pub fn oembed(&self, embed_url: &str) -> Result<Map<String, Value>> {
        let endpoint = self.config.oembed_endpoint();
        let value = self.transport.get_json(&endpoint, &[("url", embed_url)])?;
        match value {
            Value::Object(map) => Ok(map),
            other => bail!("oEmbed response for {embed_url} is not an object: {other}"),
        }
    }
}
