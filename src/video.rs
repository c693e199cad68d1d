//! Two-phase lazy resolution of a single video.
//!
//! Listing pages only link to a video's HTML page; the opaque token the
//! oEmbed endpoint wants is buried in the page's embedded-player JSON-LD. A
//! [`VideoResolver`] therefore works in two memoised steps:
//!
//! 1. fetch the page once and pull the first `"embedUrl":"<embed>/<token>/"`
//!    out of its text nodes, yielding [`VideoId::Found`] or
//!    [`VideoId::Absent`];
//! 2. on the first metadata access, query oEmbed with that token and keep the
//!    decoded [`VideoMetadata`].
//!
//! `Absent` is a terminal answer, not a failure: metadata then resolves to
//! defaults without touching the network. Transport and decode errors are
//! returned to the caller and leave the corresponding cache slot empty.

use anyhow::{Context, Result};
use log::{debug, info};
use regex::Regex;
use scraper::Html;
use serde_json::{Map, Value};

use crate::transport::Site;

/// Outcome of identifier resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoId {
    Found(String),
    /// The page carries no embedded-player reference.
    Absent,
}

impl VideoId {
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Found(token) => Some(token.as_str()),
            Self::Absent => None,
        }
    }
}

/// Typed view over an oEmbed response. Strings default to `""` and numbers
/// to `0` when the provider omits them or sends something unusable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoMetadata {
    pub kind: String,
    pub version: String,
    pub title: String,
    pub author_name: String,
    pub author_url: String,
    pub provider_name: String,
    pub provider_url: String,
    pub html: String,
    pub width: u64,
    pub height: u64,
    pub duration: u64,
    pub thumbnail_url: String,
    pub thumbnail_width: u64,
    pub thumbnail_height: u64,
    raw: Map<String, Value>,
}

impl VideoMetadata {
    pub fn from_map(raw: Map<String, Value>) -> Self {
        Self {
            kind: string_field(&raw, "type"),
            version: string_field(&raw, "version"),
            title: string_field(&raw, "title"),
            author_name: string_field(&raw, "author_name"),
            author_url: string_field(&raw, "author_url"),
            provider_name: string_field(&raw, "provider_name"),
            provider_url: string_field(&raw, "provider_url"),
            html: string_field(&raw, "html"),
            width: number_field(&raw, "width"),
            height: number_field(&raw, "height"),
            duration: number_field(&raw, "duration"),
            thumbnail_url: string_field(&raw, "thumbnail_url"),
            thumbnail_width: number_field(&raw, "thumbnail_width"),
            thumbnail_height: number_field(&raw, "thumbnail_height"),
            raw,
        }
    }

    /// Raw JSON value for any key, known or not.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

fn string_field(raw: &Map<String, Value>, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn number_field(raw: &Map<String, Value>, key: &str) -> u64 {
    match raw.get(key) {
        Some(Value::Number(value)) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .unwrap_or_default(),
        Some(Value::String(value)) => value.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

/// Lazily resolves the identifier and metadata of the video at `page_path`.
pub struct VideoResolver {
    site: Site,
    page_path: String,
    id: Option<VideoId>,
    metadata: Option<VideoMetadata>,
}

impl VideoResolver {
    /// `page_path` is site-relative, e.g. `/v2dsuho-144113244.html`.
    pub fn new(site: Site, page_path: impl Into<String>) -> Self {
        Self {
            site,
            page_path: page_path.into(),
            id: None,
            metadata: None,
        }
    }

    pub fn page_path(&self) -> &str {
        &self.page_path
    }

    pub fn url(&self) -> String {
        self.site.absolute_url(&self.page_path)
    }

    /// Identifier if it has already been resolved, without fetching.
    pub fn cached_identifier(&self) -> Option<&VideoId> {
        self.id.as_ref()
    }

    pub fn is_metadata_loaded(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn identifier(&mut self) -> Result<&VideoId> {
        let id = match self.id.take() {
            Some(id) => id,
            None => self.resolve_identifier()?,
        };
        Ok(self.id.insert(id))
    }

    pub fn metadata(&mut self) -> Result<&VideoMetadata> {
        let metadata = match self.metadata.take() {
            Some(metadata) => metadata,
            None => self.load_metadata()?,
        };
        Ok(self.metadata.insert(metadata))
    }

    /// `metadata[name]`, or `default` when the provider did not send it.
    pub fn field(&mut self, name: &str, default: Value) -> Result<Value> {
        Ok(self.metadata()?.field(name).cloned().unwrap_or(default))
    }

    pub fn title(&mut self) -> Result<String> {
        Ok(self.metadata()?.title.clone())
    }

    pub fn author_name(&mut self) -> Result<String> {
        Ok(self.metadata()?.author_name.clone())
    }

    pub fn author_url(&mut self) -> Result<String> {
        Ok(self.metadata()?.author_url.clone())
    }

    pub fn channel_name(&mut self) -> Result<String> {
        self.author_name()
    }

    pub fn channel_url(&mut self) -> Result<String> {
        self.author_url()
    }

    /// Duration in seconds.
    pub fn duration(&mut self) -> Result<u64> {
        Ok(self.metadata()?.duration)
    }

    pub fn thumbnail_url(&mut self) -> Result<String> {
        Ok(self.metadata()?.thumbnail_url.clone())
    }

    fn resolve_identifier(&self) -> Result<VideoId> {
        // Rows without a link have nothing to fetch.
        if self.page_path.is_empty() {
            debug!("video without page path, identifier absent");
            return Ok(VideoId::Absent);
        }
        let document = self
            .site
            .page(&self.page_path)
            .with_context(|| format!("fetching video page {}", self.url()))?;
        let pattern = embed_pattern(&self.site.config().embed_base())?;
        let id = match first_embed_token(&document, &pattern) {
            Some(token) => {
                info!("{} resolved to video id {token}", self.page_path);
                VideoId::Found(token)
            }
            None => {
                info!("{} has no embedded player reference", self.page_path);
                VideoId::Absent
            }
        };
        Ok(id)
    }

    fn load_metadata(&mut self) -> Result<VideoMetadata> {
        let token = match self.identifier()? {
            VideoId::Found(token) => token.clone(),
            VideoId::Absent => return Ok(VideoMetadata::default()),
        };
        let embed_url = self.site.embed_url(&token);
        let raw = self
            .site
            .oembed(&embed_url)
            .with_context(|| format!("loading oEmbed metadata for {embed_url}"))?;
        Ok(VideoMetadata::from_map(raw))
    }
}

fn embed_pattern(embed_base: &str) -> Result<Regex> {
    let source = format!(r#""embedUrl":"{}/(\w+?)/""#, regex::escape(embed_base));
    Regex::new(&source).with_context(|| format!("compiling embed pattern {source}"))
}

/// First token in document order across all text nodes.
fn first_embed_token(document: &Html, pattern: &Regex) -> Option<String> {
    document.root_element().text().find_map(|text| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|token| token.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::{FakeTransport, site};
    use serde_json::json;

    const PAGE_URL: &str = "https://rumble.test/v2dsuho-144113244.html";
    const OEMBED_URL: &str =
        "https://rumble.test/api/Media/oembed.json?url=https://rumble.test/embed/v2b7eve/";

    fn video_page(tokens: &[&str]) -> String {
        let scripts: String = tokens
            .iter()
            .map(|token| {
                format!(
                    r#"<script type="application/ld+json">[{{"@type":"VideoObject","embedUrl":"https://rumble.test/embed/{token}/"}}]</script>"#
                )
            })
            .collect();
        format!("<html><head>{scripts}</head><body><p>video</p></body></html>")
    }

    fn resolver(transport: &std::sync::Arc<FakeTransport>) -> VideoResolver {
        VideoResolver::new(site(transport), "/v2dsuho-144113244.html")
    }

    #[test]
    fn identifier_is_fetched_once() -> Result<()> {
        let transport = FakeTransport::new();
        transport.serve(PAGE_URL, video_page(&["v2b7eve"]));
        let mut video = resolver(&transport);

        assert_eq!(video.identifier()?, &VideoId::Found("v2b7eve".into()));
        assert_eq!(video.identifier()?, &VideoId::Found("v2b7eve".into()));
        assert_eq!(transport.hits(PAGE_URL), 1);
        Ok(())
    }

    #[test]
    fn first_match_wins() -> Result<()> {
        let transport = FakeTransport::new();
        transport.serve(PAGE_URL, video_page(&["first1", "second2"]));
        let mut video = resolver(&transport);
        assert_eq!(video.identifier()?.as_deref(), Some("first1"));
        Ok(())
    }

    #[test]
    fn absent_identifier_skips_metadata_fetch() -> Result<()> {
        let transport = FakeTransport::new();
        transport.serve(PAGE_URL, "<html><body>no player here</body></html>");
        let mut video = resolver(&transport);

        assert_eq!(video.identifier()?, &VideoId::Absent);
        assert_eq!(video.title()?, "");
        assert_eq!(video.author_name()?, "");
        assert_eq!(video.duration()?, 0);
        assert_eq!(video.thumbnail_url()?, "");
        assert_eq!(video.field("html", json!("fallback"))?, json!("fallback"));
        assert_eq!(transport.requests(), vec![PAGE_URL.to_string()]);
        Ok(())
    }

    #[test]
    fn metadata_round_trip() -> Result<()> {
        let transport = FakeTransport::new();
        transport.serve(PAGE_URL, video_page(&["v2b7eve"]));
        transport.serve(
            OEMBED_URL,
            r#"{"title":"T","author_name":"A","duration":248,"thumbnail_url":"U"}"#,
        );
        let mut video = resolver(&transport);

        assert_eq!(video.title()?, "T");
        assert_eq!(video.author_name()?, "A");
        assert_eq!(video.duration()?, 248);
        assert_eq!(video.thumbnail_url()?, "U");
        assert_eq!(video.channel_name()?, video.author_name()?);
        assert_eq!(video.author_url()?, "");
        assert_eq!(transport.hits(PAGE_URL), 1);
        assert_eq!(transport.hits(OEMBED_URL), 1);
        Ok(())
    }

    #[test]
    fn field_falls_back_for_unknown_keys() -> Result<()> {
        let transport = FakeTransport::new();
        transport.serve(PAGE_URL, video_page(&["v2b7eve"]));
        transport.serve(OEMBED_URL, r#"{"provider_name":"Rumble.com","width":1280}"#);
        let mut video = resolver(&transport);

        assert_eq!(video.field("provider_name", json!(""))?, json!("Rumble.com"));
        assert_eq!(video.field("width", json!(0))?, json!(1280));
        assert_eq!(video.field("nonexistent", json!(""))?, json!(""));
        assert_eq!(video.metadata()?.width, 1280);
        Ok(())
    }

    #[test]
    fn empty_metadata_object_is_still_cached() -> Result<()> {
        let transport = FakeTransport::new();
        transport.serve(PAGE_URL, video_page(&["v2b7eve"]));
        transport.serve(OEMBED_URL, "{}");
        let mut video = resolver(&transport);

        assert_eq!(video.title()?, "");
        assert_eq!(video.duration()?, 0);
        assert!(video.is_metadata_loaded());
        assert!(video.metadata()?.is_empty());
        assert_eq!(transport.hits(OEMBED_URL), 1);
        Ok(())
    }

    #[test]
    fn page_failure_propagates_and_is_not_cached() -> Result<()> {
        let transport = FakeTransport::new();
        let mut video = resolver(&transport);

        let err = video.identifier().unwrap_err();
        assert!(format!("{err:#}").contains("fetching video page"));
        assert!(video.cached_identifier().is_none());

        transport.serve(PAGE_URL, video_page(&["late"]));
        assert_eq!(video.identifier()?.as_deref(), Some("late"));
        Ok(())
    }

    #[test]
    fn metadata_decode_failure_propagates() -> Result<()> {
        let transport = FakeTransport::new();
        transport.serve(PAGE_URL, video_page(&["v2b7eve"]));
        transport.serve(OEMBED_URL, "<html>not json</html>");
        let mut video = resolver(&transport);

        assert!(video.title().is_err());
        assert!(!video.is_metadata_loaded());
        // The identifier stays memoised even though metadata failed.
        assert_eq!(video.cached_identifier(), Some(&VideoId::Found("v2b7eve".into())));
        assert_eq!(transport.hits(PAGE_URL), 1);
        Ok(())
    }

    #[test]
    fn empty_path_is_absent_without_fetching() -> Result<()> {
        let transport = FakeTransport::new();
        let mut video = VideoResolver::new(site(&transport), "");
        assert_eq!(video.identifier()?, &VideoId::Absent);
        assert!(video.metadata()?.is_empty());
        assert!(transport.requests().is_empty());
        Ok(())
    }

    #[test]
    fn lenient_decode_defaults_wrong_types() {
        let raw = json!({
            "type": "video",
            "title": 5,
            "duration": "248",
            "width": 1280.7,
            "height": -1,
            "thumbnail_width": "wide",
        });
        let Value::Object(raw) = raw else {
            unreachable!()
        };
        let metadata = VideoMetadata::from_map(raw);
        assert_eq!(metadata.kind, "video");
        assert_eq!(metadata.title, "5");
        assert_eq!(metadata.duration, 248);
        assert_eq!(metadata.width, 1280);
        assert_eq!(metadata.height, 0);
        assert_eq!(metadata.thumbnail_width, 0);
        assert_eq!(metadata.author_url, "");
    }

    #[test]
    fn url_joins_host_and_path() {
        let transport = FakeTransport::new();
        let video = resolver(&transport);
        assert_eq!(video.url(), PAGE_URL);
        assert_eq!(video.page_path(), "/v2dsuho-144113244.html");
    }
}
