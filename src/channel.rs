//! Channel page: identity, follower text and the lazily parsed listing.

use std::fmt;

use anyhow::{Context, Result};
use log::{debug, info};
use scraper::Html;

use crate::markup::{FieldResultExt, FieldSelector, extract_text, try_extract_text};
use crate::playlist::PlaylistEntry;
use crate::transport::Site;

pub const PAGE_TITLE: FieldSelector = FieldSelector::new("title", "");
pub const FOLLOWERS: FieldSelector = FieldSelector::new("span", "listing-header--followers");
pub const LISTING_ROW: FieldSelector = FieldSelector::new("li", "video-listing-entry");

const MISSING_FOLLOWERS_TEXT: &str = "0 followers";

/// Follower label as scraped. A page without the label reads as
/// `"0 followers"` and counts as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followers {
    Text(String),
    Missing,
}

impl Followers {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Missing => MISSING_FOLLOWERS_TEXT,
        }
    }

    /// Best-effort numeric reading of labels like `1.2K followers`; anything
    /// unparseable is zero.
    pub fn count(&self) -> u64 {
        match self {
            Self::Text(text) => parse_count(text).unwrap_or(0),
            Self::Missing => 0,
        }
    }
}

impl fmt::Display for Followers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

fn parse_count(text: &str) -> Option<u64> {
    let token = text.split_whitespace().next()?.replace(',', "");
    let (digits, multiplier) = match token.chars().last()?.to_ascii_uppercase() {
        'K' => (&token[..token.len() - 1], 1_000.0),
        'M' => (&token[..token.len() - 1], 1_000_000.0),
        'B' => (&token[..token.len() - 1], 1_000_000_000.0),
        _ => (token.as_str(), 1.0),
    };
    let value: f64 = digits.parse().ok()?;
    (value >= 0.0).then(|| (value * multiplier).round() as u64)
}

/// A channel page fetched once at construction. Listing rows are turned into
/// [`PlaylistEntry`] values on first access and cached afterwards.
pub struct ChannelListing {
    site: Site,
    channel_id: String,
    path: String,
    name: String,
    followers: Followers,
    document: Html,
    entries: Option<Vec<PlaylistEntry>>,
}

impl ChannelListing {
    pub fn fetch(site: Site, channel_id: impl Into<String>) -> Result<Self> {
        let channel_id = channel_id.into();
        let path = site.channel_path(&channel_id);
        let document = site
            .page(&path)
            .with_context(|| format!("fetching channel page {}", site.absolute_url(&path)))?;
        Ok(Self::from_document(site, channel_id, document))
    }

    pub fn from_document(site: Site, channel_id: impl Into<String>, document: Html) -> Self {
        let channel_id = channel_id.into();
        let path = site.channel_path(&channel_id);
        let root = Some(document.root_element());
        let name = extract_text(root, &PAGE_TITLE);
        let followers = try_extract_text(root, &FOLLOWERS)
            .map(Followers::Text)
            .unwrap_or_else(|err| {
                debug!("followers defaulted: {err}");
                Followers::Missing
            });
        info!("loaded channel {channel_id} ({name})");
        Self {
            site,
            channel_id,
            path,
            name,
            followers,
            document,
            entries: None,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn followers(&self) -> &Followers {
        &self.followers
    }

    pub fn url(&self) -> String {
        self.site.absolute_url(&self.path)
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    pub fn entries(&mut self) -> &[PlaylistEntry] {
        self.load_entries()
    }

    pub fn entries_mut(&mut self) -> &mut [PlaylistEntry] {
        self.load_entries()
    }

    pub fn entry_count(&mut self) -> usize {
        self.load_entries().len()
    }

    fn load_entries(&mut self) -> &mut Vec<PlaylistEntry> {
        let entries = match self.entries.take() {
            Some(entries) => entries,
            None => self.parse_entries(),
        };
        self.entries.insert(entries)
    }

    fn parse_entries(&self) -> Vec<PlaylistEntry> {
        let entries: Vec<PlaylistEntry> = LISTING_ROW
            .compile()
            .map(|selector| {
                self.document
                    .select(&selector)
                    .map(|row| PlaylistEntry::from_element(&self.site, row))
                    .collect::<Vec<_>>()
            })
            .or_field_default("listing rows");
        debug!("{} listing rows on {}", entries.len(), self.path);
        entries
    }
}
