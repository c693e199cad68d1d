//! One row of a channel's listing page.

use anyhow::Result;
use scraper::ElementRef;
use serde::Serialize;

use crate::markup::{
    FieldSelector, ImageReference, LinkReference, extract_image, extract_link, extract_raw,
    extract_text,
};
use crate::transport::Site;
use crate::video::VideoResolver;

pub const THUMBNAIL: FieldSelector = FieldSelector::new("img", "video-item--img");
pub const TITLE: FieldSelector = FieldSelector::new("h3", "video-item--title");
pub const LINK: FieldSelector = FieldSelector::new("a", "video-item--a");
pub const VIEWS: FieldSelector =
    FieldSelector::new("div", "video-counters--item video-item--views");

/// Compact JSON-friendly view of an entry. `id` is `null` when the video
/// page has no embedded player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub title: String,
    pub id: Option<String>,
    #[serde(rename = "thumb")]
    pub thumbnail_src: String,
}

/// Listing fields are read eagerly and independently; the video behind the
/// link is only resolved when asked for.
pub struct PlaylistEntry {
    thumbnail: ImageReference,
    title: String,
    link: LinkReference,
    views_raw: Option<String>,
    views_text: String,
    video: VideoResolver,
}

impl PlaylistEntry {
    pub fn from_element(site: &Site, row: ElementRef<'_>) -> Self {
        Self::from_node(site, Some(row))
    }

    pub fn from_node(site: &Site, row: Option<ElementRef<'_>>) -> Self {
        let thumbnail = extract_image(row, &THUMBNAIL);
        let title = extract_text(row, &TITLE);
        let link = extract_link(row, &LINK);
        let views_raw = extract_raw(row, &VIEWS);
        let views_text = extract_text(row, &VIEWS);
        let video = VideoResolver::new(site.clone(), link.relative_path.clone());
        Self {
            thumbnail,
            title,
            link,
            views_raw,
            views_text,
            video,
        }
    }

    pub fn thumbnail(&self) -> &ImageReference {
        &self.thumbnail
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &LinkReference {
        &self.link
    }

    /// View counter exactly as it appeared in the listing markup.
    pub fn views_raw(&self) -> Option<&str> {
        self.views_raw.as_deref()
    }

    pub fn views_text(&self) -> &str {
        &self.views_text
    }

    pub fn video(&self) -> &VideoResolver {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut VideoResolver {
        &mut self.video
    }

    /// Forces identifier resolution; page fetch errors propagate.
    pub fn summary(&mut self) -> Result<EntrySummary> {
        let id = self.video.identifier()?.as_deref().map(str::to_string);
        Ok(EntrySummary {
            title: self.title.clone(),
            id,
            thumbnail_src: self.thumbnail.src.clone(),
        })
    }
}
