#![forbid(unsafe_code)]

//! Scraper for Rumble channel listings.
//!
//! A [`ChannelListing`] fetches `/c/<id>` once and turns each listing row into
//! a [`PlaylistEntry`]. Every entry owns a [`VideoResolver`] that, on demand,
//! digs the video token out of the video page and looks its metadata up via
//! the site's oEmbed endpoint. All network access goes through a shared
//! [`Site`].

pub mod channel;
pub mod config;
pub mod markup;
pub mod playlist;
pub mod transport;
pub mod video;

pub use channel::{ChannelListing, Followers};
pub use config::SiteConfig;
pub use markup::{FieldError, ImageReference, LinkReference};
pub use playlist::{EntrySummary, PlaylistEntry};
pub use transport::{HttpTransport, Site, Transport};
pub use video::{VideoId, VideoMetadata, VideoResolver};
