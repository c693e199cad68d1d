//! Typed field extraction from scraped listing markup.
//!
//! Listing pages are third-party HTML that changes shape without notice, so
//! nothing in here fails: every helper resolves to the field's default when
//! the node, the child element or the attribute is missing. The failure is
//! still modelled as a [`FieldError`] internally and funnelled through
//! [`FieldResultExt::or_field_default`], which is the only place a field
//! error is swallowed.

use std::fmt;

use log::debug;
use scraper::{ElementRef, Selector};

use crate::transport::Site;

/// Tag name plus a whitespace-separated class list, e.g.
/// `div` / `video-counters--item video-item--views`. An element matches when
/// it carries every listed class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelector {
    pub tag: &'static str,
    pub class: &'static str,
}

impl FieldSelector {
    pub const fn new(tag: &'static str, class: &'static str) -> Self {
        Self { tag, class }
    }

    pub fn css(&self) -> String {
        let mut css = self.tag.to_string();
        for class in self.class.split_whitespace() {
            css.push('.');
            css.push_str(class);
        }
        css
    }

    pub fn compile(&self) -> Result<Selector, FieldError> {
        let css = self.css();
        Selector::parse(&css)
            .map_err(|err| FieldError::InvalidSelector(format!("{css}: {err:?}")))
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

/// Why a markup field could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The containing node itself was absent.
    MissingNode,
    /// No descendant matched the selector.
    MissingElement(String),
    /// The element exists but lacks the attribute.
    MissingAttribute { selector: String, attribute: String },
    InvalidSelector(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNode => write!(f, "source node is absent"),
            Self::MissingElement(selector) => write!(f, "no element matches {selector}"),
            Self::MissingAttribute {
                selector,
                attribute,
            } => write!(f, "{selector} has no `{attribute}` attribute"),
            Self::InvalidSelector(msg) => write!(f, "invalid selector {msg}"),
        }
    }
}

impl std::error::Error for FieldError {}

pub trait FieldResultExt<T> {
    /// Collapses a field error into `T::default()`, logging what was lost.
    fn or_field_default(self, field: &str) -> T;
}

impl<T: Default> FieldResultExt<T> for Result<T, FieldError> {
    fn or_field_default(self, field: &str) -> T {
        self.unwrap_or_else(|err| {
            debug!("field `{field}` defaulted: {err}");
            T::default()
        })
    }
}

/// Thumbnail image (`src`/`alt`) of a listing row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReference {
    pub src: String,
    pub alt: String,
}

impl ImageReference {
    pub fn is_empty(&self) -> bool {
        self.src.is_empty() && self.alt.is_empty()
    }
}

/// Site-relative link, e.g. `/v2dsuho-144113244.html`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReference {
    pub relative_path: String,
}

impl LinkReference {
    pub fn absolute_url(&self, site: &Site) -> String {
        site.absolute_url(&self.relative_path)
    }
}

/// First descendant of `node` matching `selector`.
pub fn find_child<'a>(
    node: Option<ElementRef<'a>>,
    selector: &FieldSelector,
) -> Result<ElementRef<'a>, FieldError> {
    let node = node.ok_or(FieldError::MissingNode)?;
    let compiled = selector.compile()?;
    node.select(&compiled)
        .next()
        .ok_or_else(|| FieldError::MissingElement(selector.css()))
}

fn attribute(
    element: ElementRef<'_>,
    selector: &FieldSelector,
    name: &str,
) -> Result<String, FieldError> {
    element
        .value()
        .attr(name)
        .map(str::to_string)
        .ok_or_else(|| FieldError::MissingAttribute {
            selector: selector.css(),
            attribute: name.to_string(),
        })
}

pub fn try_extract_image(
    node: Option<ElementRef<'_>>,
    selector: &FieldSelector,
) -> Result<ImageReference, FieldError> {
    let img = find_child(node, selector)?;
    // A missing `alt` must not cost us a valid `src`, and vice versa.
    Ok(ImageReference {
        src: attribute(img, selector, "src").or_field_default("img.src"),
        alt: attribute(img, selector, "alt").or_field_default("img.alt"),
    })
}

pub fn extract_image(node: Option<ElementRef<'_>>, selector: &FieldSelector) -> ImageReference {
    try_extract_image(node, selector).or_field_default("image")
}

pub fn try_extract_link(
    node: Option<ElementRef<'_>>,
    selector: &FieldSelector,
) -> Result<LinkReference, FieldError> {
    let anchor = find_child(node, selector)?;
    let relative_path = attribute(anchor, selector, "href")?;
    Ok(LinkReference { relative_path })
}

pub fn extract_link(node: Option<ElementRef<'_>>, selector: &FieldSelector) -> LinkReference {
    try_extract_link(node, selector).or_field_default("link")
}

pub fn try_extract_text(
    node: Option<ElementRef<'_>>,
    selector: &FieldSelector,
) -> Result<String, FieldError> {
    let element = find_child(node, selector)?;
    Ok(element.text().collect::<String>().trim().to_string())
}

pub fn extract_text(node: Option<ElementRef<'_>>, selector: &FieldSelector) -> String {
    try_extract_text(node, selector).or_field_default("text")
}

/// Outer HTML of the matched element, for fields kept as raw markup.
pub fn extract_raw(node: Option<ElementRef<'_>>, selector: &FieldSelector) -> Option<String> {
    find_child(node, selector)
        .map(|element| Some(element.html()))
        .or_field_default("raw")
}
