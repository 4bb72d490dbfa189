pub mod html;
pub mod text;

#[cfg(test)]
mod tests;

use crate::results::{CandidateLink, Heading};

/// An image as it appears in the markup, before its source is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// `src` attribute exactly as written
    pub src: String,
    pub alt: String,
}

/// Content extracted from rendered HTML
///
/// Links are already absolute; image sources are resolved later by the
/// scraper so it can pace those lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
    pub images: Vec<RawImage>,
    pub links: Vec<CandidateLink>,
}
