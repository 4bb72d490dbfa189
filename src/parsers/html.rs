use crate::filter::is_download_link;
use crate::parsers::{PageContent, RawImage};
use crate::results::{CandidateLink, Heading};
use crate::utils::absolute_url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static IMAGES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Collect every anchor as `(href, text)`, in document order
pub fn parse_anchors(html: &str) -> Vec<(String, String)> {
    let doc = Html::parse_document(html);
    doc.select(&ANCHORS)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            (!href.is_empty()).then(|| (href.to_string(), element_text(&a)))
        })
        .collect()
}

/// Find the download links on a page
///
/// Every anchor is resolved against `base_url` and kept when the link
/// classifier accepts it. Duplicates are dropped, first occurrence wins.
pub fn parse_download_links(html: &str, base_url: &str) -> Vec<String> {
    let anchors = parse_anchors(html);
    ::log::info!("Found {} total links on {}", anchors.len(), base_url);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for (href, _) in anchors {
        let Some(url) = absolute_url(base_url, &href) else {
            continue;
        };

        if is_download_link(&url) {
            ::log::info!("Found PDF download link: {}", url);
            if seen.insert(url.clone()) {
                links.push(url);
            }
        } else {
            ::log::debug!("Skipping non-PDF link: {}", url);
        }
    }

    links
}

/// Extract title, headings, paragraphs, images and links from a page
pub fn parse_content(html: &str, base_url: &str) -> PageContent {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE)
        .next()
        .map(|t| element_text(&t))
        .unwrap_or_default();

    let headings = doc
        .select(&HEADINGS)
        .map(|h| Heading {
            level: heading_level(h.value().name()),
            text: element_text(&h),
        })
        .collect();

    let paragraphs = doc
        .select(&PARAGRAPHS)
        .map(|p| element_text(&p))
        .filter(|text| !text.is_empty())
        .collect();

    let images = doc
        .select(&IMAGES)
        .filter_map(|img| {
            let src = img.value().attr("src")?.trim();
            (!src.is_empty()).then(|| RawImage {
                src: src.to_string(),
                alt: img.value().attr("alt").unwrap_or("").trim().to_string(),
            })
        })
        .collect();

    let links = doc
        .select(&ANCHORS)
        .filter_map(|a| {
            let url = absolute_url(base_url, a.value().attr("href")?)?;
            Some(CandidateLink {
                url,
                text: element_text(&a),
            })
        })
        .collect();

    PageContent {
        title,
        headings,
        paragraphs,
        images,
        links,
    }
}

/// Text content of an element with whitespace collapsed
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn heading_level(tag: &str) -> u8 {
    tag.strip_prefix('h')
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}
