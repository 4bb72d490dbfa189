use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A link discovered on a page, with the text it was shown with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    /// Absolute URL of the link
    pub url: String,

    /// Anchor text (may be empty)
    pub text: String,
}

/// A heading and its level (1 for `h1` through 6 for `h6`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// An image on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// Absolute source URL
    pub src: String,
    pub alt: String,
}

/// Where and how a page was captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub user_agent: String,
}

/// Structured content of one rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// Title of the page (empty if the page has none)
    pub title: String,
    pub headings: Vec<Heading>,

    /// Non-empty paragraph texts in document order
    pub paragraphs: Vec<String>,
    pub images: Vec<PageImage>,
    pub links: Vec<CandidateLink>,
    pub metadata: PageMetadata,
}

impl ScrapedPage {
    /// Render the page as the text block handed to the language model
    pub fn to_prompt_text(&self) -> String {
        let mut text = String::new();

        if !self.title.is_empty() {
            text.push_str(&format!("# {}\n\n", self.title));
        }

        if !self.headings.is_empty() {
            text.push_str("## Headings\n");
            for heading in &self.headings {
                text.push_str(&format!("- {}\n", heading.text));
            }
            text.push('\n');
        }

        if !self.paragraphs.is_empty() {
            text.push_str("## Content\n");
            for paragraph in &self.paragraphs {
                text.push_str(paragraph);
                text.push_str("\n\n");
            }
        }

        text
    }
}

/// Outcome of downloading a single link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    /// Local path of the saved file
    Success(PathBuf),
    Failure { url: String, reason: String },
}

/// Downloads of a batch, split into what worked and what did not
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Local paths of saved files, in request order
    pub successes: Vec<PathBuf>,

    /// Original URLs that could not be downloaded, in request order
    pub failures: Vec<String>,
}

impl DownloadReport {
    pub fn record(&mut self, result: DownloadResult) {
        match result {
            DownloadResult::Success(path) => self.successes.push(path),
            DownloadResult::Failure { url, .. } => self.failures.push(url),
        }
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}
