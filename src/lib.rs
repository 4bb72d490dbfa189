pub mod config;
pub mod crawlers;
pub mod download;
pub mod error;
pub mod extract;
pub mod filename;
pub mod filter;
pub mod guard;
pub mod install;
pub mod llm;
pub mod parsers;
pub mod results;
pub mod retry;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::ScraperConfig;
pub use crawlers::WebScraper;
pub use download::Downloader;
pub use error::{Error, Result};
pub use llm::{LlmClient, LlmConfig, LlmError};
pub use results::{CandidateLink, DownloadReport, DownloadResult, ScrapedPage};
pub use retry::RetryPolicy;
