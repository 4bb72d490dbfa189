use fantoccini::error::NewSessionError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while scraping pages or downloading files
#[derive(Error, Debug)]
pub enum Error {
    /// Browser or driver binary missing, mismatched or unusable
    #[error("environment check failed: {0}")]
    Environment(String),

    /// Could not open a WebDriver session
    #[error("failed to start browser session at {url}: {source}")]
    Session {
        url: String,
        #[source]
        source: NewSessionError,
    },

    /// A WebDriver command failed inside an open session
    #[error("browser command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),

    /// The page never became ready within the allowed time
    #[error("timed out after {0:?} waiting for page to load")]
    Timeout(Duration),

    /// Transport-level HTTP failure (connect, reset, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Downloaded body turned out to be empty
    #[error("empty response body from {0}")]
    EmptyBody(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A downloaded archive could not be read
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The language model client could not be used
    #[error("language model error: {0}")]
    Llm(#[from] crate::llm::LlmError),
}

impl Error {
    /// Whether another attempt could succeed
    ///
    /// Environment problems, bad URLs and HTTP error statuses are permanent,
    /// and so is a driver refusing to create a session (usually a browser and
    /// driver version mismatch). Other browser failures and transport errors
    /// are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Environment(_)
            | Error::InvalidUrl { .. }
            | Error::Status { .. }
            | Error::EmptyBody(_)
            | Error::Config(_)
            | Error::Llm(_)
            | Error::Archive(_)
            | Error::Io(_) => false,
            Error::Session { source, .. } => !matches!(
                source,
                NewSessionError::SessionNotCreated(_) | NewSessionError::BadWebdriverUrl(_)
            ),
            Error::Command(_) | Error::Timeout(_) => true,
            Error::Http(e) => !e.is_status() && !e.is_builder(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
