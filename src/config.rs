use crate::llm::LlmConfig;
use crate::retry::RetryPolicy;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration shared by the scraper, the download pipeline and the guard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Path of the local automation driver binary
    #[serde(default = "default_driver_path")]
    pub driver_path: PathBuf,

    /// Browser binary to query for its version (searched on PATH if unset)
    #[serde(default)]
    pub browser_binary: Option<PathBuf>,

    /// Spawn the driver binary instead of expecting a running WebDriver server
    #[serde(default)]
    pub launch_driver: bool,

    /// Check the driver binary before every scrape
    #[serde(default = "default_true")]
    pub verify_driver: bool,

    /// Run the browser without a window
    #[serde(default)]
    pub headless: bool,

    /// User agents to pick from, one per browser session
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Base politeness delay between requests to the same site, in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Random extra delay added on top of the base delay, in milliseconds
    #[serde(default = "default_request_jitter_ms")]
    pub request_jitter_ms: u64,

    /// How long to wait for the page body to appear, in seconds
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Pause after load so deferred content can render, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Timeout for the content-type HEAD request, in seconds
    #[serde(default = "default_head_timeout_secs")]
    pub head_timeout_secs: u64,

    /// Timeout for a single file download, in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Default target folder for downloads
    #[serde(default = "default_download_folder")]
    pub download_folder: PathBuf,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_true() -> bool {
    true
}

/// Default value for webdriver_url (ChromeDriver's own port)
fn default_webdriver_url() -> String {
    std::env::var("WEBDRIVER_URL").unwrap_or_else(|_| "http://localhost:9515".to_string())
}

fn default_driver_path() -> PathBuf {
    PathBuf::from("chromedriver")
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_request_delay_ms() -> u64 {
    2000
}

fn default_request_jitter_ms() -> u64 {
    1000
}

fn default_page_timeout_secs() -> u64 {
    10
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_head_timeout_secs() -> u64 {
    10
}

fn default_download_timeout_secs() -> u64 {
    30
}

fn default_download_folder() -> PathBuf {
    PathBuf::from("downloads")
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            driver_path: default_driver_path(),
            browser_binary: None,
            launch_driver: false,
            verify_driver: true,
            headless: false,
            user_agents: default_user_agents(),
            request_delay_ms: default_request_delay_ms(),
            request_jitter_ms: default_request_jitter_ms(),
            page_timeout_secs: default_page_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            head_timeout_secs: default_head_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            download_folder: default_download_folder(),
            retry: RetryPolicy::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Override the WebDriver URL
    pub fn with_webdriver_url(mut self, url: &str) -> Self {
        self.webdriver_url = url.to_string();
        self
    }

    /// Override the driver binary path
    pub fn with_driver_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.driver_path = path.into();
        self
    }

    /// Run the browser headless
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the politeness delay and its random jitter
    pub fn with_request_delay(mut self, base: Duration, jitter: Duration) -> Self {
        self.request_delay_ms = base.as_millis() as u64;
        self.request_jitter_ms = jitter.as_millis() as u64;
        self
    }

    /// Skip the driver check before scraping
    pub fn without_driver_check(mut self) -> Self {
        self.verify_driver = false;
        self
    }

    /// Pick a user agent from the pool at random
    pub fn random_user_agent(&self) -> String {
        self.user_agents
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| default_user_agents().remove(0))
    }

    /// Politeness delay with jitter applied
    pub fn request_delay(&self) -> Duration {
        let jitter = if self.request_jitter_ms > 0 {
            rand::rng().random_range(0..=self.request_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.request_delay_ms + jitter)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn head_timeout(&self) -> Duration {
        Duration::from_secs(self.head_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
