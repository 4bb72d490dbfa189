use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use url::Url;

/// How often to try reaching a driver we just spawned
const DRIVER_STARTUP_ATTEMPTS: u32 = 10;
const DRIVER_STARTUP_INTERVAL: Duration = Duration::from_millis(500);

/// An open browser session
///
/// Obtained with [`BrowserSession::launch`] and released with
/// [`BrowserSession::close`]. A driver process spawned for the session is
/// killed when the session is closed or dropped.
pub struct BrowserSession {
    client: Client,
    driver: Option<Child>,
}

impl BrowserSession {
    /// Start a browser with the stability flags and the given user agent
    pub async fn launch(config: &ScraperConfig, user_agent: &str) -> Result<Self> {
        let driver = if config.launch_driver {
            Some(spawn_driver(config)?)
        } else {
            None
        };

        let attempts = if driver.is_some() {
            DRIVER_STARTUP_ATTEMPTS
        } else {
            1
        };

        let mut attempt = 0;
        let client = loop {
            attempt += 1;
            match ClientBuilder::native()
                .capabilities(chrome_capabilities(config, user_agent))
                .connect(&config.webdriver_url)
                .await
            {
                Ok(client) => break client,
                Err(e) if attempt < attempts => {
                    ::log::debug!(
                        "WebDriver at {} not ready yet ({}), retrying",
                        config.webdriver_url,
                        e
                    );
                    tokio::time::sleep(DRIVER_STARTUP_INTERVAL).await;
                }
                Err(e) => {
                    ::log::error!(
                        "Failed to connect to WebDriver at {}: {}",
                        config.webdriver_url,
                        e
                    );
                    ::log::error!(
                        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
                    );
                    return Err(Error::Session {
                        url: config.webdriver_url.clone(),
                        source: e,
                    });
                }
            }
        };

        ::log::debug!("Connected to WebDriver at {}", config.webdriver_url);
        Ok(Self { client, driver })
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        ::log::info!("Accessing URL: {}", url);
        self.client.goto(url).await?;
        Ok(())
    }

    /// Block until the document body exists, up to `timeout`
    pub async fn wait_for_body(&self, timeout: Duration) -> Result<()> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css("body"))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(Error::Timeout(timeout)),
            Err(e) => Err(e.into()),
        }
    }

    /// Rendered page source
    pub async fn source(&self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    /// `href` attributes of all elements matching an XPath expression
    pub async fn hrefs_matching(&self, xpath: &str) -> Result<Vec<String>> {
        let elements = self.client.find_all(Locator::XPath(xpath)).await?;
        let mut hrefs = Vec::with_capacity(elements.len());
        for element in elements {
            if let Some(href) = element.attr("href").await? {
                hrefs.push(href);
            }
        }
        Ok(hrefs)
    }

    /// End the browser session and stop the driver if we started it
    pub async fn close(self) {
        let Self { client, driver } = self;

        if let Err(e) = client.close().await {
            ::log::warn!("Failed to close browser session: {}", e);
        } else {
            ::log::info!("Browser closed.");
        }

        if let Some(mut child) = driver {
            if let Err(e) = child.kill().await {
                ::log::warn!("Failed to stop driver process: {}", e);
            }
        }
    }
}

/// Capabilities asking Chrome for a stable, automation-friendly window
pub fn chrome_capabilities(
    config: &ScraperConfig,
    user_agent: &str,
) -> serde_json::Map<String, serde_json::Value> {
    let mut args = vec![
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-extensions".to_string(),
        "--disable-software-rasterizer".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--window-size=1920,1080".to_string(),
        format!("--user-agent={}", user_agent),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }

    let mut options = json!({ "args": args });
    if let Some(binary) = &config.browser_binary {
        options["binary"] = json!(binary.display().to_string());
    }

    let mut caps = serde_json::Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), options);
    caps
}

/// Start the driver binary listening on the WebDriver URL's port
fn spawn_driver(config: &ScraperConfig) -> Result<Child> {
    let port = Url::parse(&config.webdriver_url)
        .ok()
        .and_then(|url| url.port_or_known_default())
        .ok_or_else(|| Error::InvalidUrl {
            url: config.webdriver_url.clone(),
            reason: "no port to start the driver on".to_string(),
        })?;

    ::log::info!(
        "Starting driver {} on port {}",
        config.driver_path.display(),
        port
    );
    let child = Command::new(&config.driver_path)
        .arg(format!("--port={}", port))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            Error::Environment(format!(
                "could not start driver {}: {}",
                config.driver_path.display(),
                e
            ))
        })?;
    Ok(child)
}
