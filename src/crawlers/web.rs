use crate::config::ScraperConfig;
use crate::crawlers::crawler::{LoadMode, PageLoader, RenderedPage};
use crate::crawlers::session::BrowserSession;
use crate::error::{Error, Result};
use crate::guard;
use crate::parsers::html::{parse_content, parse_download_links};
use crate::parsers::text::body_text;
use crate::results::{PageImage, PageMetadata, ScrapedPage};
use crate::utils::absolute_url;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Instant;

/// Elements whose `href` mentions a download or a PDF
const DOWNLOAD_HREF_XPATH: &str = "//*[contains(@href, 'download') or contains(@href, '.pdf')]";

/// Renders pages in a fresh WebDriver-controlled browser
///
/// Each load gets its own browser session, closed before `load` returns.
pub struct WebDriverLoader {
    config: ScraperConfig,
}

impl WebDriverLoader {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

impl PageLoader for WebDriverLoader {
    async fn load(&self, url: &str, user_agent: &str, mode: LoadMode) -> Result<RenderedPage> {
        let session = BrowserSession::launch(&self.config, user_agent).await?;
        let result = render(&session, &self.config, url, mode).await;
        session.close().await;
        result
    }
}

async fn render(
    session: &BrowserSession,
    config: &ScraperConfig,
    url: &str,
    mode: LoadMode,
) -> Result<RenderedPage> {
    let started = Instant::now();
    session.goto(url).await?;
    session.wait_for_body(config.page_timeout()).await?;

    if mode == LoadMode::Content {
        tokio::time::sleep(config.settle_delay()).await;
    }

    let html = session.source().await?;

    let dom_links = match mode {
        LoadMode::Links => match session.hrefs_matching(DOWNLOAD_HREF_XPATH).await {
            Ok(hrefs) => hrefs,
            Err(e) => {
                ::log::warn!("Error scanning live DOM for download links: {}", e);
                Vec::new()
            }
        },
        LoadMode::Content => Vec::new(),
    };

    ::log::debug!(
        "Rendered {} in {:.2} seconds",
        url,
        started.elapsed().as_secs_f64()
    );
    Ok(RenderedPage { html, dom_links })
}

/// Scrapes pages through a [`PageLoader`], politely and with retries
///
/// Consecutive scrapes are spaced by the configured request delay. Every
/// scrape is retried per the configured policy when it fails transiently.
pub struct WebScraper<L: PageLoader = WebDriverLoader> {
    config: ScraperConfig,
    loader: L,
    last_scrape: Option<Instant>,
}

impl WebScraper<WebDriverLoader> {
    pub fn new(config: ScraperConfig) -> Self {
        let loader = WebDriverLoader::new(config.clone());
        Self::with_loader(config, loader)
    }
}

impl<L: PageLoader> WebScraper<L> {
    pub fn with_loader(config: ScraperConfig, loader: L) -> Self {
        Self {
            config,
            loader,
            last_scrape: None,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Collect the absolute URLs of the downloadable documents on a page
    ///
    /// Links found in the page source come first, followed by any extra
    /// links only visible in the live DOM. No URL appears twice.
    pub async fn scrape_links(&mut self, url: &str) -> Result<Vec<String>> {
        self.prepare().await?;
        let links = self
            .config
            .retry
            .run("Scraping links", Error::is_transient, || self.links_once(url))
            .await?;
        ::log::info!("Found {} PDF links in total", links.len());
        Ok(links)
    }

    /// Capture the structured content of a page
    pub async fn scrape_content(&mut self, url: &str) -> Result<ScrapedPage> {
        self.prepare().await?;
        self.config
            .retry
            .run("Scraping content", Error::is_transient, || {
                self.content_once(url)
            })
            .await
    }

    /// Readable body text of a page, ready to hand to the language model
    pub async fn scrape_text(&mut self, url: &str) -> Result<String> {
        self.prepare().await?;
        self.config
            .retry
            .run("Scraping text", Error::is_transient, || self.text_once(url))
            .await
    }

    async fn text_once(&self, url: &str) -> Result<String> {
        let user_agent = self.config.random_user_agent();
        let page = self.loader.load(url, &user_agent, LoadMode::Content).await?;
        Ok(body_text(&page.html))
    }

    async fn links_once(&self, url: &str) -> Result<Vec<String>> {
        let user_agent = self.config.random_user_agent();
        let page = self.loader.load(url, &user_agent, LoadMode::Links).await?;

        let mut links = parse_download_links(&page.html, url);
        let mut seen: HashSet<String> = links.iter().cloned().collect();

        for href in &page.dom_links {
            let Some(link) = absolute_url(url, href) else {
                continue;
            };
            if seen.insert(link.clone()) {
                ::log::info!("Found additional PDF link: {}", link);
                links.push(link);
            }
        }

        Ok(links)
    }

    async fn content_once(&self, url: &str) -> Result<ScrapedPage> {
        let user_agent = self.config.random_user_agent();
        let page = self.loader.load(url, &user_agent, LoadMode::Content).await?;
        let content = parse_content(&page.html, url);

        let mut images = Vec::with_capacity(content.images.len());
        for (i, image) in content.images.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.request_delay()).await;
            }
            match absolute_url(url, &image.src) {
                Some(src) => images.push(PageImage {
                    src,
                    alt: image.alt,
                }),
                None => ::log::debug!("Skipping unresolvable image source: {}", image.src),
            }
        }

        Ok(ScrapedPage {
            title: content.title,
            headings: content.headings,
            paragraphs: content.paragraphs,
            images,
            links: content.links,
            metadata: PageMetadata {
                url: url.to_string(),
                scraped_at: Utc::now(),
                user_agent,
            },
        })
    }

    /// Check the environment, then wait out the politeness delay
    async fn prepare(&mut self) -> Result<()> {
        if self.config.verify_driver {
            // Runs `--version` on the browser and reads the driver binary
            let config = self.config.clone();
            let verified = tokio::task::spawn_blocking(move || guard::verify_driver(&config))
                .await
                .unwrap_or_else(|e| {
                    ::log::error!("Driver verification task failed: {}", e);
                    false
                });
            if !verified {
                return Err(Error::Environment(format!(
                    "driver at {} failed verification",
                    self.config.driver_path.display()
                )));
            }
        }

        if let Some(last) = self.last_scrape {
            let delay = self.config.request_delay();
            let elapsed = last.elapsed();
            if elapsed < delay {
                ::log::debug!("Waiting {:?} before next request", delay - elapsed);
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        self.last_scrape = Some(Instant::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const LISTING: &str = r#"
        <html><head><title>Reports</title></head><body>
            <h1>Annual reports</h1>
            <p>Download the  reports below.</p>
            <p>   </p>
            <img src="/img/logo.png" alt="Logo">
            <img src="chart.svg">
            <a href="/files/2023.pdf">2023</a>
            <a href="/files/2023.pdf">2023 again</a>
            <a href="/about">About</a>
        </body></html>
    "#;

    struct FakeLoader {
        page: RenderedPage,
        failures: AtomicU32,
        error: fn() -> Error,
        calls: AtomicU32,
        agents: Mutex<Vec<(String, LoadMode)>>,
    }

    impl FakeLoader {
        fn new(html: &str, dom_links: &[&str]) -> Self {
            Self {
                page: RenderedPage {
                    html: html.to_string(),
                    dom_links: dom_links.iter().map(|s| s.to_string()).collect(),
                },
                failures: AtomicU32::new(0),
                error: || Error::Timeout(Duration::from_secs(10)),
                calls: AtomicU32::new(0),
                agents: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, times: u32, error: fn() -> Error) -> Self {
            self.failures = AtomicU32::new(times);
            self.error = error;
            self
        }
    }

    impl PageLoader for FakeLoader {
        async fn load(&self, _url: &str, user_agent: &str, mode: LoadMode) -> Result<RenderedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.agents
                .lock()
                .unwrap()
                .push((user_agent.to_string(), mode));

            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err((self.error)());
            }
            Ok(self.page.clone())
        }
    }

    fn test_config() -> ScraperConfig {
        ScraperConfig::default()
            .without_driver_check()
            .with_request_delay(Duration::ZERO, Duration::ZERO)
            .with_retry(RetryPolicy::new(
                3,
                Duration::from_millis(1),
                Duration::from_millis(2),
            ))
    }

    #[tokio::test]
    async fn test_links_merge_source_and_dom() {
        let loader = FakeLoader::new(
            LISTING,
            &["/files/2023.pdf", "download.php?id=7", "//cdn.example.org/a.pdf"],
        );
        let mut scraper = WebScraper::with_loader(test_config(), loader);

        let links = scraper
            .scrape_links("https://example.org/reports/")
            .await
            .unwrap();

        assert_eq!(
            links,
            vec![
                "https://example.org/files/2023.pdf",
                "https://example.org/reports/download.php?id=7",
                "https://cdn.example.org/a.pdf",
            ]
        );
        let agents = scraper.loader.agents.lock().unwrap();
        assert_eq!(agents[0].1, LoadMode::Links);
    }

    #[tokio::test]
    async fn test_page_without_links() {
        let loader = FakeLoader::new("<html><body><p>Nothing here</p></body></html>", &[]);
        let mut scraper = WebScraper::with_loader(test_config(), loader);
        let links = scraper.scrape_links("https://example.org/").await.unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let loader = FakeLoader::new(LISTING, &[]).failing(2, || {
            Error::Timeout(Duration::from_secs(10))
        });
        let mut scraper = WebScraper::with_loader(test_config(), loader);

        let links = scraper.scrape_links("https://example.org/").await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(scraper.loader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_policy_attempts() {
        let loader = FakeLoader::new(LISTING, &[]).failing(10, || {
            Error::Timeout(Duration::from_secs(10))
        });
        let mut scraper = WebScraper::with_loader(test_config(), loader);

        let result = scraper.scrape_links("https://example.org/").await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(scraper.loader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let loader = FakeLoader::new(LISTING, &[]).failing(10, || {
            Error::Environment("no browser".to_string())
        });
        let mut scraper = WebScraper::with_loader(test_config(), loader);

        let result = scraper.scrape_content("https://example.org/").await;
        assert!(matches!(result, Err(Error::Environment(_))));
        assert_eq!(scraper.loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_driver_refusing_session_is_not_retried() {
        let loader = FakeLoader::new(LISTING, &[]).failing(10, || Error::Session {
            url: "http://localhost:9515".to_string(),
            source: fantoccini::error::NewSessionError::SessionNotCreated(
                fantoccini::error::WebDriver::new(
                    fantoccini::error::ErrorStatus::SessionNotCreated,
                    "session not created: version mismatch",
                ),
            ),
        });
        let mut scraper = WebScraper::with_loader(test_config(), loader);

        let result = scraper.scrape_links("https://example.org/").await;
        assert!(matches!(result, Err(Error::Session { .. })));
        assert_eq!(scraper.loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_text_skips_scripts() {
        let html = "<html><body><h1>Reports</h1><script>track()</script><p>All years</p></body></html>";
        let mut scraper = WebScraper::with_loader(test_config(), FakeLoader::new(html, &[]));

        let text = scraper.scrape_text("https://example.org/").await.unwrap();
        assert_eq!(text, "Reports\nAll years");
        let agents = scraper.loader.agents.lock().unwrap();
        assert_eq!(agents[0].1, LoadMode::Content);
    }

    #[tokio::test]
    async fn test_failed_driver_check_skips_loading() {
        let mut config = test_config().with_driver_path("/nonexistent/chromedriver");
        config.verify_driver = true;
        let mut scraper = WebScraper::with_loader(config, FakeLoader::new(LISTING, &[]));

        let result = scraper.scrape_links("https://example.org/").await;
        assert!(matches!(result, Err(Error::Environment(_))));
        assert_eq!(scraper.loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_content_is_structured() {
        let mut scraper = WebScraper::with_loader(test_config(), FakeLoader::new(LISTING, &[]));
        let page = scraper
            .scrape_content("https://example.org/reports/")
            .await
            .unwrap();

        assert_eq!(page.title, "Reports");
        assert_eq!(page.headings.len(), 1);
        assert_eq!(page.headings[0].level, 1);
        assert_eq!(page.paragraphs, vec!["Download the reports below."]);
        assert_eq!(
            page.images,
            vec![
                PageImage {
                    src: "https://example.org/img/logo.png".to_string(),
                    alt: "Logo".to_string(),
                },
                PageImage {
                    src: "https://example.org/reports/chart.svg".to_string(),
                    alt: String::new(),
                },
            ]
        );
        assert_eq!(page.links.len(), 3);
        assert_eq!(page.metadata.url, "https://example.org/reports/");

        let agents = scraper.loader.agents.lock().unwrap();
        assert_eq!(agents[0].1, LoadMode::Content);
        assert_eq!(page.metadata.user_agent, agents[0].0);
        assert!(scraper.config().user_agents.contains(&page.metadata.user_agent));
    }

    #[tokio::test]
    async fn test_consecutive_scrapes_are_spaced() {
        let config = test_config().with_request_delay(Duration::from_millis(50), Duration::ZERO);
        let mut scraper = WebScraper::with_loader(config, FakeLoader::new(LISTING, &[]));

        let started = Instant::now();
        scraper.scrape_links("https://example.org/").await.unwrap();
        scraper.scrape_links("https://example.org/").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
