use clap::Parser;
use page_harvest::crawlers::WebScraper;
use page_harvest::install::DriverInstaller;
use page_harvest::{Downloader, LlmClient, ScraperConfig, guard};
use std::path::Path;
use std::process::ExitCode;

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(args.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ::log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Configuration file (or defaults) with command-line overrides applied
fn load_config(args: &Args) -> page_harvest::Result<ScraperConfig> {
    let mut config = match &args.config {
        Some(path) => ScraperConfig::from_file(path)?,
        None => ScraperConfig::default(),
    };

    if let Some(url) = &args.webdriver_url {
        config = config.with_webdriver_url(url);
    }
    if let Some(path) = &args.driver_path {
        config = config.with_driver_path(path);
    }
    if args.headless {
        config = config.with_headless(true);
    }
    Ok(config)
}

async fn run(command: Command, config: ScraperConfig) -> page_harvest::Result<()> {
    match command {
        Command::Links {
            url,
            download,
            folder,
        } => {
            let folder = folder.unwrap_or_else(|| config.download_folder.clone());
            let mut scraper = WebScraper::new(config.clone());
            let links = scraper.scrape_links(&url).await?;

            if links.is_empty() {
                println!("No PDF links found on {}", url);
                return Ok(());
            }

            println!("Found {} PDF links:", links.len());
            for link in &links {
                println!("  {}", link);
            }

            if download {
                download_batch(config, &links, &folder).await?;
            }
        }
        Command::Content { url, json, text } => {
            let mut scraper = WebScraper::new(config);
            if text {
                println!("{}", scraper.scrape_text(&url).await?);
                return Ok(());
            }

            let page = scraper.scrape_content(&url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                println!("Title: {}", page.title);
                println!("Headings: {}", page.headings.len());
                println!("Paragraphs: {}", page.paragraphs.len());
                println!("Images: {}", page.images.len());
                println!("Links: {}", page.links.len());
                println!(
                    "Scraped at {} as {}",
                    page.metadata.scraped_at, page.metadata.user_agent
                );
            }
        }
        Command::Download { urls, folder } => {
            let folder = folder.unwrap_or_else(|| config.download_folder.clone());
            download_batch(config, &urls, &folder).await?;
        }
        Command::Extract { files } => {
            let texts = page_harvest::extract::extract_texts(&files).await;
            for (path, text) in files.iter().zip(&texts) {
                println!("==> {} <==", path.display());
                if text.is_empty() {
                    println!("(no text extracted)");
                } else {
                    println!("{}", text);
                }
                println!();
            }
        }
        Command::Analyze { url, prompt } => {
            let llm = LlmClient::new(config.llm.clone(), config.retry.clone())?;
            let status = llm.status().await;
            if !status.available {
                return Err(page_harvest::Error::Environment(status.message));
            }

            let mut scraper = WebScraper::new(config);
            let page = scraper.scrape_content(&url).await?;
            let analysis = llm.analyze_content(&page.to_prompt_text(), &prompt).await;
            println!("{}", analysis);
        }
        Command::VerifyDriver => {
            if guard::verify_driver(&config) {
                println!("Driver verification passed");
            } else {
                return Err(page_harvest::Error::Environment(
                    "driver verification failed".to_string(),
                ));
            }
        }
        Command::InstallDriver { version } => {
            let version = match version.or_else(|| guard::browser_version(&config)) {
                Some(version) => version,
                None => {
                    return Err(page_harvest::Error::Environment(
                        "could not determine browser version; pass --version".to_string(),
                    ));
                }
            };

            let installer = DriverInstaller::new(config.download_timeout())?;
            let path = installer.install(&version, &config.driver_path).await?;
            println!("Driver for browser {} installed at {}", version, path.display());
        }
    }
    Ok(())
}

async fn download_batch(
    config: ScraperConfig,
    urls: &[String],
    folder: &Path,
) -> page_harvest::Result<()> {
    let downloader = Downloader::new(config)?;
    println!("Downloading {} files to {}", urls.len(), folder.display());

    let report = downloader
        .download_all(urls, folder, |done, total| {
            println!("Progress: {}/{}", done, total);
        })
        .await;

    if !report.successes.is_empty() {
        println!("Successfully downloaded {} files:", report.successes.len());
        for path in &report.successes {
            println!("  {}", path.display());
        }
    }
    if !report.failures.is_empty() {
        println!("Failed to download {} files:", report.failures.len());
        for url in &report.failures {
            println!("  {}", url);
        }
    }
    Ok(())
}
