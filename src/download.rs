//! Download pipeline for discovered PDF links.

use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::filename::filename_for;
use crate::results::{DownloadReport, DownloadResult};
use crate::utils::absolute_url;
use futures::StreamExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

/// Size of the chunks written to disk
const CHUNK_SIZE: usize = 8192;

const ACCEPT_PDF: &str = "application/pdf,application/x-pdf,application/octet-stream";

/// Downloads files over HTTP into a local folder
pub struct Downloader {
    client: Client,
    config: ScraperConfig,
}

impl Downloader {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// Download a single file into `folder`
    ///
    /// Returns the absolute path of the saved file, or `None` when every
    /// attempt failed. Failures are logged, never returned.
    pub async fn download(&self, url: &str, folder: &Path) -> Option<PathBuf> {
        match self.download_result(url, folder).await {
            DownloadResult::Success(path) => Some(path),
            DownloadResult::Failure { .. } => None,
        }
    }

    /// Download a single file and report why it failed, if it did
    pub async fn download_result(&self, url: &str, folder: &Path) -> DownloadResult {
        ::log::info!("Starting download from: {}", url);

        if let Err(e) = tokio::fs::create_dir_all(folder).await {
            ::log::error!("Error creating download folder {}: {}", folder.display(), e);
            return DownloadResult::Failure {
                url: url.to_string(),
                reason: e.to_string(),
            };
        }

        let result = self
            .config
            .retry
            .run(&format!("download {}", url), Error::is_transient, || {
                self.fetch_to_folder(url, folder)
            })
            .await;

        match result {
            Ok(path) => {
                ::log::info!("Successfully downloaded: {}", path.display());
                DownloadResult::Success(path)
            }
            Err(e) => {
                ::log::error!("Error downloading {}: {}", url, e);
                DownloadResult::Failure {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Download every link in order, reporting progress after each one
    ///
    /// `progress` receives the number of finished attempts and the total.
    /// A failed link never stops the batch.
    pub async fn download_all(
        &self,
        urls: &[String],
        folder: &Path,
        mut progress: impl FnMut(usize, usize),
    ) -> DownloadReport {
        let mut report = DownloadReport::default();
        let total = urls.len();

        for (i, link) in urls.iter().enumerate() {
            let target = unwrap_download_script(link);
            let result = match self.download_result(&target, folder).await {
                DownloadResult::Failure { reason, .. } => DownloadResult::Failure {
                    url: link.clone(),
                    reason,
                },
                success => success,
            };
            report.record(result);
            progress(i + 1, total);
        }

        ::log::info!(
            "Batch download finished: {} succeeded, {} failed",
            report.successes.len(),
            report.failures.len()
        );
        report
    }

    /// One attempt: HEAD check, fetch and stream the body to disk
    async fn fetch_to_folder(&self, url: &str, folder: &Path) -> Result<PathBuf> {
        let headers = self.request_headers(url);

        ::log::debug!("Checking content type of {}", url);
        let head = self
            .client
            .head(url)
            .headers(headers.clone())
            .timeout(self.config.head_timeout())
            .send()
            .await?;
        let declared = content_type(head.headers());
        if !is_pdf_content_type(&declared) {
            // Servers often mislabel files or route them through an HTML page
            ::log::info!(
                "Declared type {:?} for {}, fetching with redirects anyway",
                declared,
                url
            );
        }

        let response = self
            .client
            .get(url)
            .headers(headers)
            .timeout(self.config.download_timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        let received = content_type(response.headers());
        if received.starts_with("text/html") {
            ::log::warn!("{} answered with an HTML page, saving it anyway", url);
        }

        let filename = filename_for(url, response.headers());
        let path = unique_path(folder, &filename).await?;
        ::log::info!("Downloading file as: {}", path.display());

        match write_body(response, &path).await {
            Ok(0) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(Error::EmptyBody(url.to_string()))
            }
            Ok(bytes) => {
                ::log::debug!("Wrote {} bytes to {}", bytes, path.display());
                Ok(std::path::absolute(&path)?)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    fn request_headers(&self, url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&self.config.random_user_agent()) {
            headers.insert(USER_AGENT, agent);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_PDF));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        if let Ok(referer) = HeaderValue::from_str(url) {
            headers.insert(REFERER, referer);
        }
        headers
    }
}

/// `folder/filename`, or `folder/<stem>-<n>.<ext>` with the first free `n`
/// when a file of that name already exists
async fn unique_path(folder: &Path, filename: &str) -> Result<PathBuf> {
    let candidate = folder.join(filename);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename);
    let extension = name.extension().and_then(|ext| ext.to_str());

    let mut n = 1u32;
    loop {
        let candidate = match extension {
            Some(ext) => folder.join(format!("{}-{}.{}", stem, n, ext)),
            None => folder.join(format!("{}-{}", stem, n)),
        };
        if !tokio::fs::try_exists(&candidate).await? {
            ::log::debug!("{} exists, saving as {}", filename, candidate.display());
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Stream the response body into `path`, returning the number of bytes written
async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    Ok(written)
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_lowercase()
}

fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.contains("application/pdf") || content_type.contains("application/octet-stream")
}

/// Follow `download_file.php?...files=<target>` links to their target
///
/// Other links come back unchanged.
pub fn unwrap_download_script(link: &str) -> String {
    if !link.contains("download_file.php") {
        return link.to_string();
    }

    let target = Url::parse(link).ok().and_then(|url| {
        url.query_pairs()
            .find(|(key, value)| key == "files" && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    });

    match target.and_then(|target| absolute_url(link, &target)) {
        Some(resolved) => {
            ::log::debug!("Unwrapped download script {} to {}", link, resolved);
            resolved
        }
        None => link.to_string(),
    }
}
