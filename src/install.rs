//! Fetch the automation driver build matching the installed browser.
//!
//! Only the `linux64` builds are fetched, matching the guard's Linux-style
//! install assumption.

use crate::error::{Error, Result};
use reqwest::Client;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zip::ZipArchive;

/// Chrome for Testing download host
pub const CHROME_FOR_TESTING_URL: &str = "https://storage.googleapis.com/chrome-for-testing-public";

/// Host of the driver builds published before Chrome for Testing
pub const LEGACY_DRIVER_URL: &str = "https://chromedriver.storage.googleapis.com";

pub const PLATFORM: &str = "linux64";

/// Name of the driver executable inside the archive
const DRIVER_BINARY: &str = "chromedriver";

/// Downloads driver archives and unpacks the driver binary
pub struct DriverInstaller {
    client: Client,
    base_url: String,
    legacy_url: String,
}

impl DriverInstaller {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_sources(CHROME_FOR_TESTING_URL, LEGACY_DRIVER_URL, timeout)
    }

    /// Installer fetching from other hosts (mirrors, tests)
    pub fn with_sources(base_url: &str, legacy_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            legacy_url: legacy_url.trim_end_matches('/').to_string(),
        })
    }

    /// Archive URLs tried for `version`, in order
    pub fn download_urls(&self, version: &str) -> Vec<String> {
        vec![
            format!(
                "{}/{}/{}/chromedriver-{}.zip",
                self.base_url, version, PLATFORM, PLATFORM
            ),
            format!("{}/{}/chromedriver_{}.zip", self.legacy_url, version, PLATFORM),
        ]
    }

    /// Download the driver for `version` and place it at `target`
    ///
    /// Each source is tried in turn. A previous binary at `target` is
    /// replaced. Returns the installed path.
    pub async fn install(&self, version: &str, target: &Path) -> Result<PathBuf> {
        ::log::info!("Using browser version: {}", version);

        for url in self.download_urls(version) {
            ::log::info!("Attempting to download from: {}", url);
            match self.fetch_archive(&url).await {
                Ok(archive) => match unpack(archive, target.to_path_buf()).await {
                    Ok(()) => {
                        ::log::info!("Driver installed successfully at: {}", target.display());
                        return Ok(target.to_path_buf());
                    }
                    Err(e) => ::log::error!("Error unpacking {}: {}", url, e),
                },
                Err(e) => ::log::error!("Error with {}: {}", url, e),
            }
        }

        Err(Error::Environment(format!(
            "no {} driver build found for version {}",
            PLATFORM, version
        )))
    }

    async fn fetch_archive(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

async fn unpack(archive: Vec<u8>, target: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || extract_driver(&archive, &target))
        .await
        .map_err(|e| Error::Environment(format!("driver unpack task failed: {}", e)))?
}

/// Copy the driver binary out of a zip archive to `target`
fn extract_driver(archive: &[u8], target: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(Cursor::new(archive))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let is_driver = Path::new(entry.name())
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == DRIVER_BINARY);
        if !is_driver || entry.is_dir() {
            continue;
        }

        ::log::info!("Extracting {}...", entry.name());
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if target.exists() {
            std::fs::remove_file(target)?;
        }

        let mut out = File::create(target)?;
        std::io::copy(&mut entry, &mut out)?;
        make_executable(target)?;
        return Ok(());
    }

    Err(Error::Environment(format!(
        "could not find {} in the downloaded archive",
        DRIVER_BINARY
    )))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
