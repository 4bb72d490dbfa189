//! Environment checks run before any browser is started.
//!
//! Assumes a Linux-style install: the browser is found on `PATH` (or at the
//! configured path) and the driver binary lives at `ScraperConfig::driver_path`.

use crate::config::ScraperConfig;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::process::Command;

/// Browser executables tried when no browser binary is configured
const BROWSER_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";
const ELF_CLASS_64: u8 = 2;
const PE_MAGIC: &[u8; 2] = b"MZ";
const PE_MACHINE_AMD64: u16 = 0x8664;
const PE_MACHINE_ARM64: u16 = 0xAA64;

/// Check that the browser is installed and the driver binary is 64-bit
///
/// Logs the reason and returns `false` on any mismatch.
pub fn verify_driver(config: &ScraperConfig) -> bool {
    let Some(version) = browser_version(config) else {
        ::log::error!("Could not determine browser version. Please ensure Chrome is installed.");
        return false;
    };
    ::log::info!("Detected browser version: {}", version);

    let driver = &config.driver_path;
    if !driver.exists() {
        ::log::error!("Driver not found at: {}", driver.display());
        return false;
    }

    match driver_is_64bit(driver) {
        Ok(true) => {
            ::log::info!("Driver at {} is 64-bit", driver.display());
            true
        }
        Ok(false) => {
            ::log::error!(
                "Driver at {} is not 64-bit; it must match the installed browser {}",
                driver.display(),
                version
            );
            false
        }
        Err(e) => {
            ::log::error!("Error verifying driver {}: {}", driver.display(), e);
            false
        }
    }
}

/// Installed browser version, e.g. `139.0.7258.66`
///
/// Asks the configured browser binary first, then the usual executables on
/// `PATH`.
pub fn browser_version(config: &ScraperConfig) -> Option<String> {
    if let Some(binary) = &config.browser_binary {
        match version_from_binary(binary) {
            Some(version) => return Some(version),
            None => ::log::warn!(
                "Could not read version from configured browser {}",
                binary.display()
            ),
        }
    }

    BROWSER_CANDIDATES.iter().find_map(|name| {
        let path = which::which(name).ok()?;
        ::log::debug!("Trying browser executable {}", path.display());
        version_from_binary(&path)
    })
}

fn version_from_binary(binary: &Path) -> Option<String> {
    let output = Command::new(binary).arg("--version").output();
    match output {
        Ok(output) if output.status.success() => {
            parse_version_output(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            ::log::debug!("{} --version exited with {}", binary.display(), output.status);
            None
        }
        Err(e) => {
            ::log::debug!("Could not run {}: {}", binary.display(), e);
            None
        }
    }
}

/// Pull the version number out of `--version` output such as
/// `Google Chrome 139.0.7258.66 `
pub fn parse_version_output(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .rev()
        .find(|word| word.starts_with(|c: char| c.is_ascii_digit()) && word.contains('.'))
        .map(str::to_string)
}

/// Inspect an executable header to tell whether it targets a 64-bit machine
///
/// Understands ELF and PE images. Anything else is reported as not 64-bit.
pub fn driver_is_64bit(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    let read = file.read(&mut magic)?;
    if read < 2 {
        return Ok(false);
    }

    if read == 4 && &magic == ELF_MAGIC {
        let mut class = [0u8; 1];
        file.read_exact(&mut class)?;
        return Ok(class[0] == ELF_CLASS_64);
    }

    if &magic[..2] == PE_MAGIC {
        // e_lfanew at 0x3C points at the "PE\0\0" signature; the machine
        // type follows it
        file.seek(SeekFrom::Start(0x3C))?;
        let mut offset = [0u8; 4];
        file.read_exact(&mut offset)?;
        let pe_offset = u32::from_le_bytes(offset) as u64;

        file.seek(SeekFrom::Start(pe_offset + 4))?;
        let mut machine = [0u8; 2];
        file.read_exact(&mut machine)?;
        let machine = u16::from_le_bytes(machine);
        return Ok(machine == PE_MACHINE_AMD64 || machine == PE_MACHINE_ARM64);
    }

    Ok(false)
}
