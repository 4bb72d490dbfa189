use regex::RegexSet;
use std::sync::LazyLock;

/// Patterns recognising PDF files and download endpoints
const DOWNLOAD_PATTERNS: &[&str] = &[
    r"download_file\.php",
    r"download\.php",
    r"get_file\.php",
    r"\.pdf$",
    r"/pdf/",
    r"download.*\.pdf",
    r"paper.*\.pdf",
    r"mark.*\.pdf",
];

/// Download-script names whose query string carries the real file name
pub const DOWNLOAD_SCRIPTS: &[&str] = &["download_file.php", "download.php", "get_file.php"];

static DOWNLOAD_SET: LazyLock<Result<RegexSet, regex::Error>> =
    LazyLock::new(|| RegexSet::new(DOWNLOAD_PATTERNS));

/// Check if a link points at a downloadable PDF
///
/// Matching is case-insensitive. When the pattern set is unusable the link
/// is treated as not downloadable.
pub fn is_download_link(href: &str) -> bool {
    if href.is_empty() {
        return false;
    }

    match DOWNLOAD_SET.as_ref() {
        Ok(set) => set.is_match(&href.to_lowercase()),
        Err(e) => {
            ::log::error!("Error checking download link {}: {}", href, e);
            false
        }
    }
}

/// Check if a URL path ends in one of the known download scripts
pub fn is_download_script(path: &str) -> bool {
    let path = path.to_lowercase();
    DOWNLOAD_SCRIPTS
        .iter()
        .any(|script| path.ends_with(&format!("/{}", script)) || path == *script)
}
