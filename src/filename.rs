//! Local file names for downloaded resources.

use crate::filter::{DOWNLOAD_SCRIPTS, is_download_script};
use crate::utils::sanitize_filename;
use sha2::{Digest, Sha256};
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use url::Url;

/// Derive a safe file name for a download
///
/// Looks at, in order: the `Content-Disposition` header, the `file` or
/// `filename` query parameter of known download scripts, and the last path
/// segment. Falls back to `paper_<hash>.pdf`. The result always ends in
/// `.pdf` and never contains path separators.
pub fn filename_for(url: &str, headers: &HeaderMap) -> String {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            ::log::error!("Error getting filename for {}: {}", url, e);
            return format!("error_{}.pdf", url_hash(url));
        }
    };

    let candidate = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_content_disposition_filename)
        .or_else(|| script_query_filename(&parsed))
        .unwrap_or_else(|| path_basename(&parsed));

    let name = if candidate.trim().is_empty() || is_generic_script_name(&candidate) {
        format!("paper_{}.pdf", url_hash(url))
    } else {
        candidate.trim().to_string()
    };

    let mut name = sanitize_filename(&name);
    if !name.to_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    name
}

/// First 8 hex characters of the URL's SHA-256 digest
pub fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// Parse the file name out of a `Content-Disposition` header value
///
/// Accepts `filename="a.pdf"`, `filename=a.pdf` and the RFC 5987
/// `filename*=UTF-8''a.pdf` form, preferring the latter.
pub fn parse_content_disposition_filename(header: &str) -> Option<String> {
    if let Some(start) = header.find("filename*=") {
        let rest = &header[start + "filename*=".len()..];
        if let Some(idx) = rest.find("''") {
            let encoded = rest[idx + 2..].split(';').next().unwrap_or("").trim();
            let decoded = decode_percent(encoded);
            if !decoded.is_empty() {
                return Some(decoded);
            }
        }
    }

    let start = header.find("filename=")?;
    let rest = &header[start + "filename=".len()..];
    let name = match rest.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or(""),
        None => rest.split(';').next().unwrap_or(""),
    };
    let name = name.trim().trim_matches('\'');
    (!name.is_empty()).then(|| name.to_string())
}

/// `file`/`filename` query parameter of a download-script URL
fn script_query_filename(url: &Url) -> Option<String> {
    if !is_download_script(url.path()) {
        return None;
    }
    let pairs: Vec<_> = url.query_pairs().collect();
    ["file", "filename"].iter().find_map(|key| {
        pairs
            .iter()
            .find(|(k, v)| &**k == *key && !v.is_empty())
            .map(|(_, v)| last_segment(v).to_string())
    })
}

fn path_basename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(decode_percent)
        .unwrap_or_default()
}

fn last_segment(value: &str) -> &str {
    value.rsplit(['/', '\\']).next().unwrap_or(value)
}

fn is_generic_script_name(name: &str) -> bool {
    let name = name.to_lowercase();
    DOWNLOAD_SCRIPTS.iter().any(|script| name == *script)
}

fn decode_percent(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn disposition(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_content_disposition_wins() {
        let headers = disposition(r#"attachment; filename="Annual Report.pdf""#);
        assert_eq!(
            filename_for("https://site.org/download.php?file=other.pdf", &headers),
            "Annual Report.pdf"
        );
    }

    #[test]
    fn test_content_disposition_variants() {
        assert_eq!(
            parse_content_disposition_filename("attachment; filename=doc.pdf"),
            Some("doc.pdf".to_string())
        );
        assert_eq!(
            parse_content_disposition_filename("attachment; filename*=UTF-8''my%20doc.pdf"),
            Some("my doc.pdf".to_string())
        );
        assert_eq!(
            parse_content_disposition_filename(
                r#"attachment; filename="fallback.pdf"; filename*=UTF-8''preferred.pdf"#
            ),
            Some("preferred.pdf".to_string())
        );
        assert_eq!(parse_content_disposition_filename("inline"), None);
    }

    #[test]
    fn test_download_script_query() {
        let headers = HeaderMap::new();
        assert_eq!(
            filename_for("https://conf.org/download_file.php?file=papers/p12.pdf", &headers),
            "p12.pdf"
        );
        assert_eq!(
            filename_for("https://conf.org/download.php?id=3&filename=slides", &headers),
            "slides.pdf"
        );
    }

    #[test]
    fn test_path_basename() {
        assert_eq!(
            filename_for("https://site.org/files/a.pdf", &HeaderMap::new()),
            "a.pdf"
        );
        assert_eq!(
            filename_for("https://site.org/files/report", &HeaderMap::new()),
            "report.pdf"
        );
    }

    #[test]
    fn test_hash_fallback() {
        let url = "https://site.org/";
        let name = filename_for(url, &HeaderMap::new());
        assert_eq!(name, format!("paper_{}.pdf", url_hash(url)));
        assert_eq!(name.len(), "paper_.pdf".len() + 8);

        let script = "https://site.org/download_file.php?id=9";
        assert_eq!(
            filename_for(script, &HeaderMap::new()),
            format!("paper_{}.pdf", url_hash(script))
        );
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(url_hash("https://site.org/"), url_hash("https://site.org/"));
        assert_ne!(url_hash("https://site.org/a"), url_hash("https://site.org/b"));
        // leading bytes of the SHA-256 of "abc"
        assert_eq!(url_hash("abc"), "ba7816bf");
    }

    #[test]
    fn test_never_empty_and_pdf() {
        for url in ["https://site.org", "https://site.org/?q=1", "nonsense", ""] {
            let name = filename_for(url, &HeaderMap::new());
            assert!(!name.is_empty());
            assert!(name.ends_with(".pdf"));
        }
    }

    #[test]
    fn test_unparseable_url_gets_error_name() {
        let name = filename_for("::not a url::", &HeaderMap::new());
        assert!(name.starts_with("error_"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn test_illegal_characters_replaced() {
        let headers = disposition(r#"attachment; filename="a:b*c?.pdf""#);
        assert_eq!(filename_for("https://site.org/x", &headers), "a_b_c_.pdf");
    }
}
