use url::{Position, Url};

/// Convert a possibly relative link into an absolute URL
///
/// Links that already carry a scheme come back unchanged. Returns `None`
/// for empty links or when the base cannot be used for resolution.
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    if has_scheme(href) {
        return Some(href.to_string());
    }

    let base_url = match Url::parse(base) {
        Ok(url) => url,
        Err(e) => {
            ::log::error!("Error getting absolute URL for {} (base {}): {}", href, base, e);
            return None;
        }
    };

    if base_url.cannot_be_a_base() {
        ::log::error!("Base URL {} cannot resolve relative link {}", base, href);
        return None;
    }

    if href.starts_with("//") {
        return Some(format!("{}:{}", base_url.scheme(), href));
    }

    if href.starts_with('/') {
        return Some(format!("{}{}", &base_url[..Position::BeforePath], href));
    }

    match base_url.join(href) {
        Ok(joined) => Some(joined.to_string()),
        Err(e) => {
            ::log::error!("Error joining {} onto {}: {}", href, base, e);
            None
        }
    }
}

/// Whether a link starts with a URL scheme such as `https:` or `mailto:`
fn has_scheme(href: &str) -> bool {
    match href.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Replace characters that are not allowed in file names
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
