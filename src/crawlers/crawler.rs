use crate::error::Result;
use std::future::Future;

/// What a page is being loaded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Looking for download links; also scans the live DOM for hrefs
    Links,
    /// Extracting content; waits for deferred content to render
    Content,
}

/// A page as rendered by the browser
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// Full page source after rendering
    pub html: String,

    /// `href` values of live elements that mention `download` or `.pdf`,
    /// as written (may be relative)
    pub dom_links: Vec<String>,
}

/// Loads and renders pages
pub trait PageLoader {
    /// Load `url` using the given user agent
    ///
    /// Implementations must release any browser resources before returning,
    /// whether loading succeeded or not.
    fn load(
        &self,
        url: &str,
        user_agent: &str,
        mode: LoadMode,
    ) -> impl Future<Output = Result<RenderedPage>>;
}
