//! Navigation link enumeration for the documentation landing page.

use scraper::{Html, Selector};
use serde::Serialize;

use crate::docs_parser::element_text;
use crate::fetcher::{FetchError, PageFetcher};

/// Anchors in the navigation bar and in the docs sidebar menu.
pub const NAV_LINK_SELECTOR: &str = "nav a[href], .menu__link[href]";

/// One anchor from the landing page's navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub href: String,
    pub label: String,
}

impl NavLink {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
        }
    }

    /// Whether the link points inside the documentation site.
    ///
    /// Anything carrying a URL scheme (`https:`, `mailto:`, ...) or starting
    /// with `//` leaves the site.
    pub fn is_internal(&self) -> bool {
        let href = self.href.trim();
        !href.starts_with("//") && url::Url::parse(href).is_err()
    }
}

/// Extracts every navigation anchor from `markup` in document order.
///
/// Duplicate hrefs are kept; each occurrence is a separate candidate.
pub fn extract_nav_links(markup: &str) -> Vec<NavLink> {
    let Ok(selector) = Selector::parse(NAV_LINK_SELECTOR) else {
        return Vec::new();
    };
    let document = Html::parse_document(markup);

    document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            Some(NavLink::new(href, element_text(anchor)))
        })
        .collect()
}

/// Fetches the landing page at `landing_url` and returns its navigation links.
pub async fn enumerate(
    fetcher: &dyn PageFetcher,
    landing_url: &str,
) -> Result<Vec<NavLink>, FetchError> {
    let markup = fetcher.fetch(landing_url).await?;
    let links = extract_nav_links(&markup);
    tracing::debug!("Found {} navigation links on {}", links.len(), landing_url);
    Ok(links)
}
