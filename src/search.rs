//! Fan-out search across the pages linked from the docs navigation tree.
//!
//! Every internal link becomes its own task. Each task fetches its page,
//! extracts it with [`SelectorRules::docs_page`] and tests the body for the
//! query. A failing branch only removes that page from the results; the
//! search as a whole never fails.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use url::Url;

use crate::docs_parser::{self, PREVIEW_LIMIT, SelectorRules};
use crate::fetcher::PageFetcher;
use crate::nav::NavLink;

/// One matched or fetched documentation page fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocSection {
    pub title: String,
    pub content: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Upper bound on pages fetched at once. `None` fetches every page
    /// concurrently.
    pub max_concurrency: Option<usize>,
}

/// Settled outcome of one fan-out branch.
#[derive(Debug)]
enum BranchOutcome {
    Matched(DocSection),
    NoMatch,
    Failed { url: String, reason: String },
}

/// Case-insensitive substring test.
pub fn matches_query(body: &str, query: &str) -> bool {
    body.to_lowercase().contains(&query.to_lowercase())
}

/// Resolves a navigation href against the docs origin.
pub fn resolve_link(base: &Url, href: &str) -> Result<Url, url::ParseError> {
    base.join(href)
}

fn evaluate_page(markup: &str, query: &str, link: &NavLink, url: &Url) -> BranchOutcome {
    let extracted = match docs_parser::extract(markup, &SelectorRules::docs_page()) {
        Ok(extracted) => extracted,
        Err(e) => {
            return BranchOutcome::Failed {
                url: url.to_string(),
                reason: e.to_string(),
            };
        }
    };

    if !matches_query(&extracted.body, query) {
        return BranchOutcome::NoMatch;
    }

    let title = if extracted.title.is_empty() {
        link.label.clone()
    } else {
        extracted.title
    };

    BranchOutcome::Matched(DocSection {
        title,
        content: docs_parser::truncate_with_ellipsis(&extracted.body, PREVIEW_LIMIT),
        url: url.to_string(),
    })
}

async fn search_link(
    fetcher: Arc<dyn PageFetcher>,
    base: Url,
    link: NavLink,
    query: Arc<str>,
    permits: Option<Arc<Semaphore>>,
) -> BranchOutcome {
    let url = match resolve_link(&base, &link.href) {
        Ok(url) => url,
        Err(e) => {
            return BranchOutcome::Failed {
                url: link.href,
                reason: e.to_string(),
            };
        }
    };

    let _permit = match &permits {
        Some(semaphore) => semaphore.acquire().await.ok(),
        None => None,
    };

    match fetcher.fetch(url.as_str()).await {
        Ok(markup) => evaluate_page(&markup, &query, &link, &url),
        Err(e) => BranchOutcome::Failed {
            url: url.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Searches the pages behind `links` for `query`.
///
/// External links are skipped without being fetched. All branches run to
/// completion before this returns; the order of the returned sections is
/// unspecified.
pub async fn search(
    fetcher: Arc<dyn PageFetcher>,
    base: &Url,
    query: &str,
    links: Vec<NavLink>,
    options: &SearchOptions,
) -> Vec<DocSection> {
    let query: Arc<str> = Arc::from(query);
    let permits = options
        .max_concurrency
        .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

    let handles = links
        .into_iter()
        .filter(NavLink::is_internal)
        .map(|link| {
            tokio::spawn(search_link(
                fetcher.clone(),
                base.clone(),
                link,
                query.clone(),
                permits.clone(),
            ))
        })
        .collect::<Vec<_>>();

    tracing::info!("Searching {} pages for '{}'", handles.len(), query);

    let mut sections = Vec::new();
    for outcome in join_all(handles).await {
        match outcome {
            Ok(BranchOutcome::Matched(section)) => {
                tracing::debug!("Match in {}", section.url);
                sections.push(section);
            }
            Ok(BranchOutcome::NoMatch) => {}
            Ok(BranchOutcome::Failed { url, reason }) => {
                tracing::warn!("Skipping {} during search: {}", url, reason);
            }
            Err(e) => {
                tracing::warn!("Search task did not complete: {}", e);
            }
        }
    }

    sections
}
