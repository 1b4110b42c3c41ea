//! Content extraction from documentation markup.
//!
//! Extraction is driven by [`SelectorRules`], a small declarative rule set
//! naming the CSS selector for a page's title and for its content container.
//! The same extractor serves docs pages and API reference pages; only the
//! rules differ.

use std::borrow::Cow;

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Character budget for a fetched page body.
pub const FULL_PAGE_LIMIT: usize = 1000;

/// Character budget for a search result preview.
pub const PREVIEW_LIMIT: usize = 200;

/// Marker appended to text cut at a limit.
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Selectors used to pull a title and a body out of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorRules {
    /// Selector whose first match supplies the title.
    pub title: Cow<'static, str>,
    /// Selector whose first match supplies the body text.
    pub body: Cow<'static, str>,
}

impl SelectorRules {
    pub fn new(title: impl Into<Cow<'static, str>>, body: impl Into<Cow<'static, str>>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Rules for a documentation section page: the top-level heading and the
    /// article holding the page's readable text.
    pub fn docs_page() -> Self {
        Self::new("h1", "article")
    }

    /// Rules for a docs.rs API page: the first code signature block of a
    /// function, struct or trait, and the first documentation block.
    pub fn api_reference() -> Self {
        Self::new(
            "pre.rust.fn, pre.rust.struct, pre.rust.trait, pre.rust.item-decl, .item-decl",
            ".docblock",
        )
    }
}

/// Title and body text extracted from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub body: String,
}

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Whitespace-normalized text of an element and its descendants.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).join(" ")
}

fn first_match_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Applies `rules` to `markup`.
///
/// Missing elements yield empty strings rather than errors; only malformed
/// selectors fail.
pub fn extract(markup: &str, rules: &SelectorRules) -> Result<Extracted, ExtractError> {
    let title_selector = compile(&rules.title)?;
    let body_selector = compile(&rules.body)?;

    let document = Html::parse_document(markup);

    Ok(Extracted {
        title: first_match_text(&document, &title_selector),
        body: first_match_text(&document, &body_selector),
    })
}

/// Keeps at most `limit` characters of `text`, appending [`ELLIPSIS`] only
/// when something was cut.
pub fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
