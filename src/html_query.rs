//! Thin layer over `scraper`: parse a page once, then query it through named,
//! precompiled selectors.
//!
//! An empty match is never an error here; callers decide whether a missing
//! node means the layout changed.

use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, ScrapeError};
use crate::text_manipulators::extract_text;

/// A compiled structural query.
#[derive(Debug, Clone)]
pub struct Query {
    selector: Selector,
}

impl Query {
    pub fn new(source: &'static str) -> Result<Self> {
        let selector = Selector::parse(source).map_err(|e| ScrapeError::Selector {
            selector: source,
            message: e.to_string(),
        })?;
        Ok(Self { selector })
    }
}

pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parses raw bytes. The html parser itself recovers from any markup, so
    /// only bodies that are not text at all are refused.
    pub fn parse(body: &[u8], url: &str) -> Result<Self> {
        let text = std::str::from_utf8(body).map_err(|e| ScrapeError::parse(url, e))?;
        Ok(Self::parse_str(text))
    }

    pub fn parse_str(text: &str) -> Self {
        Self {
            html: Html::parse_document(text),
        }
    }

    pub fn find_all(&self, query: &Query) -> Vec<ElementRef<'_>> {
        self.html.select(&query.selector).collect()
    }

    pub fn find_one(&self, query: &Query) -> Option<ElementRef<'_>> {
        self.html.select(&query.selector).next()
    }
}

/// All descendants of `node` matching `query`, in document order.
pub fn find_all_in<'a>(node: ElementRef<'a>, query: &Query) -> Vec<ElementRef<'a>> {
    node.select(&query.selector).collect()
}

pub fn find_one_in<'a>(node: ElementRef<'a>, query: &Query) -> Option<ElementRef<'a>> {
    node.select(&query.selector).next()
}

/// The `position`-th (zero based) match below `node`.
pub fn find_nth_in<'a>(node: ElementRef<'a>, query: &Query, position: usize) -> Option<ElementRef<'a>> {
    node.select(&query.selector).nth(position)
}

/// Visible text of a node and all its descendants, untouched.
pub fn inner_text(node: ElementRef) -> String {
    extract_text(node)
}

pub fn attr<'a>(node: ElementRef<'a>, name: &str) -> Option<&'a str> {
    node.value().attr(name)
}
