//! Errors surfaced by every fetch and scrape in this crate.
//!
//! Each variant carries the URL (or field) it concerns, so that a failure in
//! production points straight at the page whose layout drifted.

use thiserror::Error;

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The server answered, but not with 200.
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// The body could not be decoded as HTML or JSON.
    #[error("unable to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// An expected node is missing. Usually the upstream html layout changed.
    #[error("unable to find {field} while parsing {url}, maybe the html structure has changed")]
    Structure { field: &'static str, url: String },

    #[error(transparent)]
    Date(#[from] DateParseError),

    #[error("unable to find the course website link in {url}")]
    IdNotFound { url: String },

    #[error("unexpected course id {found:?} in {url}, the website has changed?")]
    IdFormat { url: String, found: String },

    /// The open-data portal returned `success: false`.
    #[error("open data request to {url} failed: {message}")]
    Catalog { url: String, message: String },

    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: &'static str, message: String },

    #[error("background fetch did not complete: {message}")]
    TaskFailed { message: String },
}

impl ScrapeError {
    pub(crate) fn structure(field: &'static str, url: &str) -> Self {
        ScrapeError::Structure {
            field,
            url: url.to_string(),
        }
    }

    pub(crate) fn parse(url: &str, message: impl ToString) -> Self {
        ScrapeError::Parse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// True when the failure points at a page layout we no longer understand,
    /// as opposed to a network problem.
    pub fn is_layout_drift(&self) -> bool {
        matches!(
            self,
            ScrapeError::Structure { .. }
                | ScrapeError::Date(_)
                | ScrapeError::IdNotFound { .. }
                | ScrapeError::IdFormat { .. }
        )
    }
}

/// Failures of the Italian date phrasing parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("unknown italian month {month:?} in {input:?}")]
    UnknownMonth { month: String, input: String },

    #[error("{input:?} does not look like \"<day> <month> <year> ore <hh:mm>\"")]
    Pattern { input: String },

    #[error("could not load timezone {name:?}: {message}")]
    UnknownTimezone { name: String, message: String },

    #[error("{input:?} does not exist in timezone {timezone}")]
    NonexistentLocalTime { input: String, timezone: String },
}
