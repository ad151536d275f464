//! Search in the university staff directory ("rubrica").

use log::info;
use scraper::ElementRef;
use serde::Serialize;

use crate::{
    error::{Result, ScrapeError},
    html_query::{HtmlDocument, Query, find_one_in, inner_text},
    scraping_context::ScrapingContext,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct RubricaSelectors {
    card: Query,
    full_name: Query,
    email: Query,
}

impl RubricaSelectors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            card: Query::new("table.contact.vcard")?,
            full_name: Query::new("td.fn.name")?,
            email: Query::new("a.email")?,
        })
    }
}

pub struct ContactExtractor {
    selectors: RubricaSelectors,
}

impl ContactExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            selectors: RubricaSelectors::new()?,
        })
    }

    /// One contact per result card. No cards means no match, not an error.
    pub fn contacts(&self, document: &HtmlDocument, url: &str) -> Result<Vec<Contact>> {
        document
            .find_all(&self.selectors.card)
            .into_iter()
            .map(|card| self.contact(card, url))
            .collect()
    }

    fn contact(&self, card: ElementRef, url: &str) -> Result<Contact> {
        let full_name = find_one_in(card, &self.selectors.full_name)
            .map(inner_text)
            .ok_or_else(|| ScrapeError::structure("contact name", url))?;

        // Rendered as "LAST, First".
        let (last_name, first_name) = match full_name.split(',').collect::<Vec<_>>().as_slice() {
            [last, first] => (last.trim().to_string(), first.trim().to_string()),
            _ => {
                return Err(ScrapeError::parse(
                    url,
                    format!("unable to split contact name {full_name:?}"),
                ));
            }
        };

        let email = find_one_in(card, &self.selectors.email)
            .map(inner_text)
            .ok_or_else(|| ScrapeError::structure("contact email", url))?;
        let email = email.trim();
        let email = email.strip_prefix("mailto:").unwrap_or(email).to_string();

        Ok(Contact {
            first_name,
            last_name,
            email,
        })
    }
}

pub async fn search(ctx: &ScrapingContext, first_name: &str, last_name: &str) -> Result<Vec<Contact>> {
    let url = ctx.urls.directory_search_url(first_name, last_name);
    let body = ctx.fetch(&url).await?;
    let document = HtmlDocument::parse(&body, &url)?;
    let contacts = ContactExtractor::new()?.contacts(&document, &url)?;
    info!("{} contacts for {first_name:?} {last_name:?}", contacts.len());
    Ok(contacts)
}
