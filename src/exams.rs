//! Exam sessions scraped from a degree's `appelli` pages.
//!
//! A page lists subject groups: an `h3[role=tab]` heading (code, title,
//! teacher) paired with a `div[role=tabpanel]` holding one table per exam
//! session. Each session table has four rows in a fixed order: date,
//! subscription window, exam type, location.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use log::{debug, info, warn};
use scraper::ElementRef;
use serde::Serialize;

use crate::{
    degree::CourseId,
    error::{Result, ScrapeError},
    html_query::{HtmlDocument, Query, find_all_in, find_nth_in, find_one_in, inner_text},
    italian_date::ItalianDateParser,
    scraping_context::ScrapingContext,
    text_manipulators::TextNormalizer,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exam {
    pub subject_code: String,
    pub subject_name: String,
    pub teacher: String,
    pub date: DateTime<Tz>,
    /// Free text, e.g. "Scritto" or "Orale".
    pub exam_type: String,
    pub location: String,
    /// Free text, e.g. "aperta dal 18 ottobre 2024 al 05 dicembre 2024".
    pub subscriptions: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionWindow {
    pub opens: NaiveDate,
    pub closes: NaiveDate,
}

impl Exam {
    /// Reads "... dal <date> al <date>" out of the subscription text, if it
    /// has that shape.
    pub fn subscription_window(&self, dates: &ItalianDateParser) -> Option<SubscriptionWindow> {
        let (_, rest) = self.subscriptions.split_once("dal ")?;
        let (opens, closes) = rest.rsplit_once(" al ")?;
        Some(SubscriptionWindow {
            opens: dates.parse_day(opens).ok()?,
            closes: dates.parse_day(closes).ok()?,
        })
    }
}

/// Every structural query the exam pages need.
#[derive(Debug, Clone)]
pub struct ExamSelectors {
    tab: Query,
    panel: Query,
    subject_link: Query,
    subject_code: Query,
    teacher: Query,
    session: Query,
    session_row: Query,
    session_cell: Query,
}

impl ExamSelectors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tab: Query::new("h3[role='tab']")?,
            panel: Query::new("div[role='tabpanel']")?,
            subject_link: Query::new("a")?,
            subject_code: Query::new("span.code")?,
            teacher: Query::new("span.docente")?,
            session: Query::new("table")?,
            session_row: Query::new("tr")?,
            session_cell: Query::new("td")?,
        })
    }
}

// Row of each field inside a session table.
const DATE_ROW: usize = 0;
const SUBSCRIPTIONS_ROW: usize = 1;
const TYPE_ROW: usize = 2;
const LOCATION_ROW: usize = 3;

/// Code, title and teacher shared by all sessions of a subject group.
#[derive(Debug)]
struct SubjectGroup {
    code: String,
    name: String,
    teacher: String,
}

pub struct ExamPageScraper {
    selectors: ExamSelectors,
    dates: ItalianDateParser,
    plain: TextNormalizer,
}

impl ExamPageScraper {
    pub fn new(dates: ItalianDateParser) -> Result<Self> {
        Ok(Self {
            selectors: ExamSelectors::new()?,
            dates,
            plain: TextNormalizer::default(),
        })
    }

    pub fn parse_page(&self, body: &[u8], url: &str) -> Result<Vec<Exam>> {
        let document = HtmlDocument::parse(body, url)?;
        self.parse_document(&document, url)
    }

    /// All exams on one page. An empty vector means the page had no subjects.
    pub fn parse_document(&self, document: &HtmlDocument, url: &str) -> Result<Vec<Exam>> {
        let tabs = document.find_all(&self.selectors.tab);
        let panels = document.find_all(&self.selectors.panel);
        if tabs.len() != panels.len() {
            return Err(ScrapeError::structure("a tab panel for every subject", url));
        }

        let mut exams = Vec::new();
        for (tab, panel) in tabs.into_iter().zip(panels) {
            let group = self.subject_group(tab, url)?;

            let sessions = find_all_in(panel, &self.selectors.session);
            if sessions.is_empty() {
                return Err(ScrapeError::structure("exam sessions", url));
            }

            debug!("{} sessions for subject {}", sessions.len(), group.code);
            for session in sessions {
                exams.push(self.exam(session, &group, url)?);
            }
        }

        Ok(exams)
    }

    fn subject_group(&self, tab: ElementRef, url: &str) -> Result<SubjectGroup> {
        let link = find_one_in(tab, &self.selectors.subject_link)
            .ok_or_else(|| ScrapeError::structure("subject", url))?;

        let code = find_one_in(tab, &self.selectors.subject_code)
            .map(|node| self.plain.normalize(&inner_text(node)))
            .ok_or_else(|| ScrapeError::structure("subject code", url))?;

        let teacher = find_one_in(link, &self.selectors.teacher)
            .map(|node| self.plain.normalize(&inner_text(node)))
            .ok_or_else(|| ScrapeError::structure("teacher", url))?;

        // The link text repeats code and teacher around the title.
        let name = TextNormalizer::new([code.as_str(), teacher.as_str()]).normalize(&inner_text(link));

        Ok(SubjectGroup {
            code,
            name,
            teacher,
        })
    }

    fn exam(&self, session: ElementRef, group: &SubjectGroup, url: &str) -> Result<Exam> {
        let date = self.session_field(session, DATE_ROW, "date", url)?;
        let subscriptions = self.session_field(session, SUBSCRIPTIONS_ROW, "subscription list", url)?;
        let exam_type = self.session_field(session, TYPE_ROW, "exam type", url)?;
        let location = self.session_field(session, LOCATION_ROW, "location", url)?;

        Ok(Exam {
            subject_code: group.code.clone(),
            subject_name: group.name.clone(),
            teacher: group.teacher.clone(),
            date: self.dates.parse(&date)?,
            exam_type,
            location,
            subscriptions,
        })
    }

    fn session_field(
        &self,
        session: ElementRef,
        row: usize,
        field: &'static str,
        url: &str,
    ) -> Result<String> {
        find_nth_in(session, &self.selectors.session_row, row)
            .and_then(|row| find_one_in(row, &self.selectors.session_cell))
            .map(|cell| self.plain.normalize(&inner_text(cell)))
            .ok_or_else(|| ScrapeError::structure(field, url))
    }
}

/// Every exam of a degree, optionally only those of one subject.
///
/// Pages are fetched until one comes back without subjects. A failing page
/// fails the whole call; exams from earlier pages are dropped.
pub async fn fetch_exams(ctx: &ScrapingContext, id: &CourseId, subject: Option<&str>) -> Result<Vec<Exam>> {
    let scraper = ExamPageScraper::new(ctx.date_parser)?;

    let mut exams = Vec::new();
    let mut start = 0;
    loop {
        let url = ctx.urls.exams_url(id, subject, start);
        let page = match fetch_page(ctx, &scraper, &url).await {
            Ok(page) => page,
            Err(e) => {
                if !exams.is_empty() {
                    warn!("dropping {} exams of {id} already scraped: {e}", exams.len());
                }
                return Err(e);
            }
        };

        if page.is_empty() {
            break;
        }
        exams.extend(page);
        start += ctx.exam_page_size;
    }

    info!("scraped {} exams for {id}", exams.len());
    Ok(exams)
}

async fn fetch_page(ctx: &ScrapingContext, scraper: &ExamPageScraper, url: &str) -> Result<Vec<Exam>> {
    let body = ctx.fetch(url).await?;
    scraper.parse_page(&body, url)
}
