//! Degrees and the internal `<type>/<id>` pair every other endpoint needs.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::{
    curriculum::{self, Curriculum},
    error::{Result, ScrapeError},
    exams::{self, Exam},
    scraping_context::ScrapingContext,
    timetable::{self, Interval, Timetable},
};

/// Identifies a degree on the courses website, e.g. `laurea/IngegneriaInformatica`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId {
    /// e.g. "laurea", "magistrale", "2cycle"
    pub course_type: String,
    /// e.g. "IngegneriaInformatica"
    pub id: String,
}

impl CourseId {
    pub fn new(course_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            course_type: course_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.course_type, self.id)
    }
}

/// Recovers a [`CourseId`] from a degree's public page.
///
/// The page links to the degree website with a fixed anchor; the path of that
/// link is the id.
#[derive(Debug, Clone)]
pub struct DegreeIdResolver {
    link_regex: Regex,
}

impl DegreeIdResolver {
    pub fn new(courses_url: &str) -> Result<Self> {
        let pattern = format!(
            r#"<a title="Sito del corso" href="{}/(.+?)""#,
            regex::escape(courses_url.trim_end_matches('/'))
        );
        let link_regex = Regex::new(&pattern).map_err(|e| ScrapeError::Selector {
            selector: "course website link",
            message: e.to_string(),
        })?;
        Ok(Self { link_regex })
    }

    pub fn extract(&self, html: &str, url: &str) -> Result<CourseId> {
        let Some(found) = self.link_regex.captures(html).and_then(|caps| caps.get(1)) else {
            return Err(ScrapeError::IdNotFound {
                url: url.to_string(),
            });
        };

        let path = found.as_str().trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [course_type, id] if !course_type.is_empty() && !id.is_empty() => {
                Ok(CourseId::new(*course_type, *id))
            }
            _ => Err(ScrapeError::IdFormat {
                url: url.to_string(),
                found: found.as_str().to_string(),
            }),
        }
    }

    pub async fn resolve(&self, ctx: &ScrapingContext, url: &str) -> Result<CourseId> {
        let html = ctx.fetch_text(url).await?;
        let id = self.extract(&html, url)?;
        debug!("{url} resolved to course id {id}");
        Ok(id)
    }
}

/// A degree course as listed in the university open data.
///
/// The catalog rows are positional; see [`crate::catalog::parse_degrees`].
#[derive(Debug, Default, Serialize)]
pub struct Degree {
    pub academic_year: String,
    pub code: String,
    pub description: String,
    /// Public page of the degree, the only place its [`CourseId`] can be read from.
    pub url: String,
    pub campus: String,
    pub international: bool,
    pub international_title: String,
    pub international_language: String,
    pub fields: String,
    /// e.g. "Laurea triennale"
    pub degree_type: String,
    pub duration_in_years: u32,
    pub open_for_registration: String,
    pub languages: String,
    pub access_requirements: String,
    pub teaching_location: String,

    #[serde(skip)]
    id: OnceCell<CourseId>,
}

impl Degree {
    pub fn new(url: impl Into<String>, duration_in_years: u32) -> Self {
        Self {
            url: url.into(),
            duration_in_years,
            ..Self::default()
        }
    }

    /// A degree whose id is already known; nothing will be scraped for it.
    pub fn with_id(id: CourseId, duration_in_years: u32) -> Self {
        Self {
            duration_in_years,
            id: OnceCell::new_with(Some(id)),
            ..Self::default()
        }
    }

    /// The course id, scraped from [`Degree::url`] on first use and then reused.
    pub async fn course_id(&self, ctx: &ScrapingContext) -> Result<&CourseId> {
        self.id
            .get_or_try_init(|| async {
                let resolver = DegreeIdResolver::new(ctx.urls.courses_url())?;
                resolver.resolve(ctx, &self.url).await
            })
            .await
    }

    pub async fn curricula(&self, ctx: &ScrapingContext, year: u32) -> Result<Vec<Curriculum>> {
        let id = self.course_id(ctx).await?;
        curriculum::fetch_curricula(ctx, id, year).await
    }

    /// Curricula of every year of the degree, fetched in parallel.
    pub async fn all_curricula(
        &self,
        ctx: &ScrapingContext,
    ) -> Result<BTreeMap<u32, Vec<Curriculum>>> {
        let id = self.course_id(ctx).await?.clone();
        let all = curriculum::fetch_all_curricula(ctx, &id, self.duration_in_years).await?;
        info!("fetched curricula of {} years for {id}", all.len());
        Ok(all)
    }

    pub async fn timetable(
        &self,
        ctx: &ScrapingContext,
        year: u32,
        curriculum: Option<&Curriculum>,
        interval: Option<&Interval>,
    ) -> Result<Timetable> {
        let id = self.course_id(ctx).await?;
        let curriculum = curriculum.map(|c| c.value.as_str());
        timetable::fetch_timetable(ctx, id, curriculum, year, interval).await
    }

    pub async fn exams(&self, ctx: &ScrapingContext) -> Result<Vec<Exam>> {
        let id = self.course_id(ctx).await?;
        exams::fetch_exams(ctx, id, None).await
    }
}
