//! Every endpoint url the scrapers fetch.
//!
//! Degrees taught in English ("international cycle") live under different
//! path segments than Italian ones. Optional query parameters are left out
//! entirely when absent.

use url::form_urlencoded::byte_serialize;

use crate::config::ScrapingConfig;
use crate::degree::CourseId;
use crate::timetable::Interval;

/// Course types containing this marker are English-taught.
pub const INTERNATIONAL_MARKER: &str = "cycle";

const DEPARTMENTS_PATH: &str = "/it/ateneo/sedi-e-strutture/dipartimenti";
const TEACHERS_PATH: &str = "/it/dipartimento/persone/docenti-e-ricercatori";
const MAX_TEACHERS: u32 = 2000;

pub fn is_international(course_type: &str) -> bool {
    course_type.contains(INTERNATIONAL_MARKER)
}

fn timetable_segment(course_type: &str) -> &'static str {
    if is_international(course_type) {
        "timetable"
    } else {
        "orario-lezioni"
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

#[derive(Debug, Clone)]
pub struct UrlBuilder {
    courses_url: String,
    website_url: String,
    directory_url: String,
    opendata_url: String,
    department_domain: String,
}

impl UrlBuilder {
    pub fn new(config: &ScrapingConfig) -> Self {
        Self {
            courses_url: config.courses_url.trim_end_matches('/').to_string(),
            website_url: config.website_url.trim_end_matches('/').to_string(),
            directory_url: config.directory_url.clone(),
            opendata_url: config.opendata_url.trim_end_matches('/').to_string(),
            department_domain: config.department_domain.clone(),
        }
    }

    pub fn courses_url(&self) -> &str {
        &self.courses_url
    }

    pub fn website_url(&self) -> &str {
        &self.website_url
    }

    pub fn department_domain(&self) -> &str {
        &self.department_domain
    }

    fn course_root(&self, id: &CourseId) -> String {
        format!("{}/{}/{}", self.courses_url, id.course_type, id.id)
    }

    /// JSON timetable of one year of a degree.
    ///
    /// `curriculum` and `interval` are appended only when present.
    pub fn timetable_url(
        &self,
        id: &CourseId,
        curriculum: Option<&str>,
        year: u32,
        interval: Option<&Interval>,
    ) -> String {
        let mut url = format!(
            "{}/{}/@@orario_reale_json?anno={}",
            self.course_root(id),
            timetable_segment(&id.course_type),
            year
        );

        if let Some(curriculum) = curriculum.filter(|c| !c.is_empty()) {
            url.push_str(&format!("&curricula={}", encode(curriculum)));
        }

        if let Some(interval) = interval {
            url.push_str(&format!(
                "&start={}&end={}",
                interval.start.format("%Y-%m-%d"),
                interval.end.format("%Y-%m-%d")
            ));
        }

        url
    }

    pub fn curricula_url(&self, id: &CourseId, year: u32) -> String {
        format!(
            "{}/{}/@@available_curricula?anno={}",
            self.course_root(id),
            timetable_segment(&id.course_type),
            year
        )
    }

    /// One page of the exam listing. `start` is the number of subjects to skip.
    pub fn exams_url(&self, id: &CourseId, subject: Option<&str>, start: usize) -> String {
        let mut params = Vec::new();
        if let Some(subject) = subject.filter(|s| !s.is_empty()) {
            params.push(format!("appelli={}", encode(subject)));
        }
        if start > 0 {
            params.push(format!("b_start:int={start}"));
        }

        let url = format!("{}/appelli", self.course_root(id));
        if params.is_empty() {
            url
        } else {
            format!("{url}?{}", params.join("&"))
        }
    }

    pub fn departments_url(&self) -> String {
        format!("{}{}", self.website_url, DEPARTMENTS_PATH)
    }

    /// Home of a department, e.g. `https://disi.unibo.it/it` for code `disi`.
    pub fn department_url(&self, code: &str) -> String {
        format!("https://{}.{}/it", code, self.department_domain)
    }

    pub fn department_teachers_url(&self, code: &str) -> String {
        format!(
            "https://{}.{}{}?pagesize={}",
            code, self.department_domain, TEACHERS_PATH, MAX_TEACHERS
        )
    }

    pub fn teacher_website_url(&self, username: &str) -> String {
        format!("{}/sitoweb/{}", self.website_url, username)
    }

    pub fn directory_search_url(&self, first_name: &str, last_name: &str) -> String {
        let mut url = format!("{}?tab=PersonePanel&mode=people&query=", self.directory_url);
        if !first_name.is_empty() {
            url.push_str(&format!("+nome:{}", encode(first_name)));
        }
        if !last_name.is_empty() {
            url.push_str(&format!("+cognome:{}", encode(last_name)));
        }
        url
    }

    pub fn catalog_package_url(&self, package_id: &str) -> String {
        format!(
            "{}/api/3/action/package_show?id={}",
            self.opendata_url,
            encode(package_id)
        )
    }
}
