//! University departments and their teaching staff.

use log::info;
use regex::Regex;
use serde::Serialize;

use crate::{
    error::{Result, ScrapeError},
    scraping_context::ScrapingContext,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Department {
    /// e.g. "Informatica - Scienza e Ingegneria"
    pub name: String,
    /// Subdomain of the department website, e.g. "disi".
    pub code: String,
}

impl Department {
    pub fn url(&self, ctx: &ScrapingContext) -> String {
        ctx.urls.department_url(&self.code)
    }

    pub fn teachers_url(&self, ctx: &ScrapingContext) -> String {
        ctx.urls.department_teachers_url(&self.code)
    }

    pub async fn teachers(&self, ctx: &ScrapingContext) -> Result<Vec<Teacher>> {
        fetch_teachers(ctx, &self.code).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Teacher {
    pub username: String,
}

impl Teacher {
    pub fn website(&self, ctx: &ScrapingContext) -> String {
        ctx.urls.teacher_website_url(&self.username)
    }
}

fn regex(pattern: &str, name: &'static str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ScrapeError::Selector {
        selector: name,
        message: e.to_string(),
    })
}

pub struct DepartmentExtractor {
    department_regex: Regex,
    teacher_regex: Regex,
}

impl DepartmentExtractor {
    pub fn new(department_domain: &str, website_url: &str) -> Result<Self> {
        let department_regex = regex(
            &format!(
                r#"<a class="internal-link" href="https://([^".]+)\.{}/it"[^>]*>([^<]+)</a>"#,
                regex::escape(department_domain)
            ),
            "department link",
        )?;
        let teacher_regex = regex(
            &format!(r#"{}/sitoweb/([^/"?#\s]+)"#, regex::escape(website_url)),
            "teacher website link",
        )?;
        Ok(Self {
            department_regex,
            teacher_regex,
        })
    }

    pub fn departments(&self, html: &str) -> Vec<Department> {
        self.department_regex
            .captures_iter(html)
            .map(|caps| Department {
                code: caps[1].to_string(),
                name: caps[2].trim().to_string(),
            })
            .collect()
    }

    /// Usernames linked from a staff page, first occurrence order.
    pub fn teachers(&self, html: &str) -> Vec<Teacher> {
        let mut teachers: Vec<Teacher> = Vec::new();
        for caps in self.teacher_regex.captures_iter(html) {
            let username = &caps[1];
            if !teachers.iter().any(|t| t.username == username) {
                teachers.push(Teacher {
                    username: username.to_string(),
                });
            }
        }
        teachers
    }
}

fn extractor(ctx: &ScrapingContext) -> Result<DepartmentExtractor> {
    DepartmentExtractor::new(ctx.urls.department_domain(), ctx.urls.website_url())
}

pub async fn fetch_departments(ctx: &ScrapingContext) -> Result<Vec<Department>> {
    let url = ctx.urls.departments_url();
    let html = ctx.fetch_text(&url).await?;
    let departments = extractor(ctx)?.departments(&html);
    info!("found {} departments", departments.len());
    Ok(departments)
}

pub async fn fetch_teachers(ctx: &ScrapingContext, department_code: &str) -> Result<Vec<Teacher>> {
    let url = ctx.urls.department_teachers_url(department_code);
    let html = ctx.fetch_text(&url).await?;
    let teachers = extractor(ctx)?.teachers(&html);
    info!("found {} teachers in {department_code}", teachers.len());
    Ok(teachers)
}
