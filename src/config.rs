use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};

const ENV_PREFIX: &str = "UNIBO_";

/// The env vars that override the default endpoints, all prefixed by `UNIBO_`.
#[derive(Debug, Deserialize)]
pub struct ScrapingEnv {
    #[serde(default = "default_courses_url")]
    courses_url: String,
    #[serde(default = "default_website_url")]
    website_url: String,
    #[serde(default = "default_directory_url")]
    directory_url: String,
    #[serde(default = "default_opendata_url")]
    opendata_url: String,
    #[serde(default = "default_department_domain")]
    department_domain: String,
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_exam_page_size")]
    exam_page_size: usize,
}

fn default_courses_url() -> String {
    "https://corsi.unibo.it".to_string()
}

fn default_website_url() -> String {
    "https://www.unibo.it".to_string()
}

fn default_directory_url() -> String {
    "https://www.unibo.it/uniboweb/unibosearch/rubrica.aspx".to_string()
}

fn default_opendata_url() -> String {
    "https://dati.unibo.it".to_string()
}

fn default_department_domain() -> String {
    "unibo.it".to_string()
}

fn default_timezone() -> String {
    "Europe/Rome".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

// Subjects shown per page on the exams listing.
fn default_exam_page_size() -> usize {
    20
}

#[derive(Debug, Clone)]
pub struct ScrapingConfig {
    /// Root of the degree websites, e.g. `https://corsi.unibo.it`.
    pub courses_url: String,
    /// Root of the main university website.
    pub website_url: String,
    pub directory_url: String,
    pub opendata_url: String,
    /// Department sites live at `<code>.<department_domain>`.
    pub department_domain: String,
    /// IANA name of the zone every scraped date is anchored to.
    pub timezone: String,
    pub request_timeout: Duration,
    pub exam_page_size: usize,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            courses_url: default_courses_url(),
            website_url: default_website_url(),
            directory_url: default_directory_url(),
            opendata_url: default_opendata_url(),
            department_domain: default_department_domain(),
            timezone: default_timezone(),
            request_timeout: Duration::from_secs(default_request_timeout_secs()),
            exam_page_size: default_exam_page_size(),
        }
    }
}

impl From<ScrapingEnv> for ScrapingConfig {
    fn from(env: ScrapingEnv) -> Self {
        Self {
            courses_url: env.courses_url.trim_end_matches('/').to_string(),
            website_url: env.website_url.trim_end_matches('/').to_string(),
            directory_url: env.directory_url,
            opendata_url: env.opendata_url.trim_end_matches('/').to_string(),
            department_domain: env.department_domain,
            timezone: env.timezone,
            request_timeout: Duration::from_secs(env.request_timeout_secs),
            exam_page_size: env.exam_page_size,
        }
    }
}

impl ScrapingConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let scraping_env = ScrapingEnv::load_from_env()?;
        anyhow::ensure!(
            scraping_env.exam_page_size > 0,
            "UNIBO_EXAM_PAGE_SIZE must be greater than zero"
        );
        Ok(scraping_env.into())
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
