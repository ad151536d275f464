//! Lesson timetables, served by the courses website as a JSON array.
//!
//! Start and end come as local wall-clock times without an offset
//! (`2023-09-19T09:00:00`). They are read as naive times and anchored to the
//! context timezone only once the whole body decoded.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use log::info;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    degree::CourseId,
    error::{Result, ScrapeError},
    italian_date::ItalianDateParser,
    scraping_context::ScrapingContext,
};

/// Serde adapter for the timetable's `YYYY-MM-DDTHH:MM:SS` local times.
pub mod calendar_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(D::Error::custom)
    }
}

/// Upstream sends `null` for text it has no value for.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Date range used to narrow a timetable request. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Interval {
    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Building {
    #[serde(default, rename = "comune")]
    pub city: String,
    #[serde(default, rename = "via")]
    pub street: String,
    #[serde(default, rename = "provincia")]
    pub province: String,
    #[serde(default, rename = "codice")]
    pub code: String,
    #[serde(default, rename = "cap")]
    pub postal_code: String,
    #[serde(default, rename = "descrizione")]
    pub description: String,
    #[serde(default, rename = "plesso")]
    pub complex: String,
    #[serde(default)]
    pub geo: Option<Geo>,
}

/// Classroom metadata exactly as the endpoint reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawClassroom {
    #[serde(default, rename = "abilitato")]
    pub enabled: bool,
    #[serde(default, rename = "attivo")]
    pub active: bool,
    #[serde(default, rename = "bloccato")]
    pub blocked: bool,
    #[serde(default, rename = "metriQuadri")]
    pub surface: Option<f64>,
    #[serde(default, rename = "numeroPostazioni")]
    pub seats: Option<u32>,
    #[serde(default, rename = "descrizione")]
    pub description: String,
    #[serde(default, rename = "dataCreazione")]
    pub creation_date: Option<String>,
    #[serde(default, rename = "dataModifica")]
    pub edit_date: Option<String>,
    #[serde(default, rename = "edificio")]
    pub building: Option<Building>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    #[serde(default, rename = "des_risorsa", deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, rename = "des_piano", deserialize_with = "null_as_empty")]
    pub floor: String,
    #[serde(default, rename = "des_edificio", deserialize_with = "null_as_empty")]
    pub building: String,
    #[serde(default)]
    pub raw: RawClassroom,
}

/// One timetable row as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
struct RawEvent {
    cod_modulo: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    periodo_calendario: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    cod_sdoppiamento: String,
    title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    periodo: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    docente: String,
    #[serde(default)]
    cfu: u32,
    #[serde(default)]
    teledidattica: bool,
    #[serde(default)]
    teams: Option<String>,
    #[serde(with = "calendar_time")]
    start: NaiveDateTime,
    #[serde(with = "calendar_time")]
    end: NaiveDateTime,
    #[serde(default)]
    aule: Vec<Classroom>,
}

impl RawEvent {
    fn anchor(self, dates: &ItalianDateParser) -> Result<Event> {
        let start = dates.localize(self.start, &self.start.to_string())?;
        let end = dates.localize(self.end, &self.end.to_string())?;
        Ok(Event {
            module_code: self.cod_modulo,
            calendar_interval: self.periodo_calendario,
            split_code: self.cod_sdoppiamento,
            title: self.title,
            interval: self.periodo,
            teacher: self.docente,
            cfu: self.cfu,
            remote_learning: self.teledidattica,
            teams: self.teams.filter(|t| !t.is_empty()),
            start,
            end,
            classrooms: self.aule,
        })
    }
}

/// A lecture (or lab) in the timetable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub module_code: String,
    /// Teaching period of the module, e.g. "18 settembre 2023 - 20 dicembre 2023".
    pub calendar_interval: String,
    /// Identifies one half of a lecture split by surname, e.g. "28004_1--A-K".
    pub split_code: String,
    pub title: String,
    pub interval: String,
    pub teacher: String,
    pub cfu: u32,
    pub remote_learning: bool,
    /// Teams meeting link, only for remote lectures.
    pub teams: Option<String>,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub classrooms: Vec<Classroom>,
}

/// Events in the order the endpoint returned them, not necessarily chronological.
pub type Timetable = Vec<Event>;

pub fn parse_timetable(body: &[u8], url: &str, dates: &ItalianDateParser) -> Result<Timetable> {
    let raw: Vec<RawEvent> =
        serde_json::from_slice(body).map_err(|e| ScrapeError::parse(url, e))?;
    raw.into_iter().map(|event| event.anchor(dates)).collect()
}

pub async fn fetch_timetable(
    ctx: &ScrapingContext,
    id: &CourseId,
    curriculum: Option<&str>,
    year: u32,
    interval: Option<&Interval>,
) -> Result<Timetable> {
    let url = ctx.urls.timetable_url(id, curriculum, year, interval);
    let body = ctx.fetch(&url).await?;
    let timetable = parse_timetable(&body, &url, &ctx.date_parser)?;
    info!("fetched {} timetable events for {id}, year {year}", timetable.len());
    Ok(timetable)
}
