//! Dates as the university website prints them: `21 febbraio 2025 ore 09:30`.
//!
//! The pages carry no machine readable timestamp, so the month name table and
//! the timezone are fixed here. Anything that does not match the expected
//! phrasing is an error, never a best-effort guess.

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::error::DateParseError;

const MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

/// Separates the date from the time.
const TIME_MARKER: &str = "ore";

/// Calendar month (1..=12) for an Italian month name.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTHS.get(month.checked_sub(1)? as usize).copied()
}

/// Parses Italian date phrasing into timestamps of one fixed zone.
#[derive(Debug, Clone, Copy)]
pub struct ItalianDateParser {
    tz: Tz,
}

impl ItalianDateParser {
    pub fn new(timezone: &str) -> Result<Self, DateParseError> {
        let tz = timezone
            .parse::<Tz>()
            .map_err(|e| DateParseError::UnknownTimezone {
                name: timezone.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { tz })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// `"06 dicembre 2024 ore 09:00"` -> 2024-12-06T09:00 in the parser's zone.
    pub fn parse(&self, input: &str) -> Result<DateTime<Tz>, DateParseError> {
        let pattern_err = || DateParseError::Pattern {
            input: input.to_string(),
        };

        let tokens: Vec<&str> = input.split_whitespace().collect();
        let [day, month, year, marker, time] = tokens.as_slice() else {
            return Err(pattern_err());
        };
        if !marker.eq_ignore_ascii_case(TIME_MARKER) {
            return Err(pattern_err());
        }

        let month = month_number(month).ok_or_else(|| DateParseError::UnknownMonth {
            month: month.to_string(),
            input: input.to_string(),
        })?;

        let normalized = format!("{day} {month} {year} {time}");
        let naive = NaiveDateTime::parse_from_str(&normalized, "%d %m %Y %H:%M")
            .map_err(|_| pattern_err())?;
        self.localize(naive, input)
    }

    /// Anchors a wall-clock time to the parser's zone.
    ///
    /// Ambiguous times (the repeated hour in October) resolve to the earlier
    /// instant; times skipped by the spring change are rejected.
    pub fn localize(&self, naive: NaiveDateTime, input: &str) -> Result<DateTime<Tz>, DateParseError> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest),
            LocalResult::None => Err(DateParseError::NonexistentLocalTime {
                input: input.to_string(),
                timezone: self.tz.name().to_string(),
            }),
        }
    }

    /// Parses a date without a time, e.g. `18 ottobre 2024`.
    pub fn parse_day(&self, input: &str) -> Result<NaiveDate, DateParseError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let [day, month, year] = tokens.as_slice() else {
            return Err(DateParseError::Pattern {
                input: input.to_string(),
            });
        };
        let month = month_number(month).ok_or_else(|| DateParseError::UnknownMonth {
            month: month.to_string(),
            input: input.to_string(),
        })?;
        NaiveDate::parse_from_str(&format!("{day} {month} {year}"), "%d %m %Y").map_err(|_| {
            DateParseError::Pattern {
                input: input.to_string(),
            }
        })
    }
}

/// Renders a timestamp back to the website phrasing, in its own zone.
pub fn format_italian(date: &DateTime<Tz>) -> String {
    // month() is always 1..=12
    let month = month_name(date.month()).unwrap_or_default();
    format!(
        "{:02} {} {} {} {:02}:{:02}",
        date.day(),
        month,
        date.year(),
        TIME_MARKER,
        date.hour(),
        date.minute()
    )
}
