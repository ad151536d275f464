//! Client for the University of Bologna websites: exams, timetables,
//! curricula, departments and the staff directory.
//!
//! Most of these endpoints are undocumented HTML pages, so most of this crate
//! is scraping. Layout changes surface as [`ScrapeError::Structure`].

pub mod catalog;
pub mod config;
pub mod curriculum;
pub mod degree;
pub mod department;
pub mod error;
pub mod exams;
pub mod html_query;
pub mod italian_date;
pub mod requests;
pub mod rubrica;
pub mod scraping_context;
pub mod text_manipulators;
pub mod timetable;
pub mod urls;

pub use config::ScrapingConfig;
pub use curriculum::Curriculum;
pub use degree::{CourseId, Degree, DegreeIdResolver};
pub use department::{Department, Teacher};
pub use error::{DateParseError, ScrapeError};
pub use exams::Exam;
pub use requests::{Fetch, RequestClient};
pub use rubrica::Contact;
pub use scraping_context::ScrapingContext;
pub use timetable::{Classroom, Event, Interval, Timetable};
