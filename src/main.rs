use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use log::LevelFilter;
use regex::Regex;
use serde::Serialize;
use unibo::{
    CourseId, Degree, Exam, Interval, ScrapingContext, catalog, department, exams, rubrica, timetable,
};

extern crate env_logger;
extern crate log;

#[derive(Parser)]
#[command(name = "unibo", about = "A CLI to interact with the University of Bologna")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Exams of a degree, optionally filtered by subject name
    #[command(alias = "e")]
    Exams {
        course_type: String,
        course_id: String,
        /// Case insensitive regex on the subject name
        subject: Option<String>,
        #[arg(short, long, value_enum, default_value = "human")]
        format: Format,
    },
    /// Today's lessons of a degree year
    #[command(alias = "t")]
    Timetable {
        course_type: String,
        course_id: String,
        year: u32,
        curriculum: Option<String>,
        #[arg(short, long, value_enum, default_value = "human")]
        format: Format,
    },
    /// Curricula of every year of a degree
    Curricula {
        course_type: String,
        course_id: String,
        years: u32,
    },
    /// Resolve the course id from a degree's public page
    CourseId { url: String },
    /// Search the staff directory
    Contacts { first_name: String, last_name: String },
    /// List the university departments
    Departments,
    /// List every degree in the open data catalog
    Degrees {
        #[arg(short, long, value_enum, default_value = "human")]
        format: Format,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_exams(exams: &[Exam]) {
    let mut subjects: BTreeMap<&str, Vec<&Exam>> = BTreeMap::new();
    for exam in exams {
        subjects.entry(&exam.subject_name).or_default().push(exam);
    }

    for (subject, subject_exams) in &subjects {
        println!("{} ({})", subject, subject_exams[0].teacher);
        for exam in subject_exams {
            println!(
                "- data: {}  luogo: {}  tipo: {}",
                exam.date.format("%Y-%m-%d %H:%M"),
                exam.location,
                exam.exam_type
            );
        }
        println!();
    }

    println!("Total exams: {}", exams.len());
    println!("Total subjects: {}", subjects.len());
}

async fn run_exams(
    ctx: &ScrapingContext,
    id: &CourseId,
    subject: Option<&str>,
    format: Format,
) -> anyhow::Result<()> {
    let subject_regex = subject
        .map(|s| Regex::new(&format!("(?i){s}")))
        .transpose()
        .context("invalid subject regex")?;

    let mut found = exams::fetch_exams(ctx, id, None).await?;
    if let Some(regex) = &subject_regex {
        found.retain(|exam| regex.is_match(&exam.subject_name));
    }

    match format {
        Format::Human => print_exams(&found),
        Format::Json => print_json(&found)?,
    }
    Ok(())
}

/// The current day as seen in `tz`, whatever the host's zone.
fn today_in(tz: Tz, now: DateTime<Utc>) -> Interval {
    Interval::day(now.with_timezone(&tz).date_naive())
}

async fn run_timetable(
    ctx: &ScrapingContext,
    id: &CourseId,
    year: u32,
    curriculum: Option<&str>,
    format: Format,
) -> anyhow::Result<()> {
    let today = today_in(ctx.date_parser.timezone(), Utc::now());
    let events = timetable::fetch_timetable(ctx, id, curriculum, year, Some(&today))
        .await
        .context("error fetching timetable")?;

    if format == Format::Json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No lessons found");
        return Ok(());
    }
    for e in &events {
        println!(
            "- {} -> {}: {:<50} {:<30} ({})",
            e.start.format("%H:%M"),
            e.end.format("%H:%M"),
            e.title,
            e.teacher,
            e.module_code
        );
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = ScrapingContext::new()?;

    match cli.command {
        Command::Exams {
            course_type,
            course_id,
            subject,
            format,
        } => {
            let id = CourseId::new(course_type, course_id);
            run_exams(&ctx, &id, subject.as_deref(), format).await
        }
        Command::Timetable {
            course_type,
            course_id,
            year,
            curriculum,
            format,
        } => {
            let id = CourseId::new(course_type, course_id);
            run_timetable(&ctx, &id, year, curriculum.as_deref(), format).await
        }
        Command::Curricula {
            course_type,
            course_id,
            years,
        } => {
            let degree = Degree::with_id(CourseId::new(course_type, course_id), years);
            let all = degree.all_curricula(&ctx).await?;
            for (year, curricula) in &all {
                println!("Year {year}");
                for c in curricula {
                    println!("- {} ({})", c.label, c.value);
                }
            }
            Ok(())
        }
        Command::CourseId { url } => {
            let degree = Degree::new(url, 0);
            println!("{}", degree.course_id(&ctx).await?);
            Ok(())
        }
        Command::Contacts {
            first_name,
            last_name,
        } => {
            let contacts = rubrica::search(&ctx, &first_name, &last_name).await?;
            if contacts.is_empty() {
                println!("No contacts found");
            }
            for c in &contacts {
                println!("{} {} <{}>", c.first_name, c.last_name, c.email);
            }
            Ok(())
        }
        Command::Departments => {
            for d in department::fetch_departments(&ctx).await? {
                println!("{:<10} {}", d.code, d.name);
            }
            Ok(())
        }
        Command::Degrees { format } => {
            let degrees = catalog::fetch_degrees(&ctx).await?;
            if format == Format::Json {
                return print_json(&degrees);
            }
            for d in &degrees {
                println!(
                    "{:<6} {:<20} {} ({} years)",
                    d.code, d.degree_type, d.description, d.duration_in_years
                );
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_exam_filters() {
        let cli = Cli::parse_from(["unibo", "e", "laurea", "Informatica", "reti", "-f", "json"]);
        let Command::Exams { subject, format, .. } = cli.command else {
            panic!("expected exams command");
        };
        assert_eq!(subject.as_deref(), Some("reti"));
        assert!(format == Format::Json);
    }

    #[test]
    fn today_follows_the_configured_zone() {
        // 23:30 UTC on 6 October is already the 7th in Bologna.
        let now = "2024-10-06T23:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let today = today_in(chrono_tz::Europe::Rome, now);
        assert_eq!(today.start.to_string(), "2024-10-07");
        assert_eq!(today.start, today.end);
    }
}
