use std::{
    collections::BTreeSet,
    fmt, fs,
    io::{self, Write},
    path::Path,
    ptr,
};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime, Utc};
use tracing::info;

use crate::study::{
    cleanup::{CleanupRequest, CleanupService, DataKind, Scope},
    compare::{self, CompareMode, Comparison},
    data::{Store, StudyRecord},
    filter::{period_window, Selection},
    import,
    stats::{Delta, Summary},
    DateRange, NamedPeriod, Position, SubjectFilter,
};

/// Filter and comparison flags shared by `list` and `stats`.
pub struct Query {
    pub subject: SubjectFilter,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub period: Option<NamedPeriod>,
    pub compare: Option<CompareMode>,
}

pub struct NewRecord {
    pub subject: String,
    pub date: Option<NaiveDateTime>,
    pub duration: u32,
    pub topic: String,
    pub notes: String,
    pub source: String,
}

pub fn add(new: NewRecord) -> Result<()> {
    let now = now();
    let date = new.date.unwrap_or(now);
    if new.duration == 0 {
        bail!("error: Duration must be at least one minute");
    }
    if date > now {
        bail!("error: Session cannot be in the future");
    }
    let store = Store::open()?;
    let mut studies = store.read_studies()?;
    let record = StudyRecord {
        topic: new.topic,
        notes: new.notes,
        source: new.source,
        ..StudyRecord::new(new.subject, date, new.duration)
    };
    println!("Added a new study session:");
    println!("{}", Row(&record));
    studies.push(record);
    store.write_studies(&mut studies)
}

pub fn remove(pos: Position) -> Result<()> {
    let store = Store::open()?;
    let mut studies = store.read_studies()?;
    let i = parse_index(&studies, pos)?;
    println!("{:3}. {}", i + 1, Row(&studies[i]));
    print!("Are you sure you want to remove this study session? Enter \"y\" if so: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    if input.trim() == "y" {
        studies.remove(i);
        store.write_studies(&mut studies)?;
        println!("Removed study session");
    } else {
        println!("Did not remove study session");
    }
    Ok(())
}

pub fn list(query: Query) -> Result<()> {
    let store = Store::open()?;
    let studies = store.read_studies()?;
    let now = now();
    let current = selection(&store, &query)?;
    let records = current.apply(&studies, now);

    print_records(&studies, &records, &describe(&current, now));
    if let Some(mode) = query.compare {
        let (other, comparison) = comparison_selection(mode, &current, now);
        if comparison == Comparison::none() {
            println!("There is nothing to compare with");
        } else {
            println!();
            print_records(&studies, &other.apply(&studies, now), &describe(&other, now));
        }
    }
    Ok(())
}

pub fn stats(query: Query) -> Result<()> {
    let store = Store::open()?;
    let studies = store.read_studies()?;
    let user = store.read_user()?;
    let now = now();
    let current = selection(&store, &query)?;
    let summary = Summary::of(&current.apply(&studies, now));
    let text = describe(&current, now);

    if summary.sessions == 0 {
        println!("There are no recorded study sessions {text}");
    } else {
        println!("The study statistics {text} are:");
        println!("Number of sessions: {}", summary.sessions);
        println!("Total time: {}", minutes_to_string(summary.total));
        if let Some(average) = summary.average() {
            println!("Average session length: {}", minutes_to_string(average));
        }
        println!("Days studied: {}", summary.active_days);
        if let Some(goal) = user.daily_goal {
            if let Some(progress) = summary.goal_progress(goal) {
                println!(
                    "Daily goal reached: {:.1}% of {}",
                    progress * 100.,
                    minutes_to_string(goal.into())
                );
            }
        }
        println!("Time per subject:");
        for (subject, minutes) in &summary.by_subject {
            println!("    {subject}: {}", minutes_to_string(*minutes));
        }
    }

    if let Some(mode) = query.compare {
        let (other, comparison) = comparison_selection(mode, &current, now);
        if comparison == Comparison::none() {
            println!("There is nothing to compare with");
            return Ok(());
        }
        let previous = Summary::of(&other.apply(&studies, now));
        let delta = Delta::between(&summary, &previous);
        println!(
            "Comparison {}: {} in {} sessions",
            describe(&other, now),
            minutes_to_string(previous.total),
            previous.sessions
        );
        let sign = if delta.difference < 0 { "-" } else { "+" };
        let change = minutes_to_string(delta.difference.unsigned_abs());
        match delta.percent {
            Some(percent) => println!("Change: {sign}{change} ({percent:+.1}%)"),
            None => println!("Change: {sign}{change}"),
        }
    }
    Ok(())
}

pub fn subjects() -> Result<()> {
    let studies = Store::open()?.read_studies()?;
    let subjects: BTreeSet<_> = studies.iter().map(|record| record.subject.as_str()).collect();
    if subjects.is_empty() {
        println!("There are currently no recorded subjects");
    } else {
        println!("The recorded subjects are:");
        for subject in subjects {
            println!("{subject}");
        }
    }
    Ok(())
}

pub fn import(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("error: Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("error: {} is not valid JSON", path.display()))?;
    let imported = import::parse_records(&value);

    let store = Store::open()?;
    let mut studies = store.read_studies()?;
    let count = imported.len();
    let undated = imported.iter().filter(|record| record.date.is_none()).count();
    studies.extend(imported);
    store.write_studies(&mut studies)?;

    let mut system = store.read_system()?;
    system.imports += 1;
    system.last_import = Some(Utc::now());
    store.write_system(&system)?;

    info!(count, undated, path = %path.display(), "imported study sessions");
    println!("Imported {count} study sessions from {}", path.display());
    if undated > 0 {
        println!("{undated} of them have no readable date");
    }
    Ok(())
}

pub fn status() -> Result<()> {
    let store = Store::open()?;
    let studies = store.read_studies()?;
    let user = store.read_user()?;
    let system = store.read_system()?;
    println!("Recorded study sessions: {}", studies.len());
    match user.daily_goal {
        Some(goal) => println!("Daily goal: {}", minutes_to_string(goal.into())),
        None => println!("Daily goal: none"),
    }
    println!("Default period: {}", user.default_period);
    println!("Imports: {}", system.imports);
    if let Some(last) = system.last_import {
        let local: chrono::DateTime<Local> = last.into();
        println!("Last import: {}", local.format("%d/%m/%y %R"));
    }
    Ok(())
}

pub fn goal(minutes: Option<u32>) -> Result<()> {
    let store = Store::open()?;
    let mut user = store.read_user()?;
    match minutes {
        Some(0) => {
            user.daily_goal = None;
            store.write_user(&user)?;
            println!("Removed the daily goal");
        }
        Some(minutes) => {
            user.daily_goal = Some(minutes);
            store.write_user(&user)?;
            println!("Daily goal set to {}", minutes_to_string(minutes.into()));
        }
        None => match user.daily_goal {
            Some(goal) => println!("Daily goal is {}", minutes_to_string(goal.into())),
            None => println!("There is no daily goal set"),
        },
    }
    Ok(())
}

pub fn period(period: Option<NamedPeriod>) -> Result<()> {
    let store = Store::open()?;
    let mut user = store.read_user()?;
    if let Some(period) = period {
        user.default_period = period;
        store.write_user(&user)?;
        println!("Default period set to \"{period}\"");
    } else {
        println!("Default period is \"{}\"", user.default_period);
    }
    Ok(())
}

pub fn clear(scopes: Vec<Scope>, kinds: Vec<DataKind>) -> Result<()> {
    let request = CleanupRequest::new(scopes, kinds);
    print!("Are you sure you want to clear this data? It cannot be recovered. Enter \"y\" if so: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    if input.trim() != "y" {
        println!("Did not clear any data");
        return Ok(());
    }

    let outcome = CleanupService::new().with_local(Store::open()?).run(&request);
    if !outcome.success {
        bail!("error: {}", outcome.message);
    }
    println!("{}", outcome.message);
    Ok(())
}

fn selection(store: &Store, query: &Query) -> Result<Selection> {
    let date_range = match (query.from, query.to) {
        (Some(from), Some(to)) => match DateRange::new(from, to) {
            Some(range) => Some(range),
            None => bail!("error: Start of range must be before end"),
        },
        (None, None) => None,
        _ => bail!("error: A range needs both a start and an end"),
    };
    let period = match query.period {
        Some(period) => period,
        None => store.read_user()?.default_period,
    };
    Ok(Selection {
        subject: query.subject.clone(),
        date_range,
        period,
    })
}

fn comparison_selection(
    mode: CompareMode,
    current: &Selection,
    now: NaiveDateTime,
) -> (Selection, Comparison) {
    let comparison = compare::derive(mode, current.period, current.date_range, now);
    (comparison.selection(current), comparison)
}

fn print_records(all: &[StudyRecord], records: &[&StudyRecord], text: &str) {
    if records.is_empty() {
        println!("There are no recorded study sessions {text}");
        return;
    }
    println!("The recorded study sessions {text} are:");
    for record in records {
        let index = all.iter().position(|r| ptr::eq(r, *record)).unwrap_or_default();
        println!("{:3}. {}", index + 1, Row(record));
    }
}

fn describe(selection: &Selection, now: NaiveDateTime) -> String {
    let mut parts = Vec::new();
    if let SubjectFilter::Only(subject) = &selection.subject {
        parts.push(format!("of \"{subject}\""));
    }
    if let Some(range) = selection.date_range {
        parts.push(format!("from {range}"));
    }
    if let Some(window) = period_window(selection.period, now) {
        parts.push(format!("in the past {} ({window})", selection.period));
    }
    if parts.is_empty() {
        "overall".to_string()
    } else {
        parts.join(" ")
    }
}

fn parse_index(studies: &[StudyRecord], pos: Position) -> Result<usize> {
    if studies.is_empty() {
        bail!("error: There are no recorded study sessions");
    }
    let i = match pos {
        Position::Last => studies.len() - 1,
        Position::Index(i) => i.wrapping_sub(1),
    };
    if i >= studies.len() {
        bail!("error: No study session with this index exists")
    }
    Ok(i)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

struct Row<'a>(&'a StudyRecord);

impl fmt::Display for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        match record.date {
            Some(date) => write!(f, "{}", date.format("%d/%m/%y %R"))?,
            None => write!(f, "{:<14}", "no date")?,
        }
        write!(
            f,
            " {} ({})",
            record.subject,
            minutes_to_string(record.duration.into())
        )?;
        if !record.topic.is_empty() {
            write!(f, " - {}", record.topic)?;
        }
        if !record.notes.is_empty() {
            write!(f, " - {}", record.notes)?;
        }
        if !record.source.is_empty() {
            write!(f, " [{}]", record.source)?;
        }
        Ok(())
    }
}

fn minutes_to_string(minutes: u64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours == 0 {
        format!("{mins}m")
    } else if mins == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {mins}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::at;

    #[test]
    fn minutes_are_shown_as_hours_and_minutes() {
        assert_eq!(minutes_to_string(0), "0m");
        assert_eq!(minutes_to_string(45), "45m");
        assert_eq!(minutes_to_string(120), "2h");
        assert_eq!(minutes_to_string(135), "2h 15m");
    }

    #[test]
    fn row_shows_optional_fields() {
        let mut record = StudyRecord::new("Math".to_string(), at("2024-01-05 10:30"), 50);
        assert_eq!(Row(&record).to_string(), "05/01/24 10:30 Math (50m)");
        record.topic = "Integrals".to_string();
        record.source = "book".to_string();
        record.date = None;
        assert_eq!(
            Row(&record).to_string(),
            "no date        Math (50m) - Integrals [book]"
        );
    }

    #[test]
    fn index_positions_are_one_based() {
        let studies = vec![
            StudyRecord::new("A".to_string(), at("2024-01-05"), 10),
            StudyRecord::new("B".to_string(), at("2024-01-06"), 10),
        ];
        assert_eq!(parse_index(&studies, Position::Index(1)).unwrap(), 0);
        assert_eq!(parse_index(&studies, Position::Last).unwrap(), 1);
        assert!(parse_index(&studies, Position::Index(0)).is_err());
        assert!(parse_index(&studies, Position::Index(3)).is_err());
        assert!(parse_index(&[], Position::Last).is_err());
    }

    #[test]
    fn describes_selection() {
        let now = at("2024-03-10 12:00");
        let selection = Selection {
            subject: SubjectFilter::Only("Math".to_string()),
            date_range: None,
            period: NamedPeriod::Week,
        };
        assert_eq!(
            describe(&selection, now),
            "of \"Math\" in the past week (03/03/24 00:00 to 10/03/24 23:59)"
        );
        assert_eq!(describe(&Selection::default(), now), "overall");
    }
}
