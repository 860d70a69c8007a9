mod study;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};

use study::{
    cleanup::{DataKind, Scope},
    commands::{self, NewRecord, Query},
    compare::CompareMode,
    end_of_day, start_of_day, NamedPeriod, Position, SubjectFilter,
};

#[derive(Parser)]
#[clap(about)]
/// A CLI for tracking time spent studying different subjects
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a study session
    Add {
        /// Subject studied
        #[arg(value_parser = parse_name)]
        subject: String,
        /// Length of the session in minutes
        #[arg(short = 'm', long)]
        minutes: u32,
        /// Date and time of the session [dd/mm/yy HH:MM]
        ///
        /// Omit for now
        #[arg(short, long, value_parser = parse_date_time)]
        date: Option<NaiveDateTime>,
        /// Optional topic
        #[arg(short, long, value_parser = parse_text, default_value_t = String::new(), hide_default_value = true)]
        topic: String,
        /// Optional notes
        #[arg(short, long, value_parser = parse_text, default_value_t = String::new(), hide_default_value = true)]
        notes: String,
        /// Optional source category, such as [book] or [course]
        #[arg(short, long, value_parser = parse_text, default_value_t = String::new(), hide_default_value = true)]
        source: String,
    },
    /// Remove a study session
    Remove {
        /// Position of the session to remove (either an index, or [last])
        #[arg(value_parser = parse_position)]
        position: Position,
    },
    /// Display study sessions, optionally filtered and compared
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Display study statistics, optionally filtered and compared
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Display the names of all studied subjects
    Subjects,
    /// Import study sessions from a JSON file
    ///
    /// The file must hold an array of objects with a "subject", and optionally
    /// "date", "duration" (minutes), "topic", "notes" and "source"
    Import {
        /// Path to the JSON file
        path: PathBuf,
    },
    /// Display stored data and preferences
    Status,
    /// Display or set the daily study goal
    Goal {
        /// Daily goal in minutes, or [0] to remove it
        minutes: Option<u32>,
    },
    /// Display or set the period used when none is given
    Period {
        /// One of [all], [week], [month], [quarter] or [year]
        #[arg(value_parser = parse_period)]
        period: Option<NamedPeriod>,
    },
    /// Clear stored data
    ///
    /// Omit the kind flags to clear every kind of data
    Clear {
        /// Storage to clear ([local], [server] or [all])
        #[arg(long, value_parser = parse_scope, default_value = "local")]
        scope: Scopes,
        /// Clear study sessions
        #[arg(long)]
        studies: bool,
        /// Clear user preferences
        #[arg(long)]
        user: bool,
        /// Clear system data
        #[arg(long)]
        system: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only sessions of this subject, or [all]
    #[arg(long, value_parser = parse_subject, default_value = "all")]
    subject: SubjectFilter,
    /// Start of the range ([dd/mm/yy] or [dd/mm/yy HH:MM])
    #[arg(short, long, value_parser = parse_bound, requires = "to")]
    from: Option<Absolute>,
    /// End of the range ([dd/mm/yy] or [dd/mm/yy HH:MM])
    #[arg(short, long, value_parser = parse_bound, requires = "from")]
    to: Option<Absolute>,
    /// Only sessions in the past [week], [month], [quarter] or [year], or [all]
    #[arg(short, long, value_parser = parse_period)]
    period: Option<NamedPeriod>,
    /// Also show a comparison with the [previous] period or the same period [last-year]
    #[arg(short, long, value_parser = parse_compare)]
    compare: Option<CompareMode>,
}

impl From<FilterArgs> for Query {
    fn from(args: FilterArgs) -> Self {
        Query {
            subject: args.subject,
            from: args.from.map(Absolute::start),
            to: args.to.map(Absolute::end),
            period: args.period,
            compare: args.compare,
        }
    }
}

fn main() {
    study::logging::init();
    if let Err(e) = run() {
        print!("{e}");
    }
}

fn run() -> Result<()> {
    let cli = Cli::try_parse()?;

    match cli.command {
        Command::Add {
            subject,
            minutes,
            date,
            topic,
            notes,
            source,
        } => commands::add(NewRecord {
            subject,
            date,
            duration: minutes,
            topic,
            notes,
            source,
        }),
        Command::Remove { position } => commands::remove(position),
        Command::List { filter } => commands::list(filter.into()),
        Command::Stats { filter } => commands::stats(filter.into()),
        Command::Subjects => commands::subjects(),
        Command::Import { path } => commands::import(&path),
        Command::Status => commands::status(),
        Command::Goal { minutes } => commands::goal(minutes),
        Command::Period { period } => commands::period(period),
        Command::Clear {
            scope,
            studies,
            user,
            system,
        } => {
            let mut kinds = Vec::new();
            if studies {
                kinds.push(DataKind::Studies);
            }
            if user {
                kinds.push(DataKind::UserData);
            }
            if system {
                kinds.push(DataKind::SystemData);
            }
            if kinds.is_empty() {
                kinds = vec![DataKind::Studies, DataKind::UserData, DataKind::SystemData];
            }
            commands::clear(scope.0, kinds)
        }
    }
}

fn parse_name(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("subject must not be empty".to_string());
    }
    Ok(s.to_string())
}

fn parse_text(s: &str) -> Result<String, String> {
    Ok(s.trim().to_string())
}

fn parse_subject(s: &str) -> Result<SubjectFilter, String> {
    s.parse()
}

fn parse_period(s: &str) -> Result<NamedPeriod, String> {
    s.parse()
}

fn parse_compare(s: &str) -> Result<CompareMode, String> {
    s.parse()
}

fn parse_scope(s: &str) -> Result<Scopes, String> {
    match s {
        "local" => Ok(Scopes(vec![Scope::Local])),
        "server" => Ok(Scopes(vec![Scope::Server])),
        "all" => Ok(Scopes(vec![Scope::Local, Scope::Server])),
        _ => Err("scope must be one of [local], [server] or [all]".to_string()),
    }
}

fn parse_position(s: &str) -> Result<Position, String> {
    if s == "last" {
        Ok(Position::Last)
    } else if let Ok(i) = s.parse() {
        Ok(Position::Index(i))
    } else {
        Err("index must be either [last] or a positive integer".to_string())
    }
}

fn parse_date_time(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%d/%m/%y %R")
        .map_err(|_| "date and time must be in the form [dd/mm/yy HH:MM]".to_string())
}

fn parse_bound(s: &str) -> Result<Absolute, String> {
    if let Ok(date_time) = NaiveDateTime::parse_from_str(s, "%d/%m/%y %R") {
        return Ok(Absolute::DateTime(date_time));
    } else if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%y") {
        return Ok(Absolute::Date(date));
    }
    Err("must be in the form [dd/mm/yy] or [dd/mm/yy HH:MM]".to_string())
}

#[derive(Clone)]
struct Scopes(Vec<Scope>);

#[derive(Clone, Copy)]
enum Absolute {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

impl Absolute {
    fn start(self) -> NaiveDateTime {
        match self {
            Absolute::DateTime(date_time) => date_time,
            Absolute::Date(date) => start_of_day(date),
        }
    }

    /// A bare date ends at the last millisecond of that day.
    fn end(self) -> NaiveDateTime {
        match self {
            Absolute::DateTime(date_time) => date_time,
            Absolute::Date(date) => end_of_day(date),
        }
    }
}
