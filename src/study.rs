pub mod cleanup;
pub mod commands;
pub mod compare;
mod data;
pub mod filter;
mod import;
pub mod logging;
mod stats;

use std::{fmt, str::FromStr};

use chrono::{Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

type DateTime = chrono::DateTime<chrono::Utc>;

#[derive(Clone)]
pub enum Position {
    Index(usize),
    Last,
}

/// Relative window ending today, identified by a fixed label.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NamedPeriod {
    #[default]
    All,
    Week,
    Month,
    Quarter,
    Year,
}

impl NamedPeriod {
    /// Steps `from` back by one unit of this period using calendar arithmetic.
    ///
    /// Returns `None` for [`NamedPeriod::All`] or when the result leaves the
    /// representable range.
    pub fn step_back(self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            NamedPeriod::All => None,
            NamedPeriod::Week => from.checked_sub_signed(Duration::days(7)),
            NamedPeriod::Month => from.checked_sub_months(Months::new(1)),
            NamedPeriod::Quarter => from.checked_sub_months(Months::new(3)),
            NamedPeriod::Year => from.checked_sub_months(Months::new(12)),
        }
    }

    pub fn is_all(self) -> bool {
        self == NamedPeriod::All
    }
}

impl FromStr for NamedPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(NamedPeriod::All),
            "week" => Ok(NamedPeriod::Week),
            "month" => Ok(NamedPeriod::Month),
            "quarter" => Ok(NamedPeriod::Quarter),
            "year" => Ok(NamedPeriod::Year),
            _ => Err(
                "period must be one of [all], [week], [month], [quarter] or [year]".to_string(),
            ),
        }
    }
}

impl fmt::Display for NamedPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NamedPeriod::All => "all",
            NamedPeriod::Week => "week",
            NamedPeriod::Month => "month",
            NamedPeriod::Quarter => "quarter",
            NamedPeriod::Year => "year",
        };
        f.write_str(name)
    }
}

/// Inclusive range of timestamps with `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, date: NaiveDateTime) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let to_format = if self.start.date() == self.end.date() {
            "%R"
        } else {
            "%d/%m/%y %R"
        };
        write!(
            f,
            "{} to {}",
            self.start.format("%d/%m/%y %R"),
            self.end.format(to_format)
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubjectFilter {
    #[default]
    All,
    Only(String),
}

impl SubjectFilter {
    pub fn matches(&self, subject: &str) -> bool {
        match self {
            SubjectFilter::All => true,
            SubjectFilter::Only(wanted) => wanted == subject,
        }
    }
}

impl FromStr for SubjectFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("subject must not be empty".to_string());
        }
        Ok(if s == "all" {
            SubjectFilter::All
        } else {
            SubjectFilter::Only(s.to_string())
        })
    }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last millisecond of `date`.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::milliseconds(24 * 60 * 60 * 1000 - 1)
}

#[cfg(test)]
pub(crate) fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(start_of_day))
        .unwrap()
}
