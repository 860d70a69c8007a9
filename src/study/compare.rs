//! Derives the comparison selection shown next to the current one.

use std::str::FromStr;

use chrono::{Duration, Months, NaiveDateTime};
use tracing::debug;

use crate::study::{filter::Selection, start_of_day, DateRange, NamedPeriod};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareMode {
    PreviousPeriod,
    SameLastYear,
}

impl FromStr for CompareMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "previous" => Ok(CompareMode::PreviousPeriod),
            "last-year" => Ok(CompareMode::SameLastYear),
            _ => Err("comparison must be either [previous] or [last-year]".to_string()),
        }
    }
}

/// Range and period to filter the comparison records by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Comparison {
    pub date_range: Option<DateRange>,
    pub time_frame: NamedPeriod,
}

impl Comparison {
    pub fn none() -> Self {
        Self::default()
    }

    /// The selection to filter comparison records with, keeping the
    /// subject of `current`.
    pub fn selection(&self, current: &Selection) -> Selection {
        Selection {
            subject: current.subject.clone(),
            date_range: self.date_range,
            period: self.time_frame,
        }
    }
}

pub fn derive(
    mode: CompareMode,
    time_frame: NamedPeriod,
    date_range: Option<DateRange>,
    now: NaiveDateTime,
) -> Comparison {
    let comparison = match mode {
        CompareMode::PreviousPeriod => previous_period(time_frame, date_range, now),
        CompareMode::SameLastYear => same_last_year(time_frame, date_range),
    }
    .unwrap_or_default();
    debug!(?mode, %time_frame, ?comparison, "derived comparison period");
    comparison
}

fn previous_period(
    time_frame: NamedPeriod,
    date_range: Option<DateRange>,
    now: NaiveDateTime,
) -> Option<Comparison> {
    let range = if !time_frame.is_all() {
        let current_start = time_frame.step_back(start_of_day(now.date()))?;
        let start = time_frame.step_back(current_start)?;
        let end = current_start.checked_sub_signed(Duration::milliseconds(1))?;
        DateRange::new(start, end)?
    } else if let Some(range) = date_range {
        let span = range.end() - range.start();
        let end = range.start().checked_sub_signed(Duration::milliseconds(1))?;
        let start = end.checked_sub_signed(span)?;
        DateRange::new(start, end)?
    } else {
        return None;
    };
    Some(Comparison {
        date_range: Some(range),
        time_frame: NamedPeriod::All,
    })
}

fn same_last_year(time_frame: NamedPeriod, date_range: Option<DateRange>) -> Option<Comparison> {
    if let Some(range) = date_range {
        let year = Months::new(12);
        let shifted = DateRange::new(
            range.start().checked_sub_months(year)?,
            range.end().checked_sub_months(year)?,
        )?;
        Some(Comparison {
            date_range: Some(shifted),
            time_frame: NamedPeriod::All,
        })
    } else if !time_frame.is_all() {
        // Only the period is echoed; today is not moved back a year.
        Some(Comparison {
            date_range: None,
            time_frame,
        })
    } else {
        None
    }
}
