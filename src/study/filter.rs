//! Narrows a record set by subject, explicit date range and named period.
//!
//! The three filters are conjunctive and applied in that order. A record
//! without a readable date never passes a date-based filter.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::study::{
    data::StudyRecord, end_of_day, start_of_day, DateRange, NamedPeriod, SubjectFilter,
};

/// What the caller currently wants to see.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub subject: SubjectFilter,
    pub date_range: Option<DateRange>,
    pub period: NamedPeriod,
}

impl Selection {
    pub fn apply<'a>(
        &self,
        records: &'a [StudyRecord],
        now: NaiveDateTime,
    ) -> Vec<&'a StudyRecord> {
        filter(records, &self.subject, self.date_range, self.period, now)
    }
}

pub fn filter<'a>(
    records: &'a [StudyRecord],
    subject: &SubjectFilter,
    date_range: Option<DateRange>,
    period: NamedPeriod,
    now: NaiveDateTime,
) -> Vec<&'a StudyRecord> {
    let mut filtered: Vec<&StudyRecord> = records
        .iter()
        .filter(|record| subject.matches(&record.subject))
        .collect();

    if let Some(range) = date_range {
        filtered.retain(|record| record.date.map_or(false, |date| range.contains(date)));
    }

    if let Some(window) = period_window(period, now) {
        filtered.retain(|record| record.date.map_or(false, |date| window.contains(date)));
    }

    debug!(
        total = records.len(),
        kept = filtered.len(),
        %period,
        "filtered study records"
    );
    filtered
}

/// Window covered by `period` on the day of `now`, from the start of the day
/// one unit back through the end of today.
pub fn period_window(period: NamedPeriod, now: NaiveDateTime) -> Option<DateRange> {
    let today = now.date();
    let compare_date = period.step_back(start_of_day(today))?;
    DateRange::new(compare_date, end_of_day(today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::at;

    fn record(subject: &str, date: &str) -> StudyRecord {
        StudyRecord::new(subject.to_string(), at(date), 45)
    }

    fn undated(subject: &str) -> StudyRecord {
        StudyRecord {
            date: None,
            ..record(subject, "2000-01-01")
        }
    }

    fn subjects(records: &[&StudyRecord]) -> Vec<String> {
        records.iter().map(|r| r.subject.clone()).collect()
    }

    fn only(subject: &str) -> SubjectFilter {
        SubjectFilter::Only(subject.to_string())
    }

    #[test]
    fn subject_filter_keeps_exact_matches_in_order() {
        let records = vec![
            record("Math", "2024-01-05"),
            record("Bio", "2024-06-01"),
            record("math", "2024-02-01"),
            record("Math", "2024-03-01"),
        ];
        let kept = filter(&records, &only("Math"), None, NamedPeriod::All, at("2024-07-01"));
        assert_eq!(kept, vec![&records[0], &records[3]]);
    }

    #[test]
    fn subject_filter_scenario() {
        let records = vec![record("Math", "2024-01-05"), record("Bio", "2024-06-01")];
        let kept = filter(&records, &only("Math"), None, NamedPeriod::All, at("2024-07-01"));
        assert_eq!(subjects(&kept), ["Math"]);
    }

    #[test]
    fn filtering_by_subject_twice_changes_nothing() {
        let records = vec![
            record("Math", "2024-01-05"),
            record("Bio", "2024-06-01"),
            record("Math", "2024-03-01"),
        ];
        let once: Vec<StudyRecord> =
            filter(&records, &only("Math"), None, NamedPeriod::All, at("2024-07-01"))
                .into_iter()
                .cloned()
                .collect();
        let twice = filter(&once, &only("Math"), None, NamedPeriod::All, at("2024-07-01"));
        assert_eq!(twice.len(), once.len());
        assert!(twice.iter().zip(&once).all(|(a, b)| *a == b));
    }

    #[test]
    fn all_subjects_and_all_period_keep_everything() {
        let records = vec![record("Math", "2024-01-05"), undated("Bio")];
        let kept = filter(&records, &SubjectFilter::All, None, NamedPeriod::All, at("2024-07-01"));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn date_range_is_inclusive_at_both_ends() {
        let records = vec![
            record("A", "2024-02-29 23:59:59.999"),
            record("B", "2024-03-01"),
            record("C", "2024-03-05 12:00"),
            record("D", "2024-03-10"),
            record("E", "2024-03-10 00:00:00.001"),
            undated("F"),
        ];
        let range = DateRange::new(at("2024-03-01"), at("2024-03-10"));
        let kept = filter(&records, &SubjectFilter::All, range, NamedPeriod::All, at("2024-07-01"));
        assert_eq!(subjects(&kept), ["B", "C", "D"]);
    }

    #[test]
    fn week_period_spans_seven_days_through_end_of_today() {
        let records = vec![
            record("A", "2024-03-02 23:59"),
            record("B", "2024-03-03"),
            record("C", "2024-03-10 23:30"),
            record("D", "2024-03-11"),
        ];
        let now = at("2024-03-10 09:15");
        let kept = filter(&records, &SubjectFilter::All, None, NamedPeriod::Week, now);
        assert_eq!(subjects(&kept), ["B", "C"]);
    }

    #[test]
    fn quarter_period_uses_calendar_months() {
        // Three calendar months back from 31 May is 29 Feb, 92 days earlier.
        let records = vec![
            record("A", "2024-02-28 23:00"),
            record("B", "2024-02-29"),
            record("C", "2024-03-01"),
        ];
        let now = at("2024-05-31 18:00");
        let kept = filter(&records, &SubjectFilter::All, None, NamedPeriod::Quarter, now);
        assert_eq!(subjects(&kept), ["B", "C"]);
    }

    #[test]
    fn year_period_window() {
        let window = period_window(NamedPeriod::Year, at("2024-02-29 08:00")).unwrap();
        assert_eq!(window.start(), at("2023-02-28"));
        assert_eq!(window.end(), at("2024-02-29 23:59:59.999"));
        assert!(period_window(NamedPeriod::All, at("2024-02-29")).is_none());
    }

    #[test]
    fn undated_records_fail_period_filter() {
        let records = vec![undated("A"), record("B", "2024-03-09")];
        let now = at("2024-03-10");
        let kept = filter(&records, &SubjectFilter::All, None, NamedPeriod::Month, now);
        assert_eq!(subjects(&kept), ["B"]);
    }

    #[test]
    fn range_and_period_are_both_applied() {
        let records = vec![
            record("A", "2024-01-15"),
            record("B", "2024-03-05"),
            record("C", "2024-03-12"),
        ];
        let range = DateRange::new(at("2024-01-01"), at("2024-03-08"));
        let now = at("2024-03-12");
        let kept = filter(&records, &SubjectFilter::All, range, NamedPeriod::Week, now);
        assert_eq!(subjects(&kept), ["B"]);
    }

    #[test]
    fn selection_applies_all_filters() {
        let records = vec![
            record("Math", "2024-03-05"),
            record("Bio", "2024-03-05"),
            record("Math", "2023-03-05"),
        ];
        let selection = Selection {
            subject: only("Math"),
            date_range: None,
            period: NamedPeriod::Month,
        };
        assert_eq!(selection.apply(&records, at("2024-03-10")), vec![&records[0]]);
    }
}
