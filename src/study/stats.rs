use std::collections::{BTreeMap, BTreeSet};

use crate::study::data::StudyRecord;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub sessions: usize,
    /// Minutes.
    pub total: u64,
    pub active_days: usize,
    pub by_subject: BTreeMap<String, u64>,
}

impl Summary {
    pub fn of(records: &[&StudyRecord]) -> Self {
        let mut by_subject = BTreeMap::new();
        let mut days = BTreeSet::new();
        let mut total = 0;
        for record in records {
            total += u64::from(record.duration);
            *by_subject.entry(record.subject.clone()).or_insert(0) += u64::from(record.duration);
            if let Some(date) = record.date {
                days.insert(date.date());
            }
        }
        Self {
            sessions: records.len(),
            total,
            active_days: days.len(),
            by_subject,
        }
    }

    /// Average minutes per session.
    pub fn average(&self) -> Option<u64> {
        if self.sessions == 0 {
            None
        } else {
            Some(self.total / self.sessions as u64)
        }
    }

    /// Share of the daily goal reached on the days studied.
    pub fn goal_progress(&self, daily_goal: u32) -> Option<f64> {
        if self.active_days == 0 || daily_goal == 0 {
            return None;
        }
        Some(self.total as f64 / (self.active_days as f64 * f64::from(daily_goal)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Delta {
    /// Minutes, current minus comparison.
    pub difference: i64,
    /// `None` when the comparison total is zero.
    pub percent: Option<f64>,
}

impl Delta {
    pub fn between(current: &Summary, comparison: &Summary) -> Self {
        let difference = current.total as i64 - comparison.total as i64;
        let percent = if comparison.total == 0 {
            None
        } else {
            Some(difference as f64 / comparison.total as f64 * 100.)
        };
        Self {
            difference,
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::at;

    fn record(subject: &str, date: &str, duration: u32) -> StudyRecord {
        StudyRecord::new(subject.to_string(), at(date), duration)
    }

    #[test]
    fn summary_totals_by_subject_and_day() {
        let records = vec![
            record("Math", "2024-03-01 09:00", 60),
            record("Bio", "2024-03-01 18:00", 30),
            record("Math", "2024-03-02", 45),
        ];
        let refs: Vec<_> = records.iter().collect();
        let summary = Summary::of(&refs);

        assert_eq!(summary.sessions, 3);
        assert_eq!(summary.total, 135);
        assert_eq!(summary.active_days, 2);
        assert_eq!(summary.average(), Some(45));
        assert_eq!(summary.by_subject["Math"], 105);
        assert_eq!(summary.by_subject["Bio"], 30);
        assert_eq!(summary.goal_progress(90), Some(0.75));
    }

    #[test]
    fn empty_summary_has_no_averages() {
        let summary = Summary::of(&[]);
        assert_eq!(summary, Summary::default());
        assert_eq!(summary.average(), None);
        assert_eq!(summary.goal_progress(60), None);
    }

    #[test]
    fn delta_against_comparison() {
        let current = Summary {
            total: 150,
            ..Summary::default()
        };
        let previous = Summary {
            total: 100,
            ..Summary::default()
        };
        assert_eq!(
            Delta::between(&current, &previous),
            Delta {
                difference: 50,
                percent: Some(50.)
            }
        );
        assert_eq!(Delta::between(&current, &Summary::default()).percent, None);
    }
}
