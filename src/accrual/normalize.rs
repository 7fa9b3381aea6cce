//! Collapses raw association periods into disjoint billable day ranges.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::models::{AssociationPeriod, Id};

/// A closed, inclusive range of whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "interval start after end");
        Self { start, end }
    }

    /// Number of days covered, counting both ends.
    pub fn days(&self) -> u64 {
        let span = (self.end - self.start).num_days();
        u64::try_from(span).map_or(0, |d| d + 1)
    }

    /// True if `date` overlaps this interval or starts the day right after it.
    fn reaches(&self, date: NaiveDate) -> bool {
        match self.end.checked_add_days(Days::new(1)) {
            Some(next_day) => date <= next_day,
            None => true,
        }
    }
}

/// A closed period whose exit precedes its entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedPeriod {
    pub period_id: Id,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
}

/// Output of [`normalize`]: sorted, pairwise disjoint, non-touching intervals
/// plus whatever was left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedPeriods {
    pub intervals: Vec<DayInterval>,
    pub malformed: Vec<MalformedPeriod>,
    pub open_periods: usize,
}

impl NormalizedPeriods {
    pub fn total_days(&self) -> u64 {
        self.intervals.iter().map(DayInterval::days).sum()
    }
}

/// Merge overlapping or adjacent closed periods.
///
/// Open periods are counted and dropped. Periods with `exit_date < entry_date`
/// are skipped and reported in `malformed`.
pub fn normalize(periods: &[AssociationPeriod]) -> NormalizedPeriods {
    let mut out = NormalizedPeriods::default();
    let mut closed: Vec<DayInterval> = Vec::with_capacity(periods.len());

    for period in periods {
        let Some(exit_date) = period.exit_date else {
            out.open_periods += 1;
            continue;
        };
        if exit_date < period.entry_date {
            out.malformed.push(MalformedPeriod {
                period_id: period.id.clone(),
                entry_date: period.entry_date,
                exit_date,
            });
            continue;
        }
        closed.push(DayInterval::new(period.entry_date, exit_date));
    }

    closed.sort_by_key(|interval| (interval.start, interval.end));

    let mut iter = closed.into_iter();
    let Some(mut current) = iter.next() else {
        return out;
    };
    for next in iter {
        if current.reaches(next.start) {
            current.end = current.end.max(next.end);
        } else {
            out.intervals.push(current);
            current = next;
        }
    }
    out.intervals.push(current);

    out
}
