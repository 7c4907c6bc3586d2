//! Filters, search and sort over the merged timeline.
//!
//! Every function takes the full record set and returns a fresh list. They
//! do not compose: filtering by media after a date range starts again from
//! the full set and drops the date range.

use crate::tweet_record::TweetRecord;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Inclusive instant bounds; an absent bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Calendar-day bounds in `tz`: `start` from its first instant, `end`
    /// through its last, so both days are included whole. An end day with
    /// no following day (`NaiveDate::MAX`) leaves the end open.
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>, tz: Tz) -> Self {
        Self {
            start: start.map(|day| start_of_day(day, tz)),
            end: end
                .and_then(|day| day.succ_opt())
                .and_then(|next| start_of_day(next, tz).checked_sub_signed(Duration::nanoseconds(1))),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| instant >= start)
            && self.end.map_or(true, |end| instant <= end)
    }
}

fn start_of_day(day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    // A DST jump can skip local midnight; take the earliest valid reading.
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Stable sort by creation instant; equal instants keep their order.
pub fn sort_by_time(superset: &[TweetRecord], direction: SortDirection) -> Vec<TweetRecord> {
    let mut sorted = superset.to_vec();
    match direction {
        SortDirection::Ascending => sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortDirection::Descending => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    sorted
}

pub fn filter_by_date_range(superset: &[TweetRecord], range: &DateRange) -> Vec<TweetRecord> {
    if range.is_unbounded() {
        return superset.to_vec();
    }
    superset
        .iter()
        .filter(|record| range.contains(record.created_at))
        .cloned()
        .collect()
}

/// Records carrying at least one photo.
pub fn filter_by_media(superset: &[TweetRecord]) -> Vec<TweetRecord> {
    superset
        .iter()
        .filter(|record| record.has_photo())
        .cloned()
        .collect()
}

/// Case-sensitive substring match on the text or the owner label.
pub fn search(superset: &[TweetRecord], query: &str) -> Vec<TweetRecord> {
    if query.is_empty() {
        return superset.to_vec();
    }
    superset
        .iter()
        .filter(|record| record.raw_text.contains(query) || record.owner_label.contains(query))
        .cloned()
        .collect()
}

pub fn reset(superset: &[TweetRecord]) -> Vec<TweetRecord> {
    superset.to_vec()
}
