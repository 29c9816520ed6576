//! Canonical data model for collected posts.
//!
//! The listing walker produces [Record]s; the exporters consume them. Dates are
//! calendar days in UTC; the window check never looks at the time of day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Date format used on the command line, in the config file, and in exported rows.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One admitted post. Column order here is the CSV header order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Post fullname (e.g. `t3_abc123`). Also the pagination cursor.
    pub identifier: String,
    pub ups: i64,
    pub downs: i64,
    pub upvote_ratio: f64,
    pub num_comments: u64,
    pub subreddit_subscribers: u64,
    /// `ups / max(subscribers, 1)`. See [engagement_ratio].
    pub engagement_ratio: f64,
    /// Title length in characters.
    pub title_length: usize,
    /// Creation date (UTC calendar day).
    pub time: NaiveDate,
}

/// Pagination token: the identifier of the last post on a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Returns None for an empty token; an empty cursor means the listing is exhausted.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("Invalid date window: start {start} is after end {end}.")]
    Reversed { start: NaiveDate, end: NaiveDate },
}

/// Closed calendar-date interval `[start, end]`. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

/// Where a date falls relative to a [DateWindow].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Newer than `end`; the listing has not reached the window yet.
    After,
    Inside,
    /// Older than `start`; everything later in the listing is older still.
    Before,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// True when `date` is strictly older than the window start.
    pub fn is_before_start(&self, date: NaiveDate) -> bool {
        date < self.start
    }

    pub fn place(&self, date: NaiveDate) -> Placement {
        if self.is_before_start(date) {
            Placement::Before
        } else if date > self.end {
            Placement::After
        } else {
            Placement::Inside
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

/// Truncate a Unix timestamp (seconds, possibly fractional) to its UTC calendar day.
///
/// Timestamps chrono cannot represent fall back to the epoch day, so they sort as
/// older than any sensible window.
pub fn date_of(created_utc: f64) -> NaiveDate {
    let secs = if created_utc.is_finite() {
        created_utc.floor() as i64
    } else {
        0
    };
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .date_naive()
}

/// Upvotes per subscriber. The denominator is clamped to 1 so an empty or
/// unreported subscriber count never divides by zero.
pub fn engagement_ratio(ups: i64, subscribers: u64) -> f64 {
    ups as f64 / subscribers.max(1) as f64
}
