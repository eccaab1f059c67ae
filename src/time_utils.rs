// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for time: feed-week derivation and the injectable clock.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

/// Source of "now", injectable so tests can pin timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Monday 00:00 of the calendar week containing `start`, evaluated at the
/// given offset from UTC and returned as a UTC instant.
///
/// An activity starting exactly on Monday 00:00 maps to itself.
pub fn feed_week(start: DateTime<Utc>, utc_offset_minutes: i32) -> DateTime<Utc> {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    let local = start.with_timezone(&offset);
    let days_from_monday = i64::from(local.weekday().num_days_from_monday());
    let monday = local.date_naive() - Duration::days(days_from_monday);
    offset
        .from_local_datetime(&monday.and_time(NaiveTime::MIN))
        .single()
        .map_or(start, |dt| dt.with_timezone(&Utc))
}

/// Stable index key for the feed week containing `start` ("YYYY-MM-DD" of
/// the local Monday).
pub fn week_key(start: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    feed_week(start, utc_offset_minutes)
        .with_timezone(&offset)
        .format("%Y-%m-%d")
        .to_string()
}
