//! Weekly time windows: grammar parsing and membership evaluation.
//!
//! # Grammar
//!
//! ```text
//! [<day3>-<day3> ]<HH:MM>-<HH:MM>[ <IANA zone>]
//! ```
//!
//! `"Mon-Fri 08:00-20:00 Europe/Berlin"`, `"22:00-06:00"`. The weekday
//! range defaults to the full week (Sun-Sat), the zone to UTC. Both the
//! weekday range and the time range may wrap (`Fri-Mon`, `22:00-06:00`).
//!
//! # Boundaries
//!
//! Time-of-day comparison is strict on both ends: an instant exactly on
//! `time_start` or `time_end` is outside the window.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

static WINDOW_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\w{3})-(\w{3})\s+)?(\d{2}:\d{2})-(\d{2}:\d{2})(?:\s+([\w/_+-]+))?$")
        .expect("window grammar is a valid regex")
});

/// Day of the week, ordered Sunday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Weekday {
    /// Parse a case-insensitive three-letter abbreviation.
    pub fn from_abbrev(token: &str) -> ParseResult<Self> {
        match token.to_ascii_lowercase().as_str() {
            "sun" => Ok(Weekday::Sun),
            "mon" => Ok(Weekday::Mon),
            "tue" => Ok(Weekday::Tue),
            "wed" => Ok(Weekday::Wed),
            "thu" => Ok(Weekday::Thu),
            "fri" => Ok(Weekday::Fri),
            "sat" => Ok(Weekday::Sat),
            _ => Err(ParseError::UnknownWeekday(token.to_string())),
        }
    }

    pub fn abbrev(self) -> &'static str {
        match self {
            Weekday::Sun => "Sun",
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
        }
    }

    pub fn of<T: Datelike>(date: &T) -> Self {
        match date.weekday() {
            chrono::Weekday::Sun => Weekday::Sun,
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// A recurring weekly interval: weekday range x time-of-day range x zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub weekday_start: Weekday,
    pub weekday_end: Weekday,
    /// Minute of day, 0..=1439.
    pub time_start: u16,
    /// Minute of day, 0..=1439.
    pub time_end: u16,
    pub zone: Tz,
}

impl TimeWindow {
    /// Parse a canonical window string.
    pub fn parse(input: &str) -> ParseResult<Self> {
        let caps = WINDOW_GRAMMAR
            .captures(input.trim())
            .ok_or_else(|| ParseError::InvalidFormat(input.to_string()))?;

        let (weekday_start, weekday_end) = match (caps.get(1), caps.get(2)) {
            (Some(start), Some(end)) => (
                Weekday::from_abbrev(start.as_str())?,
                Weekday::from_abbrev(end.as_str())?,
            ),
            _ => (Weekday::Sun, Weekday::Sat),
        };

        let time_start = parse_hour_min(&caps[3])?;
        let time_end = parse_hour_min(&caps[4])?;

        let zone = match caps.get(5) {
            Some(zone) => zone
                .as_str()
                .parse::<Tz>()
                .map_err(|_| ParseError::UnknownTimezone(zone.as_str().to_string()))?,
            None => Tz::UTC,
        };

        Ok(Self {
            weekday_start,
            weekday_end,
            time_start,
            time_end,
            zone,
        })
    }

    /// Whether `now`, viewed in the window's own zone, falls inside.
    pub fn contains<T: TimeZone>(&self, now: &DateTime<T>) -> bool {
        let local = now.with_timezone(&self.zone);
        self.contains_day(Weekday::of(&local)) && self.contains_time(minute_of_day(&local))
    }

    fn contains_day(&self, day: Weekday) -> bool {
        if self.weekday_start <= self.weekday_end {
            self.weekday_start <= day && day <= self.weekday_end
        } else {
            day >= self.weekday_start || day <= self.weekday_end
        }
    }

    fn contains_time(&self, minute: u16) -> bool {
        if self.time_start < self.time_end {
            self.time_start < minute && minute < self.time_end
        } else {
            minute > self.time_start || minute < self.time_end
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {}-{} {}",
            self.weekday_start,
            self.weekday_end,
            format_hour_min(self.time_start),
            format_hour_min(self.time_end),
            self.zone.name()
        )
    }
}

/// Minute-of-day component of a timestamp.
pub fn minute_of_day<T: Timelike>(t: &T) -> u16 {
    (t.hour() * 60 + t.minute()) as u16
}

fn parse_hour_min(token: &str) -> ParseResult<u16> {
    let invalid = || ParseError::InvalidTime(token.to_string());
    let (hours, minutes) = token.split_once(':').ok_or_else(invalid)?;
    let hours: u16 = hours.parse().map_err(|_| invalid())?;
    let minutes: u16 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

fn format_hour_min(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
