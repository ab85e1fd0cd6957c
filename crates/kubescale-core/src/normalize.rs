//! Rewrites relative `up` / `down` directives into canonical windows.
//!
//! `kubescale/down: 2h` evaluated at `now` becomes
//! `kubescale/downtime: <Day>-<Day> <now>-<now+2h> UTC`, where `<Day>` is
//! the weekday of `now + 2h`. The relative directive is removed so the
//! rewrite happens once; the caller persists the result.

use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::annotations::{
    AnnotationSet, DOWN_DURATION_ANNOTATION, DOWNTIME_ANNOTATION, UP_DURATION_ANNOTATION,
    UPTIME_ANNOTATION,
};
use crate::duration::parse_human_duration;
use crate::error::{ParseError, ParseResult};
use crate::window::{TimeWindow, Weekday, minute_of_day};

/// (relative directive, canonical directive it produces)
const DIRECTIVES: [(&str, &str); 2] = [
    (UP_DURATION_ANNOTATION, UPTIME_ANNOTATION),
    (DOWN_DURATION_ANNOTATION, DOWNTIME_ANNOTATION),
];

/// Build the single-day window covering `[now, now + duration)`.
pub fn relative_window(now: DateTime<Utc>, duration: Duration) -> ParseResult<TimeWindow> {
    let overflow = || ParseError::DurationOverflow(format!("{}s", duration.as_secs()));
    let delta = chrono::Duration::from_std(duration).map_err(|_| overflow())?;
    let end = now.checked_add_signed(delta).ok_or_else(overflow)?;
    let day = Weekday::of(&end);

    Ok(TimeWindow {
        weekday_start: day,
        weekday_end: day,
        time_start: minute_of_day(&now),
        time_end: minute_of_day(&end),
        zone: Tz::UTC,
    })
}

/// Replace relative directives with canonical windows anchored at `now`.
///
/// Returns `Ok(true)` when the set was modified. On error the set is left
/// exactly as it was, even if the other directive was valid. Empty
/// directive values are ignored.
pub fn normalize_directives(
    annotations: &mut AnnotationSet,
    now: DateTime<Utc>,
) -> ParseResult<bool> {
    let mut rewrites = Vec::with_capacity(DIRECTIVES.len());
    for (relative, canonical) in DIRECTIVES {
        let Some(value) = annotations.get(relative).filter(|v| !v.is_empty()) else {
            continue;
        };
        let window = relative_window(now, parse_human_duration(value)?)?;
        rewrites.push((relative, canonical, window));
    }

    let changed = !rewrites.is_empty();
    for (relative, canonical, window) in rewrites {
        annotations.insert(canonical.to_string(), window.to_string());
        annotations.remove(relative);
    }
    Ok(changed)
}
