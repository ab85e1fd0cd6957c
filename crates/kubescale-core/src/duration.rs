//! Shorthand relative durations used by the `up` / `down` directives.
//!
//! Grammar: `<digits><unit>` with no whitespace, where unit is one of
//! `m` (minutes), `h` (hours), `d` (days), `w` (weeks) or `M` (months,
//! counted as 30 days).

use std::time::Duration;

use crate::error::{ParseError, ParseResult};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;

/// Parse a human duration such as `"10m"`, `"2h"` or `"1w"`.
pub fn parse_human_duration(input: &str) -> ParseResult<Duration> {
    let Some((split, suffix)) = input.char_indices().last() else {
        return Err(ParseError::DurationTooShort(input.to_string()));
    };
    if input.len() < 2 {
        return Err(ParseError::DurationTooShort(input.to_string()));
    }

    let amount = &input[..split];
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidAmount(input.to_string()));
    }
    let value: u64 = amount
        .parse()
        .map_err(|_| ParseError::DurationOverflow(input.to_string()))?;

    let unit = match suffix {
        'm' => MINUTE,
        'h' => HOUR,
        'd' => DAY,
        'w' => WEEK,
        'M' => MONTH,
        _ => return Err(ParseError::UnknownUnit(suffix.to_string())),
    };

    value
        .checked_mul(unit)
        .map(Duration::from_secs)
        .ok_or_else(|| ParseError::DurationOverflow(input.to_string()))
}
