//! Parse errors for schedule directives.

use thiserror::Error;

/// Result type alias for directive parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while parsing durations and window strings.
///
/// These are always local to one resource: the caller reports them and
/// moves on to the next resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("duration too short: {0:?}")]
    DurationTooShort(String),

    #[error("invalid duration amount: {0:?}")]
    InvalidAmount(String),

    #[error("unknown duration suffix: {0:?}")]
    UnknownUnit(String),

    #[error("duration out of range: {0:?}")]
    DurationOverflow(String),

    #[error("invalid window format: {0:?}")]
    InvalidFormat(String),

    #[error("unknown weekday: {0:?}")]
    UnknownWeekday(String),

    #[error("invalid time of day: {0:?}")]
    InvalidTime(String),

    #[error("invalid timezone: {0:?}")]
    UnknownTimezone(String),
}
