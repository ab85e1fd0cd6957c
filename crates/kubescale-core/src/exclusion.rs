//! Exclusion overrides that disable scheduling for a resource.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::annotations::{AnnotationSet, EXCLUDE_ANNOTATION, EXCLUDE_UNTIL_ANNOTATION};

/// Exclusion state derived from annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exclusion {
    pub hard_excluded: bool,
    pub excluded_until: Option<DateTime<Utc>>,
}

impl Exclusion {
    /// Read the exclusion annotations. An unparsable `exclude-until` is
    /// treated as absent.
    pub fn from_annotations(annotations: &AnnotationSet) -> Self {
        let hard_excluded = annotations
            .get(EXCLUDE_ANNOTATION)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let excluded_until = annotations.get(EXCLUDE_UNTIL_ANNOTATION).and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(e) => {
                    debug!(value = %raw, error = %e, "ignoring unparsable exclude-until");
                    None
                }
            }
        });

        Self {
            hard_excluded,
            excluded_until,
        }
    }

    /// Whether the resource must be skipped at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.hard_excluded || self.excluded_until.is_some_and(|until| now < until)
    }
}

/// Shorthand for `Exclusion::from_annotations(..).is_active(now)`.
pub fn should_skip(annotations: &AnnotationSet, now: DateTime<Utc>) -> bool {
    Exclusion::from_annotations(annotations).is_active(now)
}
