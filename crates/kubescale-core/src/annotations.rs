//! Annotation keys and namespace/resource merging.
//!
//! Every key lives under the `kubescale/` prefix. Operators write the
//! directives (`up`, `down`, `uptime`, `downtime`, `replicas`, `exclude`,
//! `exclude-until`); the engine owns `previous-replicas`.

use std::collections::BTreeMap;

/// String-keyed metadata attached to a namespace or a resource.
pub type AnnotationSet = BTreeMap<String, String>;

pub const BASE_ANNOTATION: &str = "kubescale";

/// Canonical weekly window during which the workload should run.
pub const UPTIME_ANNOTATION: &str = "kubescale/uptime";
/// Canonical weekly window during which the workload should be off.
pub const DOWNTIME_ANNOTATION: &str = "kubescale/downtime";
/// Stash of the liveness value captured at suspend time.
pub const PREVIOUS_REPLICAS_ANNOTATION: &str = "kubescale/previous-replicas";
/// Explicit restore target for replica-count kinds.
pub const CUSTOM_REPLICAS_ANNOTATION: &str = "kubescale/replicas";
/// `"true"` (any case) excludes the resource from scheduling.
pub const EXCLUDE_ANNOTATION: &str = "kubescale/exclude";
/// RFC 3339 instant before which the resource is excluded.
pub const EXCLUDE_UNTIL_ANNOTATION: &str = "kubescale/exclude-until";
/// Relative "keep up for" directive, rewritten into `uptime`.
pub const UP_DURATION_ANNOTATION: &str = "kubescale/up";
/// Relative "keep down for" directive, rewritten into `downtime`.
pub const DOWN_DURATION_ANNOTATION: &str = "kubescale/down";

/// Combine namespace defaults with resource annotations.
///
/// Resource values win on key collision. Neither input is modified.
pub fn merge_annotations(namespace: &AnnotationSet, resource: &AnnotationSet) -> AnnotationSet {
    let mut merged = namespace.clone();
    merged.extend(resource.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Whether the set carries any scheduling directive at all.
pub fn has_schedule(annotations: &AnnotationSet) -> bool {
    annotations.contains_key(UPTIME_ANNOTATION) || annotations.contains_key(DOWNTIME_ANNOTATION)
}
