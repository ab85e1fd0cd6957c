//! Record types for the kubescale resource store.
//!
//! Records are JSON-serialized into redb tables. Each carries a
//! `resource_version` that the store bumps on every write; updates must
//! present the version they read.

use std::collections::BTreeMap;

use kubescale_core::{AnnotationSet, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StateError, StateResult};

/// Label mapping used as a node selector.
pub type LabelSelector = BTreeMap<String, String>;

// ── Namespace ──────────────────────────────────────────────────────

/// A namespace and the default annotations it lends its resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamespaceRecord {
    pub name: String,
    #[serde(default)]
    pub annotations: AnnotationSet,
    #[serde(default)]
    pub resource_version: u64,
}

impl NamespaceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: AnnotationSet::new(),
            resource_version: 0,
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Build the key for the namespaces table.
    pub fn table_key(&self) -> String {
        self.name.clone()
    }
}

// ── Resource ───────────────────────────────────────────────────────

/// A workload with its annotations and kind-specific liveness knob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: AnnotationSet,
    pub spec: WorkloadSpec,
    #[serde(default)]
    pub resource_version: u64,
}

/// The part of a workload spec that controls whether it runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkloadSpec {
    /// Replica count (deployments, stateful sets).
    Replicated { replicas: u32 },
    /// Suspend flag (cron jobs).
    Scheduled {
        #[serde(default)]
        suspend: bool,
    },
    /// Pod-template node selector (daemon sets).
    NodePinned {
        #[serde(default)]
        node_selector: LabelSelector,
    },
    /// Semi-structured document of an externally-managed resource.
    Custom { api_version: String, document: Value },
}

impl WorkloadSpec {
    /// Whether this spec shape belongs to `kind`.
    pub fn fits(&self, kind: ResourceKind) -> bool {
        matches!(
            (kind, self),
            (ResourceKind::Deployment, WorkloadSpec::Replicated { .. })
                | (ResourceKind::StatefulSet, WorkloadSpec::Replicated { .. })
                | (ResourceKind::DaemonSet, WorkloadSpec::NodePinned { .. })
                | (ResourceKind::CronJob, WorkloadSpec::Scheduled { .. })
                | (ResourceKind::Custom, WorkloadSpec::Custom { .. })
        )
    }
}

impl ResourceRecord {
    pub fn new(
        kind: ResourceKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: WorkloadSpec,
    ) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
            annotations: AnnotationSet::new(),
            spec,
            resource_version: 0,
        }
    }

    pub fn deployment(namespace: &str, name: &str, replicas: u32) -> Self {
        Self::new(
            ResourceKind::Deployment,
            namespace,
            name,
            WorkloadSpec::Replicated { replicas },
        )
    }

    pub fn stateful_set(namespace: &str, name: &str, replicas: u32) -> Self {
        Self::new(
            ResourceKind::StatefulSet,
            namespace,
            name,
            WorkloadSpec::Replicated { replicas },
        )
    }

    pub fn daemon_set(namespace: &str, name: &str, node_selector: LabelSelector) -> Self {
        Self::new(
            ResourceKind::DaemonSet,
            namespace,
            name,
            WorkloadSpec::NodePinned { node_selector },
        )
    }

    pub fn cron_job(namespace: &str, name: &str, suspend: bool) -> Self {
        Self::new(
            ResourceKind::CronJob,
            namespace,
            name,
            WorkloadSpec::Scheduled { suspend },
        )
    }

    pub fn custom(namespace: &str, name: &str, api_version: &str, document: Value) -> Self {
        Self::new(
            ResourceKind::Custom,
            namespace,
            name,
            WorkloadSpec::Custom {
                api_version: api_version.to_string(),
                document,
            },
        )
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Build the composite key for the resources table.
    pub fn table_key(&self) -> String {
        Self::key(self.kind, &self.namespace, &self.name)
    }

    pub fn key(kind: ResourceKind, namespace: &str, name: &str) -> String {
        format!("{kind}/{namespace}/{name}")
    }

    pub fn validate(&self) -> StateResult<()> {
        if self.namespace.is_empty() || self.name.is_empty() {
            return Err(StateError::Invalid(
                "namespace and name must not be empty".to_string(),
            ));
        }
        if self.namespace.contains('/') || self.name.contains('/') {
            return Err(StateError::Invalid(format!(
                "{}: namespace and name must not contain '/'",
                self.table_key()
            )));
        }
        if !self.spec.fits(self.kind) {
            return Err(StateError::Invalid(format!(
                "{}: spec does not match kind {}",
                self.table_key(),
                self.kind
            )));
        }
        Ok(())
    }
}

// ── Versioning ─────────────────────────────────────────────────────

/// Records stored with optimistic-lock versions.
pub(crate) trait Versioned: Clone + Serialize + for<'de> Deserialize<'de> {
    fn table_key(&self) -> String;
    fn resource_version(&self) -> u64;
    fn set_resource_version(&mut self, version: u64);
}

impl Versioned for NamespaceRecord {
    fn table_key(&self) -> String {
        NamespaceRecord::table_key(self)
    }
    fn resource_version(&self) -> u64 {
        self.resource_version
    }
    fn set_resource_version(&mut self, version: u64) {
        self.resource_version = version;
    }
}

impl Versioned for ResourceRecord {
    fn table_key(&self) -> String {
        ResourceRecord::table_key(self)
    }
    fn resource_version(&self) -> u64 {
        self.resource_version
    }
    fn set_resource_version(&mut self, version: u64) {
        self.resource_version = version;
    }
}

// ── Nested document fields ─────────────────────────────────────────

/// Read an integer field at `path` inside a generic document.
///
/// Returns `Ok(None)` when some segment is missing, and an error when an
/// intermediate value is not an object or the leaf is not an integer.
pub fn nested_i64<S: AsRef<str>>(doc: &Value, path: &[S]) -> StateResult<Option<i64>> {
    let mut current = doc;
    for (depth, segment) in path.iter().enumerate() {
        let Value::Object(map) = current else {
            return Err(field_error(path, depth, "not an object"));
        };
        match map.get(segment.as_ref()) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    current
        .as_i64()
        .map(Some)
        .ok_or_else(|| field_error(path, path.len(), "not an integer"))
}

/// Write an integer field at `path`, creating intermediate objects.
pub fn set_nested_i64<S: AsRef<str>>(doc: &mut Value, path: &[S], value: i64) -> StateResult<()> {
    let Some((leaf, parents)) = path.split_last() else {
        return Err(StateError::InvalidField {
            path: String::new(),
            reason: "empty path".to_string(),
        });
    };

    if doc.is_null() {
        *doc = Value::Object(Default::default());
    }
    let mut current = doc;
    for (depth, segment) in parents.iter().enumerate() {
        current = match current {
            Value::Object(map) => map
                .entry(segment.as_ref().to_string())
                .or_insert_with(|| Value::Object(Default::default())),
            _ => return Err(field_error(path, depth, "not an object")),
        };
    }
    match current {
        Value::Object(map) => {
            map.insert(leaf.as_ref().to_string(), Value::from(value));
            Ok(())
        }
        _ => Err(field_error(path, parents.len(), "not an object")),
    }
}

fn field_error<S: AsRef<str>>(path: &[S], depth: usize, reason: &str) -> StateError {
    let shown: Vec<&str> = path[..depth].iter().map(|s| s.as_ref()).collect();
    StateError::InvalidField {
        path: if shown.is_empty() {
            "<root>".to_string()
        } else {
            shown.join(".")
        },
        reason: reason.to_string(),
    }
}
