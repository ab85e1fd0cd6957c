//! Scaler — the periodic sweep over every scheduled workload.
//!
//! One sweep lists namespaces, rewrites their relative directives, then
//! visits every resource of every configured kind in turn:
//!
//! ```text
//! merge(namespace, resource) -> exclusion? -> normalize + persist
//!     -> merge again -> lifecycle::apply(adapter) -> update
//! ```
//!
//! Failures are local to one resource: they are logged, recorded in the
//! [`SweepReport`], and the sweep moves on. Nothing is retried within a
//! sweep; the next one starts from whatever the store then holds.
//!
//! An unparsable `/up` or `/down` fails its resource before any window is
//! evaluated, so a typo in a relative directive pauses scheduling for that
//! resource (its existing `/uptime` and `/downtime` included) until fixed.
//!
//! Sweeps talk to the store synchronously, both from [`Scaler::run`] and
//! from the API's on-demand sweep.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use kubescale_core::annotations::has_schedule;
use kubescale_core::config::ScalerConfig;
use kubescale_core::{AnnotationSet, ResourceKind, merge_annotations, normalize_directives, should_skip};
use kubescale_state::{ResourceRecord, StateError};

use crate::adapter::{CustomReplicaAdapter, NodeSelectorAdapter, ReplicaAdapter, SuspendFlagAdapter};
use crate::error::ScalerResult;
use crate::lifecycle::{self, Transition};
use crate::store::ResourceStore;

/// Result of reconciling one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Excluded,
    NoOp,
    Suspended,
    Resumed,
    Failed { error: String },
}

impl From<Transition> for Outcome {
    fn from(t: Transition) -> Self {
        match t {
            Transition::NoOp => Outcome::NoOp,
            Transition::Suspend => Outcome::Suspended,
            Transition::Resume => Outcome::Resumed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    /// Whether relative directives were rewritten this sweep.
    pub normalized: bool,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Everything one sweep did.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub at: DateTime<Utc>,
    pub resources: Vec<ResourceOutcome>,
    /// Failures not tied to a single resource (listing, namespaces).
    pub errors: Vec<String>,
}

impl SweepReport {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            resources: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.resources.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn suspended(&self) -> usize {
        self.count(|o| *o == Outcome::Suspended)
    }

    pub fn resumed(&self) -> usize {
        self.count(|o| *o == Outcome::Resumed)
    }

    pub fn excluded(&self) -> usize {
        self.count(|o| *o == Outcome::Excluded)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn outcome_of(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<&Outcome> {
        self.resources
            .iter()
            .find(|r| r.kind == kind && r.namespace == namespace && r.name == name)
            .map(|r| &r.outcome)
    }
}

/// Drives the lifecycle engine over everything in a [`ResourceStore`].
#[derive(Clone)]
pub struct Scaler<S> {
    store: S,
    kinds: Vec<ResourceKind>,
    custom: CustomReplicaAdapter,
    interval: Duration,
    startup_delay: Duration,
}

impl<S: ResourceStore> Scaler<S> {
    pub fn new(store: S, config: &ScalerConfig) -> Self {
        Self {
            store,
            kinds: config.sweep.kinds.clone(),
            custom: CustomReplicaAdapter::new(config.custom.replicas_path.clone()),
            interval: config.sweep.interval(),
            startup_delay: config.sweep.startup_delay(),
        }
    }

    /// Run one full sweep at `now`.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::new(now);
        let namespaces = self.namespace_annotations(now, &mut report);

        for &kind in &self.kinds {
            let resources = match self.store.list_resources(kind) {
                Ok(resources) => resources,
                Err(e) => {
                    warn!(%kind, error = %e, "failed to list resources");
                    report.errors.push(format!("list {kind}: {e}"));
                    continue;
                }
            };

            for res in resources {
                let ns_annotations = namespaces.get(&res.namespace).cloned().unwrap_or_default();
                report.resources.push(self.reconcile(res, &ns_annotations, now));
            }
        }

        info!(
            resources = report.resources.len(),
            suspended = report.suspended(),
            resumed = report.resumed(),
            excluded = report.excluded(),
            failed = report.failed(),
            "sweep complete"
        );
        report
    }

    /// Reconcile a single resource at `now`, outside the periodic sweep.
    pub fn reconcile_one(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> ScalerResult<ResourceOutcome> {
        let res = self
            .store
            .get_resource(kind, namespace, name)?
            .ok_or_else(|| StateError::NotFound(ResourceRecord::key(kind, namespace, name)))?;
        let ns_annotations = self
            .store
            .get_namespace(namespace)?
            .map(|ns| ns.annotations)
            .unwrap_or_default();
        Ok(self.reconcile(res, &ns_annotations, now))
    }

    /// Run the sweep loop until `shutdown` flips.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            startup_delay_secs = self.startup_delay.as_secs(),
            kinds = ?self.kinds,
            "scaler started"
        );

        let mut delay = self.startup_delay;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.sweep(Utc::now());
                    delay = self.interval;
                }
                _ = shutdown.changed() => {
                    info!("scaler shutting down");
                    break;
                }
            }
        }
    }

    /// Effective namespace annotations for this sweep, with relative
    /// directives rewritten and persisted.
    fn namespace_annotations(
        &self,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> HashMap<String, AnnotationSet> {
        let namespaces = match self.store.list_namespaces() {
            Ok(namespaces) => namespaces,
            Err(e) => {
                error!(error = %e, "failed to list namespaces, continuing without defaults");
                report.errors.push(format!("list namespaces: {e}"));
                return HashMap::new();
            }
        };

        let mut by_name = HashMap::with_capacity(namespaces.len());
        for ns in namespaces {
            if should_skip(&ns.annotations, now) {
                by_name.insert(ns.name, ns.annotations);
                continue;
            }

            let mut normalized = ns.clone();
            let annotations = match normalize_directives(&mut normalized.annotations, now) {
                Ok(false) => ns.annotations,
                Ok(true) => match self.store.update_namespace(&normalized) {
                    Ok(_) => {
                        info!(namespace = %ns.name, "normalized namespace directives");
                        normalized.annotations
                    }
                    Err(e) => {
                        warn!(namespace = %ns.name, error = %e, "failed to persist namespace directives");
                        report.errors.push(format!("namespace {}: {e}", ns.name));
                        ns.annotations
                    }
                },
                Err(e) => {
                    warn!(namespace = %ns.name, error = %e, "invalid namespace directive");
                    report.errors.push(format!("namespace {}: {e}", ns.name));
                    ns.annotations
                }
            };
            by_name.insert(ns.name, annotations);
        }
        by_name
    }

    fn reconcile(
        &self,
        mut res: ResourceRecord,
        ns_annotations: &AnnotationSet,
        now: DateTime<Utc>,
    ) -> ResourceOutcome {
        let mut normalized = false;
        let outcome = match self.try_reconcile(&mut res, ns_annotations, now, &mut normalized) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    kind = %res.kind,
                    namespace = %res.namespace,
                    name = %res.name,
                    error = %e,
                    "resource reconcile failed"
                );
                Outcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        ResourceOutcome {
            kind: res.kind,
            namespace: res.namespace,
            name: res.name,
            normalized,
            outcome,
        }
    }

    fn try_reconcile(
        &self,
        res: &mut ResourceRecord,
        ns_annotations: &AnnotationSet,
        now: DateTime<Utc>,
        normalized: &mut bool,
    ) -> ScalerResult<Outcome> {
        if should_skip(&merge_annotations(ns_annotations, &res.annotations), now) {
            debug!(kind = %res.kind, namespace = %res.namespace, name = %res.name, "excluded");
            return Ok(Outcome::Excluded);
        }

        let mut rewritten = res.annotations.clone();
        if normalize_directives(&mut rewritten, now)? {
            let mut next = res.clone();
            next.annotations = rewritten;
            next.resource_version = self.store.update_resource(&next)?;
            *res = next;
            *normalized = true;
            info!(
                kind = %res.kind,
                namespace = %res.namespace,
                name = %res.name,
                "normalized relative directives"
            );
        }

        let effective = merge_annotations(ns_annotations, &res.annotations);
        if !has_schedule(&effective) {
            return Ok(Outcome::NoOp);
        }

        let mut next = res.clone();
        let transition = match next.kind {
            ResourceKind::Deployment | ResourceKind::StatefulSet => {
                lifecycle::apply(&ReplicaAdapter, &mut next, &effective, now)?
            }
            ResourceKind::CronJob => lifecycle::apply(&SuspendFlagAdapter, &mut next, &effective, now)?,
            ResourceKind::DaemonSet => {
                lifecycle::apply(&NodeSelectorAdapter, &mut next, &effective, now)?
            }
            ResourceKind::Custom => lifecycle::apply(&self.custom, &mut next, &effective, now)?,
        };

        if transition == Transition::NoOp {
            debug!(kind = %res.kind, namespace = %res.namespace, name = %res.name, "no change");
            return Ok(Outcome::NoOp);
        }

        next.resource_version = self.store.update_resource(&next)?;
        *res = next;
        info!(
            kind = %res.kind,
            namespace = %res.namespace,
            name = %res.name,
            ?transition,
            "applied transition"
        );
        Ok(transition.into())
    }
}
