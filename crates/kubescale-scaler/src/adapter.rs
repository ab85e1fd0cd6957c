//! Per-kind access to a workload's liveness knob.
//!
//! | Kind | Knob | Off value | Stash |
//! |---|---|---|---|
//! | deployment, stateful set | replica count | `0` | decimal count |
//! | cron job | suspend flag | `true` | none |
//! | daemon set | node selector | sentinel label | JSON selector |
//! | custom | integer field in a document | `0` | decimal count |

use kubescale_core::AnnotationSet;
use kubescale_core::annotations::{CUSTOM_REPLICAS_ANNOTATION, PREVIOUS_REPLICAS_ANNOTATION};
use kubescale_state::{LabelSelector, ResourceRecord, WorkloadSpec, nested_i64, set_nested_i64};
use tracing::warn;

use crate::error::{ScalerError, ScalerResult};
use crate::snapshot::PreviousState;

/// Node-selector label that no node carries.
pub const SUSPEND_SELECTOR_KEY: &str = "kubescale-suspend-daemonset";
pub const SUSPEND_SELECTOR_VALUE: &str = "true";

/// Capability interface the lifecycle engine drives.
///
/// `stash` and `unstash` only touch the resource's own annotations;
/// `unstash` must leave the resource untouched when it fails.
pub trait LivenessAdapter {
    type Knob: std::fmt::Debug;

    fn read_liveness(&self, res: &ResourceRecord) -> ScalerResult<Self::Knob>;

    fn is_suspended(&self, knob: &Self::Knob) -> bool;

    fn off_value(&self) -> Self::Knob;

    fn write_liveness(&self, res: &mut ResourceRecord, knob: Self::Knob) -> ScalerResult<()>;

    fn stash(&self, res: &mut ResourceRecord, knob: &Self::Knob) -> ScalerResult<()>;

    /// Consume the stash and return the value to restore. `effective` is
    /// the merged namespace + resource annotation set.
    fn unstash(&self, res: &mut ResourceRecord, effective: &AnnotationSet)
    -> ScalerResult<Self::Knob>;
}

fn knob_mismatch(res: &ResourceRecord, expected: &str) -> ScalerError {
    ScalerError::Knob(format!(
        "{} has no {expected} (spec: {:?})",
        res.table_key(),
        res.spec
    ))
}

/// Restore target for replica-count kinds: the `replicas` override, else
/// the stash, else 1.
fn restore_replicas(res: &ResourceRecord, effective: &AnnotationSet) -> u32 {
    if let Some(n) = effective
        .get(CUSTOM_REPLICAS_ANNOTATION)
        .and_then(|raw| PreviousState::decode_replicas(raw))
    {
        return n;
    }
    match res.annotations.get(PREVIOUS_REPLICAS_ANNOTATION) {
        Some(raw) => PreviousState::decode_replicas(raw).unwrap_or_else(|| {
            warn!(
                resource = %res.table_key(),
                stash = %raw,
                "unusable replica stash, restoring 1"
            );
            1
        }),
        None => 1,
    }
}

// ── Replica count ──────────────────────────────────────────────────

/// Deployments and stateful sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicaAdapter;

impl LivenessAdapter for ReplicaAdapter {
    type Knob = u32;

    fn read_liveness(&self, res: &ResourceRecord) -> ScalerResult<u32> {
        match &res.spec {
            WorkloadSpec::Replicated { replicas } => Ok(*replicas),
            _ => Err(knob_mismatch(res, "replica count")),
        }
    }

    fn is_suspended(&self, knob: &u32) -> bool {
        *knob == 0
    }

    fn off_value(&self) -> u32 {
        0
    }

    fn write_liveness(&self, res: &mut ResourceRecord, knob: u32) -> ScalerResult<()> {
        match &mut res.spec {
            WorkloadSpec::Replicated { replicas } => {
                *replicas = knob;
                Ok(())
            }
            _ => Err(knob_mismatch(res, "replica count")),
        }
    }

    fn stash(&self, res: &mut ResourceRecord, knob: &u32) -> ScalerResult<()> {
        let raw = PreviousState::Replicas(*knob).encode()?;
        res.annotations
            .insert(PREVIOUS_REPLICAS_ANNOTATION.to_string(), raw);
        Ok(())
    }

    fn unstash(&self, res: &mut ResourceRecord, effective: &AnnotationSet) -> ScalerResult<u32> {
        let target = restore_replicas(res, effective);
        res.annotations.remove(PREVIOUS_REPLICAS_ANNOTATION);
        Ok(target)
    }
}

// ── Suspend flag ───────────────────────────────────────────────────

/// Cron jobs. The flag itself is the whole state, so nothing is stashed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuspendFlagAdapter;

impl LivenessAdapter for SuspendFlagAdapter {
    type Knob = bool;

    fn read_liveness(&self, res: &ResourceRecord) -> ScalerResult<bool> {
        match &res.spec {
            WorkloadSpec::Scheduled { suspend } => Ok(*suspend),
            _ => Err(knob_mismatch(res, "suspend flag")),
        }
    }

    fn is_suspended(&self, knob: &bool) -> bool {
        *knob
    }

    fn off_value(&self) -> bool {
        true
    }

    fn write_liveness(&self, res: &mut ResourceRecord, knob: bool) -> ScalerResult<()> {
        match &mut res.spec {
            WorkloadSpec::Scheduled { suspend } => {
                *suspend = knob;
                Ok(())
            }
            _ => Err(knob_mismatch(res, "suspend flag")),
        }
    }

    fn stash(&self, _res: &mut ResourceRecord, _knob: &bool) -> ScalerResult<()> {
        Ok(())
    }

    fn unstash(&self, _res: &mut ResourceRecord, _effective: &AnnotationSet) -> ScalerResult<bool> {
        Ok(false)
    }
}

// ── Node selector ──────────────────────────────────────────────────

/// Daemon sets: pinned to a label no node has while suspended.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeSelectorAdapter;

impl NodeSelectorAdapter {
    pub fn sentinel() -> LabelSelector {
        LabelSelector::from([(
            SUSPEND_SELECTOR_KEY.to_string(),
            SUSPEND_SELECTOR_VALUE.to_string(),
        )])
    }
}

impl LivenessAdapter for NodeSelectorAdapter {
    type Knob = LabelSelector;

    fn read_liveness(&self, res: &ResourceRecord) -> ScalerResult<LabelSelector> {
        match &res.spec {
            WorkloadSpec::NodePinned { node_selector } => Ok(node_selector.clone()),
            _ => Err(knob_mismatch(res, "node selector")),
        }
    }

    fn is_suspended(&self, knob: &LabelSelector) -> bool {
        knob.get(SUSPEND_SELECTOR_KEY)
            .is_some_and(|v| v == SUSPEND_SELECTOR_VALUE)
    }

    fn off_value(&self) -> LabelSelector {
        Self::sentinel()
    }

    fn write_liveness(&self, res: &mut ResourceRecord, knob: LabelSelector) -> ScalerResult<()> {
        match &mut res.spec {
            WorkloadSpec::NodePinned { node_selector } => {
                *node_selector = knob;
                Ok(())
            }
            _ => Err(knob_mismatch(res, "node selector")),
        }
    }

    fn stash(&self, res: &mut ResourceRecord, knob: &LabelSelector) -> ScalerResult<()> {
        let raw = PreviousState::NodeSelector(knob.clone()).encode()?;
        res.annotations
            .insert(PREVIOUS_REPLICAS_ANNOTATION.to_string(), raw);
        Ok(())
    }

    fn unstash(
        &self,
        res: &mut ResourceRecord,
        _effective: &AnnotationSet,
    ) -> ScalerResult<LabelSelector> {
        let selector = match res.annotations.get(PREVIOUS_REPLICAS_ANNOTATION) {
            Some(raw) => PreviousState::decode_node_selector(raw)?,
            None => LabelSelector::new(),
        };
        res.annotations.remove(PREVIOUS_REPLICAS_ANNOTATION);
        Ok(selector)
    }
}

// ── Custom resource ────────────────────────────────────────────────

/// Externally-managed resources with an integer replica field somewhere
/// in their document.
#[derive(Debug, Clone)]
pub struct CustomReplicaAdapter {
    replicas_path: Vec<String>,
}

impl CustomReplicaAdapter {
    pub fn new(replicas_path: Vec<String>) -> Self {
        Self { replicas_path }
    }

    fn path_display(&self) -> String {
        self.replicas_path.join(".")
    }
}

impl Default for CustomReplicaAdapter {
    fn default() -> Self {
        Self::new(vec!["spec".to_string(), "replicas".to_string()])
    }
}

impl LivenessAdapter for CustomReplicaAdapter {
    type Knob = i64;

    fn read_liveness(&self, res: &ResourceRecord) -> ScalerResult<i64> {
        let WorkloadSpec::Custom { document, .. } = &res.spec else {
            return Err(knob_mismatch(res, "document"));
        };
        nested_i64(document, &self.replicas_path)?.ok_or_else(|| {
            ScalerError::Knob(format!(
                "{} has no field {}",
                res.table_key(),
                self.path_display()
            ))
        })
    }

    fn is_suspended(&self, knob: &i64) -> bool {
        *knob <= 0
    }

    fn off_value(&self) -> i64 {
        0
    }

    fn write_liveness(&self, res: &mut ResourceRecord, knob: i64) -> ScalerResult<()> {
        let WorkloadSpec::Custom { document, .. } = &mut res.spec else {
            return Err(knob_mismatch(res, "document"));
        };
        set_nested_i64(document, &self.replicas_path, knob)?;
        Ok(())
    }

    fn stash(&self, res: &mut ResourceRecord, knob: &i64) -> ScalerResult<()> {
        let count = u32::try_from(*knob)
            .map_err(|_| ScalerError::Knob(format!("replica count {knob} out of range")))?;
        let raw = PreviousState::Replicas(count).encode()?;
        res.annotations
            .insert(PREVIOUS_REPLICAS_ANNOTATION.to_string(), raw);
        Ok(())
    }

    fn unstash(&self, res: &mut ResourceRecord, effective: &AnnotationSet) -> ScalerResult<i64> {
        let target = restore_replicas(res, effective);
        res.annotations.remove(PREVIOUS_REPLICAS_ANNOTATION);
        Ok(i64::from(target))
    }
}
