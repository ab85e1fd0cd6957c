//! Resource lifecycle engine.
//!
//! Decides, from the effective annotations and the current liveness knob,
//! whether a resource should be suspended, resumed, or left alone, and
//! applies that decision to the in-memory record through a
//! [`LivenessAdapter`]. The caller persists the record.
//!
//! ```text
//! in_downtime = downtime window contains now          (absent: false)
//! in_uptime   = !in_downtime && uptime contains now   (absent: false)
//!
//! Suspend  if in_downtime && active
//! Resume   if !in_downtime && in_uptime && suspended
//! NoOp     otherwise
//! ```
//!
//! The engine keeps no memory between sweeps: the liveness value and the
//! stash annotation are the whole state, so re-running after missed ticks
//! or restarts converges to the same result.

use chrono::{DateTime, Utc};

use kubescale_core::annotations::{DOWNTIME_ANNOTATION, UPTIME_ANNOTATION};
use kubescale_core::{AnnotationSet, ParseResult, TimeWindow};
use kubescale_state::ResourceRecord;

use crate::adapter::LivenessAdapter;
use crate::error::ScalerResult;

/// What the engine decided for one resource on one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoOp,
    Suspend,
    Resume,
}

/// Window membership at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowState {
    pub in_downtime: bool,
    pub in_uptime: bool,
}

/// Evaluate the downtime and uptime directives at `now`.
///
/// The uptime directive is not even parsed once downtime matches.
pub fn evaluate_windows(annotations: &AnnotationSet, now: DateTime<Utc>) -> ParseResult<WindowState> {
    let in_window = |key: &str| -> ParseResult<bool> {
        match annotations.get(key) {
            Some(raw) => Ok(TimeWindow::parse(raw)?.contains(&now)),
            None => Ok(false),
        }
    };

    let in_downtime = in_window(DOWNTIME_ANNOTATION)?;
    let in_uptime = !in_downtime && in_window(UPTIME_ANNOTATION)?;
    Ok(WindowState {
        in_downtime,
        in_uptime,
    })
}

/// Pick a transition from window membership and the current state.
pub fn decide(windows: WindowState, suspended: bool) -> Transition {
    if windows.in_downtime && !suspended {
        Transition::Suspend
    } else if !windows.in_downtime && windows.in_uptime && suspended {
        Transition::Resume
    } else {
        Transition::NoOp
    }
}

/// Decide and apply the transition for `res`.
///
/// On `Suspend` the current knob value is stashed and the off value
/// written; on `Resume` the stash is consumed and its value written. On
/// error the transition is abandoned and the caller must not persist `res`.
pub fn apply<A: LivenessAdapter>(
    adapter: &A,
    res: &mut ResourceRecord,
    effective: &AnnotationSet,
    now: DateTime<Utc>,
) -> ScalerResult<Transition> {
    let windows = evaluate_windows(effective, now)?;
    let knob = adapter.read_liveness(res)?;
    let transition = decide(windows, adapter.is_suspended(&knob));

    match transition {
        Transition::Suspend => {
            adapter.stash(res, &knob)?;
            adapter.write_liveness(res, adapter.off_value())?;
        }
        Transition::Resume => {
            let restored = adapter.unstash(res, effective)?;
            adapter.write_liveness(res, restored)?;
        }
        Transition::NoOp => {}
    }
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{
        CustomReplicaAdapter, NodeSelectorAdapter, ReplicaAdapter, SuspendFlagAdapter,
    };
    use crate::error::ScalerError;
    use chrono::TimeZone;
    use kubescale_core::annotations::{CUSTOM_REPLICAS_ANNOTATION, PREVIOUS_REPLICAS_ANNOTATION};
    use kubescale_state::{LabelSelector, WorkloadSpec};

    /// 2024-01-02 is a Tuesday.
    fn tuesday(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, hour, minute, 0).unwrap()
    }

    fn set(pairs: &[(&str, &str)]) -> AnnotationSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn replicas(res: &ResourceRecord) -> u32 {
        match res.spec {
            WorkloadSpec::Replicated { replicas } => replicas,
            _ => panic!("not a replicated workload"),
        }
    }

    // ── decide ─────────────────────────────────────────────────────

    #[test]
    fn decide_table() {
        let down = WindowState { in_downtime: true, in_uptime: false };
        let up = WindowState { in_downtime: false, in_uptime: true };
        let neither = WindowState::default();

        assert_eq!(decide(down, false), Transition::Suspend);
        assert_eq!(decide(down, true), Transition::NoOp);
        assert_eq!(decide(up, true), Transition::Resume);
        assert_eq!(decide(up, false), Transition::NoOp);
        assert_eq!(decide(neither, true), Transition::NoOp);
        assert_eq!(decide(neither, false), Transition::NoOp);
    }

    // ── evaluate_windows ───────────────────────────────────────────

    #[test]
    fn downtime_has_priority() {
        let ann = set(&[
            (DOWNTIME_ANNOTATION, "Mon-Fri 09:00-17:00 UTC"),
            (UPTIME_ANNOTATION, "Mon-Fri 08:00-20:00 UTC"),
        ]);
        let state = evaluate_windows(&ann, tuesday(10, 0)).unwrap();
        assert!(state.in_downtime);
        assert!(!state.in_uptime);
    }

    #[test]
    fn uptime_not_parsed_during_downtime() {
        let ann = set(&[
            (DOWNTIME_ANNOTATION, "09:00-17:00"),
            (UPTIME_ANNOTATION, "garbage"),
        ]);
        assert!(evaluate_windows(&ann, tuesday(10, 0)).unwrap().in_downtime);
        // Outside downtime the broken uptime surfaces.
        assert!(evaluate_windows(&ann, tuesday(18, 0)).is_err());
    }

    #[test]
    fn no_directives_means_no_windows() {
        assert_eq!(
            evaluate_windows(&AnnotationSet::new(), tuesday(10, 0)).unwrap(),
            WindowState::default()
        );
    }

    // ── apply ──────────────────────────────────────────────────────

    #[test]
    fn suspend_then_resume_restores_exact_count() {
        let mut res = ResourceRecord::deployment("ns", "api", 7);
        let down = set(&[(DOWNTIME_ANNOTATION, "Mon-Fri 09:00-17:00 UTC")]);

        let t = apply(&ReplicaAdapter, &mut res, &down, tuesday(10, 0)).unwrap();
        assert_eq!(t, Transition::Suspend);
        assert_eq!(replicas(&res), 0);
        assert_eq!(res.annotations[PREVIOUS_REPLICAS_ANNOTATION], "7");

        let up = set(&[
            (DOWNTIME_ANNOTATION, "Mon-Fri 09:00-17:00 UTC"),
            (UPTIME_ANNOTATION, "Mon-Fri 17:00-23:00 UTC"),
        ]);
        let t = apply(&ReplicaAdapter, &mut res, &up, tuesday(18, 0)).unwrap();
        assert_eq!(t, Transition::Resume);
        assert_eq!(replicas(&res), 7);
        assert!(!res.annotations.contains_key(PREVIOUS_REPLICAS_ANNOTATION));
    }

    #[test]
    fn repeated_application_is_idempotent() {
        let mut res = ResourceRecord::deployment("ns", "api", 3);
        let ann = set(&[(DOWNTIME_ANNOTATION, "09:00-17:00")]);

        assert_eq!(apply(&ReplicaAdapter, &mut res, &ann, tuesday(10, 0)).unwrap(), Transition::Suspend);
        let after_first = res.clone();
        assert_eq!(apply(&ReplicaAdapter, &mut res, &ann, tuesday(10, 0)).unwrap(), Transition::NoOp);
        assert_eq!(res, after_first);
    }

    #[test]
    fn resume_only_when_suspended() {
        let mut res = ResourceRecord::deployment("ns", "api", 2);
        let ann = set(&[(UPTIME_ANNOTATION, "08:00-20:00")]);
        assert_eq!(apply(&ReplicaAdapter, &mut res, &ann, tuesday(10, 0)).unwrap(), Transition::NoOp);
        assert_eq!(replicas(&res), 2);
    }

    #[test]
    fn outside_both_windows_is_noop() {
        let mut res = ResourceRecord::deployment("ns", "api", 0);
        let ann = set(&[
            (DOWNTIME_ANNOTATION, "Sat-Sun 00:00-23:59"),
            (UPTIME_ANNOTATION, "Mon-Fri 08:00-09:00"),
        ]);
        assert_eq!(apply(&ReplicaAdapter, &mut res, &ann, tuesday(12, 0)).unwrap(), Transition::NoOp);
    }

    #[test]
    fn cron_job_suspend_and_resume() {
        let mut res = ResourceRecord::cron_job("ns", "report", false);
        let down = set(&[(DOWNTIME_ANNOTATION, "22:00-06:00")]);
        assert_eq!(apply(&SuspendFlagAdapter, &mut res, &down, tuesday(23, 0)).unwrap(), Transition::Suspend);
        assert_eq!(res.spec, WorkloadSpec::Scheduled { suspend: true });
        assert!(res.annotations.is_empty());

        let up = set(&[(DOWNTIME_ANNOTATION, "22:00-06:00"), (UPTIME_ANNOTATION, "06:00-22:00")]);
        assert_eq!(apply(&SuspendFlagAdapter, &mut res, &up, tuesday(9, 0)).unwrap(), Transition::Resume);
        assert_eq!(res.spec, WorkloadSpec::Scheduled { suspend: false });
    }

    #[test]
    fn daemon_set_is_not_gated_twice() {
        let selector = LabelSelector::from([("zone".to_string(), "a".to_string())]);
        let mut res = ResourceRecord::daemon_set("infra", "agent", selector.clone());
        let down = set(&[(DOWNTIME_ANNOTATION, "09:00-17:00")]);

        apply(&NodeSelectorAdapter, &mut res, &down, tuesday(10, 0)).unwrap();
        assert_eq!(apply(&NodeSelectorAdapter, &mut res, &down, tuesday(11, 0)).unwrap(), Transition::NoOp);

        // The stash still holds the original selector, not the sentinel.
        let up = set(&[(UPTIME_ANNOTATION, "17:00-23:00")]);
        apply(&NodeSelectorAdapter, &mut res, &up, tuesday(18, 0)).unwrap();
        assert_eq!(res.spec, WorkloadSpec::NodePinned { node_selector: selector });
    }

    fn custom_replicas(res: &ResourceRecord) -> serde_json::Value {
        match &res.spec {
            WorkloadSpec::Custom { document, .. } => document["spec"]["replicas"].clone(),
            _ => panic!("not a custom resource"),
        }
    }

    #[test]
    fn custom_resource_suspend_then_resume() {
        let mut res = ResourceRecord::custom(
            "monitoring",
            "prom",
            "monitoring.coreos.com/v1",
            serde_json::json!({"metadata": {"name": "prom"}, "spec": {"replicas": 5}}),
        );
        let adapter = CustomReplicaAdapter::default();
        let down = set(&[(DOWNTIME_ANNOTATION, "Mon-Fri 09:00-17:00 UTC")]);

        assert_eq!(apply(&adapter, &mut res, &down, tuesday(10, 0)).unwrap(), Transition::Suspend);
        assert_eq!(custom_replicas(&res), 0);
        assert_eq!(res.annotations[PREVIOUS_REPLICAS_ANNOTATION], "5");

        let up = set(&[
            (DOWNTIME_ANNOTATION, "Mon-Fri 09:00-17:00 UTC"),
            (UPTIME_ANNOTATION, "Mon-Fri 17:00-23:00 UTC"),
        ]);
        assert_eq!(apply(&adapter, &mut res, &up, tuesday(18, 0)).unwrap(), Transition::Resume);
        assert_eq!(custom_replicas(&res), 5);
        assert!(!res.annotations.contains_key(PREVIOUS_REPLICAS_ANNOTATION));
        let WorkloadSpec::Custom { document, .. } = &res.spec else {
            panic!("spec shape changed");
        };
        assert_eq!(document["metadata"]["name"], "prom");
    }

    #[test]
    fn custom_resource_resume_honours_replica_override() {
        let mut res = ResourceRecord::custom(
            "monitoring",
            "prom",
            "monitoring.coreos.com/v1",
            serde_json::json!({"spec": {"replicas": 0}}),
        )
        .with_annotation(PREVIOUS_REPLICAS_ANNOTATION, "2");
        let up = set(&[
            (UPTIME_ANNOTATION, "08:00-20:00"),
            (CUSTOM_REPLICAS_ANNOTATION, "4"),
        ]);

        let t = apply(&CustomReplicaAdapter::default(), &mut res, &up, tuesday(10, 0)).unwrap();
        assert_eq!(t, Transition::Resume);
        assert_eq!(custom_replicas(&res), 4);
        assert!(!res.annotations.contains_key(PREVIOUS_REPLICAS_ANNOTATION));
    }

    #[test]
    fn malformed_stash_leaves_resource_suspended() {
        let mut res = ResourceRecord::daemon_set("infra", "agent", NodeSelectorAdapter::sentinel())
            .with_annotation(PREVIOUS_REPLICAS_ANNOTATION, "{broken");
        let before = res.clone();
        let up = set(&[(UPTIME_ANNOTATION, "08:00-20:00")]);

        let err = apply(&NodeSelectorAdapter, &mut res, &up, tuesday(10, 0)).unwrap_err();
        assert!(matches!(err, ScalerError::Deserialize { .. }));
        assert_eq!(res, before);
    }

    #[test]
    fn malformed_window_is_a_parse_error() {
        let mut res = ResourceRecord::deployment("ns", "api", 3);
        let ann = set(&[(DOWNTIME_ANNOTATION, "Someday 09:00-17:00")]);
        let err = apply(&ReplicaAdapter, &mut res, &ann, tuesday(10, 0)).unwrap_err();
        assert!(matches!(err, ScalerError::Parse(_)));
        assert_eq!(replicas(&res), 3);
    }
}
