//! Shared types used across kubescale crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Workload kinds the scaler knows how to suspend and resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    CronJob,
    /// Externally-managed resource accessed as a generic document.
    Custom,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Deployment,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
        ResourceKind::CronJob,
        ResourceKind::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Deployment => "deployment",
            ResourceKind::StatefulSet => "stateful_set",
            ResourceKind::DaemonSet => "daemon_set",
            ResourceKind::CronJob => "cron_job",
            ResourceKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown resource kind: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_string_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert!("pod".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn serde_matches_display() {
        let json = serde_json::to_string(&ResourceKind::StatefulSet).unwrap();
        assert_eq!(json, "\"stateful_set\"");
    }
}
