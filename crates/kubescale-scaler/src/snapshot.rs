//! Typed stash of the liveness value captured at suspend time.
//!
//! On the wire the stash is the `kubescale/previous-replicas` annotation:
//! a decimal replica count, or a JSON object for node selectors.

use kubescale_state::LabelSelector;

use crate::error::{ScalerError, ScalerResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousState {
    Replicas(u32),
    NodeSelector(LabelSelector),
}

impl PreviousState {
    pub fn encode(&self) -> ScalerResult<String> {
        match self {
            PreviousState::Replicas(n) => Ok(n.to_string()),
            PreviousState::NodeSelector(selector) => {
                serde_json::to_string(selector).map_err(|e| ScalerError::Knob(e.to_string()))
            }
        }
    }

    /// Decode a replica stash. Only positive counts are usable restore
    /// targets; anything else yields `None`.
    pub fn decode_replicas(raw: &str) -> Option<u32> {
        raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
    }

    /// Decode a node-selector stash. `null` decodes to an empty selector.
    pub fn decode_node_selector(raw: &str) -> ScalerResult<LabelSelector> {
        serde_json::from_str::<Option<LabelSelector>>(raw)
            .map(Option::unwrap_or_default)
            .map_err(|e| ScalerError::Deserialize {
                raw: raw.to_string(),
                reason: e.to_string(),
            })
    }
}
