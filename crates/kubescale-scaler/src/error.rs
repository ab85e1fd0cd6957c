//! Scaler error types.

use thiserror::Error;

use kubescale_core::ParseError;
use kubescale_state::StateError;

/// Errors that can occur while reconciling one resource.
#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("schedule parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("state store error: {0}")]
    State(#[from] StateError),

    /// The stashed liveness value could not be decoded; the resource stays
    /// suspended.
    #[error("malformed previous state {raw:?}: {reason}")]
    Deserialize { raw: String, reason: String },

    #[error("liveness knob error: {0}")]
    Knob(String),
}

pub type ScalerResult<T> = Result<T, ScalerError>;
