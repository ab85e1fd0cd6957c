//! kubescale-scaler — schedule-driven suspend/resume of workloads.
//!
//! Each sweep reads every namespace and workload from a [`ResourceStore`],
//! resolves its effective annotations (namespace defaults overridden by the
//! resource's own), and moves it between running and suspended:
//!
//! ```text
//! excluded?                      -> skip, no mutation
//! downtime-duration / uptime-... -> rewritten as absolute windows
//! in downtime && running         -> stash knob, write off value
//! in uptime   && suspended       -> restore stash, clear it
//! ```
//!
//! The knob and the stash annotation are the only state; nothing is kept
//! between sweeps, so the engine is safe to restart at any time.

pub mod adapter;
pub mod error;
pub mod lifecycle;
pub mod scaler;
pub mod snapshot;
pub mod store;

pub use adapter::{
    CustomReplicaAdapter, LivenessAdapter, NodeSelectorAdapter, ReplicaAdapter, SuspendFlagAdapter,
};
pub use error::{ScalerError, ScalerResult};
pub use lifecycle::{Transition, WindowState, apply, decide, evaluate_windows};
pub use scaler::{Outcome, ResourceOutcome, Scaler, SweepReport};
pub use snapshot::PreviousState;
pub use store::ResourceStore;
