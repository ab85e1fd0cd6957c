//! kubescale-state — embedded resource store for kubescale.
//!
//! Backed by [redb](https://docs.rs/redb), holds the namespaces and
//! workloads the scaler sweeps over: their annotations and the
//! kind-specific liveness knob (replica count, suspend flag, node selector
//! or a generic document).
//!
//! # Architecture
//!
//! All records are JSON-serialized into redb's `&[u8]` value columns.
//! Resource keys are `{kind}/{namespace}/{name}` so listing one kind is a
//! prefix scan. Every record carries a `resource_version`; conditional
//! updates fail with [`StateError::Conflict`] when someone else wrote in
//! between.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
