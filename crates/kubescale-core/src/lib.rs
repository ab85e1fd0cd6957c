//! kubescale-core — schedule directives and the pure decision primitives.
//!
//! Nothing in this crate performs I/O or reads the wall clock: every
//! evaluation takes `now` as a parameter.
//!
//! - [`duration`]: `10m` / `2h` / `1d` / `1w` / `1M` shorthand
//! - [`window`]: `Mon-Fri 08:00-20:00 Europe/Berlin` grammar and membership
//! - [`normalize`]: one-shot rewrite of relative directives into windows
//! - [`annotations`]: annotation keys and namespace/resource merging
//! - [`exclusion`]: `exclude` / `exclude-until` overrides
//! - [`config`]: `kubescale.toml`

pub mod annotations;
pub mod config;
pub mod duration;
pub mod error;
pub mod exclusion;
pub mod normalize;
pub mod types;
pub mod window;

pub use annotations::{AnnotationSet, merge_annotations};
pub use config::ScalerConfig;
pub use duration::parse_human_duration;
pub use error::{ParseError, ParseResult};
pub use exclusion::{Exclusion, should_skip};
pub use normalize::normalize_directives;
pub use types::ResourceKind;
pub use window::{TimeWindow, Weekday};
