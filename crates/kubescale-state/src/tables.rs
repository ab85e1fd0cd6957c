//! redb table definitions for the kubescale resource store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized records).

use redb::TableDefinition;

pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Namespaces keyed by `{name}`.
pub const NAMESPACES: JsonTable = TableDefinition::new("namespaces");

/// Workloads keyed by `{kind}/{namespace}/{name}`.
pub const RESOURCES: JsonTable = TableDefinition::new("resources");
