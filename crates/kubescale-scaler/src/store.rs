//! The store seam the scaler reads from and writes through.

use kubescale_core::ResourceKind;
use kubescale_state::{NamespaceRecord, ResourceRecord, StateResult, StateStore};

/// List/Get/Update access to namespaces and workloads.
///
/// Updates are conditional on the record's `resource_version`; a stale
/// record fails with `StateError::Conflict`.
pub trait ResourceStore: Send + Sync {
    fn list_namespaces(&self) -> StateResult<Vec<NamespaceRecord>>;
    fn get_namespace(&self, name: &str) -> StateResult<Option<NamespaceRecord>>;
    fn update_namespace(&self, ns: &NamespaceRecord) -> StateResult<u64>;
    fn list_resources(&self, kind: ResourceKind) -> StateResult<Vec<ResourceRecord>>;
    fn get_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> StateResult<Option<ResourceRecord>>;
    fn update_resource(&self, res: &ResourceRecord) -> StateResult<u64>;
}

impl ResourceStore for StateStore {
    fn list_namespaces(&self) -> StateResult<Vec<NamespaceRecord>> {
        StateStore::list_namespaces(self)
    }

    fn get_namespace(&self, name: &str) -> StateResult<Option<NamespaceRecord>> {
        StateStore::get_namespace(self, name)
    }

    fn update_namespace(&self, ns: &NamespaceRecord) -> StateResult<u64> {
        StateStore::update_namespace(self, ns)
    }

    fn list_resources(&self, kind: ResourceKind) -> StateResult<Vec<ResourceRecord>> {
        StateStore::list_resources(self, kind)
    }

    fn get_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> StateResult<Option<ResourceRecord>> {
        StateStore::get_resource(self, kind, namespace, name)
    }

    fn update_resource(&self, res: &ResourceRecord) -> StateResult<u64> {
        StateStore::update_resource(self, res)
    }
}
