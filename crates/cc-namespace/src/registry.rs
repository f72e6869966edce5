// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Holds every namespace a process knows about. The default namespace is
//! never required to exist ahead of time — it is lazily built by a
//! caller-supplied factory the first time anything asks for it.

use std::collections::HashMap;

use cc_domain::NamespaceId;

use crate::namespace::Namespace;

pub struct NamespaceRegistry {
    namespaces: HashMap<NamespaceId, Namespace>,
    default_factory: Box<dyn Fn() -> Namespace + Send + Sync>,
}

impl NamespaceRegistry {
    pub fn new(default_factory: impl Fn() -> Namespace + Send + Sync + 'static) -> Self {
        Self { namespaces: HashMap::new(), default_factory: Box::new(default_factory) }
    }

    pub fn get(&self, id: &NamespaceId) -> Option<&Namespace> {
        self.namespaces.get(id)
    }

    pub fn get_mut(&mut self, id: &NamespaceId) -> Option<&mut Namespace> {
        self.namespaces.get_mut(id)
    }

    /// The default namespace, building and registering it via the factory
    /// the first time it's asked for.
    pub fn get_or_create_default(&mut self) -> &mut Namespace {
        let default_id = NamespaceId::default_namespace();
        self.namespaces.entry(default_id).or_insert_with(&self.default_factory)
    }

    pub fn insert(&mut self, namespace: Namespace) {
        self.namespaces.insert(namespace.id().clone(), namespace);
    }

    pub fn remove(&mut self, id: &NamespaceId) -> Option<Namespace> {
        self.namespaces.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &NamespaceId> {
        self.namespaces.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::LocalTransport;
    use cc_server::{CcServer, CcServerConfig};
    use std::sync::Arc;
    use std::time::Duration;

    fn build_default(dir: &std::path::Path) -> Namespace {
        let config = CcServerConfig {
            namespace: NamespaceId::default_namespace(),
            response_root: dir.join("responses"),
            file_base: None,
            heartbeat_deadline: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(5),
            grace_period: Duration::from_secs(5),
        };
        let server = CcServer::new(config).unwrap();
        let transport = Arc::new(LocalTransport(|_: &str| Ok(String::new())));
        Namespace::new(NamespaceId::default_namespace(), server, transport, Vec::new())
    }

    #[test]
    fn the_default_namespace_is_created_lazily_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let mut registry = NamespaceRegistry::new(move || build_default(&path));

        assert!(registry.get(&NamespaceId::default_namespace()).is_none());
        registry.get_or_create_default();
        assert!(registry.get(&NamespaceId::default_namespace()).is_some());
    }

    #[test]
    fn named_namespaces_can_be_inserted_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let mut registry = NamespaceRegistry::new(move || build_default(&path));

        let staging_id = NamespaceId::new("staging").unwrap();
        let staging = build_default(dir.path());
        let transport = Arc::new(LocalTransport(|_: &str| Ok(String::new())));
        registry.insert(Namespace::new(staging_id.clone(), staging.server().clone(), transport, Vec::new()));

        assert!(registry.get(&staging_id).is_some());
        registry.remove(&staging_id);
        assert!(registry.get(&staging_id).is_none());
    }
}
