// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! A namespace: its own CC server, its member host set, and the CLI
//! convenience state (active filter, active prefix) scoped to it. The
//! mount table and VM-launch queue are strictly scheduling concerns and
//! are deliberately not modeled here.

use std::sync::Arc;

use cc_domain::{Filter, NamespaceId};
use cc_server::CcServer;

use crate::mesh::{fan_out, HostReply, MeshTransport};

pub struct Namespace {
    id: NamespaceId,
    server: Arc<CcServer>,
    transport: Arc<dyn MeshTransport>,
    hosts: Vec<String>,
    active_filter: Filter,
    active_prefix: String,
}

impl Namespace {
    pub fn new(id: NamespaceId, server: Arc<CcServer>, transport: Arc<dyn MeshTransport>, hosts: Vec<String>) -> Self {
        Self { id, server, transport, hosts, active_filter: Filter::any(), active_prefix: String::new() }
    }

    pub fn id(&self) -> &NamespaceId {
        &self.id
    }

    pub fn server(&self) -> &Arc<CcServer> {
        &self.server
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn add_host(&mut self, host: impl Into<String>) {
        let host = host.into();
        if !self.hosts.contains(&host) {
            self.hosts.push(host);
        }
    }

    pub fn remove_host(&mut self, host: &str) {
        self.hosts.retain(|h| h != host);
    }

    pub fn active_filter(&self) -> &Filter {
        &self.active_filter
    }

    pub fn set_active_filter(&mut self, filter: Filter) {
        self.active_filter = filter;
    }

    pub fn active_prefix(&self) -> &str {
        &self.active_prefix
    }

    pub fn set_active_prefix(&mut self, prefix: impl Into<String>) {
        self.active_prefix = prefix.into();
    }

    /// Fan `request` out across every member host and collect the replies,
    /// one per host. A namespace with no member hosts still answers for
    /// its own host — the single-host case is the degenerate fan-out.
    pub async fn fan_out(&self, request: &str) -> Vec<HostReply> {
        if self.hosts.is_empty() {
            return fan_out(self.transport.as_ref(), &["localhost".to_string()], request).await;
        }
        fan_out(self.transport.as_ref(), &self.hosts, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_server::CcServerConfig;
    use std::time::Duration;

    fn test_server(dir: &tempfile::TempDir) -> Arc<CcServer> {
        let config = CcServerConfig {
            namespace: NamespaceId::default_namespace(),
            response_root: dir.path().join("responses"),
            file_base: None,
            heartbeat_deadline: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(5),
            grace_period: Duration::from_secs(5),
        };
        CcServer::new(config).unwrap()
    }

    #[tokio::test]
    async fn a_namespace_with_no_hosts_still_fans_out_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(&dir);
        let transport = Arc::new(crate::mesh::LocalTransport(|req: &str| Ok(format!("ok: {req}"))));
        let ns = Namespace::new(NamespaceId::default_namespace(), server, transport, Vec::new());

        let replies = ns.fan_out("get-clients").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].output, Ok("ok: get-clients".to_string()));
    }

    #[tokio::test]
    async fn adding_a_host_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(&dir);
        let transport = Arc::new(crate::mesh::LocalTransport(|_: &str| Ok(String::new())));
        let mut ns = Namespace::new(NamespaceId::default_namespace(), server, transport, Vec::new());

        ns.add_host("alpha");
        ns.add_host("alpha");
        assert_eq!(ns.hosts(), &["alpha".to_string()]);
    }
}
