// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The client registry: UUID -> agent session. Guarded the same way as the
//! command store — a read-write lock over a map, readers snapshot under
//! the read lock.
//!
//! A reconnect within the grace window reattaches to the existing `Agent`
//! record (tags and process list survive) rather than starting a fresh one;
//! only the transport-derived fields (hostname/os/arch/addresses) and the
//! session's tunnel handle are replaced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use cc_domain::{Agent, Filter};
use cc_session::AgentAnnounce;
use cc_tunnel::SessionTunnelHandle;
use chrono::Utc;
use uuid::Uuid;

struct ClientEntry {
    agent: RwLock<Agent>,
    tunnel: Mutex<Option<SessionTunnelHandle>>,
    disconnected_at: Mutex<Option<Instant>>,
}

pub struct ClientRegistry {
    clients: RwLock<HashMap<Uuid, Arc<ClientEntry>>>,
    grace_period: Duration,
}

impl ClientRegistry {
    pub fn new(grace_period: Duration) -> Self {
        Self { clients: RwLock::new(HashMap::new()), grace_period }
    }

    /// Install a fresh agent record, or reattach to an existing one if this
    /// uuid was seen before (whether still connected or within its grace
    /// window) — there is no separate "create" vs. "reconnect" operation,
    /// so this folds both into one call.
    pub fn register_or_reattach(&self, announce: AgentAnnounce) {
        let clients = self.clients.read().unwrap();
        if let Some(entry) = clients.get(&announce.uuid) {
            let mut agent = entry.agent.write().unwrap();
            agent.hostname = announce.hostname;
            agent.os = announce.os;
            agent.arch = announce.arch;
            agent.ipv4 = announce.ipv4;
            agent.ipv6 = announce.ipv6;
            agent.macs = announce.macs;
            agent.touch(Utc::now());
            *entry.disconnected_at.lock().unwrap() = None;
            tracing::info!(uuid = %announce.uuid, "agent reattached");
            return;
        }
        drop(clients);

        let mut agent = Agent::new(announce.uuid, announce.hostname, announce.os, announce.arch, Utc::now());
        agent.ipv4 = announce.ipv4;
        agent.ipv6 = announce.ipv6;
        agent.macs = announce.macs;

        let entry = Arc::new(ClientEntry {
            agent: RwLock::new(agent),
            tunnel: Mutex::new(None),
            disconnected_at: Mutex::new(None),
        });
        self.clients.write().unwrap().insert(announce.uuid, entry);
        tracing::info!(uuid = %announce.uuid, "agent registered");
    }

    /// Wire up the tunnel handle for a just-handshaken session. Called from
    /// `on_handshake`, after `register_or_reattach` has already run.
    pub fn set_tunnel(&self, uuid: Uuid, tunnel: SessionTunnelHandle) {
        if let Some(entry) = self.clients.read().unwrap().get(&uuid) {
            *entry.tunnel.lock().unwrap() = Some(tunnel);
        }
    }

    pub fn touch_heartbeat(&self, uuid: Uuid) {
        if let Some(entry) = self.clients.read().unwrap().get(&uuid) {
            entry.agent.write().unwrap().touch(Utc::now());
        }
    }

    pub fn snapshot(&self, uuid: Uuid) -> Option<Agent> {
        self.clients.read().unwrap().get(&uuid).map(|e| e.agent.read().unwrap().clone())
    }

    pub fn snapshot_all(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> =
            self.clients.read().unwrap().values().map(|e| e.agent.read().unwrap().clone()).collect();
        agents.sort_by_key(|a| a.uuid);
        agents
    }

    pub fn tunnel_of(&self, uuid: Uuid) -> Option<SessionTunnelHandle> {
        self.clients.read().unwrap().get(&uuid).and_then(|e| e.tunnel.lock().unwrap().clone())
    }

    /// Every currently-connected session's tunnel handle whose agent
    /// matches `filter`, snapshotted once at call time (a reverse tunnel's
    /// membership does not track subsequent connects/disconnects).
    pub fn tunnels_matching(&self, filter: &Filter) -> Vec<SessionTunnelHandle> {
        self.clients
            .read()
            .unwrap()
            .values()
            .filter_map(|e| {
                let agent = e.agent.read().unwrap();
                if cc_matcher::matches(filter, &agent) {
                    e.tunnel.lock().unwrap().clone()
                } else {
                    None
                }
            })
            .collect()
    }

    /// Mark `uuid` as disconnected now, starting its grace-period clock.
    /// The record is not removed — a reconnect before the grace period
    /// elapses reattaches via `register_or_reattach`.
    pub fn mark_disconnected(&self, uuid: Uuid) {
        if let Some(entry) = self.clients.read().unwrap().get(&uuid) {
            *entry.disconnected_at.lock().unwrap() = Some(Instant::now());
            *entry.tunnel.lock().unwrap() = None;
        }
    }

    /// Remove every record disconnected past the grace period, returning
    /// the evicted uuids. Intended to be polled periodically by the server.
    pub fn evict_stale(&self) -> Vec<Uuid> {
        let now = Instant::now();
        let stale: Vec<Uuid> = {
            let clients = self.clients.read().unwrap();
            clients
                .iter()
                .filter(|(_, entry)| {
                    entry
                        .disconnected_at
                        .lock()
                        .unwrap()
                        .is_some_and(|at| now.duration_since(at) > self.grace_period)
                })
                .map(|(uuid, _)| *uuid)
                .collect()
        };
        if !stale.is_empty() {
            let mut clients = self.clients.write().unwrap();
            for uuid in &stale {
                clients.remove(uuid);
            }
        }
        stale
    }

    /// Unconditionally remove `uuid` — `UnregisterVM`, unlike a transport
    /// drop, does not wait out the grace period.
    pub fn remove(&self, uuid: Uuid) {
        self.clients.write().unwrap().remove(&uuid);
    }

    pub fn uuids(&self) -> Vec<Uuid> {
        self.clients.read().unwrap().keys().copied().collect()
    }
}
