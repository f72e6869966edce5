// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The in-guest agent, as tracked by the CC server's client registry.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single process reported by an agent in response to a `process` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// Descriptive attributes an agent announces at handshake and refreshes via
/// heartbeats. `tags` are supplied out-of-band (by an operator labelling a
/// VM), never by the agent itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub uuid: Uuid,
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub macs: Vec<String>,
    pub processes: Vec<ProcessInfo>,
    pub tags: BTreeMap<String, String>,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

impl Agent {
    /// Construct a freshly handshaken agent record; `connected_at` and
    /// `last_heartbeat` both start at `now`.
    pub fn new(uuid: Uuid, hostname: String, os: String, arch: String, now: DateTime<Utc>) -> Self {
        Self {
            uuid,
            hostname,
            os,
            arch,
            ipv4: Vec::new(),
            ipv6: Vec::new(),
            macs: Vec::new(),
            processes: Vec::new(),
            tags: BTreeMap::new(),
            connected_at: now,
            last_heartbeat: now,
        }
    }

    /// Record a heartbeat, resetting the session's timeout deadline.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_heartbeat = now;
    }
}
