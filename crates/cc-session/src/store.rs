// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The boundary between a session and the server state it reads/writes.
//! A session never touches the command store, response store, or file base
//! directly — it goes through this trait, so `cc-session` stays ignorant of
//! persistence and transfer details (`cc-server` supplies the real
//! implementation, wired to `cc-persistence`/`cc-transfer`).

use std::net::{Ipv4Addr, Ipv6Addr};

use cc_domain::{Agent, Command, CommandId};
use uuid::Uuid;

use crate::error::SessionError;

/// The descriptor an agent reports in its `ClientAnnounce` frame.
pub struct AgentAnnounce {
    pub uuid: Uuid,
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub macs: Vec<String>,
}

pub trait SessionStore: Send + Sync {
    /// Register (or reattach to, on reconnect) the agent that just
    /// announced itself.
    fn register_agent(&self, announce: AgentAnnounce) -> Result<(), SessionError>;

    /// Record a heartbeat, resetting the agent's staleness deadline as
    /// tracked by the registry (independent of this session's own
    /// watchdog, which tears the transport down regardless).
    fn touch_heartbeat(&self, agent: Uuid);

    /// Commands with id >= `from`, already scoped to this session's
    /// namespace, in ascending id order.
    fn commands_from(&self, from: CommandId) -> Vec<Command>;

    /// Whether `agent` has already checked in a response for `id`.
    fn is_checked_in(&self, id: CommandId, agent: Uuid) -> bool;

    /// The current descriptor for `agent`, used to evaluate filters against
    /// its latest reported attributes and tags.
    fn agent_snapshot(&self, agent: Uuid) -> Option<Agent>;

    /// Serve a file-send chunk request from the file base.
    fn read_file_chunk(&self, name: &str, offset: u64, length: u32) -> Result<Vec<u8>, SessionError>;

    /// Stage one file-receive chunk under `<responses>/<id>/<agent>/<name>`.
    fn write_file_chunk(
        &self,
        id: CommandId,
        agent: Uuid,
        name: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<(), SessionError>;

    /// Finalize the response for `(id, agent)`, making it visible through
    /// `GetResponse`. Returns `false` if it was already recorded (the
    /// idempotent-duplicate-collapse case).
    fn finalize_response(&self, id: CommandId, agent: Uuid, stdout: Vec<u8>) -> Result<bool, SessionError>;
}
