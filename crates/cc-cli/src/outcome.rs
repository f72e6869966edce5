// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::net::SocketAddr;

use cc_domain::{Agent, Command, CommandId, ProcessInfo, ResponseRecord};
use cc_namespace::HostReply;

/// What a dispatched verb produced, for a front end to render however it
/// likes.
#[derive(Debug, Clone)]
pub enum Outcome {
    CommandId(CommandId),
    Commands(Vec<Command>),
    Responses(Vec<ResponseRecord>),
    Clients(Vec<Agent>),
    Processes(Vec<ProcessInfo>),
    Endpoint(SocketAddr),
    DeletedCommands(Vec<CommandId>),
    /// Per-host replies to a fanned-out administrative command, already
    /// concatenated the way `stamp_replies` renders them.
    FanOut(Vec<HostReply>),
    Ack,
}
