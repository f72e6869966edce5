// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The closed set of verbs a CLI front end issues. Each carries its own
//! typed argument set, so the wire between an external line-oriented CLI
//! and this crate is "parse text into one of these, call `dispatch`" —
//! the text parser itself stays an external collaborator.

use cc_domain::{CommandId, Filter, LogLevel};
use cc_proto::StreamId;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum ProcessAction {
    /// List the processes an agent last reported.
    Query,
    /// Signal a PID inside the guest.
    Signal { pid: u32, signal: u32 },
    /// Kill every guest process matching this name.
    Kill { name: String },
}

#[derive(Debug, Clone)]
pub enum DeleteTarget {
    Command(CommandId),
    CommandsByPrefix(String),
    Response(CommandId),
    ResponsesByPrefix(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Commands,
    Responses,
}

#[derive(Debug, Clone)]
pub enum MountAction {
    Start,
    Stop(StreamId),
}

/// A shell payload's optional pipe wiring, shared by `exec` and
/// `background`.
#[derive(Debug, Clone, Default)]
pub struct ShellPipes {
    pub stdin: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Verb {
    /// Send files (glob patterns, expanded against the file base) to every
    /// agent matching the namespace's active filter, under its active
    /// prefix.
    Send(Vec<String>),
    /// Ask every matched agent to send these guest-relative paths back.
    Recv(Vec<String>),
    /// Run a foreground shell command.
    Exec { argv: Vec<String>, pipes: ShellPipes },
    /// Run a backgrounded shell command.
    Background { argv: Vec<String>, pipes: ShellPipes },
    /// Query, signal, or kill a guest process.
    Process { uuid: Uuid, action: ProcessAction },
    /// Set the namespace's active filter for subsequent commands.
    Filter(Filter),
    /// Set the namespace's active prefix for subsequent commands.
    Prefix(String),
    /// `None` lists every command; `Some(id)` fetches one.
    Commands(Option<CommandId>),
    /// `None` lists every response in the namespace; `Some(id)` fetches the
    /// responses recorded for one command, across every agent.
    Responses { id: Option<CommandId>, raw: bool },
    Delete(DeleteTarget),
    Clear(ClearTarget),
    Clients,
    /// Forward tunnel: proxy connections accepted on the server to a single
    /// agent's side.
    Tunnel { uuid: Uuid, listen_port: u16, host: String, port: u16 },
    /// Reverse tunnel: proxy connections accepted on the server out through
    /// every agent matching the namespace's active filter.
    Rtunnel { listen_port: u16, host: String, port: u16 },
    Mount { uuid: Uuid, action: MountAction },
    Listen(u16),
    /// Change the agent-side log verbosity of every matched agent.
    Log(LogLevel),
}
