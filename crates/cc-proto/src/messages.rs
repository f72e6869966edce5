// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The closed `Message` sum type carried over the agent <-> server link.
//!
//! Every record carries a `record_id` used to correlate out-of-band
//! exchanges (file chunk requests, tunnel stream frames) within one
//! connection; heartbeats and one-way frames set it to `0`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cc_domain::command::{Command, LogLevel};

/// A stream id scoped to one agent session, identifying one forward/reverse
/// tunnel connection or one UFS mount.
pub type StreamId = u64;

/// Top-level envelope: a record id plus one variant body. Implementations
/// must reject unknown variants (a `bincode` decode failure on an envelope
/// already surfaces this as `ProtocolError::Malformed`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub record_id: u64,
    pub body: Message,
}

impl Frame {
    pub fn new(record_id: u64, body: Message) -> Self {
        Self { record_id, body }
    }
}

/// The message sum type. Variant order is part of the wire format — do not
/// reorder existing variants; append new ones at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Sent once by the agent immediately after the transport connects.
    /// Any other frame arriving before this one is a protocol error.
    ClientAnnounce {
        uuid: Uuid,
        hostname: String,
        os: String,
        arch: String,
        ipv4: Vec<std::net::Ipv4Addr>,
        ipv6: Vec<std::net::Ipv6Addr>,
        macs: Vec<String>,
    },

    /// Empty-bodied keepalive, sent agent -> server at the negotiated
    /// interval.
    Heartbeat,

    /// Server -> agent: here is a command to evaluate/run.
    CommandRequest { command: Command },

    /// Agent -> server: the result of running a command.
    CommandResponse {
        command_id: u64,
        stdout: Vec<u8>,
        /// Names (relative to the agent's working directory) of files it is
        /// about to stream back via `FileChunk` frames for this response.
        receive_files: Vec<String>,
    },

    /// Agent -> server: please send chunk `(name, offset, length)` of a
    /// file-send payload.
    FileRequest { name: String, offset: u64, length: u32 },

    /// Either direction: one chunk of file bytes. `eof` marks the last
    /// chunk for `name`. Used both for file-send (server -> agent, answering
    /// a `FileRequest`) and file-receive (agent -> server, unsolicited,
    /// tagged with the command id the bytes belong to).
    FileChunk {
        name: String,
        offset: u64,
        data: Vec<u8>,
        eof: bool,
        command_id: Option<u64>,
    },

    /// Server -> agent: open a new tunnel stream. `forward` is true for
    /// forward tunnels (agent connects out to `host:port`); false for
    /// reverse tunnels (the near end already accepted on the server, the
    /// agent dials out to mirror it).
    TunnelOpen { stream: StreamId, forward: bool, host: String, port: u16 },

    /// Either direction: bytes belonging to an open tunnel stream.
    TunnelData { stream: StreamId, data: Vec<u8> },

    /// Either direction: one side is done with this tunnel stream.
    TunnelClose { stream: StreamId },

    /// Either direction: a 9P-shaped UFS frame, opaque to this protocol.
    UfsData { mount: StreamId, data: Vec<u8> },

    /// Server -> agent: change the agent's own log verbosity.
    LogLevelChange { level: LogLevel },
}
