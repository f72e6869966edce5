// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Responses: the one artifact recorded per `(command, agent)` pair.
//!
//! The bytes themselves live on disk under `cc-persistence`'s tree; this
//! type is the in-memory view handed back to callers of `GetResponse`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::CommandId;

/// The textual and file-based output an agent reported for one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub command_id: CommandId,
    pub agent: Uuid,
    /// Captured stdout/stderr text.
    pub stdout: Vec<u8>,
    /// Paths (relative to the response directory) of files the agent sent
    /// back, for file-receive commands.
    pub received_files: Vec<String>,
}

impl ResponseRecord {
    pub fn new(command_id: CommandId, agent: Uuid, stdout: Vec<u8>) -> Self {
        Self { command_id, agent, stdout, received_files: Vec::new() }
    }
}
