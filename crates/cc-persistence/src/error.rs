// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },

    #[error("response for command {command_id} / agent {agent} not found")]
    NotFound { command_id: u64, agent: uuid::Uuid },
}
