// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The server-facing error enum, one variant per error kind the CC core
//! distinguishes, in the shape `ah-rest-server::error::ServerError` uses —
//! `#[from]` conversions at the boundaries, a distinct variant per kind
//! rather than a single opaque string.

use cc_domain::{CommandId, DomainError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CcError {
    /// Malformed frame, unexpected session state, unknown wire variant.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A file reference escaped the file base, named a missing file, or
    /// carried bad permission bits.
    #[error("path error: {0}")]
    Path(String),

    /// Port already in use, file descriptors exhausted, and similar.
    #[error("resource error: {0}")]
    Resource(String),

    /// An agent's heartbeat deadline elapsed.
    #[error("agent {0} timed out")]
    AgentTimeout(Uuid),

    /// `NewCommand` was given an id that's already in the store.
    #[error("duplicate command id {0}")]
    Duplicate(CommandId),

    #[error("unknown client {0}")]
    UnknownClient(Uuid),

    #[error("unknown command {0}")]
    UnknownCommand(CommandId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Persist(#[from] cc_persistence::PersistError),

    #[error(transparent)]
    Transfer(#[from] cc_transfer::TransferError),

    #[error(transparent)]
    Session(#[from] cc_session::SessionError),

    #[error(transparent)]
    Tunnel(#[from] cc_tunnel::TunnelError),

    #[error(transparent)]
    Ufs(#[from] cc_ufs::UfsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
