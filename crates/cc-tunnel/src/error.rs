// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no agent available to carry a reverse tunnel connection")]
    NoAgentAvailable,

    #[error("session outbound channel closed")]
    SessionClosed,
}
