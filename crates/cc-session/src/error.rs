// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("framing error: {0}")]
    Framing(#[from] cc_proto::FramingError),

    #[error("handshake violation: {0}")]
    Handshake(String),

    #[error("store error: {0}")]
    Store(String),
}
