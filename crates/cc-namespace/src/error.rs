// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("no namespace is active")]
    NoActiveNamespace,

    #[error("namespace {0:?} has no member hosts")]
    NoMemberHosts(cc_domain::NamespaceId),

    #[error("host {host} did not respond: {reason}")]
    HostUnreachable { host: String, reason: String },
}
