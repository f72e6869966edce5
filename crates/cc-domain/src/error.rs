// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Validation errors raised when constructing domain values from untrusted
//! (CLI or wire) input.

use thiserror::Error;

/// Errors raised while constructing or validating a domain value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("empty shell command")]
    EmptyShellCommand,

    #[error("file spec name must not be empty")]
    EmptyFileName,

    #[error("file spec name `{0}` escapes the file base")]
    UnsafeFileName(String),

    #[error("invalid IPv4 prefix `{0}`")]
    InvalidIpv4Prefix(String),

    #[error("invalid MAC address `{0}`")]
    InvalidMac(String),

    #[error("namespace name must not be empty")]
    EmptyNamespace,
}
