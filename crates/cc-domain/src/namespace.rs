// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Namespace identity. Namespace *management* (server ownership, host
//! membership, mount tables, the active-namespace stack) lives in
//! `cc-namespace`; this is just the value type used to key persistence
//! paths and tag log events.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A namespace name. Always non-empty; `"default"` is reserved for the
/// namespace that exists without operator action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespaceId(String);

impl NamespaceId {
    pub const DEFAULT: &'static str = "default";

    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::EmptyNamespace);
        }
        Ok(Self(name))
    }

    pub fn default_namespace() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for NamespaceId {
    fn default() -> Self {
        Self::default_namespace()
    }
}
