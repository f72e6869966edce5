// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Namespace management: each namespace owns a CC server and a set of
//! member hosts, fans administrative commands out across them via
//! `MeshTransport`, and concatenates the per-host replies. The active
//! namespace for a CLI invocation is tracked with an explicit
//! `NamespaceStack`, never process-global state.

pub mod error;
pub mod mesh;
pub mod namespace;
pub mod registry;
pub mod stack;

pub use error::NamespaceError;
pub use mesh::{fan_out, stamp_replies, HostReply, LocalTransport, MeshTransport};
pub use namespace::Namespace;
pub use registry::NamespaceRegistry;
pub use stack::NamespaceStack;
