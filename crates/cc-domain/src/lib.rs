// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Domain types for the CC core: agents, commands, filters, responses, and
//! namespaces. This crate has no I/O — it only defines the shapes that
//! `cc-server`, `cc-session`, `cc-matcher`, and `cc-persistence` operate on.

pub mod agent;
pub mod command;
pub mod error;
pub mod filter;
pub mod namespace;
pub mod response;

pub use agent::{Agent, ProcessInfo};
pub use command::{Command, CommandId, FileSpec, LogLevel, Payload};
pub use error::DomainError;
pub use filter::{Filter, IpFilter};
pub use namespace::NamespaceId;
pub use response::ResponseRecord;
