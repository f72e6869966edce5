// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The CC server for one namespace: accept loop, client registry, command
//! store, response store, and every administrative operation a CLI or a
//! namespace's mesh fan-out drives.

pub mod client_registry;
pub mod command_store;
pub mod error;
pub mod server;

pub use error::CcError;
pub use server::{CcServer, CcServerConfig, PayloadRequest};
