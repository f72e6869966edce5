// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Durable storage for command responses: a directory tree on disk plus a
//! RAM index of what's recorded, so lookups don't need to stat the tree on
//! every call. See `response_store` for the staging/finalize write path that
//! keeps a response invisible until it's completely written.

pub mod error;
pub mod response_store;

pub use error::PersistError;
pub use response_store::{PendingResponse, ResponseStore};
