// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The remote-filesystem bridge: for each mounted guest, a local
//! ephemeral-port 9P listener whose bytes are relayed as `UfsData` frames
//! over that guest's agent session.

pub mod error;
pub mod mount;

pub use error::UfsError;
pub use mount::{listen, UfsMount};
