// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The library surface an external CLI front end calls 1:1: parse operator
//! text into a `Verb`, call `dispatch`, render the `Outcome`. The actual
//! text parser stays outside this crate.

pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod verb;

pub use dispatch::dispatch;
pub use error::CliError;
pub use outcome::Outcome;
pub use verb::{ClearTarget, DeleteTarget, MountAction, ProcessAction, ShellPipes, Verb};
