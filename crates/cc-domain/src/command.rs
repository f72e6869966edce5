// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Commands: immutable units of work served to agents matching a filter.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::filter::Filter;

/// A command id, unique within a server and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommandId(pub u64);

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file referenced by a send/receive payload: a name relative to the
/// configured file base, carrying the permission bits to apply on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub name: String,
    pub mode: u32,
}

impl FileSpec {
    pub fn new(name: impl Into<String>, mode: u32) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::EmptyFileName);
        }
        Ok(Self { name, mode })
    }
}

/// The unit of work a command asks an agent to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Run a shell command. `background` commands don't block the agent's
    /// evaluation loop waiting for exit; `stdin`/`stdout`/`stderr` name pipes
    /// the agent should wire the child process to instead of capturing them
    /// inline.
    Shell {
        argv: Vec<String>,
        background: bool,
        stdin: Option<String>,
        stdout: Option<String>,
        stderr: Option<String>,
    },
    /// Send these files (already glob-expanded) to the agent.
    FileSend(Vec<FileSpec>),
    /// Ask the agent to send these (guest-relative) paths back.
    FileReceive(Vec<String>),
    /// Send a signal to a PID inside the guest.
    Signal { pid: u32, signal: u32 },
    /// Kill every process matching this name inside the guest.
    KillProcess { name: String },
    /// Change the agent's own log verbosity.
    LogLevel(LogLevel),
}

/// Agent-side log verbosity, settable via the `log` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Payload {
    /// Construction-time validation: a shell payload must name at least one
    /// argv element, matching the path-confinement style checks the rest of
    /// the repository performs at trust boundaries.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Payload::Shell { argv, .. } if argv.is_empty() => Err(DomainError::EmptyShellCommand),
            _ => Ok(()),
        }
    }
}

/// An immutable work record. `CheckedIn` is tracked separately by the
/// command store (see `cc-server`), not on this value, because it is the
/// one field the invariants allow to grow after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub prefix: Option<String>,
    pub filter: Filter,
    pub payload: Payload,
}

impl Command {
    pub fn new(
        id: CommandId,
        prefix: Option<String>,
        filter: Filter,
        payload: Payload,
    ) -> Result<Self, DomainError> {
        payload.validate()?;
        Ok(Self { id, prefix, filter, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_shell_argv() {
        let err = Command::new(
            CommandId(1),
            None,
            Filter::any(),
            Payload::Shell {
                argv: vec![],
                background: false,
                stdin: None,
                stdout: None,
                stderr: None,
            },
        )
        .unwrap_err();
        assert_eq!(err, DomainError::EmptyShellCommand);
    }

    #[test]
    fn file_spec_rejects_empty_name() {
        assert_eq!(FileSpec::new("", 0o644).unwrap_err(), DomainError::EmptyFileName);
    }
}
