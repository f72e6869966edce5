// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The command store: a mutex-guarded ordered map, matching §5's "readers
//! may snapshot under a read lock" contract. Ordered by id so
//! `commands_from` is a cheap range scan rather than a full-table filter.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use cc_domain::{Command, CommandId};

use crate::error::CcError;

#[derive(Default)]
pub struct CommandStore {
    next_id: AtomicU64,
    commands: RwLock<BTreeMap<CommandId, Command>>,
}

impl CommandStore {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), commands: RwLock::new(BTreeMap::new()) }
    }

    /// Assign the next id, store `build(id)`'s result, and return the id.
    /// `build` stamps the id onto the command it constructs.
    pub fn insert_next(&self, build: impl FnOnce(CommandId) -> Result<Command, CcError>) -> Result<CommandId, CcError> {
        let id = CommandId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let command = build(id)?;
        self.commands.write().unwrap().insert(id, command);
        Ok(id)
    }

    pub fn get(&self, id: CommandId) -> Option<Command> {
        self.commands.read().unwrap().get(&id).cloned()
    }

    pub fn get_all(&self) -> Vec<Command> {
        self.commands.read().unwrap().values().cloned().collect()
    }

    pub fn from(&self, start: CommandId) -> Vec<Command> {
        self.commands.read().unwrap().range(start..).map(|(_, c)| c.clone()).collect()
    }

    /// Remove `id`. Does not touch any already-collected responses — the
    /// response store is a separate, independently cleared tree.
    pub fn delete(&self, id: CommandId) {
        self.commands.write().unwrap().remove(&id);
    }

    /// Every id whose `Command::prefix` equals `prefix` — the authoritative
    /// resolution path (scanning on-disk response directory ids by prefix
    /// is the legacy path this implementation does not carry forward).
    pub fn ids_with_prefix(&self, prefix: &str) -> Vec<CommandId> {
        self.commands
            .read()
            .unwrap()
            .values()
            .filter(|c| c.prefix.as_deref() == Some(prefix))
            .map(|c| c.id)
            .collect()
    }

    pub fn delete_prefix(&self, prefix: &str) -> Vec<CommandId> {
        let ids = self.ids_with_prefix(prefix);
        let mut commands = self.commands.write().unwrap();
        for id in &ids {
            commands.remove(id);
        }
        ids
    }

    pub fn clear(&self) {
        self.commands.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_domain::{Filter, Payload};

    fn shell(argv: &[&str]) -> Payload {
        Payload::Shell {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            background: false,
            stdin: None,
            stdout: None,
            stderr: None,
        }
    }

    #[test]
    fn ids_are_assigned_monotonically() {
        let store = CommandStore::new();
        let a = store.insert_next(|id| Command::new(id, None, Filter::any(), shell(&["a"])).map_err(Into::into)).unwrap();
        let b = store.insert_next(|id| Command::new(id, None, Filter::any(), shell(&["b"])).map_err(Into::into)).unwrap();
        assert!(b.0 > a.0);
    }

    #[test]
    fn from_returns_ascending_ids_at_or_after_cursor() {
        let store = CommandStore::new();
        for i in 0..5 {
            store
                .insert_next(|id| Command::new(id, None, Filter::any(), shell(&[&i.to_string()])).map_err(Into::into))
                .unwrap();
        }
        let ids: Vec<u64> = store.from(CommandId(3)).iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn delete_prefix_removes_only_matching_commands() {
        let store = CommandStore::new();
        store
            .insert_next(|id| Command::new(id, Some("batch".into()), Filter::any(), shell(&["a"])).map_err(Into::into))
            .unwrap();
        store.insert_next(|id| Command::new(id, None, Filter::any(), shell(&["b"])).map_err(Into::into)).unwrap();

        let deleted = store.delete_prefix("batch");
        assert_eq!(deleted.len(), 1);
        assert_eq!(store.get_all().len(), 1);
    }
}
