// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The on-disk response tree, `<base>/responses/<namespace>/<id>/<uuid>/…`,
//! mirrored by a RAM index of known `(namespace, id) -> {uuid}` pairs so
//! `GetResponse`/`GetResponses` don't need to scan the tree on every call.
//!
//! Writes go through a staging area first: chunks accumulate under
//! `<base>/.staging/<namespace>/<id>/<uuid>/` and only become visible (moved
//! into the final directory, indexed) once `finalize` is called, so a
//! response is never observable half-written (§5 ordering guarantee 3).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use cc_domain::{CommandId, NamespaceId, ResponseRecord};
use uuid::Uuid;

use crate::error::PersistError;

fn io_err(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io { path: path.to_path_buf(), source }
}

/// In-flight accumulation state for one `(namespace, id, uuid)` response,
/// not yet finalized.
pub struct PendingResponse<'a> {
    store: &'a ResponseStore,
    namespace: NamespaceId,
    id: CommandId,
    agent: Uuid,
}

impl PendingResponse<'_> {
    fn staging_dir(&self) -> PathBuf {
        self.store.staging_dir(&self.namespace, self.id, self.agent)
    }

    /// Append (or overwrite, for retransmitted chunks) `data` at `offset` of
    /// `filename` within the staging directory.
    pub fn write_file_chunk(&self, filename: &str, offset: u64, data: &[u8]) -> Result<(), PersistError> {
        use std::io::{Seek, SeekFrom, Write};

        let dir = self.staging_dir();
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let path = dir.join(filename);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        file.seek(SeekFrom::Start(offset)).map_err(|e| io_err(&path, e))?;
        file.write_all(data).map_err(|e| io_err(&path, e))?;
        Ok(())
    }

    /// Move the staged files into the final response directory alongside
    /// `stdout`, then index it. Returns `false` without touching disk again
    /// if this `(id, uuid)` pair was already finalized — the at-most-once
    /// collapse the duplicate-response property test exercises.
    pub fn finalize(self, stdout: &[u8]) -> Result<bool, PersistError> {
        self.store.finalize(&self.namespace, self.id, self.agent, stdout, &self.staging_dir())
    }
}

pub struct ResponseStore {
    root: PathBuf,
    index: RwLock<HashMap<(NamespaceId, CommandId), HashSet<Uuid>>>,
}

impl ResponseStore {
    /// Open (creating if absent) the response tree rooted at `root`,
    /// rebuilding the RAM index by scanning disk — directory scans tolerate
    /// concurrent file creation, so this is safe to call while other writers
    /// are active elsewhere in the tree.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        let mut index = HashMap::new();

        if let Ok(namespaces) = fs::read_dir(&root) {
            for ns_entry in namespaces.flatten() {
                if ns_entry.file_name() == ".staging" || !ns_entry.path().is_dir() {
                    continue;
                }
                let Ok(ns) = NamespaceId::new(ns_entry.file_name().to_string_lossy().to_string())
                else {
                    continue;
                };
                let Ok(ids) = fs::read_dir(ns_entry.path()) else { continue };
                for id_entry in ids.flatten() {
                    if !id_entry.path().is_dir() {
                        continue;
                    }
                    let Ok(id) = id_entry.file_name().to_string_lossy().parse::<u64>() else {
                        continue;
                    };
                    let Ok(uuids) = fs::read_dir(id_entry.path()) else { continue };
                    let mut set = HashSet::new();
                    for uuid_entry in uuids.flatten() {
                        if let Ok(uuid) = uuid_entry.file_name().to_string_lossy().parse::<Uuid>() {
                            set.insert(uuid);
                        }
                    }
                    index.insert((ns.clone(), CommandId(id)), set);
                }
            }
        }

        Ok(Self { root, index: RwLock::new(index) })
    }

    fn final_dir(&self, ns: &NamespaceId, id: CommandId, agent: Uuid) -> PathBuf {
        self.root.join(ns.as_str()).join(id.0.to_string()).join(agent.to_string())
    }

    fn staging_dir(&self, ns: &NamespaceId, id: CommandId, agent: Uuid) -> PathBuf {
        self.root.join(".staging").join(ns.as_str()).join(id.0.to_string()).join(agent.to_string())
    }

    /// Begin accumulating a response for `(id, agent)`. The caller should
    /// call this once per command delivery; calling it again for an
    /// already-finalized pair is harmless (the staging writes are simply
    /// discarded without effect once `finalize` observes the pair is
    /// already checked in).
    pub fn begin(&self, namespace: NamespaceId, id: CommandId, agent: Uuid) -> PendingResponse<'_> {
        PendingResponse { store: self, namespace, id, agent }
    }

    /// Record a response with no file payload in one step — the common case
    /// for shell-exec commands that only produce textual output.
    pub fn record(
        &self,
        namespace: &NamespaceId,
        id: CommandId,
        agent: Uuid,
        stdout: &[u8],
    ) -> Result<bool, PersistError> {
        let staging = self.staging_dir(namespace, id, agent);
        self.finalize(namespace, id, agent, stdout, &staging)
    }

    fn finalize(
        &self,
        namespace: &NamespaceId,
        id: CommandId,
        agent: Uuid,
        stdout: &[u8],
        staging_dir: &Path,
    ) -> Result<bool, PersistError> {
        {
            let index = self.index.read().unwrap();
            if index.get(&(namespace.clone(), id)).map(|s| s.contains(&agent)).unwrap_or(false) {
                // Duplicate response frame: keep the first, discard this one.
                let _ = fs::remove_dir_all(staging_dir);
                return Ok(false);
            }
        }

        let final_dir = self.final_dir(namespace, id, agent);
        fs::create_dir_all(&final_dir).map_err(|e| io_err(&final_dir, e))?;

        if staging_dir.is_dir() {
            for entry in fs::read_dir(staging_dir).map_err(|e| io_err(staging_dir, e))?.flatten() {
                let dest = final_dir.join(entry.file_name());
                fs::rename(entry.path(), &dest).map_err(|e| io_err(&dest, e))?;
            }
            let _ = fs::remove_dir_all(staging_dir);
        }

        let stdout_path = final_dir.join("stdout");
        fs::write(&stdout_path, stdout).map_err(|e| io_err(&stdout_path, e))?;

        let mut index = self.index.write().unwrap();
        index.entry((namespace.clone(), id)).or_default().insert(agent);
        Ok(true)
    }

    fn received_files(&self, dir: &Path) -> Vec<String> {
        let mut files = Vec::new();
        fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
            let Ok(entries) = fs::read_dir(dir) else { return };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(base, &path, out);
                } else if path.file_name().map(|n| n != "stdout").unwrap_or(true) {
                    if let Ok(rel) = path.strip_prefix(base) {
                        out.push(rel.to_string_lossy().to_string());
                    }
                }
            }
        }
        walk(dir, dir, &mut files);
        files.sort();
        files
    }

    /// Read back one response, if it has been fully recorded.
    pub fn get(
        &self,
        namespace: &NamespaceId,
        id: CommandId,
        agent: Uuid,
    ) -> Result<Option<ResponseRecord>, PersistError> {
        let known = {
            let index = self.index.read().unwrap();
            index.get(&(namespace.clone(), id)).map(|s| s.contains(&agent)).unwrap_or(false)
        };
        if !known {
            return Ok(None);
        }

        let dir = self.final_dir(namespace, id, agent);
        let stdout_path = dir.join("stdout");
        let stdout = fs::read(&stdout_path).map_err(|e| io_err(&stdout_path, e))?;
        let received_files = self.received_files(&dir);
        Ok(Some(ResponseRecord { command_id: id, agent, stdout, received_files }))
    }

    /// All responses recorded for `id`, across every agent, sorted by
    /// agent UUID for deterministic output.
    pub fn get_all(&self, namespace: &NamespaceId, id: CommandId) -> Result<Vec<ResponseRecord>, PersistError> {
        let agents: Vec<Uuid> = {
            let index = self.index.read().unwrap();
            index.get(&(namespace.clone(), id)).map(|s| s.iter().copied().collect()).unwrap_or_default()
        };
        let mut agents = agents;
        agents.sort();

        let mut out = Vec::with_capacity(agents.len());
        for agent in agents {
            if let Some(record) = self.get(namespace, id, agent)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Delete every response recorded for `id`, removing both the RAM index
    /// entry and the on-disk directory — `absent-from-store` must imply
    /// `absent-from-disk`.
    pub fn delete(&self, namespace: &NamespaceId, id: CommandId) -> Result<(), PersistError> {
        {
            let mut index = self.index.write().unwrap();
            index.remove(&(namespace.clone(), id));
        }
        let dir = self.root.join(namespace.as_str()).join(id.0.to_string());
        if dir.is_dir() {
            fs::remove_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        Ok(())
    }

    /// Delete the responses for every id in `ids` (used to back
    /// `DeleteResponses(prefix)` once the caller has resolved which command
    /// ids carry that prefix).
    pub fn delete_many(&self, namespace: &NamespaceId, ids: &[CommandId]) -> Result<(), PersistError> {
        for id in ids {
            self.delete(namespace, *id)?;
        }
        Ok(())
    }

    /// Every command id with at least one recorded response in `namespace`,
    /// ascending — backs `GetResponses` scanning across the whole tree.
    pub fn ids(&self, namespace: &NamespaceId) -> Vec<CommandId> {
        let index = self.index.read().unwrap();
        let mut ids: Vec<CommandId> =
            index.keys().filter(|(ns, _)| ns == namespace).map(|(_, id)| *id).collect();
        ids.sort();
        ids
    }

    /// Clear every response in the namespace.
    pub fn clear(&self, namespace: &NamespaceId) -> Result<(), PersistError> {
        let ids: Vec<CommandId> = {
            let index = self.index.read().unwrap();
            index.keys().filter(|(ns, _)| ns == namespace).map(|(_, id)| *id).collect()
        };
        self.delete_many(namespace, &ids)
    }

    /// Whether `agent` has already checked in for `id` (used by the session
    /// to decide whether redelivering a command is necessary after a
    /// reconnect, mirroring the `CheckedIn` set the command store keeps in
    /// memory).
    pub fn is_recorded(&self, namespace: &NamespaceId, id: CommandId, agent: Uuid) -> bool {
        self.index.read().unwrap().get(&(namespace.clone(), id)).map(|s| s.contains(&agent)).unwrap_or(false)
    }

    /// Every agent that has checked in a response for `id`, sorted for
    /// deterministic output. Backs the `CheckedIn` set a command carries
    /// conceptually, even though it isn't stored on the `Command` value
    /// itself.
    pub fn checked_in(&self, namespace: &NamespaceId, id: CommandId) -> Vec<Uuid> {
        let mut agents: Vec<Uuid> = self
            .index
            .read()
            .unwrap()
            .get(&(namespace.clone(), id))
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        agents.sort();
        agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> NamespaceId {
        NamespaceId::default_namespace()
    }

    #[test]
    fn records_and_reads_back_a_response() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::open(dir.path()).unwrap();
        let agent = Uuid::new_v4();

        assert!(store.record(&ns(), CommandId(1), agent, b"hello\n").unwrap());
        let record = store.get(&ns(), CommandId(1), agent).unwrap().unwrap();
        assert_eq!(record.stdout, b"hello\n");
    }

    #[test]
    fn duplicate_response_is_collapsed_to_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::open(dir.path()).unwrap();
        let agent = Uuid::new_v4();

        assert!(store.record(&ns(), CommandId(1), agent, b"first").unwrap());
        assert!(!store.record(&ns(), CommandId(1), agent, b"second").unwrap());

        let record = store.get(&ns(), CommandId(1), agent).unwrap().unwrap();
        assert_eq!(record.stdout, b"first");
    }

    #[test]
    fn file_chunks_assemble_before_becoming_visible() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::open(dir.path()).unwrap();
        let agent = Uuid::new_v4();
        let id = CommandId(2);

        let pending = store.begin(ns(), id, agent);
        pending.write_file_chunk("foo.bin", 0, b"0123").unwrap();
        pending.write_file_chunk("foo.bin", 4, b"4567").unwrap();

        // Not yet visible: finalize hasn't run.
        assert!(store.get(&ns(), id, agent).unwrap().is_none());

        pending.finalize(b"done\n").unwrap();
        let record = store.get(&ns(), id, agent).unwrap().unwrap();
        assert_eq!(record.stdout, b"done\n");
        assert_eq!(record.received_files, vec!["foo.bin".to_string()]);

        let bytes = fs::read(dir.path().join("default").join("2").join(agent.to_string()).join("foo.bin")).unwrap();
        assert_eq!(bytes, b"01234567");
    }

    #[test]
    fn delete_removes_ram_index_and_disk_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::open(dir.path()).unwrap();
        let agent = Uuid::new_v4();
        store.record(&ns(), CommandId(3), agent, b"x").unwrap();

        store.delete(&ns(), CommandId(3)).unwrap();
        assert!(store.get(&ns(), CommandId(3), agent).unwrap().is_none());
        assert!(!dir.path().join("default").join("3").exists());

        // Idempotent: deleting again is a no-op, not an error.
        store.delete(&ns(), CommandId(3)).unwrap();
    }

    #[test]
    fn reopening_rebuilds_the_index_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let agent = Uuid::new_v4();
        {
            let store = ResponseStore::open(dir.path()).unwrap();
            store.record(&ns(), CommandId(5), agent, b"x").unwrap();
        }

        let reopened = ResponseStore::open(dir.path()).unwrap();
        assert!(reopened.is_recorded(&ns(), CommandId(5), agent));
    }

    #[test]
    fn checked_in_lists_every_agent_that_recorded_a_response() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::open(dir.path()).unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(store.checked_in(&ns(), CommandId(7)).is_empty());

        store.record(&ns(), CommandId(7), a, b"a").unwrap();
        store.record(&ns(), CommandId(7), b, b"b").unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.checked_in(&ns(), CommandId(7)), expected);
    }
}
