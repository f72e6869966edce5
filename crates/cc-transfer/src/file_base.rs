// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The file base: a single directory the CC server reads file-send payloads
//! from. Every resolved path must be a prefix-descendant of it, the same
//! containment check `agentfs-proto::validation` applies to decoded wire
//! requests, generalized here from a version-byte check to a path check.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use crate::error::TransferError;

fn io_err(path: &Path, source: std::io::Error) -> TransferError {
    TransferError::Io { path: path.to_path_buf(), source }
}

pub struct FileBase {
    root: PathBuf,
}

impl FileBase {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, TransferError> {
        let root = root.into();
        let root = root.canonicalize().map_err(|e| io_err(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `name` to an absolute path inside the file base, rejecting
    /// absolute paths, `..` components, and symlinks that escape the root
    /// once canonicalized.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, TransferError> {
        let candidate = Path::new(name);
        if candidate.is_absolute() || candidate.components().any(|c| c == Component::ParentDir) {
            return Err(TransferError::PathEscape(name.to_string()));
        }

        let joined = self.root.join(candidate);
        let canonical = joined.canonicalize().map_err(|_| TransferError::PathEscape(name.to_string()))?;
        if !canonical.starts_with(&self.root) {
            return Err(TransferError::PathEscape(name.to_string()));
        }
        if !canonical.is_file() {
            return Err(TransferError::NotAFile(name.to_string()));
        }
        Ok(canonical)
    }

    /// Read `length` bytes starting at `offset` of `name`, refusing the
    /// request outright (rather than returning a short read) if the path
    /// escapes the base.
    pub fn read_chunk(&self, name: &str, offset: u64, length: u64) -> Result<Vec<u8>, TransferError> {
        let path = self.resolve(name)?;
        let mut file = File::open(&path).map_err(|e| io_err(&path, e))?;
        file.seek(SeekFrom::Start(offset)).map_err(|e| io_err(&path, e))?;

        let mut buf = vec![0u8; length as usize];
        let mut total = 0;
        while total < buf.len() {
            let n = file.read(&mut buf[total..]).map_err(|e| io_err(&path, e))?;
            if n == 0 {
                break;
            }
            total += n;
        }
        buf.truncate(total);
        Ok(buf)
    }

    /// The permission bits of `name`, advertised alongside the file name
    /// when a command is constructed.
    #[cfg(unix)]
    pub fn mode(&self, name: &str) -> Result<u32, TransferError> {
        use std::os::unix::fs::PermissionsExt;
        let path = self.resolve(name)?;
        let meta = std::fs::metadata(&path).map_err(|e| io_err(&path, e))?;
        Ok(meta.permissions().mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_a_chunk_from_the_middle_of_a_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("payload.bin"), b"0123456789").unwrap();
        let base = FileBase::new(dir.path()).unwrap();

        let chunk = base.read_chunk("payload.bin", 3, 4).unwrap();
        assert_eq!(chunk, b"3456");
    }

    #[test]
    fn rejects_parent_dir_escape() {
        let dir = tempfile::tempdir().unwrap();
        let base = FileBase::new(dir.path()).unwrap();
        let err = base.resolve("../etc/passwd").unwrap_err();
        assert!(matches!(err, TransferError::PathEscape(_)));
    }

    #[test]
    fn rejects_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let base = FileBase::new(dir.path()).unwrap();
        let err = base.resolve("/etc/passwd").unwrap_err();
        assert!(matches!(err, TransferError::PathEscape(_)));
    }

    #[test]
    fn rejects_symlink_escaping_the_base() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret"), b"nope").unwrap();

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(outside.path().join("secret"), dir.path().join("link")).unwrap();
            let base = FileBase::new(dir.path()).unwrap();
            let err = base.resolve("link").unwrap_err();
            assert!(matches!(err, TransferError::PathEscape(_)));
        }
    }

    #[test]
    fn rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        let base = FileBase::new(dir.path()).unwrap();
        let err = base.resolve("subdir").unwrap_err();
        assert!(matches!(err, TransferError::NotAFile(_)));
    }
}
