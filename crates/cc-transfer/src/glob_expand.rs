// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Glob expansion of file-send patterns against the file base, performed at
//! command-construction time so the resulting `Command` carries a closed
//! list of concrete names rather than re-resolving patterns on every chunk
//! request.

use std::path::Path;

use globset::GlobBuilder;

use crate::error::TransferError;
use crate::file_base::FileBase;

fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk(base, &path, out);
        } else if let Ok(rel) = path.strip_prefix(base) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Expand `pattern` (a glob relative to `base`'s root) into the sorted list
/// of matching, currently-existing relative file names. A pattern with no
/// glob metacharacters that names an existing file is returned as-is without
/// walking the tree.
pub fn expand(base: &FileBase, pattern: &str) -> Result<Vec<String>, TransferError> {
    if !pattern.contains(['*', '?', '[']) {
        return if base.resolve(pattern).is_ok() { Ok(vec![pattern.to_string()]) } else { Ok(vec![]) };
    }

    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| TransferError::BadGlob { pattern: pattern.to_string(), source })?
        .compile_matcher();

    let mut all = Vec::new();
    walk(base.root(), base.root(), &mut all);

    let mut matched: Vec<String> = all.into_iter().filter(|name| glob.is_match(name)).collect();
    matched.sort();
    Ok(matched)
}

/// Expand every pattern in `patterns`, concatenating and deduplicating the
/// results while preserving sorted order.
pub fn expand_all(base: &FileBase, patterns: &[String]) -> Result<Vec<String>, TransferError> {
    let mut names = std::collections::BTreeSet::new();
    for pattern in patterns {
        for name in expand(base, pattern)? {
            names.insert(name);
        }
    }
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn expands_a_wildcard_against_the_file_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), b"").unwrap();
        fs::write(dir.path().join("b.log"), b"").unwrap();
        fs::write(dir.path().join("c.txt"), b"").unwrap();
        let base = FileBase::new(dir.path()).unwrap();

        let names = expand(&base, "*.log").unwrap();
        assert_eq!(names, vec!["a.log".to_string(), "b.log".to_string()]);
    }

    #[test]
    fn literal_pattern_with_no_wildcard_passes_through_if_present() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("only.bin"), b"").unwrap();
        let base = FileBase::new(dir.path()).unwrap();

        assert_eq!(expand(&base, "only.bin").unwrap(), vec!["only.bin".to_string()]);
        assert!(expand(&base, "missing.bin").unwrap().is_empty());
    }

    #[test]
    fn expand_all_deduplicates_across_overlapping_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), b"").unwrap();
        let base = FileBase::new(dir.path()).unwrap();

        let names = expand_all(&base, &["*.log".to_string(), "a.log".to_string()]).unwrap();
        assert_eq!(names, vec!["a.log".to_string()]);
    }
}
