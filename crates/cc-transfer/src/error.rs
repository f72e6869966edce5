// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("`{0}` escapes the file base")]
    PathEscape(String),

    #[error("`{0}` does not name a file under the file base")]
    NotAFile(String),

    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("invalid glob pattern `{pattern}`: {source}")]
    BadGlob { pattern: String, source: globset::Error },
}
