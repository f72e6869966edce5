// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Server(#[from] cc_server::CcError),

    #[error(transparent)]
    Namespace(#[from] cc_namespace::NamespaceError),

    #[error(transparent)]
    Domain(#[from] cc_domain::DomainError),

    #[error("no such mount")]
    UnknownMount,
}
