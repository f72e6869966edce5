// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Forward and reverse TCP tunnel multiplexing over an agent session. Both
//! kinds of tunnel listen on the server and relay accepted connections
//! through `TunnelOpen`/`TunnelData`/`TunnelClose` frames; they differ only
//! in how many agent sessions a given listener may hand connections to —
//! exactly one (forward, chosen by uuid) or a filter-matched, round-robin
//! set (reverse).

pub mod error;
pub mod forward;
pub mod relay;
pub mod reverse;
pub mod stream_table;

pub use error::TunnelError;
pub use forward::run_forward_listener;
pub use relay::{spawn_stream, SessionTunnelHandle};
pub use reverse::{run_reverse_listener, ReverseTargets};
pub use stream_table::{StreamTable, STREAM_BUFFER};
