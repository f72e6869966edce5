// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Forward tunnels: one listener scoped to a single agent's session.

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::relay::{spawn_stream, SessionTunnelHandle};

/// Accept connections on `listener` for as long as `cancel` is unset,
/// spawning one relay stream on `handle`'s session per accepted connection.
/// Runs until cancelled or the listener errors; callers typically
/// `tokio::spawn` this.
pub async fn run_forward_listener(
    handle: SessionTunnelHandle,
    listener: TcpListener,
    host: String,
    port: u16,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(local_addr = ?listener.local_addr().ok(), "forward listener cancelled");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        tracing::debug!(%peer, "forward tunnel connection accepted");
                        spawn_stream(handle.clone(), socket, true, host.clone(), port);
                    }
                    Err(error) => {
                        tracing::warn!(%error, "forward listener accept failed");
                        break;
                    }
                }
            }
        }
    }
}
