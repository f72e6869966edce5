// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Reverse tunnels: one listener on the server, its accepted connections
//! spread round-robin across every agent session matched by the filter at
//! the time `Reverse` was issued.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::relay::{spawn_stream, SessionTunnelHandle};

/// The set of agent sessions a reverse tunnel may hand connections to,
/// resolved once from the filter when the tunnel is created (matching the
/// snapshot-at-dispatch-time evaluation the command dispatcher uses —
/// membership changes after creation don't retroactively affect an
/// already-open listener).
pub struct ReverseTargets {
    handles: Vec<SessionTunnelHandle>,
    next: AtomicUsize,
}

impl ReverseTargets {
    pub fn new(handles: Vec<SessionTunnelHandle>) -> Self {
        Self { handles, next: AtomicUsize::new(0) }
    }

    fn pick(&self) -> Option<SessionTunnelHandle> {
        if self.handles.is_empty() {
            return None;
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.handles.len();
        Some(self.handles[i].clone())
    }
}

pub async fn run_reverse_listener(
    targets: ReverseTargets,
    listener: TcpListener,
    host: String,
    port: u16,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(local_addr = ?listener.local_addr().ok(), "reverse listener cancelled");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        let Some(handle) = targets.pick() else {
                            tracing::warn!(%peer, "reverse tunnel connection dropped: no matched agent");
                            drop(socket);
                            continue;
                        };
                        tracing::debug!(%peer, "reverse tunnel connection accepted");
                        spawn_stream(handle, socket, false, host.clone(), port);
                    }
                    Err(error) => {
                        tracing::warn!(%error, "reverse listener accept failed");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robins_across_targets() {
        let (tx1, _rx1) = tokio::sync::mpsc::channel(1);
        let (tx2, _rx2) = tokio::sync::mpsc::channel(1);
        let targets = ReverseTargets::new(vec![
            SessionTunnelHandle { streams: Default::default(), outbound: tx1 },
            SessionTunnelHandle { streams: Default::default(), outbound: tx2 },
        ]);

        let first = targets.pick().unwrap();
        let second = targets.pick().unwrap();
        let third = targets.pick().unwrap();
        assert!(!first.outbound.same_channel(&second.outbound));
        assert!(first.outbound.same_channel(&third.outbound));
    }

    #[test]
    fn empty_targets_never_picks() {
        let targets = ReverseTargets::new(vec![]);
        assert!(targets.pick().is_none());
    }
}
