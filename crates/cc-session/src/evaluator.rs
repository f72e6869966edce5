// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The command-evaluator actor: walks the command store from a
//! `next-to-consider` cursor, dispatching every command this agent matches
//! and hasn't checked in, one at a time and strictly in id order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cc_domain::CommandId;
use cc_proto::Message;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::store::SessionStore;

/// How often the evaluator re-checks `is_checked_in` while waiting out a
/// command it has dispatched, as a fallback against a missed `Notify` wake.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The session's per-command progress: the lowest command id not yet fully
/// considered. Shared so the session can report it (e.g. for diagnostics)
/// without locking.
#[derive(Default)]
pub struct Cursor(AtomicU64);

impl Cursor {
    pub fn get(&self) -> CommandId {
        CommandId(self.0.load(Ordering::Acquire))
    }

    fn advance_past(&self, id: CommandId) {
        self.0.store(id.0 + 1, Ordering::Release);
    }
}

/// Run the evaluator loop until `cancel` fires. `store` is already scoped to
/// this session's namespace; `agent` is this session's announced uuid.
pub async fn run<S: SessionStore + ?Sized>(
    store: Arc<S>,
    agent: Uuid,
    outbound: mpsc::Sender<Message>,
    cursor: Arc<Cursor>,
    new_command: Arc<Notify>,
    response_recorded: Arc<Notify>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        // Register interest before re-checking the store, not after: a
        // command inserted (and `notify_waiters()` fired) between the check
        // and the wait would otherwise be missed until the *next* signal,
        // since `Notify::notify_waiters` wakes only tasks already waiting
        // and stores no permit for latecomers.
        let woken = new_command.notified();
        let pending = store.commands_from(cursor.get());
        if pending.is_empty() {
            tokio::pin!(woken);
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = &mut woken => continue,
            }
        }

        for command in pending {
            if cancel.is_cancelled() {
                return;
            }

            let Some(agent_snapshot) = store.agent_snapshot(agent) else {
                return;
            };

            if !cc_matcher::matches(&command.filter, &agent_snapshot) {
                cursor.advance_past(command.id);
                continue;
            }

            if store.is_checked_in(command.id, agent) {
                cursor.advance_past(command.id);
                continue;
            }

            tracing::debug!(command_id = command.id.0, %agent, "dispatching command");
            if outbound.send(Message::CommandRequest { command: command.clone() }).await.is_err() {
                return;
            }

            loop {
                if store.is_checked_in(command.id, agent) {
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = response_recorded.notified() => {}
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
            }
            cursor.advance_past(command.id);
        }
    }
}
