// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! A session-scoped registry of open tunnel streams, in the same
//! buffer-and-registry shape `ah-rest-server::task_socket::TaskSocketHub`
//! uses for its PTY fan-out, specialized here to one bounded pipe per
//! point-to-point stream rather than a broadcast per session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use cc_proto::StreamId;
use tokio::sync::mpsc;

/// Bounds how many unconsumed chunks may queue for one stream before the
/// sender (the session's reader task) is made to wait, so one slow
/// destination can't grow memory without bound.
pub const STREAM_BUFFER: usize = 64;

#[derive(Default)]
pub struct StreamTable {
    next_id: AtomicU64,
    streams: Mutex<HashMap<StreamId, mpsc::Sender<Vec<u8>>>>,
}

impl StreamTable {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), streams: Mutex::new(HashMap::new()) }
    }

    /// Allocate a fresh stream id, unique within this session's lifetime.
    pub fn allocate(&self) -> StreamId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register(&self, id: StreamId, sender: mpsc::Sender<Vec<u8>>) {
        self.streams.lock().unwrap().insert(id, sender);
    }

    pub fn remove(&self, id: StreamId) {
        self.streams.lock().unwrap().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Demultiplex one `TunnelData` frame to the relay task waiting on
    /// stream `id`. Returns `false` if no such stream is registered (the
    /// frame is simply dropped — the stream already closed on this side).
    pub async fn dispatch_data(&self, id: StreamId, data: Vec<u8>) -> bool {
        let sender = { self.streams.lock().unwrap().get(&id).cloned() };
        match sender {
            Some(sender) => sender.send(data).await.is_ok(),
            None => false,
        }
    }

    /// A peer-initiated `TunnelClose`: drop the sender half so the relay
    /// task reading from the paired receiver observes end-of-stream and
    /// tears down the local socket.
    pub fn dispatch_close(&self, id: StreamId) {
        self.remove(id);
    }
}
