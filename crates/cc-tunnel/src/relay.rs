// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The per-stream relay: one accepted TCP connection, wired to a
//! `TunnelOpen`/`TunnelData`/`TunnelClose` exchange over an agent session.
//! Shared between forward and reverse tunnels — they differ only in where
//! the listener lives and which session carries a given connection, not in
//! how bytes are relayed once a stream exists.

use std::sync::Arc;

use cc_proto::{Message, StreamId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::stream_table::{StreamTable, STREAM_BUFFER};

/// The handle a session hands to `cc-tunnel` so it can open streams and
/// relay bytes without this crate needing to know anything about session
/// state machines, heartbeats, or framing.
#[derive(Clone)]
pub struct SessionTunnelHandle {
    pub streams: Arc<StreamTable>,
    pub outbound: mpsc::Sender<Message>,
}

/// Take ownership of `socket` as one new tunnel stream on `handle`'s
/// session, sending the initiating `TunnelOpen` and spawning the two
/// half-duplex relay tasks. Returns immediately; the relay runs to
/// completion in the background.
pub fn spawn_stream(handle: SessionTunnelHandle, socket: TcpStream, forward: bool, host: String, port: u16) {
    let stream_id = handle.streams.allocate();
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    handle.streams.register(stream_id, tx);

    tokio::spawn(async move {
        if handle.outbound.send(Message::TunnelOpen { stream: stream_id, forward, host, port }).await.is_err() {
            handle.streams.remove(stream_id);
            return;
        }

        let (read_half, write_half) = socket.into_split();
        let up = tokio::spawn(local_to_remote(read_half, stream_id, handle.outbound.clone()));
        let down = tokio::spawn(remote_to_local(write_half, rx));
        let _ = tokio::join!(up, down);

        handle.streams.remove(stream_id);
        let _ = handle.outbound.send(Message::TunnelClose { stream: stream_id }).await;
        tracing::debug!(stream = stream_id, "tunnel stream closed");
    });
}

async fn local_to_remote(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    stream_id: StreamId,
    outbound: mpsc::Sender<Message>,
) {
    let mut buf = vec![0u8; 16 * 1024];
    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if outbound.send(Message::TunnelData { stream: stream_id, data: buf[..n].to_vec() }).await.is_err() {
            break;
        }
        // Yield so one busy stream's frames don't starve siblings sharing
        // the same session's outbound channel.
        tokio::task::yield_now().await;
    }
}

async fn remote_to_local(mut write_half: tokio::net::tcp::OwnedWriteHalf, mut rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(data) = rx.recv().await {
        if write_half.write_all(&data).await.is_err() {
            break;
        }
    }
}
