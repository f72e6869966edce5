// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! One mounted guest's 9P bridge: a local ephemeral-port listener whose
//! single accepted connection is relayed, byte-for-byte, as `UfsData`
//! frames over the agent session. Grounded on `agentfs-daemon`'s per-client
//! dispatch loop, generalized from its in-process `FsCore` calls to an
//! opaque relay — the 9P server the frames eventually reach lives inside
//! the guest, out of this crate's reach.

use std::net::SocketAddr;

use cc_proto::{Message, StreamId};
use cc_tunnel::{SessionTunnelHandle, STREAM_BUFFER};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::UfsError;

/// A live mount: the ephemeral port the operator's 9P client connects to,
/// and a handle to tear it down.
pub struct UfsMount {
    pub mount_id: StreamId,
    pub local_addr: SocketAddr,
    cancel: CancellationToken,
}

impl UfsMount {
    /// Signal the relay to stop. The caller (the server's mount table) must
    /// remove its own record unconditionally after calling this — per the
    /// bridge's unmount policy, a slow or failed teardown here must never
    /// leak a ghost mount entry.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

/// Bind an ephemeral local listener and start relaying its one accepted
/// connection through `handle`'s session as `UfsData` frames tagged with
/// the returned mount id.
pub async fn listen(handle: SessionTunnelHandle) -> Result<UfsMount, UfsError> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let local_addr = listener.local_addr()?;
    let mount_id = handle.streams.allocate();
    let cancel = CancellationToken::new();

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    handle.streams.register(mount_id, tx);

    tokio::spawn(run(handle, listener, mount_id, rx, cancel.clone()));

    Ok(UfsMount { mount_id, local_addr, cancel })
}

async fn run(
    handle: SessionTunnelHandle,
    listener: TcpListener,
    mount_id: StreamId,
    rx: mpsc::Receiver<Vec<u8>>,
    cancel: CancellationToken,
) {
    let socket = tokio::select! {
        _ = cancel.cancelled() => {
            handle.streams.remove(mount_id);
            return;
        }
        accepted = listener.accept() => match accepted {
            Ok((socket, peer)) => {
                tracing::debug!(mount = mount_id, %peer, "ufs client connected");
                socket
            }
            Err(error) => {
                tracing::warn!(mount = mount_id, %error, "ufs listener accept failed");
                handle.streams.remove(mount_id);
                return;
            }
        },
    };

    let (read_half, write_half) = socket.into_split();
    let outbound = handle.outbound.clone();
    let relay = async move {
        let inbound = tokio::spawn(relay_in(read_half, mount_id, outbound));
        let outbound_task = tokio::spawn(relay_out(write_half, rx));
        let _ = tokio::join!(inbound, outbound_task);
    };

    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = relay => {}
    }

    handle.streams.remove(mount_id);
    tracing::debug!(mount = mount_id, "ufs mount torn down");
}

async fn relay_in(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    mount_id: StreamId,
    outbound: mpsc::Sender<Message>,
) {
    let mut buf = vec![0u8; 16 * 1024];
    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if outbound.send(Message::UfsData { mount: mount_id, data: buf[..n].to_vec() }).await.is_err() {
            break;
        }
    }
}

async fn relay_out(mut write_half: tokio::net::tcp::OwnedWriteHalf, mut rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(data) = rx.recv().await {
        if write_half.write_all(&data).await.is_err() {
            break;
        }
    }
}
