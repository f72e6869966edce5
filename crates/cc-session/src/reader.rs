// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The reader actor: the session's single source of inbound frames once
//! the handshake is done. Demultiplexes everything that isn't a
//! command-response or heartbeat to the tunnel/UFS stream table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cc_proto::{read_frame, Message};
use cc_tunnel::StreamTable;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::store::SessionStore;

/// Read frames from `transport` until EOF, a framing error, or the
/// heartbeat deadline elapses; dispatch each to the store, stream table, or
/// outbound channel as appropriate. Returns once the session should move to
/// `Draining`.
#[allow(clippy::too_many_arguments)]
pub async fn run<R: AsyncRead + Unpin, S: SessionStore + ?Sized>(
    mut transport: R,
    store: Arc<S>,
    agent: Uuid,
    streams: Arc<StreamTable>,
    outbound: mpsc::Sender<Message>,
    response_recorded: Arc<Notify>,
    heartbeat_deadline: Duration,
    cancel: CancellationToken,
) {
    let mut deadline = Instant::now() + heartbeat_deadline;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep_until(deadline.into()) => {
                tracing::warn!(%agent, "heartbeat deadline exceeded, draining session");
                return;
            }
            frame = read_frame(&mut transport) => {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(error) => {
                        tracing::warn!(%agent, %error, "session reader error, draining session");
                        return;
                    }
                };

                match frame.body {
                    Message::Heartbeat => {
                        deadline = Instant::now() + heartbeat_deadline;
                        store.touch_heartbeat(agent);
                    }
                    Message::CommandResponse { command_id, stdout, .. } => {
                        match store.finalize_response(cc_domain::CommandId(command_id), agent, stdout) {
                            Ok(_) => response_recorded.notify_waiters(),
                            Err(error) => tracing::warn!(%agent, %error, "failed to finalize response"),
                        }
                    }
                    Message::FileChunk { name, offset, data, command_id: Some(command_id), .. } => {
                        if let Err(error) =
                            store.write_file_chunk(cc_domain::CommandId(command_id), agent, &name, offset, &data)
                        {
                            tracing::warn!(%agent, %error, file = %name, "failed to stage file-receive chunk");
                        }
                    }
                    Message::FileRequest { name, offset, length } => {
                        let (data, eof) = match store.read_file_chunk(&name, offset, length) {
                            Ok(data) => {
                                let eof = (data.len() as u32) < length;
                                (data, eof)
                            }
                            Err(error) => {
                                tracing::warn!(%agent, %error, file = %name, "file-send chunk request refused");
                                (Vec::new(), true)
                            }
                        };
                        let reply = Message::FileChunk { name, offset, data, eof, command_id: None };
                        if outbound.send(reply).await.is_err() {
                            return;
                        }
                    }
                    Message::TunnelData { stream, data } => {
                        streams.dispatch_data(stream, data).await;
                    }
                    Message::TunnelClose { stream } => {
                        streams.dispatch_close(stream);
                    }
                    Message::UfsData { mount, data } => {
                        streams.dispatch_data(mount, data).await;
                    }
                    other => {
                        tracing::warn!(%agent, ?other, "unexpected frame in active state, ignoring");
                    }
                }
            }
        }
    }
}
