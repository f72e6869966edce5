// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Ties the reader, writer, and evaluator actors together around one
//! accepted connection, from `ClientAnnounce` through to teardown.

use std::sync::Arc;
use std::time::Duration;

use cc_proto::{read_frame, Message};
use cc_tunnel::{SessionTunnelHandle, StreamTable};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SessionError;
use crate::evaluator::Cursor;
use crate::state::{SessionState, SessionStateCell};
use crate::store::{AgentAnnounce, SessionStore};
use crate::{evaluator, reader, writer};

/// How many outbound frames (command dispatch, file chunks, tunnel/UFS
/// data) may queue before a slow writer applies backpressure to every
/// producer sharing this session.
pub const OUTBOUND_BUFFER: usize = 256;

/// Everything a caller needs to reach into a running session from the
/// outside: its announced uuid, its tunnel/UFS handle (for wiring
/// `Forward`/`Reverse`/`ListenUFS`), and a token to request teardown.
pub struct SessionHandle {
    pub uuid: Uuid,
    pub tunnel: SessionTunnelHandle,
    pub state: Arc<SessionStateCell>,
    pub cursor: Arc<Cursor>,
    pub shutdown: CancellationToken,
}

/// Run one session end to end: perform the handshake, then drive the
/// reader/writer/evaluator actors until the transport closes, errors, the
/// heartbeat deadline elapses, or `shutdown` fires. Returns once every actor
/// has stopped.
pub async fn run_session<T, S>(
    transport: T,
    store: Arc<S>,
    new_command: Arc<Notify>,
    heartbeat_deadline: Duration,
    handshake_timeout: Duration,
    shutdown: CancellationToken,
    on_handshake: impl FnOnce(SessionHandle) + Send,
) -> Result<Uuid, SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: SessionStore + 'static,
{
    let state = Arc::new(SessionStateCell::new(SessionState::Handshake));
    let (mut read_half, write_half) = tokio::io::split(transport);

    let announce = tokio::time::timeout(handshake_timeout, read_frame(&mut read_half))
        .await
        .map_err(|_| SessionError::Handshake("timed out waiting for ClientAnnounce".into()))??;

    let (uuid, hostname, os, arch, ipv4, ipv6, macs) = match announce.body {
        Message::ClientAnnounce { uuid, hostname, os, arch, ipv4, ipv6, macs } => {
            (uuid, hostname, os, arch, ipv4, ipv6, macs)
        }
        other => {
            return Err(SessionError::Handshake(format!("expected ClientAnnounce, got {other:?}")));
        }
    };

    store.register_agent(AgentAnnounce { uuid, hostname, os, arch, ipv4, ipv6, macs })?;
    state.set(SessionState::Active);

    let (outbound_tx, outbound_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
    let streams = Arc::new(StreamTable::new());
    let tunnel = SessionTunnelHandle { streams: streams.clone(), outbound: outbound_tx.clone() };
    let cursor = Arc::new(Cursor::default());
    let response_recorded = Arc::new(Notify::new());

    on_handshake(SessionHandle {
        uuid,
        tunnel: tunnel.clone(),
        state: state.clone(),
        cursor: cursor.clone(),
        shutdown: shutdown.clone(),
    });

    let writer_task = tokio::spawn(writer::run(write_half, outbound_rx));

    let evaluator_task = tokio::spawn(evaluator::run(
        store.clone(),
        uuid,
        outbound_tx.clone(),
        cursor,
        new_command,
        response_recorded.clone(),
        shutdown.clone(),
    ));

    reader::run(
        read_half,
        store,
        uuid,
        streams,
        outbound_tx.clone(),
        response_recorded,
        heartbeat_deadline,
        shutdown.clone(),
    )
    .await;

    state.set(SessionState::Draining);
    shutdown.cancel();
    drop(outbound_tx);
    let _ = evaluator_task.await;
    let _ = writer_task.await;
    state.set(SessionState::Closed);

    Ok(uuid)
}
