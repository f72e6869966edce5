// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The `CcServer`: the TCP accept loop, the command/response stores, the
//! client registry, and the operations a namespace's server exposes.
//! Mirrors `ah-command-trace-server::CommandTraceServer::run`'s shape —
//! one `TcpListener`, one task per accepted connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cc_domain::{Command, CommandId, Filter, LogLevel, NamespaceId, Payload, ResponseRecord};
use cc_persistence::ResponseStore;
use cc_proto::StreamId;
use cc_session::{run_session, AgentAnnounce, SessionError, SessionStore};
use cc_transfer::FileBase;
use cc_tunnel::{run_forward_listener, run_reverse_listener, ReverseTargets};
use cc_ufs::UfsMount;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::client_registry::ClientRegistry;
use crate::command_store::CommandStore;
use crate::error::CcError;

/// A command's payload as requested by a caller, before glob expansion and
/// id assignment. Identical to `cc_domain::Payload` except `FileSend` still
/// carries the raw patterns an operator typed — `new_command` resolves them
/// against the file base before the `Command` (and its id) exist, so glob
/// expansion always happens at construction time, never after.
#[derive(Debug, Clone)]
pub enum PayloadRequest {
    Shell { argv: Vec<String>, background: bool, stdin: Option<String>, stdout: Option<String>, stderr: Option<String> },
    FileSend(Vec<String>),
    FileReceive(Vec<String>),
    Signal { pid: u32, signal: u32 },
    KillProcess { name: String },
    LogLevel(LogLevel),
}

pub struct CcServerConfig {
    pub namespace: NamespaceId,
    pub response_root: std::path::PathBuf,
    pub file_base: Option<std::path::PathBuf>,
    pub heartbeat_deadline: Duration,
    pub handshake_timeout: Duration,
    pub grace_period: Duration,
}

pub struct CcServer {
    namespace: NamespaceId,
    commands: CommandStore,
    responses: ResponseStore,
    registry: ClientRegistry,
    file_base: Option<FileBase>,
    new_command: Arc<Notify>,
    shutdown: CancellationToken,
    heartbeat_deadline: Duration,
    handshake_timeout: Duration,
    bound_port: Mutex<Option<u16>>,
    listeners: Mutex<Vec<CancellationToken>>,
    ufs_mounts: Mutex<HashMap<StreamId, UfsMount>>,
}

impl CcServer {
    pub fn new(config: CcServerConfig) -> Result<Arc<Self>, CcError> {
        let file_base = config.file_base.map(FileBase::new).transpose()?;
        Ok(Arc::new(Self {
            namespace: config.namespace,
            commands: CommandStore::new(),
            responses: ResponseStore::open(config.response_root)?,
            registry: ClientRegistry::new(config.grace_period),
            file_base,
            new_command: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
            heartbeat_deadline: config.heartbeat_deadline,
            handshake_timeout: config.handshake_timeout,
            bound_port: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            ufs_mounts: Mutex::new(HashMap::new()),
        }))
    }

    /// Bind the accept loop to `port`. Idempotent: calling again with the
    /// same port is a no-op success; a different port while already bound
    /// is a resource error (one CC server owns exactly one listener).
    pub async fn listen(self: &Arc<Self>, port: u16) -> Result<(), CcError> {
        {
            let bound = self.bound_port.lock().unwrap();
            if let Some(existing) = *bound {
                if existing == port {
                    return Ok(());
                }
                return Err(CcError::Resource(format!("already listening on port {existing}")));
            }
        }

        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| CcError::Resource(format!("bind {port}: {e}")))?;
        *self.bound_port.lock().unwrap() = Some(port);
        tracing::info!(port, "cc server listening");

        let server = self.clone();
        tokio::spawn(async move { server.accept_loop(listener).await });
        Ok(())
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("accept loop shutting down");
                    return;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            tracing::debug!(%peer, "agent connection accepted");
                            let server = self.clone();
                            tokio::spawn(async move { server.run_one_session(socket).await });
                        }
                        Err(error) => {
                            tracing::warn!(%error, "accept failed");
                        }
                    }
                }
            }
        }
    }

    async fn run_one_session(self: Arc<Self>, socket: tokio::net::TcpStream) {
        let _ = socket.set_nodelay(true);
        let registry_handle = self.clone();
        let session_shutdown = self.shutdown.child_token();

        let result = run_session(
            socket,
            self.clone(),
            self.new_command.clone(),
            self.heartbeat_deadline,
            self.handshake_timeout,
            session_shutdown,
            move |handle| {
                registry_handle.registry.set_tunnel(handle.uuid, handle.tunnel.clone());
            },
        )
        .await;

        match result {
            Ok(uuid) => {
                tracing::info!(%uuid, "agent session closed");
                self.registry.mark_disconnected(uuid);
            }
            Err(error) => {
                tracing::warn!(%error, "agent session ended with error before handshake completed");
            }
        }
    }

    // ---- command store -------------------------------------------------

    /// Resolve `payload` (expanding any file-send glob patterns against the
    /// file base) and store the resulting command under a freshly assigned
    /// id, waking every session's evaluator.
    pub fn new_command(&self, prefix: Option<String>, filter: Filter, payload: PayloadRequest) -> Result<CommandId, CcError> {
        let payload = self.resolve_payload(payload)?;
        let id = self.commands.insert_next(|id| Ok(Command::new(id, prefix, filter, payload)?))?;
        self.new_command.notify_waiters();
        tracing::info!(command_id = id.0, "new command stored");
        Ok(id)
    }

    fn resolve_payload(&self, payload: PayloadRequest) -> Result<Payload, CcError> {
        Ok(match payload {
            PayloadRequest::Shell { argv, background, stdin, stdout, stderr } => {
                Payload::Shell { argv, background, stdin, stdout, stderr }
            }
            PayloadRequest::FileSend(patterns) => {
                let base = self.file_base.as_ref().ok_or_else(|| CcError::Path("no file base configured".into()))?;
                let names = cc_transfer::expand_all(base, &patterns)?;
                let specs = names
                    .into_iter()
                    .map(|name| {
                        let mode = base.mode(&name)?;
                        Ok(cc_domain::FileSpec::new(name, mode)?)
                    })
                    .collect::<Result<Vec<_>, CcError>>()?;
                Payload::FileSend(specs)
            }
            PayloadRequest::FileReceive(paths) => Payload::FileReceive(paths),
            PayloadRequest::Signal { pid, signal } => Payload::Signal { pid, signal },
            PayloadRequest::KillProcess { name } => Payload::KillProcess { name },
            PayloadRequest::LogLevel(level) => Payload::LogLevel(level),
        })
    }

    pub fn get_command(&self, id: CommandId) -> Option<Command> {
        self.commands.get(id)
    }

    /// Every agent uuid that has checked in a response for `id`, sorted.
    /// `Command` itself stays immutable (see `cc_domain::Command`'s doc
    /// comment) — this set is tracked in the response store, not on the
    /// command value, and grows independently of it.
    pub fn checked_in(&self, id: CommandId) -> Vec<Uuid> {
        self.responses.checked_in(&self.namespace, id)
    }

    pub fn get_commands(&self) -> Vec<Command> {
        self.commands.get_all()
    }

    pub fn delete_command(&self, id: CommandId) {
        self.commands.delete(id);
    }

    /// Delete every command carrying `prefix`. Does not touch any response
    /// already collected for them.
    pub fn delete_commands(&self, prefix: &str) -> Vec<CommandId> {
        self.commands.delete_prefix(prefix)
    }

    pub fn clear_commands(&self) {
        self.commands.clear();
    }

    // ---- response store --------------------------------------------------

    /// Every response recorded for `id`, across every agent that checked in.
    /// `raw` toggles whether multi-file responses get a path header
    /// prepended to their stdout bytes.
    pub fn get_response(&self, id: CommandId, raw: bool) -> Result<Vec<ResponseRecord>, CcError> {
        let mut records = self.responses.get_all(&self.namespace, id)?;
        if !raw {
            for record in &mut records {
                annotate_with_file_headers(record);
            }
        }
        Ok(records)
    }

    /// Every response recorded in the namespace, across every command id.
    pub fn get_responses(&self, raw: bool) -> Result<Vec<ResponseRecord>, CcError> {
        let mut all = Vec::new();
        for id in self.responses.ids(&self.namespace) {
            all.extend(self.get_response(id, raw)?);
        }
        Ok(all)
    }

    pub fn delete_response(&self, id: CommandId) -> Result<(), CcError> {
        Ok(self.responses.delete(&self.namespace, id)?)
    }

    /// Delete the responses for every command carrying `prefix`. Resolved
    /// the authoritative way: scanning `Command::prefix`, never legacy
    /// on-disk id scanning.
    pub fn delete_responses(&self, prefix: &str) -> Result<Vec<CommandId>, CcError> {
        let ids = self.commands.ids_with_prefix(prefix);
        self.responses.delete_many(&self.namespace, &ids)?;
        Ok(ids)
    }

    pub fn clear_responses(&self) -> Result<(), CcError> {
        Ok(self.responses.clear(&self.namespace)?)
    }

    // ---- client registry -------------------------------------------------

    pub fn clients(&self) -> Vec<Uuid> {
        self.registry.uuids()
    }

    pub fn get_clients(&self) -> Vec<cc_domain::Agent> {
        self.registry.snapshot_all()
    }

    pub fn get_processes(&self, uuid: Uuid) -> Result<Vec<cc_domain::ProcessInfo>, CcError> {
        self.registry.snapshot(uuid).map(|a| a.processes).ok_or(CcError::UnknownClient(uuid))
    }

    pub fn unregister_vm(&self, uuid: Uuid) {
        self.registry.remove(uuid);
    }

    /// Periodic maintenance: evict agent records past their disconnect
    /// grace period. Callers typically run this on a timer alongside the
    /// accept loop.
    pub fn evict_stale_clients(&self) -> Vec<Uuid> {
        self.registry.evict_stale()
    }

    // ---- tunnels -----------------------------------------------------------

    /// Open a listener on the server that proxies every accepted connection
    /// through `uuid`'s session to `dst_host:dst_port`.
    pub async fn forward(
        &self,
        uuid: Uuid,
        listen_port: u16,
        dst_host: String,
        dst_port: u16,
    ) -> Result<SocketAddr, CcError> {
        let tunnel = self.registry.tunnel_of(uuid).ok_or(CcError::UnknownClient(uuid))?;
        let listener = TcpListener::bind(("0.0.0.0", listen_port))
            .await
            .map_err(|e| CcError::Resource(format!("bind {listen_port}: {e}")))?;
        let addr = listener.local_addr()?;
        let cancel = self.shutdown.child_token();
        self.listeners.lock().unwrap().push(cancel.clone());

        tokio::spawn(run_forward_listener(tunnel, listener, dst_host, dst_port, cancel));
        Ok(addr)
    }

    /// Open a listener on the server whose accepted connections fan out
    /// round-robin across every agent matched by `filter` at call time, each
    /// terminating at `dst_host:dst_port` from that agent's perspective.
    pub async fn reverse(
        &self,
        filter: Filter,
        listen_port: u16,
        dst_host: String,
        dst_port: u16,
    ) -> Result<SocketAddr, CcError> {
        let targets = self.registry.tunnels_matching(&filter);
        if targets.is_empty() {
            return Err(CcError::Resource("no connected agent matches the reverse tunnel filter".into()));
        }
        let listener = TcpListener::bind(("0.0.0.0", listen_port))
            .await
            .map_err(|e| CcError::Resource(format!("bind {listen_port}: {e}")))?;
        let addr = listener.local_addr()?;
        let cancel = self.shutdown.child_token();
        self.listeners.lock().unwrap().push(cancel.clone());

        tokio::spawn(run_reverse_listener(ReverseTargets::new(targets), listener, dst_host, dst_port, cancel));
        Ok(addr)
    }

    // ---- UFS ---------------------------------------------------------------

    pub async fn listen_ufs(&self, uuid: Uuid) -> Result<SocketAddr, CcError> {
        let tunnel = self.registry.tunnel_of(uuid).ok_or(CcError::UnknownClient(uuid))?;
        let mount = cc_ufs::listen(tunnel).await?;
        let addr = mount.local_addr;
        self.ufs_mounts.lock().unwrap().insert(mount.mount_id, mount);
        Ok(addr)
    }

    /// Tear down a UFS mount. The mount record is removed regardless of
    /// whether the underlying disconnect completed cleanly, mirroring
    /// `agentfs-daemon`'s unmount policy — a lingering failure here must
    /// never leak a ghost mount entry.
    pub fn disconnect_ufs(&self, mount_id: StreamId) {
        if let Some(mount) = self.ufs_mounts.lock().unwrap().remove(&mount_id) {
            mount.disconnect();
        }
    }

    // ---- teardown ------------------------------------------------------

    /// Close the listener, cancel every session/tunnel/mount, and drop all
    /// in-RAM state. Responses already flushed to disk are untouched.
    pub fn destroy(&self) {
        self.shutdown.cancel();
        for cancel in self.listeners.lock().unwrap().drain(..) {
            cancel.cancel();
        }
        for (_, mount) in self.ufs_mounts.lock().unwrap().drain() {
            mount.disconnect();
        }
        self.commands.clear();
        for uuid in self.registry.uuids() {
            self.registry.remove(uuid);
        }
        tracing::info!("cc server destroyed");
    }
}

fn annotate_with_file_headers(record: &mut ResponseRecord) {
    if record.received_files.is_empty() {
        return;
    }
    let mut annotated = Vec::new();
    for file in &record.received_files {
        annotated.extend_from_slice(format!("--- {file} ---\n").as_bytes());
    }
    annotated.extend_from_slice(&record.stdout);
    record.stdout = annotated;
}

impl SessionStore for CcServer {
    fn register_agent(&self, announce: AgentAnnounce) -> Result<(), SessionError> {
        self.registry.register_or_reattach(announce);
        Ok(())
    }

    fn touch_heartbeat(&self, agent: Uuid) {
        self.registry.touch_heartbeat(agent);
    }

    fn commands_from(&self, from: CommandId) -> Vec<Command> {
        self.commands.from(from)
    }

    fn is_checked_in(&self, id: CommandId, agent: Uuid) -> bool {
        self.responses.is_recorded(&self.namespace, id, agent)
    }

    fn agent_snapshot(&self, agent: Uuid) -> Option<cc_domain::Agent> {
        self.registry.snapshot(agent)
    }

    fn read_file_chunk(&self, name: &str, offset: u64, length: u32) -> Result<Vec<u8>, SessionError> {
        let base = self.file_base.as_ref().ok_or_else(|| SessionError::Store("no file base configured".into()))?;
        base.read_chunk(name, offset, length as u64).map_err(|e| SessionError::Store(e.to_string()))
    }

    fn write_file_chunk(&self, id: CommandId, agent: Uuid, name: &str, offset: u64, data: &[u8]) -> Result<(), SessionError> {
        let pending = self.responses.begin(self.namespace.clone(), id, agent);
        pending.write_file_chunk(name, offset, data).map_err(|e| SessionError::Store(e.to_string()))
    }

    fn finalize_response(&self, id: CommandId, agent: Uuid, stdout: Vec<u8>) -> Result<bool, SessionError> {
        let pending = self.responses.begin(self.namespace.clone(), id, agent);
        pending.finalize(&stdout).map_err(|e| SessionError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_domain::Filter;

    fn test_config(dir: &tempfile::TempDir) -> CcServerConfig {
        CcServerConfig {
            namespace: NamespaceId::default_namespace(),
            response_root: dir.path().join("responses"),
            file_base: None,
            heartbeat_deadline: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(5),
            grace_period: Duration::from_secs(5),
        }
    }

    #[test]
    fn new_command_assigns_ascending_ids_and_wakes_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let server = CcServer::new(test_config(&dir)).unwrap();

        let id1 = server
            .new_command(
                None,
                Filter::any(),
                PayloadRequest::Shell {
                    argv: vec!["true".to_string()],
                    background: false,
                    stdin: None,
                    stdout: None,
                    stderr: None,
                },
            )
            .unwrap();
        let id2 = server
            .new_command(
                None,
                Filter::any(),
                PayloadRequest::Shell {
                    argv: vec!["false".to_string()],
                    background: false,
                    stdin: None,
                    stdout: None,
                    stderr: None,
                },
            )
            .unwrap();

        assert!(id2.0 > id1.0);
        assert_eq!(server.get_commands().len(), 2);
    }

    #[test]
    fn get_response_prepends_file_headers_unless_raw() {
        let dir = tempfile::tempdir().unwrap();
        let server = CcServer::new(test_config(&dir)).unwrap();
        let agent = Uuid::new_v4();

        let pending = server.responses.begin(server.namespace.clone(), CommandId(1), agent);
        pending.write_file_chunk("out.bin", 0, b"data").unwrap();
        pending.finalize(b"done\n").unwrap();

        let formatted = server.get_response(CommandId(1), false).unwrap();
        assert!(formatted[0].stdout.starts_with(b"--- out.bin ---\n"));

        let raw = server.get_response(CommandId(1), true).unwrap();
        assert_eq!(raw[0].stdout, b"done\n");
    }

    #[test]
    fn checked_in_reflects_recorded_responses() {
        let dir = tempfile::tempdir().unwrap();
        let server = CcServer::new(test_config(&dir)).unwrap();
        let agent = Uuid::new_v4();

        let id = server
            .new_command(
                None,
                Filter::any(),
                PayloadRequest::Shell {
                    argv: vec!["true".to_string()],
                    background: false,
                    stdin: None,
                    stdout: None,
                    stderr: None,
                },
            )
            .unwrap();

        assert!(server.checked_in(id).is_empty());
        server.responses.record(&server.namespace, id, agent, b"done\n").unwrap();
        assert_eq!(server.checked_in(id), vec![agent]);
    }

    #[test]
    fn destroy_clears_commands_and_clients() {
        let dir = tempfile::tempdir().unwrap();
        let server = CcServer::new(test_config(&dir)).unwrap();
        server
            .new_command(
                None,
                Filter::any(),
                PayloadRequest::Shell {
                    argv: vec!["true".to_string()],
                    background: false,
                    stdin: None,
                    stdout: None,
                    stderr: None,
                },
            )
            .unwrap();

        server.destroy();
        assert!(server.get_commands().is_empty());
        assert!(server.clients().is_empty());
    }
}
