// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cc_domain::{Agent, Command, CommandId, Filter, Payload};
use cc_proto::{read_frame, write_frame, Frame, Message};
use cc_session::store::AgentAnnounce;
use cc_session::{run_session, SessionError, SessionStore};
use chrono::Utc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct MemoryStore {
    commands: Vec<Command>,
    agent: Mutex<Option<Agent>>,
    checked_in: Mutex<HashSet<CommandId>>,
    recorded: Mutex<Vec<(CommandId, Uuid, Vec<u8>)>>,
}

impl MemoryStore {
    fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            agent: Mutex::new(None),
            checked_in: Mutex::new(HashSet::new()),
            recorded: Mutex::new(Vec::new()),
        }
    }
}

impl SessionStore for MemoryStore {
    fn register_agent(&self, announce: AgentAnnounce) -> Result<(), SessionError> {
        let mut agent = Agent::new(announce.uuid, announce.hostname, announce.os, announce.arch, Utc::now());
        agent.ipv4 = announce.ipv4;
        agent.ipv6 = announce.ipv6;
        agent.macs = announce.macs;
        *self.agent.lock().unwrap() = Some(agent);
        Ok(())
    }

    fn touch_heartbeat(&self, _agent: Uuid) {}

    fn commands_from(&self, from: CommandId) -> Vec<Command> {
        self.commands.iter().filter(|c| c.id.0 >= from.0).cloned().collect()
    }

    fn is_checked_in(&self, id: CommandId, _agent: Uuid) -> bool {
        self.checked_in.lock().unwrap().contains(&id)
    }

    fn agent_snapshot(&self, _agent: Uuid) -> Option<Agent> {
        self.agent.lock().unwrap().clone()
    }

    fn read_file_chunk(&self, _name: &str, _offset: u64, _length: u32) -> Result<Vec<u8>, SessionError> {
        Err(SessionError::Store("no file base in test".into()))
    }

    fn write_file_chunk(
        &self,
        _id: CommandId,
        _agent: Uuid,
        _name: &str,
        _offset: u64,
        _data: &[u8],
    ) -> Result<(), SessionError> {
        Ok(())
    }

    fn finalize_response(&self, id: CommandId, agent: Uuid, stdout: Vec<u8>) -> Result<bool, SessionError> {
        let mut checked_in = self.checked_in.lock().unwrap();
        if !checked_in.insert(id) {
            return Ok(false);
        }
        self.recorded.lock().unwrap().push((id, agent, stdout));
        Ok(true)
    }
}

#[tokio::test]
async fn dispatches_a_pending_command_then_records_the_response() {
    let command = Command::new(CommandId(1), None, Filter::any(), Payload::Shell {
        argv: vec!["echo".to_string(), "hi".to_string()],
        background: false,
        stdin: None,
        stdout: None,
        stderr: None,
    })
    .unwrap();
    let store = Arc::new(MemoryStore::new(vec![command]));

    let (server_side, mut agent_side) = tokio::io::duplex(4096);
    let new_command = Arc::new(Notify::new());
    let shutdown = CancellationToken::new();

    let session_store = store.clone();
    let session_shutdown = shutdown.clone();
    let session_task = tokio::spawn(async move {
        run_session(
            server_side,
            session_store,
            new_command,
            Duration::from_secs(30),
            Duration::from_secs(5),
            session_shutdown,
            |_handle| {},
        )
        .await
    });

    let agent_uuid = Uuid::new_v4();
    write_frame(
        &mut agent_side,
        &Frame::new(
            0,
            Message::ClientAnnounce {
                uuid: agent_uuid,
                hostname: "vm1".to_string(),
                os: "linux".to_string(),
                arch: "x86_64".to_string(),
                ipv4: vec![],
                ipv6: vec![],
                macs: vec![],
            },
        ),
    )
    .await
    .unwrap();

    let dispatched = read_frame(&mut agent_side).await.unwrap();
    match dispatched.body {
        Message::CommandRequest { command } => assert_eq!(command.id, CommandId(1)),
        other => panic!("expected CommandRequest, got {other:?}"),
    }

    write_frame(
        &mut agent_side,
        &Frame::new(
            0,
            Message::CommandResponse { command_id: 1, stdout: b"hi\n".to_vec(), receive_files: vec![] },
        ),
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.is_checked_in(CommandId(1), agent_uuid));
    assert_eq!(store.recorded.lock().unwrap()[0].2, b"hi\n".to_vec());

    shutdown.cancel();
    drop(agent_side);
    let _ = session_task.await;
}
