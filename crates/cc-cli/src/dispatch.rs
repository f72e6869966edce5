// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! One exhaustive `match` over `Verb`, the CC core's answer to the source's
//! dynamic dispatch-by-map-of-handlers. Every verb resolves against the
//! namespace's active filter/prefix convenience state and its server.

use cc_domain::Filter;
use cc_namespace::Namespace;
use cc_server::PayloadRequest;

use crate::error::CliError;
use crate::outcome::Outcome;
use crate::verb::{ClearTarget, DeleteTarget, MountAction, ProcessAction, Verb};

pub async fn dispatch(verb: Verb, namespace: &mut Namespace) -> Result<Outcome, CliError> {
    match verb {
        Verb::Send(patterns) => new_command(namespace, PayloadRequest::FileSend(patterns)),
        Verb::Recv(paths) => new_command(namespace, PayloadRequest::FileReceive(paths)),
        Verb::Exec { argv, pipes } => new_command(
            namespace,
            PayloadRequest::Shell {
                argv,
                background: false,
                stdin: pipes.stdin,
                stdout: pipes.stdout,
                stderr: pipes.stderr,
            },
        ),
        Verb::Background { argv, pipes } => new_command(
            namespace,
            PayloadRequest::Shell {
                argv,
                background: true,
                stdin: pipes.stdin,
                stdout: pipes.stdout,
                stderr: pipes.stderr,
            },
        ),
        Verb::Process { uuid, action } => match action {
            ProcessAction::Query => Ok(Outcome::Processes(namespace.server().get_processes(uuid)?)),
            ProcessAction::Signal { pid, signal } => {
                new_command_to(namespace, Filter::any().with_uuid(uuid), PayloadRequest::Signal { pid, signal })
            }
            ProcessAction::Kill { name } => {
                new_command_to(namespace, Filter::any().with_uuid(uuid), PayloadRequest::KillProcess { name })
            }
        },
        Verb::Filter(filter) => {
            namespace.set_active_filter(filter);
            Ok(Outcome::Ack)
        }
        Verb::Prefix(prefix) => {
            namespace.set_active_prefix(prefix);
            Ok(Outcome::Ack)
        }
        Verb::Commands(None) => Ok(Outcome::Commands(namespace.server().get_commands())),
        Verb::Commands(Some(id)) => Ok(Outcome::Commands(namespace.server().get_command(id).into_iter().collect())),
        Verb::Responses { id: None, raw } => Ok(Outcome::Responses(namespace.server().get_responses(raw)?)),
        Verb::Responses { id: Some(id), raw } => Ok(Outcome::Responses(namespace.server().get_response(id, raw)?)),
        Verb::Delete(target) => match target {
            DeleteTarget::Command(id) => {
                namespace.server().delete_command(id);
                Ok(Outcome::DeletedCommands(vec![id]))
            }
            DeleteTarget::CommandsByPrefix(prefix) => {
                Ok(Outcome::DeletedCommands(namespace.server().delete_commands(&prefix)))
            }
            DeleteTarget::Response(id) => {
                namespace.server().delete_response(id)?;
                Ok(Outcome::Ack)
            }
            DeleteTarget::ResponsesByPrefix(prefix) => {
                Ok(Outcome::DeletedCommands(namespace.server().delete_responses(&prefix)?))
            }
        },
        Verb::Clear(target) => match target {
            ClearTarget::Commands => {
                namespace.server().clear_commands();
                Ok(Outcome::Ack)
            }
            ClearTarget::Responses => {
                namespace.server().clear_responses()?;
                Ok(Outcome::Ack)
            }
        },
        Verb::Clients => Ok(Outcome::Clients(namespace.server().get_clients())),
        Verb::Tunnel { uuid, listen_port, host, port } => {
            Ok(Outcome::Endpoint(namespace.server().forward(uuid, listen_port, host, port).await?))
        }
        Verb::Rtunnel { listen_port, host, port } => {
            let filter = namespace.active_filter().clone();
            Ok(Outcome::Endpoint(namespace.server().reverse(filter, listen_port, host, port).await?))
        }
        Verb::Mount { uuid, action } => match action {
            MountAction::Start => Ok(Outcome::Endpoint(namespace.server().listen_ufs(uuid).await?)),
            MountAction::Stop(mount_id) => {
                namespace.server().disconnect_ufs(mount_id);
                Ok(Outcome::Ack)
            }
        },
        Verb::Listen(port) => {
            namespace.server().listen(port).await?;
            Ok(Outcome::Ack)
        }
        Verb::Log(level) => new_command(namespace, PayloadRequest::LogLevel(level)),
    }
}

fn new_command(namespace: &Namespace, payload: PayloadRequest) -> Result<Outcome, CliError> {
    let filter = namespace.active_filter().clone();
    new_command_to(namespace, filter, payload)
}

fn new_command_to(namespace: &Namespace, filter: Filter, payload: PayloadRequest) -> Result<Outcome, CliError> {
    let prefix = active_prefix(namespace);
    let id = namespace.server().new_command(prefix, filter, payload)?;
    Ok(Outcome::CommandId(id))
}

fn active_prefix(namespace: &Namespace) -> Option<String> {
    let prefix = namespace.active_prefix();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_domain::NamespaceId;
    use cc_namespace::LocalTransport;
    use cc_server::CcServerConfig;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn test_namespace(dir: &tempfile::TempDir) -> Namespace {
        let config = CcServerConfig {
            namespace: NamespaceId::default_namespace(),
            response_root: dir.path().join("responses"),
            file_base: None,
            heartbeat_deadline: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(5),
            grace_period: Duration::from_secs(5),
        };
        let server = cc_server::CcServer::new(config).unwrap();
        let transport = Arc::new(LocalTransport(|_: &str| Ok(String::new())));
        Namespace::new(NamespaceId::default_namespace(), server, transport, Vec::new())
    }

    #[tokio::test]
    async fn exec_assigns_a_command_id_under_the_active_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = test_namespace(&dir);

        dispatch(Verb::Prefix("exp".to_string()), &mut ns).await.unwrap();
        let outcome = dispatch(
            Verb::Exec { argv: vec!["true".to_string()], pipes: crate::verb::ShellPipes::default() },
            &mut ns,
        )
        .await
        .unwrap();

        let Outcome::CommandId(id) = outcome else { panic!("expected a command id") };
        let command = ns.server().get_command(id).unwrap();
        assert_eq!(command.prefix.as_deref(), Some("exp"));
    }

    #[tokio::test]
    async fn delete_commands_by_prefix_only_touches_matching_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = test_namespace(&dir);

        dispatch(Verb::Prefix("exp".to_string()), &mut ns).await.unwrap();
        dispatch(Verb::Exec { argv: vec!["true".to_string()], pipes: Default::default() }, &mut ns).await.unwrap();
        dispatch(Verb::Exec { argv: vec!["true".to_string()], pipes: Default::default() }, &mut ns).await.unwrap();

        dispatch(Verb::Prefix("ctl".to_string()), &mut ns).await.unwrap();
        dispatch(Verb::Exec { argv: vec!["false".to_string()], pipes: Default::default() }, &mut ns).await.unwrap();

        let outcome = dispatch(Verb::Delete(DeleteTarget::CommandsByPrefix("exp".to_string())), &mut ns).await.unwrap();
        let Outcome::DeletedCommands(ids) = outcome else { panic!("expected deleted ids") };
        assert_eq!(ids.len(), 2);
        assert_eq!(ns.server().get_commands().len(), 1);
    }

    #[tokio::test]
    async fn clients_reflects_an_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = test_namespace(&dir);
        let outcome = dispatch(Verb::Clients, &mut ns).await.unwrap();
        let Outcome::Clients(agents) = outcome else { panic!("expected a client list") };
        assert!(agents.is_empty());
    }

    #[tokio::test]
    async fn querying_processes_for_an_unknown_client_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = test_namespace(&dir);
        let err = dispatch(Verb::Process { uuid: Uuid::new_v4(), action: ProcessAction::Query }, &mut ns).await;
        assert!(err.is_err());
    }
}
