// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Fan-out/collect across a namespace's member hosts, modeled as a trait so
//! the real mesh-messaging transport can be swapped for a test double —
//! the same facade pattern used for pluggable local/remote/mock task
//! backends elsewhere in this kind of system.

use async_trait::async_trait;

use crate::error::NamespaceError;

/// One host's reply to a fanned-out administrative command, or the reason
/// it didn't answer. A single unreachable host never aborts the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReply {
    pub host: String,
    pub output: Result<String, String>,
}

/// The mesh-messaging transport a namespace dispatches administrative
/// commands over. Out of scope here: only the shape agents need to plug
/// a real transport in, or a test double, is defined.
#[async_trait]
pub trait MeshTransport: Send + Sync {
    /// Send `request` to `host` and wait for its reply.
    async fn dispatch(&self, host: &str, request: &str) -> Result<String, NamespaceError>;
}

/// Fan `request` out to every host in `hosts` concurrently and collect the
/// replies, each tagged with its originating host. A host that errors is
/// recorded as a failed `HostReply`, not propagated as a fatal error, and a
/// slow or hung host cannot delay the others' replies — one bad host must
/// not hide or block the rest.
pub async fn fan_out(transport: &dyn MeshTransport, hosts: &[String], request: &str) -> Vec<HostReply> {
    let dispatches = hosts.iter().map(|host| async move {
        let output = transport.dispatch(host, request).await.map_err(|err| {
            tracing::warn!(%host, %err, "host did not answer the fanned-out command");
            err.to_string()
        });
        HostReply { host: host.clone(), output }
    });
    futures::future::join_all(dispatches).await
}

/// Concatenate fan-out replies into a single report, one stamped line per
/// output line, in host order: `"<host>: <line>"`. Hosts that errored
/// contribute a single `"<host>: [error] <reason>"` line.
pub fn stamp_replies(replies: &[HostReply]) -> String {
    let mut report = String::new();
    for reply in replies {
        match &reply.output {
            Ok(output) => {
                for line in output.lines() {
                    report.push_str(&reply.host);
                    report.push_str(": ");
                    report.push_str(line);
                    report.push('\n');
                }
            }
            Err(reason) => {
                report.push_str(&reply.host);
                report.push_str(": [error] ");
                report.push_str(reason);
                report.push('\n');
            }
        }
    }
    report
}

/// The degenerate single-host transport: every request is answered locally
/// by a closure, modeling a namespace whose only member is the CC server's
/// own host.
pub struct LocalTransport<F>(pub F)
where
    F: Fn(&str) -> Result<String, NamespaceError> + Send + Sync;

#[async_trait]
impl<F> MeshTransport for LocalTransport<F>
where
    F: Fn(&str) -> Result<String, NamespaceError> + Send + Sync,
{
    async fn dispatch(&self, _host: &str, request: &str) -> Result<String, NamespaceError> {
        (self.0)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A scripted transport for tests: each host has a canned reply or a
    /// canned failure, looked up by host name.
    struct MockTransport {
        replies: Mutex<HashMap<String, Result<String, String>>>,
    }

    #[async_trait]
    impl MeshTransport for MockTransport {
        async fn dispatch(&self, host: &str, _request: &str) -> Result<String, NamespaceError> {
            match self.replies.lock().unwrap().get(host) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(reason)) => {
                    Err(NamespaceError::HostUnreachable { host: host.to_string(), reason: reason.clone() })
                }
                None => Err(NamespaceError::HostUnreachable { host: host.to_string(), reason: "unscripted".into() }),
            }
        }
    }

    #[tokio::test]
    async fn single_host_fan_out_is_the_degenerate_case() {
        let transport = LocalTransport(|req: &str| Ok(format!("ran: {req}")));
        let replies = fan_out(&transport, &["localhost".to_string()], "uptime").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].output, Ok("ran: uptime".to_string()));
    }

    #[tokio::test]
    async fn one_unreachable_host_does_not_hide_the_others() {
        let mut scripted = HashMap::new();
        scripted.insert("alpha".to_string(), Ok("2 processes".to_string()));
        scripted.insert("beta".to_string(), Err("connection refused".to_string()));
        let transport = MockTransport { replies: Mutex::new(scripted) };

        let hosts = vec!["alpha".to_string(), "beta".to_string()];
        let replies = fan_out(&transport, &hosts, "ps").await;

        assert_eq!(replies[0].output, Ok("2 processes".to_string()));
        assert!(replies[1].output.is_err());

        let report = stamp_replies(&replies);
        assert_eq!(report, "alpha: 2 processes\nbeta: [error] connection refused\n");
    }
}
