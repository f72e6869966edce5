// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `match(filter, agent) -> bool`: a pure function with no side effects and
//! no knowledge of the store, sessions, or wire protocol. Kept as its own
//! crate so the dispatcher and the session's per-command evaluation both
//! depend on a single, independently testable implementation.

use cc_domain::{Agent, Filter};

/// Evaluate `filter` against `agent`.
///
/// Rules, in order: every populated scalar field of the filter must equal
/// the corresponding agent field (IP is "contains" against the agent's IP
/// list, MAC is exact-against-list); the tag submap must be a submap of the
/// agent's tags, where an empty filter value means "key exists". An absent
/// filter field matches all agents; a filter with every field absent
/// matches every agent.
pub fn matches(filter: &Filter, agent: &Agent) -> bool {
    if let Some(uuid) = filter.uuid {
        if uuid != agent.uuid {
            return false;
        }
    }

    if let Some(hostname) = &filter.hostname {
        if hostname != &agent.hostname {
            return false;
        }
    }

    if let Some(os) = &filter.os {
        if os != &agent.os {
            return false;
        }
    }

    if let Some(arch) = &filter.arch {
        if arch != &agent.arch {
            return false;
        }
    }

    if let Some(ip_filter) = &filter.ipv4 {
        if !agent.ipv4.iter().any(|ip| ip_filter.contains(ip)) {
            return false;
        }
    }

    if let Some(mac) = &filter.mac {
        if !agent.macs.iter().any(|m| m.eq_ignore_ascii_case(mac)) {
            return false;
        }
    }

    for (key, value) in &filter.tags {
        match agent.tags.get(key) {
            None => return false,
            Some(agent_value) => {
                if !value.is_empty() && agent_value != value {
                    return false;
                }
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn agent_with(os: &str, tags: &[(&str, &str)]) -> Agent {
        let mut agent = Agent::new(Uuid::new_v4(), "h1".to_string(), os.to_string(), "x86_64".to_string(), Utc::now());
        agent.tags = tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        agent
    }

    #[test]
    fn empty_filter_matches_everything() {
        let agent = agent_with("linux", &[]);
        assert!(matches(&Filter::any(), &agent));
    }

    #[test]
    fn os_filter_excludes_mismatch() {
        let linux = agent_with("linux", &[]);
        let windows = agent_with("windows", &[]);
        let filter = Filter::any().with_os("linux");
        assert!(matches(&filter, &linux));
        assert!(!matches(&filter, &windows));
    }

    #[test]
    fn tag_submap_requires_every_key() {
        let db = agent_with("linux", &[("role", "db"), ("env", "prod")]);
        let web = agent_with("linux", &[("role", "web"), ("env", "prod")]);
        let filter = Filter::any().with_tag("env", "prod").with_tag("role", "db");
        assert!(matches(&filter, &db));
        assert!(!matches(&filter, &web));
    }

    #[test]
    fn empty_tag_value_means_key_exists() {
        let agent = agent_with("linux", &[("role", "db")]);
        let filter = Filter::any().with_tag("role", "");
        assert!(matches(&filter, &agent));

        let filter_missing = Filter::any().with_tag("env", "");
        assert!(!matches(&filter_missing, &agent));
    }

    #[test]
    fn uuid_filter_is_exact() {
        let agent = agent_with("linux", &[]);
        let filter = Filter::any().with_uuid(agent.uuid);
        assert!(matches(&filter, &agent));
        assert!(!matches(&Filter::any().with_uuid(Uuid::new_v4()), &agent));
    }

    #[test]
    fn ip_prefix_matches_any_agent_ip() {
        let mut agent = agent_with("linux", &[]);
        agent.ipv4.push("10.0.0.5".parse().unwrap());
        let filter = Filter { ipv4: Some(cc_domain::IpFilter::parse("10.0.0.0/24").unwrap()), ..Filter::any() };
        assert!(matches(&filter, &agent));
    }

    /// Randomized soundness check over a small synthetic agent population:
    /// `matches` agrees with a hand-evaluated reference for every filter in
    /// the table.
    #[test]
    fn filter_soundness_table() {
        let cases: &[(&str, &str, &[(&str, &str)])] = &[
            ("linux", "h1", &[("env", "prod")]),
            ("windows", "h2", &[("env", "staging")]),
            ("linux", "h3", &[("env", "prod"), ("role", "db")]),
        ];
        let agents: Vec<Agent> = cases
            .iter()
            .map(|(os, host, tags)| {
                let mut a = agent_with(os, tags);
                a.hostname = host.to_string();
                a
            })
            .collect();

        let filter = Filter::any().with_os("linux").with_tag("env", "prod");
        for agent in &agents {
            let expected = agent.os == "linux" && agent.tags.get("env").map(|v| v == "prod").unwrap_or(false);
            assert_eq!(matches(&filter, agent), expected, "agent {:?}", agent.hostname);
        }
    }
}
