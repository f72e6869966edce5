// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! A filter: a conjunction of predicates over agent attributes. Matching
//! logic lives in `cc-matcher`; this module only defines the shape and
//! validates it at construction time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// An IPv4 predicate: either an exact address or a CIDR-style prefix,
/// matched as "contains" against the agent's IP list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpFilter {
    Exact(std::net::Ipv4Addr),
    Prefix { network: std::net::Ipv4Addr, bits: u8 },
}

impl IpFilter {
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        if let Some((net, bits)) = s.split_once('/') {
            let network = net
                .parse()
                .map_err(|_| DomainError::InvalidIpv4Prefix(s.to_string()))?;
            let bits: u8 = bits
                .parse()
                .map_err(|_| DomainError::InvalidIpv4Prefix(s.to_string()))?;
            if bits > 32 {
                return Err(DomainError::InvalidIpv4Prefix(s.to_string()));
            }
            Ok(IpFilter::Prefix { network, bits })
        } else {
            let exact = s
                .parse()
                .map_err(|_| DomainError::InvalidIpv4Prefix(s.to_string()))?;
            Ok(IpFilter::Exact(exact))
        }
    }

    /// Whether `addr` satisfies this predicate.
    pub fn contains(&self, addr: &std::net::Ipv4Addr) -> bool {
        match self {
            IpFilter::Exact(want) => want == addr,
            IpFilter::Prefix { network, bits } => {
                let mask = if *bits == 0 {
                    0u32
                } else {
                    u32::MAX << (32 - bits)
                };
                u32::from_bits(*network) & mask == u32::from_bits(*addr) & mask
            }
        }
    }
}

trait U32FromAddr {
    fn from_bits(addr: std::net::Ipv4Addr) -> u32;
}

impl U32FromAddr for u32 {
    fn from_bits(addr: std::net::Ipv4Addr) -> u32 {
        u32::from_be_bytes(addr.octets())
    }
}

/// A conjunction of predicates. Every populated field must match; an absent
/// (`None` or empty) field matches all agents. `tags` is a submap check:
/// every key in the filter must be present on the agent with an equal value,
/// or with an empty filter-value meaning "key exists".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub uuid: Option<uuid::Uuid>,
    pub hostname: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub ipv4: Option<IpFilter>,
    pub mac: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl Filter {
    /// The filter that matches every agent.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_prefix_contains() {
        let f = IpFilter::parse("10.0.0.0/24").unwrap();
        assert!(f.contains(&"10.0.0.42".parse().unwrap()));
        assert!(!f.contains(&"10.0.1.1".parse().unwrap()));
    }

    #[test]
    fn ip_exact() {
        let f = IpFilter::parse("10.0.0.1").unwrap();
        assert!(f.contains(&"10.0.0.1".parse().unwrap()));
        assert!(!f.contains(&"10.0.0.2".parse().unwrap()));
    }

    #[test]
    fn any_filter_matches_everything_trivially() {
        let f = Filter::any();
        assert!(f.uuid.is_none() && f.tags.is_empty());
    }
}
