// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! CC server configuration, layered file < environment < CLI flags, the
//! same precedence order `config-core` documents for Agent Harbor's own
//! settings — simplified here to plain struct merging (no schema/provenance
//! engine) since one server has a handful of scalar settings, not a nested
//! tree of per-tool overrides.

pub mod error;

use std::path::{Path, PathBuf};

pub use error::ConfigError;

/// A fully resolved configuration, ready to build a `CcServerConfig` from.
#[derive(Debug, Clone, PartialEq)]
pub struct CcConfig {
    pub namespace: String,
    pub port: u16,
    pub response_root: PathBuf,
    pub file_base: Option<PathBuf>,
    pub heartbeat_deadline_secs: u64,
    pub handshake_timeout_secs: u64,
    pub grace_period_secs: u64,
}

impl Default for CcConfig {
    /// The recommended values from the concurrency model: a 30s heartbeat
    /// deadline and a 5s shutdown grace period.
    fn default() -> Self {
        Self {
            namespace: cc_domain::NamespaceId::DEFAULT.to_string(),
            port: 9002,
            response_root: PathBuf::from("/var/lib/cc/responses"),
            file_base: None,
            heartbeat_deadline_secs: 30,
            handshake_timeout_secs: 5,
            grace_period_secs: 5,
        }
    }
}

/// One layer of overrides: every field optional, so "not present in this
/// layer" and "explicitly unset" are distinguishable from "use the default".
/// The same shape backs the TOML file layer, the environment layer, and the
/// CLI-flag layer — only how each is populated differs.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ConfigLayer {
    pub namespace: Option<String>,
    pub port: Option<u16>,
    pub response_root: Option<PathBuf>,
    pub file_base: Option<PathBuf>,
    pub heartbeat_deadline_secs: Option<u64>,
    pub handshake_timeout_secs: Option<u64>,
    pub grace_period_secs: Option<u64>,
}

impl ConfigLayer {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Read overrides from the fixed set of `CC_*` environment variables.
    /// Absent variables leave the corresponding field `None`.
    pub fn from_env() -> Result<Self, ConfigError> {
        fn parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
            match std::env::var(key) {
                Ok(value) => value
                    .parse()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidValue { field: key, reason: format!("`{value}` is not valid") }),
                Err(_) => Ok(None),
            }
        }

        Ok(Self {
            namespace: std::env::var("CC_NAMESPACE").ok(),
            port: parse("CC_PORT")?,
            response_root: std::env::var("CC_RESPONSE_ROOT").ok().map(PathBuf::from),
            file_base: std::env::var("CC_FILE_BASE").ok().map(PathBuf::from),
            heartbeat_deadline_secs: parse("CC_HEARTBEAT_DEADLINE_SECS")?,
            handshake_timeout_secs: parse("CC_HANDSHAKE_TIMEOUT_SECS")?,
            grace_period_secs: parse("CC_GRACE_PERIOD_SECS")?,
        })
    }

    /// Overwrite every field of `base` that this layer sets, leaving the
    /// rest untouched. Later layers win — callers apply file, then env,
    /// then CLI flags, in that order.
    fn apply(self, base: &mut CcConfig) {
        if let Some(v) = self.namespace {
            base.namespace = v;
        }
        if let Some(v) = self.port {
            base.port = v;
        }
        if let Some(v) = self.response_root {
            base.response_root = v;
        }
        if self.file_base.is_some() {
            base.file_base = self.file_base;
        }
        if let Some(v) = self.heartbeat_deadline_secs {
            base.heartbeat_deadline_secs = v;
        }
        if let Some(v) = self.handshake_timeout_secs {
            base.handshake_timeout_secs = v;
        }
        if let Some(v) = self.grace_period_secs {
            base.grace_period_secs = v;
        }
    }
}

/// Resolve the final configuration: defaults, then `file` (if given and
/// present on disk), then the process environment, then `cli` — each layer
/// overriding only the fields it sets.
pub fn load(file: Option<&Path>, cli: ConfigLayer) -> Result<CcConfig, ConfigError> {
    let mut config = CcConfig::default();

    if let Some(path) = file {
        if path.exists() {
            ConfigLayer::from_toml_file(path)?.apply(&mut config);
        }
    }

    ConfigLayer::from_env()?.apply(&mut config);
    cli.apply(&mut config);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_recommended_values() {
        let config = CcConfig::default();
        assert_eq!(config.heartbeat_deadline_secs, 30);
        assert_eq!(config.grace_period_secs, 5);
        assert_eq!(config.port, 9002);
    }

    #[test]
    fn file_layer_overrides_defaults_and_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cc.toml");
        std::fs::write(&path, "port = 9100\nnamespace = \"staging\"\n").unwrap();

        let cli = ConfigLayer { port: Some(9200), ..Default::default() };
        let config = load(Some(&path), cli).unwrap();

        assert_eq!(config.namespace, "staging");
        assert_eq!(config.port, 9200);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load(Some(Path::new("/nonexistent/cc.toml")), ConfigLayer::default()).unwrap();
        assert_eq!(config, CcConfig::default());
    }

    #[test]
    fn env_layer_is_picked_up_between_file_and_cli() {
        std::env::set_var("CC_GRACE_PERIOD_SECS", "42");
        let config = load(None, ConfigLayer::default()).unwrap();
        std::env::remove_var("CC_GRACE_PERIOD_SECS");
        assert_eq!(config.grace_period_secs, 42);
    }
}
