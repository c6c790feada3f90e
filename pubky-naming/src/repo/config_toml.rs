//! Configuration file of a naming node.
//!
//! All default values live exclusively in `config.default.toml`.
//! This module embeds that file at compile-time and lets callers
//! layer their own TOML on top.
//!
//! Every section keeps the keys it does not know about in an `extra` table,
//! so reading a config and writing it back never drops anything.

use super::{log_level::LogLevel, multiaddr::Multiaddr, toml_merge};
use serde::{Deserialize, Serialize};
use std::{fs, num::NonZeroU64, path::Path, str::FromStr};

/// Embedded copy of the default configuration (single source of truth for defaults)
pub const DEFAULT_CONFIG: &str = include_str!("config.default.toml");

/// Error that can occur when reading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigReadError {
    /// The file did not exist or could not be read.
    #[error("config file not found: {0}")]
    ConfigFileNotFound(#[from] std::io::Error),
    /// The TOML was syntactically invalid.
    #[error("config file is not valid TOML: {0}")]
    ConfigFileNotValid(#[from] toml::de::Error),
    /// Failed to merge defaults with overrides.
    #[error("failed to merge embedded and user TOML: {0}")]
    ConfigMergeError(#[from] toml_merge::MergeError),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BootstrapToml {
    /// Bootstrap peers as multiaddr strings.
    ///
    /// Kept as plain strings so an entry this node cannot parse survives a
    /// read-modify-write of the config.
    pub peers: Vec<String>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl BootstrapToml {
    /// Peers that parse as multiaddrs. Invalid entries are skipped with a warning.
    pub fn parsed_peers(&self) -> Vec<Multiaddr> {
        self.peers
            .iter()
            .filter_map(|peer| match Multiaddr::from_str(peer) {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!("Ignoring bootstrap peer {peer:?}: {e}");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NamingToml {
    /// Lifetime of a record when the caller gives none, e.g. `"24h"`.
    pub default_lifetime: String,
    /// Whether a publish checks that the path is available first.
    pub resolve_by_default: bool,
    /// Deadline of a publish or bootstrap reset. `None` means no deadline.
    pub default_timeout_ms: Option<NonZeroU64>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PkdnsToml {
    pub dht_request_timeout_ms: Option<NonZeroU64>,
    pub dht_relays_enabled: bool,
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoggingToml {
    pub level: LogLevel,
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// The full node configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NodeConfig {
    /// Peers to join the network through.
    pub bootstrap: BootstrapToml,
    /// Defaults of the name publishing pipeline.
    pub naming: NamingToml,
    /// Mainline DHT client settings.
    pub pkdns: PkdnsToml,
    pub logging: LoggingToml,
    /// Sections owned by other components of the node.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig::from_str(DEFAULT_CONFIG).expect("Embedded config.default.toml must be valid")
    }
}

impl Default for BootstrapToml {
    fn default() -> Self {
        NodeConfig::default().bootstrap
    }
}

impl Default for NamingToml {
    fn default() -> Self {
        NodeConfig::default().naming
    }
}

impl Default for PkdnsToml {
    fn default() -> Self {
        NodeConfig::default().pkdns
    }
}

impl NodeConfig {
    /// Read and parse a configuration file, overlaying it on top of the embedded defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigReadError> {
        let raw = fs::read_to_string(path)?;
        Self::from_str_with_defaults(&raw)
    }

    /// Parse a raw TOML string, overlaying it on top of the embedded defaults.
    pub fn from_str_with_defaults(raw: &str) -> Result<Self, ConfigReadError> {
        let default_val: toml::Value = DEFAULT_CONFIG
            .parse()
            .expect("embedded defaults invalid TOML");
        let user_val: toml::Value = raw.parse()?;
        let merged_val = toml_merge::merge(default_val, user_val)?;
        Ok(merged_val.try_into()?)
    }

    /// Render the config as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Returns a default config tuned for unit tests.
    pub fn test() -> Self {
        let mut config = Self::default();
        config.bootstrap.peers = vec![];
        config.pkdns.dht_relays_enabled = false;
        config
    }
}

impl FromStr for NodeConfig {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

/// The compiled-in bootstrap peers.
pub fn default_bootstrap_peers() -> Vec<String> {
    BootstrapToml::default().peers
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_config() {
        let c = NodeConfig::default();
        assert_eq!(c.bootstrap.peers.len(), 4);
        assert_eq!(c.bootstrap.parsed_peers().len(), 4);
        assert_eq!(c.naming.default_lifetime, "24h");
        assert!(c.naming.resolve_by_default);
        assert_eq!(c.naming.default_timeout_ms, None);
        assert_eq!(c.pkdns.dht_request_timeout_ms, None);
        assert!(c.pkdns.dht_relays_enabled);
        assert_eq!(c.logging.level, LogLevel(LevelFilter::INFO));
        assert!(c.extra.is_empty());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let c = NodeConfig::from_str_with_defaults("").unwrap();
        assert_eq!(c, NodeConfig::default());
    }

    #[test]
    fn test_partial_config_overrides_defaults() {
        let c = NodeConfig::from_str_with_defaults(
            r#"
            [bootstrap]
            peers = ["/ip4/127.0.0.1/udp/6881"]

            [pkdns]
            dht_request_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(c.bootstrap.peers, vec!["/ip4/127.0.0.1/udp/6881"]);
        assert_eq!(c.pkdns.dht_request_timeout_ms, NonZeroU64::new(500));
        assert!(c.pkdns.dht_relays_enabled);
        assert_eq!(c.naming.default_lifetime, "24h");
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = r#"
            [bootstrap]
            peers = ["/ip4/127.0.0.1/udp/6881"]
            dial_timeout = 30

            [datastore]
            path = "blocks"
            bloom_filter_size = 1024

            [datastore.gc]
            enabled = true
        "#;
        let c = NodeConfig::from_str_with_defaults(raw).unwrap();
        assert_eq!(c.bootstrap.extra.get("dial_timeout"), Some(&toml::Value::Integer(30)));
        assert!(c.extra.contains_key("datastore"));

        let rendered = c.to_toml_string().unwrap();
        let reparsed = NodeConfig::from_str(&rendered).unwrap();
        assert_eq!(reparsed, c);
    }

    #[test]
    fn test_invalid_peer_is_kept_but_not_parsed() {
        let mut c = NodeConfig::default();
        c.bootstrap.peers.push("not a multiaddr".to_string());
        assert_eq!(c.bootstrap.peers.len(), 5);
        assert_eq!(c.bootstrap.parsed_peers().len(), 4);
    }

    #[test]
    fn test_invalid_config() {
        assert!(NodeConfig::from_str_with_defaults("this is not toml").is_err());
        let wrong_type = r#"
            [naming]
            resolve_by_default = "yes"
        "#;
        assert!(matches!(
            NodeConfig::from_str_with_defaults(wrong_type),
            Err(ConfigReadError::ConfigMergeError(_))
        ));
    }

    #[test]
    fn test_default_bootstrap_peers() {
        let peers = default_bootstrap_peers();
        assert!(peers.contains(&"/dns4/router.bittorrent.com/udp/6881".to_string()));
    }
}
