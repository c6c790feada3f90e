//!
//! Restoring the bootstrap peer list.
//!

use std::{str::FromStr, sync::Arc, time::Duration};

use crate::{
    repo::{
        default_bootstrap_peers, ConfigRepo, Multiaddr, MultiaddrError, NamingToml, RepoError,
    },
    timeout::{with_timeout, TimeoutError},
};

#[derive(thiserror::Error, Debug)]
pub enum ResetError {
    #[error(transparent)]
    Config(#[from] RepoError),
    #[error("default bootstrap peer {peer:?} is invalid: {source}")]
    InvalidDefault {
        peer: String,
        #[source]
        source: MultiaddrError,
    },
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

impl ResetError {
    pub fn code(&self) -> &'static str {
        match self {
            ResetError::Config(e) => e.code(),
            ResetError::InvalidDefault { .. } => "ERR_INVALID_BOOTSTRAP_PEER",
            ResetError::Timeout(_) => "ERR_TIMEOUT",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub timeout: Option<Duration>,
}

impl ResetOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&NamingToml> for ResetOptions {
    fn from(config: &NamingToml) -> Self {
        Self {
            timeout: config
                .default_timeout_ms
                .map(|ms| Duration::from_millis(ms.get())),
        }
    }
}

/// The bootstrap peers after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPeers {
    pub peers: Vec<Multiaddr>,
}

/// Maintains the `[bootstrap]` section of the node config.
#[derive(Clone)]
pub struct BootstrapConfig {
    repo: Arc<dyn ConfigRepo>,
}

impl BootstrapConfig {
    pub fn new(repo: Arc<dyn ConfigRepo>) -> Self {
        Self { repo }
    }

    /// Replace the bootstrap peers with the built-in defaults.
    ///
    /// Everything else in the config is written back untouched.
    pub async fn reset(&self, options: ResetOptions) -> Result<BootstrapPeers, ResetError> {
        with_timeout(options.timeout, self.reset_inner()).await
    }

    async fn reset_inner(&self) -> Result<BootstrapPeers, ResetError> {
        let defaults = default_bootstrap_peers();
        let peers = defaults
            .iter()
            .map(|peer| {
                Multiaddr::from_str(peer).map_err(|source| ResetError::InvalidDefault {
                    peer: peer.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut config = self.repo.get_all().await?;
        config.bootstrap.peers = defaults;
        self.repo.replace(config).await?;

        tracing::info!("Reset bootstrap peers to {} defaults.", peers.len());
        Ok(BootstrapPeers { peers })
    }

    /// The configured peers that parse as multiaddrs.
    pub async fn list(&self) -> Result<BootstrapPeers, ResetError> {
        let config = self.repo.get_all().await?;
        Ok(BootstrapPeers {
            peers: config.bootstrap.parsed_peers(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repo::{DataDir, FileRepo, MemoryRepo, NodeConfig},
        testing::FailingRepo,
    };
    use std::num::NonZeroU64;
    use tempfile::TempDir;

    fn default_peers() -> Vec<Multiaddr> {
        default_bootstrap_peers()
            .iter()
            .map(|peer| Multiaddr::from_str(peer).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let repo = Arc::new(MemoryRepo::new(NodeConfig::test()));
        let bootstrap = BootstrapConfig::new(repo.clone());
        assert!(bootstrap.list().await.unwrap().peers.is_empty());

        let result = bootstrap.reset(ResetOptions::default()).await.unwrap();
        assert_eq!(result.peers, default_peers());
        assert_eq!(
            repo.get_all().await.unwrap().bootstrap.peers,
            default_bootstrap_peers()
        );
        assert_eq!(bootstrap.list().await.unwrap(), result);
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let repo = Arc::new(MemoryRepo::new(NodeConfig::test()));
        let bootstrap = BootstrapConfig::new(repo.clone());

        let first = bootstrap.reset(ResetOptions::default()).await.unwrap();
        let after_first = repo.get_all().await.unwrap();
        let second = bootstrap.reset(ResetOptions::default()).await.unwrap();
        let after_second = repo.get_all().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(after_first, after_second);
        assert_eq!(after_second.bootstrap.peers, default_bootstrap_peers());
    }

    #[tokio::test]
    async fn reset_preserves_other_fields() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = DataDir::new(temp_dir.path().to_path_buf());
        std::fs::write(
            data_dir.config_file_path(),
            r#"
            [bootstrap]
            peers = ["/ip4/10.0.0.1/udp/6881"]
            dial_timeout = 30

            [naming]
            default_lifetime = "1h"

            [datastore]
            path = "blocks"

            [datastore.gc]
            enabled = true
            "#,
        )
        .unwrap();
        let repo = Arc::new(FileRepo::new(&data_dir));
        let before = repo.get_all().await.unwrap();

        BootstrapConfig::new(repo.clone())
            .reset(ResetOptions::default())
            .await
            .unwrap();

        let after = repo.get_all().await.unwrap();
        assert_eq!(after.bootstrap.peers, default_bootstrap_peers());
        assert_eq!(after.bootstrap.extra, before.bootstrap.extra);
        assert_eq!(after.naming.default_lifetime, "1h");
        assert_eq!(after.naming, before.naming);
        assert_eq!(after.pkdns, before.pkdns);
        assert_eq!(after.logging, before.logging);
        assert_eq!(after.extra, before.extra);
        assert!(after.extra.contains_key("datastore"));
    }

    #[tokio::test]
    async fn read_failure_propagates() {
        let repo = Arc::new(FailingRepo::failing_reads());
        let err = BootstrapConfig::new(repo.clone())
            .reset(ResetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResetError::Config(RepoError::Read(_))));
        assert_eq!(err.code(), "ERR_CONFIG_READ");
        assert_eq!(repo.writes(), 0);
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let repo = Arc::new(FailingRepo::failing_writes());
        let err = BootstrapConfig::new(repo.clone())
            .reset(ResetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResetError::Config(RepoError::Io(_))));
        assert_eq!(repo.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_repo_times_out() {
        let repo = Arc::new(FailingRepo::slow_reads(Duration::from_secs(10)));
        let options = ResetOptions::default().timeout(Duration::from_secs(1));
        let err = BootstrapConfig::new(repo.clone())
            .reset(options)
            .await
            .unwrap_err();

        assert!(matches!(err, ResetError::Timeout(_)));
        assert_eq!(err.code(), "ERR_TIMEOUT");
        assert_eq!(repo.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_repo_within_deadline() {
        let repo = Arc::new(FailingRepo::slow_reads(Duration::from_secs(1)));
        let options = ResetOptions::default().timeout(Duration::from_secs(10));
        let result = BootstrapConfig::new(repo.clone()).reset(options).await.unwrap();
        assert_eq!(result.peers, default_peers());
        assert_eq!(repo.writes(), 1);
    }

    #[test]
    fn options_from_config() {
        let mut naming = NodeConfig::test().naming;
        assert_eq!(ResetOptions::from(&naming), ResetOptions::default());

        naming.default_timeout_ms = NonZeroU64::new(2_500);
        assert_eq!(
            ResetOptions::from(&naming).timeout,
            Some(Duration::from_millis(2_500))
        );
    }
}
