//! Node configuration and its on-disk layout.

mod config_toml;
mod data_dir;
mod log_level;
mod multiaddr;
mod toml_merge;

pub use config_toml::{
    default_bootstrap_peers, BootstrapToml, ConfigReadError, LoggingToml, NamingToml, NodeConfig,
    PkdnsToml, DEFAULT_CONFIG,
};
pub use data_dir::DataDir;
pub use log_level::{InvalidLogLevel, LogLevel};
pub use multiaddr::{Multiaddr, MultiaddrError, Protocol};
pub use toml_merge::MergeError;

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error(transparent)]
    Read(#[from] ConfigReadError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Task(#[from] tokio::task::JoinError),
}

impl RepoError {
    pub fn code(&self) -> &'static str {
        match self {
            RepoError::Read(_) => "ERR_CONFIG_READ",
            RepoError::Serialize(_) => "ERR_CONFIG_SERIALIZE",
            RepoError::Io(_) | RepoError::Task(_) => "ERR_CONFIG_WRITE",
        }
    }
}

/// Whole-document access to the node configuration.
#[async_trait]
pub trait ConfigRepo: Send + Sync {
    /// The full config, including sections this node does not understand.
    async fn get_all(&self) -> Result<NodeConfig, RepoError>;

    /// Persist `config` as the full config.
    async fn replace(&self, config: NodeConfig) -> Result<(), RepoError>;
}

/// Config stored as `config.toml` in a [`DataDir`].
#[derive(Debug, Clone)]
pub struct FileRepo {
    config_file: PathBuf,
}

impl FileRepo {
    pub fn new(data_dir: &DataDir) -> Self {
        Self {
            config_file: data_dir.config_file_path(),
        }
    }

    pub fn config_file(&self) -> &PathBuf {
        &self.config_file
    }
}

#[async_trait]
impl ConfigRepo for FileRepo {
    async fn get_all(&self) -> Result<NodeConfig, RepoError> {
        match tokio::fs::read_to_string(&self.config_file).await {
            Ok(raw) => Ok(NodeConfig::from_str_with_defaults(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    "No config at {}, using defaults.",
                    self.config_file.display()
                );
                Ok(NodeConfig::default())
            }
            Err(e) => Err(ConfigReadError::from(e).into()),
        }
    }

    async fn replace(&self, config: NodeConfig) -> Result<(), RepoError> {
        let rendered = config.to_toml_string()?;
        let config_file = self.config_file.clone();

        // A crash mid-write must leave either the old or the new file behind.
        tokio::task::spawn_blocking(move || -> Result<(), RepoError> {
            let dir = match config_file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            std::io::Write::write_all(&mut tmp, rendered.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&config_file).map_err(|e| e.error)?;
            Ok(())
        })
        .await??;

        tracing::debug!("Wrote config to {}", self.config_file.display());
        Ok(())
    }
}

/// Config held in memory.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    config: RwLock<NodeConfig>,
}

impl MemoryRepo {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

#[async_trait]
impl ConfigRepo for MemoryRepo {
    async fn get_all(&self) -> Result<NodeConfig, RepoError> {
        Ok(self.config.read().await.clone())
    }

    async fn replace(&self, config: NodeConfig) -> Result<(), RepoError> {
        *self.config.write().await = config;
        Ok(())
    }
}
