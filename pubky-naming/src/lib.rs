//! Publish content paths under pkarr keys on the Mainline DHT.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use pubky_naming::*;
//!
//! let data_dir = DataDir::default();
//! data_dir.ensure_data_dir_exists_and_is_accessible()?;
//! let config = data_dir.read_or_create_config_file()?;
//! let identity = NodeIdentity::new(data_dir.read_or_create_keypair()?);
//!
//! let blocks = BlockStore::file_system(&data_dir.blocks_dir())?;
//! let engine = Arc::new(PkarrNamingEngine::new(PkarrClientBuilder::from(&config).build()?));
//! let publisher = NamePublisher::new(
//!     identity,
//!     Arc::new(NodeStatus::new(true)),
//!     Arc::new(FileKeychain::new(data_dir.keystore_dir(), "passphrase")),
//!     Arc::new(LocalResolver::new(blocks, engine.clone())),
//!     engine,
//! );
//! let result = publisher
//!     .publish("/blob/af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262", PublishOptions::default())
//!     .await?;
//! println!("{} -> {}", result.name, result.value);
//! # Ok(())
//! # }
//! ```

mod api;
mod content_path;
mod identity;
pub mod keychain;
mod lifetime;
pub mod logging;
pub mod naming;
pub mod repo;
pub mod resolver;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod timeout;

pub use api::{
    BootstrapConfig, BootstrapPeers, NamePublisher, PublishError, PublishOptions, PublishResult,
    ResetError, ResetOptions,
};
pub use content_path::{ContentPath, PathError, PathRoot};
pub use identity::{KeyRef, NodeIdentity, NodeStatus, OnlineStatus, SELF_KEY_NAME};
pub use keychain::{FileKeychain, Keychain, KeychainError};
pub use lifetime::{parse_lifetime, LifetimeError, DEFAULT_LIFETIME};
pub use naming::{NameRecord, NamingEngine, NamingError, PkarrClientBuilder, PkarrNamingEngine};
pub use repo::{ConfigRepo, DataDir, FileRepo, MemoryRepo, Multiaddr, NodeConfig, RepoError};
pub use resolver::{BlockStore, ContentResolver, LocalResolver, ResolveError};
pub use timeout::{with_timeout, TimeoutError};

// Re-exports
pub use pkarr::{Keypair, PublicKey};
