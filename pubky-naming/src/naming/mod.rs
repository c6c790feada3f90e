//! Signing and advertising name records.

mod client_builder;
mod pkarr_engine;

pub use client_builder::PkarrClientBuilder;
pub use pkarr_engine::PkarrNamingEngine;

use async_trait::async_trait;
use pkarr::{Keypair, PublicKey};

#[derive(thiserror::Error, Debug)]
pub enum NamingError {
    #[error(transparent)]
    PublishFailed(#[from] pkarr::errors::PublishError),
    #[error("invalid name record: {0}")]
    InvalidRecord(String),
}

impl NamingError {
    pub fn is_publish_failed(&self) -> bool {
        matches!(self, NamingError::PublishFailed(_))
    }
}

/// A published name record as returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    /// Name derived from the signing public key.
    pub name: String,
    /// The published value.
    pub value: Vec<u8>,
}

/// Signs name records and advertises them on the network.
#[async_trait]
pub trait NamingEngine: Send + Sync {
    /// Sign `value` with `keypair` and publish it for `lifetime` seconds.
    async fn publish(
        &self,
        keypair: &Keypair,
        value: &[u8],
        lifetime: f64,
    ) -> Result<NameRecord, NamingError>;

    /// Look up the latest non-stale record published by `public_key`.
    async fn resolve(&self, public_key: &PublicKey) -> Result<Option<NameRecord>, NamingError>;
}
