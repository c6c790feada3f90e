//! Named signing keys.

mod file_keychain;
pub mod key_file;

pub use file_keychain::FileKeychain;
pub use key_file::KeyFileError;

use async_trait::async_trait;
use pkarr::{Keypair, PublicKey};

use crate::identity::SELF_KEY_NAME;

#[derive(thiserror::Error, Debug)]
pub enum KeychainError {
    #[error("key '{0}' not found")]
    KeyNotFound(String),
    #[error("key '{0}' already exists")]
    KeyExists(String),
    #[error("invalid key name '{0}'")]
    InvalidKeyName(String),
    #[error(transparent)]
    KeyFile(#[from] KeyFileError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("keychain task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl KeychainError {
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, KeychainError::KeyNotFound(_))
    }
}

/// A key stored in a keychain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub name: String,
    pub public_key: PublicKey,
}

/// Store of named private keys that can hand out password protected copies.
#[async_trait]
pub trait Keychain: Send + Sync {
    /// Export the named key encrypted under `password`.
    async fn export_key(&self, name: &str, password: &str) -> Result<Vec<u8>, KeychainError>;

    /// Decode a key previously produced by [`Keychain::export_key`].
    async fn import_key(&self, encoded: &[u8], password: &str) -> Result<Keypair, KeychainError> {
        let encoded = encoded.to_vec();
        let password = password.to_string();
        let keypair =
            tokio::task::spawn_blocking(move || key_file::open(&encoded, &password)).await??;
        Ok(keypair)
    }
}

/// Key names are used as file names and must not collide with the node key.
pub fn validate_key_name(name: &str) -> Result<(), KeychainError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name != SELF_KEY_NAME
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(KeychainError::InvalidKeyName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_name_validation() {
        for name in ["alice", "bob-2", "work_key", "a.b"] {
            assert!(validate_key_name(name).is_ok(), "'{name}' should be valid");
        }
        let too_long = "x".repeat(65);
        for name in ["", "self", ".hidden", "../escape", "with space", too_long.as_str()] {
            assert!(validate_key_name(name).is_err(), "'{name}' should be invalid");
        }
    }
}
