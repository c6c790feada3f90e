use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use pkarr::{Keypair, PublicKey};

use super::{key_file, validate_key_name, KeyInfo, Keychain, KeychainError};

const SECRET_EXTENSION: &str = "key";
const PUBLIC_EXTENSION: &str = "pub";

/// Keychain backed by a directory.
///
/// Every entry is a key file sealed with the keychain passphrase (`<name>.key`)
/// next to its z32 public key (`<name>.pub`) so listing doesn't need to decrypt.
#[derive(Clone)]
pub struct FileKeychain {
    dir: PathBuf,
    passphrase: Arc<String>,
}

impl std::fmt::Debug for FileKeychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKeychain")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl FileKeychain {
    pub fn new(dir: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            passphrase: Arc::new(passphrase.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn secret_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{SECRET_EXTENSION}"))
    }

    fn public_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{PUBLIC_EXTENSION}"))
    }

    /// Generate a fresh keypair and store it under `name`.
    pub async fn generate_key(&self, name: &str) -> Result<KeyInfo, KeychainError> {
        let keypair = Keypair::random();
        self.add_keypair(name, &keypair).await
    }

    /// Store an existing keypair under `name`.
    pub async fn add_keypair(&self, name: &str, keypair: &Keypair) -> Result<KeyInfo, KeychainError> {
        validate_key_name(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        if tokio::fs::try_exists(self.secret_path(name)).await? {
            return Err(KeychainError::KeyExists(name.to_string()));
        }

        let sealed = {
            let keypair = keypair.clone();
            let passphrase = self.passphrase.clone();
            tokio::task::spawn_blocking(move || key_file::seal(&keypair, &passphrase)).await??
        };

        // The `.pub` file makes the entry visible, so it goes last.
        let public_key = keypair.public_key();
        tokio::fs::write(self.secret_path(name), sealed).await?;
        if let Err(e) = tokio::fs::write(self.public_path(name), public_key.to_string()).await {
            let _ = tokio::fs::remove_file(self.secret_path(name)).await;
            return Err(e.into());
        }
        tracing::debug!("Added key '{name}' ({public_key}) to the keychain.");

        Ok(KeyInfo {
            name: name.to_string(),
            public_key,
        })
    }

    /// All keys in the keychain, sorted by name.
    pub async fn list_keys(&self) -> Result<Vec<KeyInfo>, KeychainError> {
        let mut keys = vec![];
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PUBLIC_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match self.read_public_key(name).await {
                Ok(public_key) => keys.push(KeyInfo {
                    name: name.to_string(),
                    public_key,
                }),
                Err(e) => tracing::warn!("Skipping unreadable keychain entry '{name}': {e}"),
            }
        }
        keys.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(keys)
    }

    /// Delete the named key.
    pub async fn remove_key(&self, name: &str) -> Result<KeyInfo, KeychainError> {
        validate_key_name(name)?;
        let public_key = self.read_public_key(name).await?;
        tokio::fs::remove_file(self.secret_path(name)).await?;
        tokio::fs::remove_file(self.public_path(name)).await?;
        tracing::debug!("Removed key '{name}' from the keychain.");
        Ok(KeyInfo {
            name: name.to_string(),
            public_key,
        })
    }

    async fn read_public_key(&self, name: &str) -> Result<PublicKey, KeychainError> {
        let raw = read_entry(&self.public_path(name), name).await?;
        let text = String::from_utf8_lossy(&raw);
        PublicKey::try_from(text.trim())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()).into())
    }
}

async fn read_entry(path: &Path, name: &str) -> Result<Vec<u8>, KeychainError> {
    match tokio::fs::read(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(KeychainError::KeyNotFound(name.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Keychain for FileKeychain {
    async fn export_key(&self, name: &str, password: &str) -> Result<Vec<u8>, KeychainError> {
        validate_key_name(name)?;
        let sealed = read_entry(&self.secret_path(name), name).await?;
        let passphrase = self.passphrase.clone();
        let password = password.to_string();
        let exported = tokio::task::spawn_blocking(move || {
            let keypair = key_file::open(&sealed, &passphrase)?;
            key_file::seal(&keypair, &password)
        })
        .await??;
        Ok(exported)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::keychain::KeyFileError;

    fn keychain(dir: &TempDir) -> FileKeychain {
        FileKeychain::new(dir.path().join("keystore"), "keychain passphrase")
    }

    #[tokio::test]
    async fn generate_list_remove() {
        let dir = TempDir::new().unwrap();
        let keychain = keychain(&dir);
        assert!(keychain.list_keys().await.unwrap().is_empty());

        let bob = keychain.generate_key("bob").await.unwrap();
        let alice = keychain.generate_key("alice").await.unwrap();
        let listed = keychain.list_keys().await.unwrap();
        assert_eq!(listed, vec![alice.clone(), bob.clone()]);

        let removed = keychain.remove_key("bob").await.unwrap();
        assert_eq!(removed, bob);
        assert_eq!(keychain.list_keys().await.unwrap(), vec![alice]);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let keychain = keychain(&dir);
        keychain.generate_key("alice").await.unwrap();
        let err = keychain.generate_key("alice").await.unwrap_err();
        assert!(matches!(err, KeychainError::KeyExists(name) if name == "alice"));
    }

    #[tokio::test]
    async fn self_is_reserved() {
        let dir = TempDir::new().unwrap();
        let err = keychain(&dir).generate_key("self").await.unwrap_err();
        assert!(matches!(err, KeychainError::InvalidKeyName(_)));
    }

    #[tokio::test]
    async fn export_import_roundtrip() {
        let dir = TempDir::new().unwrap();
        let keychain = keychain(&dir);
        let keypair = Keypair::random();
        keychain.add_keypair("alice", &keypair).await.unwrap();

        let exported = keychain.export_key("alice", "one-time").await.unwrap();
        let imported = keychain.import_key(&exported, "one-time").await.unwrap();
        assert_eq!(imported.public_key(), keypair.public_key());

        let err = keychain.import_key(&exported, "other").await.unwrap_err();
        assert!(matches!(err, KeychainError::KeyFile(KeyFileError::DecryptFailed)));
    }

    #[tokio::test]
    async fn export_missing_key() {
        let dir = TempDir::new().unwrap();
        let err = keychain(&dir).export_key("ghost", "pw").await.unwrap_err();
        assert!(err.is_key_not_found());
    }

    #[tokio::test]
    async fn wrong_passphrase_cannot_export() {
        let dir = TempDir::new().unwrap();
        keychain(&dir).generate_key("alice").await.unwrap();
        let other = FileKeychain::new(dir.path().join("keystore"), "not the passphrase");
        let err = other.export_key("alice", "pw").await.unwrap_err();
        assert!(matches!(err, KeychainError::KeyFile(KeyFileError::DecryptFailed)));
    }

    #[tokio::test]
    async fn failed_add_leaves_no_entry() {
        let dir = TempDir::new().unwrap();
        let keychain = keychain(&dir);
        std::fs::create_dir_all(keychain.public_path("alice")).unwrap();

        assert!(keychain.generate_key("alice").await.is_err());
        assert!(!keychain.secret_path("alice").exists());
        assert!(keychain.export_key("alice", "pw").await.unwrap_err().is_key_not_found());

        std::fs::remove_dir(keychain.public_path("alice")).unwrap();
        let alice = keychain.generate_key("alice").await.unwrap();
        assert_eq!(keychain.list_keys().await.unwrap(), vec![alice]);
    }
}
