//! Recording collaborators for tests.
//!
//! Every mock counts its calls and can be switched into failing.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use pkarr::{Keypair, PublicKey};

use crate::{
    content_path::ContentPath,
    identity::OnlineStatus,
    keychain::{KeyFileError, Keychain, KeychainError},
    naming::{NameRecord, NamingEngine, NamingError},
    repo::{ConfigReadError, ConfigRepo, NodeConfig, RepoError},
    resolver::{ContentResolver, ResolveError},
};

/// Fixed online status.
#[derive(Debug, Clone, Copy)]
pub struct StaticOnline(pub bool);

impl OnlineStatus for StaticOnline {
    fn is_online(&self) -> bool {
        self.0
    }
}

/// A call to [`Keychain::export_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportCall {
    pub name: String,
    pub password: String,
}

/// A call to [`Keychain::import_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCall {
    pub encoded: Vec<u8>,
    pub password: String,
}

/// Keychain holding plain keypairs. Exports are the raw secret key bytes.
#[derive(Debug, Default)]
pub struct MockKeychain {
    keys: Mutex<HashMap<String, Keypair>>,
    exports: Mutex<Vec<ExportCall>>,
    imports: Mutex<Vec<ImportCall>>,
    fail_export: AtomicBool,
    fail_import: AtomicBool,
}

impl MockKeychain {
    pub fn with_key(name: &str, keypair: Keypair) -> Self {
        let keychain = Self::default();
        keychain
            .keys
            .lock()
            .expect("lock poisoned")
            .insert(name.to_string(), keypair);
        keychain
    }

    /// Make every export fail with [`KeychainError::Io`].
    pub fn fail_export(&self) {
        self.fail_export.store(true, Ordering::SeqCst);
    }

    /// Make every import fail with [`KeyFileError::DecryptFailed`].
    pub fn fail_import(&self) {
        self.fail_import.store(true, Ordering::SeqCst);
    }

    pub fn exports(&self) -> Vec<ExportCall> {
        self.exports.lock().expect("lock poisoned").clone()
    }

    pub fn imports(&self) -> Vec<ImportCall> {
        self.imports.lock().expect("lock poisoned").clone()
    }

    pub fn calls(&self) -> usize {
        self.exports().len() + self.imports().len()
    }
}

#[async_trait]
impl Keychain for MockKeychain {
    async fn export_key(&self, name: &str, password: &str) -> Result<Vec<u8>, KeychainError> {
        self.exports.lock().expect("lock poisoned").push(ExportCall {
            name: name.to_string(),
            password: password.to_string(),
        });
        if self.fail_export.load(Ordering::SeqCst) {
            return Err(KeychainError::Io(std::io::Error::other("keystore unavailable")));
        }
        let keys = self.keys.lock().expect("lock poisoned");
        let keypair = keys
            .get(name)
            .ok_or_else(|| KeychainError::KeyNotFound(name.to_string()))?;
        Ok(keypair.secret_key().to_vec())
    }

    async fn import_key(&self, encoded: &[u8], password: &str) -> Result<Keypair, KeychainError> {
        self.imports.lock().expect("lock poisoned").push(ImportCall {
            encoded: encoded.to_vec(),
            password: password.to_string(),
        });
        if self.fail_import.load(Ordering::SeqCst) {
            return Err(KeyFileError::DecryptFailed.into());
        }
        let secret: [u8; 32] = encoded
            .try_into()
            .map_err(|_| KeyFileError::InvalidSecretKeyLength(encoded.len()))?;
        Ok(Keypair::from_secret_key(&secret))
    }
}

/// Resolver that accepts every path unless told otherwise.
#[derive(Debug, Default)]
pub struct MockResolver {
    calls: Mutex<Vec<String>>,
    completed: AtomicUsize,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MockResolver {
    pub fn failing() -> Self {
        let resolver = Self::default();
        resolver.fail.store(true, Ordering::SeqCst);
        resolver
    }

    /// Take `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        let resolver = Self::default();
        *resolver.delay.lock().expect("lock poisoned") = Some(delay);
        resolver
    }

    /// Normalized paths this resolver was asked about.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Calls that ran to the end, including the delay.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentResolver for MockResolver {
    async fn resolve(&self, path: &ContentPath) -> Result<(), ResolveError> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .push(path.to_string());
        let delay = *self.delay.lock().expect("lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ResolveError::NotFound(path.to_string()));
        }
        Ok(())
    }
}

/// A call to [`NamingEngine::publish`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishCall {
    pub public_key: PublicKey,
    pub value: Vec<u8>,
    pub lifetime: f64,
}

/// Naming engine keeping its records in memory.
#[derive(Debug, Default)]
pub struct MockEngine {
    records: Mutex<HashMap<PublicKey, Vec<u8>>>,
    publishes: Mutex<Vec<PublishCall>>,
    resolves: AtomicUsize,
    fail_publish: AtomicBool,
}

impl MockEngine {
    pub fn fail_publish(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    pub fn insert_record(&self, public_key: &PublicKey, value: String) {
        self.records
            .lock()
            .expect("lock poisoned")
            .insert(public_key.clone(), value.into_bytes());
    }

    pub fn publishes(&self) -> Vec<PublishCall> {
        self.publishes.lock().expect("lock poisoned").clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NamingEngine for MockEngine {
    async fn publish(
        &self,
        keypair: &Keypair,
        value: &[u8],
        lifetime: f64,
    ) -> Result<NameRecord, NamingError> {
        let public_key = keypair.public_key();
        self.publishes
            .lock()
            .expect("lock poisoned")
            .push(PublishCall {
                public_key: public_key.clone(),
                value: value.to_vec(),
                lifetime,
            });
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(NamingError::InvalidRecord("publish disabled".to_string()));
        }
        self.records
            .lock()
            .expect("lock poisoned")
            .insert(public_key.clone(), value.to_vec());
        Ok(NameRecord {
            name: public_key.to_string(),
            value: value.to_vec(),
        })
    }

    async fn resolve(&self, public_key: &PublicKey) -> Result<Option<NameRecord>, NamingError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().expect("lock poisoned");
        Ok(records.get(public_key).map(|value| NameRecord {
            name: public_key.to_string(),
            value: value.clone(),
        }))
    }
}

/// Config repo that fails or stalls reads and writes on demand.
#[derive(Debug, Default)]
pub struct FailingRepo {
    fail_reads: bool,
    fail_writes: bool,
    read_delay: Option<Duration>,
    writes: AtomicUsize,
}

impl FailingRepo {
    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Default::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    /// Reads succeed, but only after `delay`.
    pub fn slow_reads(delay: Duration) -> Self {
        Self {
            read_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigRepo for FailingRepo {
    async fn get_all(&self) -> Result<NodeConfig, RepoError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads {
            let e = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
            return Err(ConfigReadError::from(e).into());
        }
        Ok(NodeConfig::default())
    }

    async fn replace(&self, _config: NodeConfig) -> Result<(), RepoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(std::io::Error::other("disk full").into());
        }
        Ok(())
    }
}
