//!
//! Publishing a content path under a signing key.
//!

use std::{future::Future, sync::Arc, time::Duration};

use pkarr::Keypair;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    content_path::{ContentPath, PathError},
    identity::{KeyRef, NodeIdentity, OnlineStatus},
    keychain::{Keychain, KeychainError},
    lifetime::{parse_lifetime, LifetimeError, DEFAULT_LIFETIME},
    naming::{NamingEngine, NamingError},
    repo::NamingToml,
    resolver::{ContentResolver, ResolveError},
    timeout::{with_timeout, TimeoutError},
};

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("node is offline, publishing needs a node in online mode")]
    Offline,
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error(transparent)]
    InvalidDuration(#[from] LifetimeError),
    #[error("cannot get key: {0}")]
    CannotGetKey(#[source] KeychainError),
    #[error("cannot resolve path: {0}")]
    Resolve(#[from] ResolveError),
    #[error("cannot publish record: {0}")]
    Publish(#[from] NamingError),
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    #[error("publish was aborted")]
    Aborted,
}

impl PublishError {
    /// Stable machine readable code of this error.
    pub fn code(&self) -> &'static str {
        match self {
            PublishError::Offline => "ERR_OFFLINE",
            PublishError::InvalidPath(_) => "ERR_INVALID_PATH",
            PublishError::InvalidDuration(_) => "ERR_INVALID_DURATION",
            PublishError::CannotGetKey(_) => "ERR_CANNOT_GET_KEY",
            PublishError::Resolve(_) => "ERR_RESOLVE_FAILED",
            PublishError::Publish(_) => "ERR_PUBLISH_FAILED",
            PublishError::Timeout(_) => "ERR_TIMEOUT",
            PublishError::Aborted => "ERR_ABORTED",
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, PublishError::Offline)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PublishError::Timeout(_))
    }
}

/// Options of a single publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOptions {
    /// Check that the path is reachable before publishing it.
    pub resolve: bool,
    /// How long the record stays valid, e.g. `"24h"`.
    pub lifetime: String,
    /// Key to sign with.
    pub key: KeyRef,
    /// Deadline of the whole operation.
    pub timeout: Option<Duration>,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            resolve: true,
            lifetime: DEFAULT_LIFETIME.to_string(),
            key: KeyRef::SelfIdentity,
            timeout: None,
        }
    }
}

impl PublishOptions {
    pub fn resolve(mut self, resolve: bool) -> Self {
        self.resolve = resolve;
        self
    }

    pub fn lifetime(mut self, lifetime: impl Into<String>) -> Self {
        self.lifetime = lifetime.into();
        self
    }

    pub fn key(mut self, key: impl Into<KeyRef>) -> Self {
        self.key = key.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&NamingToml> for PublishOptions {
    fn from(config: &NamingToml) -> Self {
        Self {
            resolve: config.resolve_by_default,
            lifetime: config.default_lifetime.clone(),
            key: KeyRef::SelfIdentity,
            timeout: config
                .default_timeout_ms
                .map(|ms| Duration::from_millis(ms.get())),
        }
    }
}

/// A published name and the value it now points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub name: String,
    pub value: String,
}

/// Publishes content paths as signed name records.
#[derive(Clone)]
pub struct NamePublisher {
    identity: NodeIdentity,
    online: Arc<dyn OnlineStatus>,
    keychain: Arc<dyn Keychain>,
    resolver: Arc<dyn ContentResolver>,
    engine: Arc<dyn NamingEngine>,
}

impl NamePublisher {
    pub fn new(
        identity: NodeIdentity,
        online: Arc<dyn OnlineStatus>,
        keychain: Arc<dyn Keychain>,
        resolver: Arc<dyn ContentResolver>,
        engine: Arc<dyn NamingEngine>,
    ) -> Self {
        Self {
            identity,
            online,
            keychain,
            resolver,
            engine,
        }
    }

    /// Publish `value` under the name of `options.key`.
    ///
    /// `value` is normalized into a [`ContentPath`] first. The key lookup and
    /// the optional reachability check of the path run concurrently, and the
    /// record is only published when both succeed.
    pub async fn publish(
        &self,
        value: &str,
        options: PublishOptions,
    ) -> Result<PublishResult, PublishError> {
        with_timeout(options.timeout, self.publish_inner(value, options)).await
    }

    async fn publish_inner(
        &self,
        value: &str,
        options: PublishOptions,
    ) -> Result<PublishResult, PublishError> {
        if !self.online.is_online() {
            return Err(PublishError::Offline);
        }

        let path = ContentPath::normalize(value)?;
        let lifetime = parse_lifetime(&options.lifetime)?;
        tracing::debug!(
            "Publishing {path} with key {} for {lifetime}s (resolve: {}).",
            options.key,
            options.resolve
        );

        // Dropping the guard, on error or when the caller gives up, stops
        // whichever task is still running.
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        let key_task = tokio::spawn(cancellable(
            cancel.child_token(),
            lookup_key(self.identity.clone(), self.keychain.clone(), options.key),
        ));
        let path_task = tokio::spawn(cancellable(
            cancel.child_token(),
            check_path(self.resolver.clone(), path.clone(), options.resolve),
        ));
        let (keypair, ()) = tokio::try_join!(join(key_task), join(path_task))?;

        let record = self
            .engine
            .publish(&keypair, path.as_str().as_bytes(), lifetime)
            .await?;
        let value = String::from_utf8_lossy(&record.value).into_owned();

        tracing::info!("Published {value} to {}", record.name);
        Ok(PublishResult {
            name: record.name,
            value,
        })
    }
}

async fn lookup_key(
    identity: NodeIdentity,
    keychain: Arc<dyn Keychain>,
    key: KeyRef,
) -> Result<Keypair, PublishError> {
    let name = match key {
        KeyRef::SelfIdentity => return Ok(identity.keypair().clone()),
        KeyRef::Named(name) => name,
    };

    // The exported copy only lives for this lookup.
    let password = hex::encode(rand::random::<[u8; 16]>());
    let keypair = async {
        let encoded = keychain.export_key(&name, &password).await?;
        keychain.import_key(&encoded, &password).await
    }
    .await
    .map_err(|e| {
        tracing::error!("Cannot get key '{name}': {e}");
        PublishError::CannotGetKey(e)
    })?;

    tracing::debug!("Using key '{name}' ({}).", keypair.public_key());
    Ok(keypair)
}

async fn check_path(
    resolver: Arc<dyn ContentResolver>,
    path: ContentPath,
    resolve: bool,
) -> Result<(), PublishError> {
    if !resolve {
        return Ok(());
    }
    resolver.resolve(&path).await.map_err(|e| {
        tracing::error!("Cannot resolve {path}: {e}");
        PublishError::Resolve(e)
    })?;
    tracing::debug!("Resolved {path}.");
    Ok(())
}

async fn cancellable<T>(
    cancel: CancellationToken,
    task: impl Future<Output = Result<T, PublishError>>,
) -> Result<T, PublishError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PublishError::Aborted),
        result = task => result,
    }
}

async fn join<T>(handle: JoinHandle<Result<T, PublishError>>) -> Result<T, PublishError> {
    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(PublishError::Aborted),
    }
}
