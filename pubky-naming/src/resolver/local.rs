use std::sync::Arc;

use async_trait::async_trait;

use super::{BlockStore, ContentResolver, ResolveError};
use crate::{
    content_path::{ContentPath, PathRoot},
    naming::NamingEngine,
};

/// Maximum number of `/pkarr/` links followed for one path.
pub const MAX_LINK_DEPTH: usize = 8;

/// Resolves blob roots against the local block store and follows
/// `/pkarr/` links through the naming engine.
///
/// Only the root is checked. Sub paths below a blob are not looked into.
#[derive(Clone)]
pub struct LocalResolver {
    blocks: BlockStore,
    engine: Arc<dyn NamingEngine>,
}

impl LocalResolver {
    pub fn new(blocks: BlockStore, engine: Arc<dyn NamingEngine>) -> Self {
        Self { blocks, engine }
    }
}

#[async_trait]
impl ContentResolver for LocalResolver {
    async fn resolve(&self, path: &ContentPath) -> Result<(), ResolveError> {
        let mut current = path.clone();
        for _ in 0..=MAX_LINK_DEPTH {
            let key = match current.root() {
                PathRoot::Blob(hash) => {
                    if self.blocks.has(hash).await? {
                        return Ok(());
                    }
                    return Err(ResolveError::NotFound(current.to_string()));
                }
                PathRoot::Pkarr(key) => key.clone(),
            };

            let Some(record) = self.engine.resolve(&key).await? else {
                return Err(ResolveError::NotFound(current.to_string()));
            };
            let value = String::from_utf8_lossy(&record.value);
            let target =
                ContentPath::normalize(&value).map_err(|source| ResolveError::InvalidLink {
                    key: key.to_string(),
                    source,
                })?;
            tracing::debug!("Following {current} to {target}");
            current = target.join(current.segments());
        }
        Err(ResolveError::TooManyLinks(MAX_LINK_DEPTH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use pkarr::Keypair;

    fn resolver(engine: Arc<MockEngine>) -> LocalResolver {
        LocalResolver::new(BlockStore::in_memory().unwrap(), engine)
    }

    #[tokio::test]
    async fn blob_found_and_missing() {
        let resolver = resolver(Arc::new(MockEngine::default()));

        let hash = resolver.blocks.put(b"content".to_vec()).await.unwrap();
        let found = ContentPath::normalize(&hash.to_hex()).unwrap();
        resolver.resolve(&found).await.unwrap();

        let missing = ContentPath::normalize(&blake3::hash(b"other").to_hex()).unwrap();
        let err = resolver.resolve(&missing).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn follows_pkarr_link_to_blob() {
        let engine = Arc::new(MockEngine::default());
        let resolver = resolver(engine.clone());

        let hash = resolver.blocks.put(b"content".to_vec()).await.unwrap();
        let keypair = Keypair::random();
        engine.insert_record(&keypair.public_key(), format!("/blob/{}", hash.to_hex()));

        let path = ContentPath::normalize(&format!("/pkarr/{}/index.html", keypair.public_key()))
            .unwrap();
        resolver.resolve(&path).await.unwrap();
        assert_eq!(engine.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let resolver = resolver(Arc::new(MockEngine::default()));
        let path = ContentPath::normalize(&Keypair::random().public_key().to_string()).unwrap();
        assert!(resolver.resolve(&path).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn link_cycle_stops() {
        let engine = Arc::new(MockEngine::default());
        let resolver = resolver(engine.clone());

        let a = Keypair::random().public_key();
        let b = Keypair::random().public_key();
        engine.insert_record(&a, format!("/pkarr/{b}"));
        engine.insert_record(&b, format!("/pkarr/{a}"));

        let path = ContentPath::normalize(&format!("/pkarr/{a}")).unwrap();
        let err = resolver.resolve(&path).await.unwrap_err();
        assert!(matches!(err, ResolveError::TooManyLinks(MAX_LINK_DEPTH)));
        assert_eq!(engine.resolve_calls(), MAX_LINK_DEPTH + 1);
    }

    #[tokio::test]
    async fn record_without_path_is_invalid_link() {
        let engine = Arc::new(MockEngine::default());
        let resolver = resolver(engine.clone());

        let key = Keypair::random().public_key();
        engine.insert_record(&key, "hello world".to_string());

        let path = ContentPath::normalize(&format!("/pkarr/{key}")).unwrap();
        let err = resolver.resolve(&path).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidLink { .. }));
    }
}
