use std::path::Path;

use opendal::Operator;

/// Content addressed blobs, one object per blake3 hash.
#[derive(Debug, Clone)]
pub struct BlockStore {
    operator: Operator,
}

impl BlockStore {
    /// Store blocks in `dir`. The directory is created if it doesn't exist.
    pub fn file_system(dir: &Path) -> Result<Self, opendal::Error> {
        let root = match dir.to_str() {
            Some(root) => root,
            None => {
                return Err(opendal::Error::new(
                    opendal::ErrorKind::Unexpected,
                    "Invalid block store path",
                ))
            }
        };
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| {
                opendal::Error::new(opendal::ErrorKind::Unexpected, "Cannot create block dir")
                    .set_source(e)
            })?;
        }
        let builder = opendal::services::Fs::default().root(root);
        Ok(Self::from_operator(Operator::new(builder)?.finish()))
    }

    /// Keep blocks in memory. Everything is lost when the store is dropped.
    pub fn in_memory() -> Result<Self, opendal::Error> {
        let builder = opendal::services::Memory::default();
        Ok(Self::from_operator(Operator::new(builder)?.finish()))
    }

    pub fn from_operator(operator: Operator) -> Self {
        Self { operator }
    }

    fn block_path(hash: &blake3::Hash) -> String {
        hash.to_hex().to_string()
    }

    /// Store `data` and return its hash. Storing the same data twice is a no-op.
    pub async fn put(&self, data: Vec<u8>) -> Result<blake3::Hash, opendal::Error> {
        let hash = blake3::hash(&data);
        let path = Self::block_path(&hash);
        if self.operator.exists(&path).await? {
            return Ok(hash);
        }
        self.operator.write(&path, data).await?;
        tracing::debug!("Stored block {hash}");
        Ok(hash)
    }

    pub async fn get(&self, hash: &blake3::Hash) -> Result<Option<Vec<u8>>, opendal::Error> {
        match self.operator.read(&Self::block_path(hash)).await {
            Ok(buffer) => Ok(Some(buffer.to_vec())),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn has(&self, hash: &blake3::Hash) -> Result<bool, opendal::Error> {
        self.operator.exists(&Self::block_path(hash)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn put_get_has(store: &BlockStore) {
        let data = b"hello naming".to_vec();
        let expected = blake3::hash(&data);

        assert!(!store.has(&expected).await.unwrap());
        assert_eq!(store.get(&expected).await.unwrap(), None);

        let hash = store.put(data.clone()).await.unwrap();
        assert_eq!(hash, expected);
        assert!(store.has(&hash).await.unwrap());
        assert_eq!(store.get(&hash).await.unwrap(), Some(data.clone()));

        // Idempotent.
        assert_eq!(store.put(data).await.unwrap(), hash);
    }

    #[tokio::test]
    async fn in_memory_store() {
        let store = BlockStore::in_memory().unwrap();
        put_get_has(&store).await;
    }

    #[tokio::test]
    async fn file_system_store() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("blocks");
        let store = BlockStore::file_system(&dir).unwrap();
        assert!(dir.is_dir());
        put_get_has(&store).await;

        let hash = blake3::hash(b"hello naming");
        let on_disk = std::fs::read(dir.join(hash.to_hex().as_str())).unwrap();
        assert_eq!(on_disk, b"hello naming");
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
    }
}
