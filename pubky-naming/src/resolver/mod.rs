//! Checking that the content behind a path can be reached.

mod block_store;
mod local;

pub use block_store::BlockStore;
pub use local::{LocalResolver, MAX_LINK_DEPTH};

use async_trait::async_trait;

use crate::{
    content_path::{ContentPath, PathError},
    naming::NamingError,
};

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("more than {0} links followed")]
    TooManyLinks(usize),
    #[error("name record of {key} does not hold a path: {source}")]
    InvalidLink {
        key: String,
        #[source]
        source: PathError,
    },
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error("block store: {0}")]
    BlockStore(#[from] opendal::Error),
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_))
    }
}

/// Resolves a content path, failing if the content cannot be reached.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn resolve(&self, path: &ContentPath) -> Result<(), ResolveError>;
}
