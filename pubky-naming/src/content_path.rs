//! Canonical content paths.
//!
//! Two namespaces exist:
//! - `/blob/<blake3 hex>[/sub/path]` addresses content by hash.
//! - `/pkarr/<z32 public key>[/sub/path]` points through another name record.

use std::{fmt, str::FromStr};

use pkarr::PublicKey;

const BLOB_NAMESPACE: &str = "blob";
const PKARR_NAMESPACE: &str = "pkarr";

/// The input could not be turned into a [`ContentPath`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path: empty")]
    Empty,
    #[error("invalid path '{0}': not a hash, a public key or an absolute path")]
    NotAPath(String),
    #[error("invalid path: unknown namespace '/{0}'")]
    UnknownNamespace(String),
    #[error("invalid path: '/{0}' is missing its root")]
    MissingRoot(&'static str),
    #[error("invalid path: '{0}' is not a blake3 hex hash")]
    InvalidHash(String),
    #[error("invalid path: '{0}' is not a public key")]
    InvalidPublicKey(String),
    #[error("invalid path: segment '{0}' is not allowed")]
    InvalidSegment(String),
}

/// What a path is rooted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRoot {
    /// Content addressed by its blake3 hash.
    Blob(blake3::Hash),
    /// The value of the name record published by this key.
    Pkarr(PublicKey),
}

impl fmt::Display for PathRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRoot::Blob(hash) => write!(f, "/{BLOB_NAMESPACE}/{}", hash.to_hex()),
            PathRoot::Pkarr(key) => write!(f, "/{PKARR_NAMESPACE}/{key}"),
        }
    }
}

/// A normalized content path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPath {
    normalized: String,
    root: PathRoot,
    segments: Vec<String>,
}

impl ContentPath {
    /// Normalize user input into a canonical path.
    ///
    /// A bare hash becomes `/blob/<hash>`, a bare (optionally `pubky` prefixed)
    /// public key becomes `/pkarr/<key>`. Repeated and trailing slashes are dropped.
    pub fn normalize(input: &str) -> Result<Self, PathError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        if !input.starts_with('/') {
            if input.contains('/') {
                return Err(PathError::NotAPath(input.to_string()));
            }
            let root = parse_hash(input)
                .map(PathRoot::Blob)
                .or_else(|_| parse_public_key(input).map(PathRoot::Pkarr))
                .map_err(|_| PathError::NotAPath(input.to_string()))?;
            return Ok(Self::new(root, vec![]));
        }

        let mut parts = input.split('/').filter(|part| !part.is_empty());
        let root = match parts.next() {
            Some(BLOB_NAMESPACE) => {
                let raw = parts.next().ok_or(PathError::MissingRoot(BLOB_NAMESPACE))?;
                PathRoot::Blob(parse_hash(raw)?)
            }
            Some(PKARR_NAMESPACE) => {
                let raw = parts.next().ok_or(PathError::MissingRoot(PKARR_NAMESPACE))?;
                PathRoot::Pkarr(parse_public_key(raw)?)
            }
            Some(other) => return Err(PathError::UnknownNamespace(other.to_string())),
            None => return Err(PathError::NotAPath(input.to_string())),
        };

        let segments = parts
            .map(|segment| match segment {
                "." | ".." => Err(PathError::InvalidSegment(segment.to_string())),
                _ => Ok(segment.to_string()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(root, segments))
    }

    fn new(root: PathRoot, segments: Vec<String>) -> Self {
        let mut normalized = root.to_string();
        for segment in &segments {
            normalized.push('/');
            normalized.push_str(segment);
        }
        Self {
            normalized,
            root,
            segments,
        }
    }

    /// The canonical text form.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    /// Path segments below the root.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Append `segments` below this path. Used when following a `/pkarr/` link
    /// whose record points somewhere else.
    pub fn join(&self, segments: &[String]) -> Self {
        let mut joined = self.segments.clone();
        joined.extend(segments.iter().cloned());
        Self::new(self.root.clone(), joined)
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl FromStr for ContentPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl TryFrom<&str> for ContentPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::normalize(value)
    }
}

fn parse_hash(raw: &str) -> Result<blake3::Hash, PathError> {
    if raw.len() != 64 {
        return Err(PathError::InvalidHash(raw.to_string()));
    }
    blake3::Hash::from_hex(raw).map_err(|_| PathError::InvalidHash(raw.to_string()))
}

fn parse_public_key(raw: &str) -> Result<PublicKey, PathError> {
    // Accept the `pubky<z32>` rendering used across Pubky as well.
    let z32 = match raw.strip_prefix("pubky") {
        Some(stripped) if stripped.len() == 52 => stripped,
        _ => raw,
    };
    PublicKey::try_from(z32).map_err(|_| PathError::InvalidPublicKey(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use pkarr::Keypair;

    use super::*;

    fn sample_hash() -> blake3::Hash {
        blake3::hash(b"hello pubky")
    }

    #[test]
    fn bare_hash_becomes_blob_path() {
        let hash = sample_hash();
        let path = ContentPath::normalize(&hash.to_hex()).unwrap();
        assert_eq!(path.as_str(), format!("/blob/{}", hash.to_hex()));
        assert_eq!(path.root(), &PathRoot::Blob(hash));
        assert!(path.segments().is_empty());
    }

    #[test]
    fn uppercase_hash_is_lowercased() {
        let hash = sample_hash();
        let upper = hash.to_hex().to_uppercase();
        let path = ContentPath::normalize(&format!("/blob/{upper}")).unwrap();
        assert_eq!(path.as_str(), format!("/blob/{}", hash.to_hex()));
    }

    #[test]
    fn bare_public_key_becomes_pkarr_path() {
        let key = Keypair::random().public_key();
        let path = ContentPath::normalize(&key.to_string()).unwrap();
        assert_eq!(path.as_str(), format!("/pkarr/{key}"));

        let prefixed = ContentPath::normalize(&format!("pubky{key}")).unwrap();
        assert_eq!(prefixed, path);
    }

    #[test]
    fn collapses_slashes() {
        let hash = sample_hash().to_hex();
        let path = ContentPath::normalize(&format!("//blob//{hash}///docs/readme.md/")).unwrap();
        assert_eq!(path.as_str(), format!("/blob/{hash}/docs/readme.md"));
        assert_eq!(path.segments(), &["docs".to_string(), "readme.md".to_string()]);
    }

    #[test]
    fn normalizing_is_idempotent() {
        let key = Keypair::random().public_key();
        let once = ContentPath::normalize(&format!("/pkarr/{key}/a//b/")).unwrap();
        let twice = ContentPath::normalize(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn join_appends_segments() {
        let hash = sample_hash().to_hex();
        let base = ContentPath::normalize(&format!("/blob/{hash}/a")).unwrap();
        let joined = base.join(&["b".to_string(), "c".to_string()]);
        assert_eq!(joined.as_str(), format!("/blob/{hash}/a/b/c"));
    }

    #[test]
    fn rejects_invalid_paths() {
        let hash = sample_hash().to_hex();
        let cases = [
            ("", PathError::Empty),
            ("   ", PathError::Empty),
            ("not-a-thing", PathError::NotAPath("not-a-thing".into())),
            ("blob/abc", PathError::NotAPath("blob/abc".into())),
            ("/", PathError::NotAPath("/".into())),
            ("/ipfs/abc", PathError::UnknownNamespace("ipfs".into())),
            ("/blob", PathError::MissingRoot("blob")),
            ("/pkarr/", PathError::MissingRoot("pkarr")),
            ("/blob/abcd", PathError::InvalidHash("abcd".into())),
            ("/pkarr/nope", PathError::InvalidPublicKey("nope".into())),
        ];
        for (input, expected) in cases {
            assert_eq!(ContentPath::normalize(input), Err(expected), "input: {input:?}");
        }

        let traversal = format!("/blob/{hash}/../etc");
        assert_eq!(
            ContentPath::normalize(&traversal),
            Err(PathError::InvalidSegment("..".into()))
        );
    }
}
