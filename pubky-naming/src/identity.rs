//! The node's own identity and network status.

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use pkarr::{Keypair, PublicKey};
use serde::{Deserialize, Serialize};

/// Name that always refers to the node's own key.
pub const SELF_KEY_NAME: &str = "self";

/// Which key signs a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum KeyRef {
    /// The node identity key.
    #[default]
    SelfIdentity,
    /// A key stored in the keychain under this name.
    Named(String),
}

impl KeyRef {
    pub fn is_self(&self) -> bool {
        matches!(self, KeyRef::SelfIdentity)
    }
}

impl From<&str> for KeyRef {
    /// An empty name means the node key.
    fn from(value: &str) -> Self {
        match value {
            "" | SELF_KEY_NAME => KeyRef::SelfIdentity,
            name => KeyRef::Named(name.to_string()),
        }
    }
}

impl From<String> for KeyRef {
    fn from(value: String) -> Self {
        if value.is_empty() || value == SELF_KEY_NAME {
            return KeyRef::SelfIdentity;
        }
        KeyRef::Named(value)
    }
}

impl FromStr for KeyRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRef::SelfIdentity => f.write_str(SELF_KEY_NAME),
            KeyRef::Named(name) => f.write_str(name),
        }
    }
}

impl Serialize for KeyRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeyRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(String::deserialize(deserializer)?.into())
    }
}

/// The node's signing identity. Bound once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    keypair: Arc<Keypair>,
}

impl NodeIdentity {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }
}

/// Whether the node currently participates in the network.
pub trait OnlineStatus: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Shared online flag flipped by whoever owns the network client.
#[derive(Debug, Clone, Default)]
pub struct NodeStatus {
    online: Arc<AtomicBool>,
}

impl NodeStatus {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl OnlineStatus for NodeStatus {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}
