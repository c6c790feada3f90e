//!
//! Name records as pkarr packets on the Mainline DHT.
//!

use async_trait::async_trait;
use pkarr::{
    dns::{rdata::RData, rdata::TXT, Name},
    Keypair, PublicKey, SignedPacket, Timestamp,
};

use super::{NameRecord, NamingEngine, NamingError};

/// TXT record holding the published value.
const LINK_RECORD: &str = "_link";
/// Maximum length of a single DNS character-string.
const MAX_CHARACTER_STRING: usize = 255;

/// Publishes name records as a `_link` TXT record whose TTL is the record lifetime.
#[derive(Debug, Clone)]
pub struct PkarrNamingEngine {
    client: pkarr::Client,
}

impl PkarrNamingEngine {
    pub fn new(client: pkarr::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &pkarr::Client {
        &self.client
    }

    fn create_signed_packet(
        keypair: &Keypair,
        value: &str,
        ttl: u32,
    ) -> Result<SignedPacket, NamingError> {
        let mut txt = TXT::new();
        for chunk in character_strings(value) {
            txt = txt
                .with_string(chunk)
                .map_err(|e| NamingError::InvalidRecord(e.to_string()))?;
        }
        let name = Name::new(LINK_RECORD).map_err(|e| NamingError::InvalidRecord(e.to_string()))?;

        SignedPacket::builder()
            .txt(name, txt, ttl)
            .build(keypair)
            .map_err(|e| NamingError::InvalidRecord(e.to_string()))
    }
}

#[async_trait]
impl NamingEngine for PkarrNamingEngine {
    async fn publish(
        &self,
        keypair: &Keypair,
        value: &[u8],
        lifetime: f64,
    ) -> Result<NameRecord, NamingError> {
        let text = std::str::from_utf8(value)
            .map_err(|_| NamingError::InvalidRecord("value is not valid UTF-8".to_string()))?;
        let ttl = lifetime_to_ttl(lifetime);
        let packet = Self::create_signed_packet(keypair, text, ttl)?;

        if let Err(e) = self.client.publish(&packet, None).await {
            tracing::warn!(
                "Failed to publish the name record of {} to the DHT: {e}",
                keypair.public_key()
            );
            return Err(e.into());
        }
        tracing::debug!(
            "Published the name record of {} with a ttl of {ttl}s.",
            keypair.public_key()
        );

        Ok(NameRecord {
            name: keypair.public_key().to_string(),
            value: text.as_bytes().to_vec(),
        })
    }

    async fn resolve(&self, public_key: &PublicKey) -> Result<Option<NameRecord>, NamingError> {
        let Some(packet) = self.client.resolve_most_recent(public_key).await else {
            return Ok(None);
        };
        let age_secs = Timestamp::now()
            .as_u64()
            .saturating_sub(packet.timestamp().as_u64())
            / 1_000_000;

        for record in packet.resource_records(LINK_RECORD) {
            let RData::TXT(txt) = &record.rdata else {
                continue;
            };
            if age_secs > u64::from(record.ttl) {
                tracing::debug!("Name record of {public_key} is stale ({age_secs}s old).");
                return Ok(None);
            }
            let value = String::try_from(txt.clone())
                .map_err(|e| NamingError::InvalidRecord(e.to_string()))?;
            return Ok(Some(NameRecord {
                name: public_key.to_string(),
                value: value.into_bytes(),
            }));
        }
        Ok(None)
    }
}

/// Lifetime in seconds to a DNS TTL. Fractions round up so a non-zero lifetime
/// never becomes a zero TTL.
fn lifetime_to_ttl(lifetime: f64) -> u32 {
    lifetime.ceil().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Split `value` into DNS character-strings without breaking UTF-8 sequences.
fn character_strings(value: &str) -> Vec<&str> {
    let mut chunks = vec![];
    let mut rest = value;
    while rest.len() > MAX_CHARACTER_STRING {
        let mut cut = MAX_CHARACTER_STRING;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}
