//! Password protected key files.
//!
//! Layout: a spec line, a new line character, then `salt | nonce | ciphertext`.
//! The encryption key is derived from the password with argon2id.

use argon2::Argon2;
use crypto_secretbox::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Key, Nonce, XSalsa20Poly1305,
};
use pkarr::Keypair;

static SPEC_LINE: &str = "pubky.org/key";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Error decoding a key file
pub enum KeyFileError {
    #[error("Key file should start with a spec line, followed by a new line character")]
    MissingSpecLine,

    #[error("Key file version is not supported")]
    VersionNotSupported,

    #[error("Key file is too short to contain salt, nonce and an encrypted secret key")]
    Truncated,

    #[error("Key file secret key should be 32 bytes, got {0}")]
    InvalidSecretKeyLength(usize),

    #[error("Secret key could not be encrypted")]
    EncryptFailed,

    #[error("Key file could not be decrypted. Wrong password?")]
    DecryptFailed,

    #[error("Failed to derive the encryption key: {0}")]
    KeyDerivation(String),
}

/// Encrypt the keypair's secret under `password`.
pub fn seal(keypair: &Keypair, password: &str) -> Result<Vec<u8>, KeyFileError> {
    let salt: [u8; SALT_LEN] = rand::random();
    let encryption_key = derive_key(password, &salt)?;

    let cipher = XSalsa20Poly1305::new(Key::from_slice(&encryption_key));
    let nonce = XSalsa20Poly1305::generate_nonce(&mut OsRng);
    let secret_key = keypair.secret_key();
    let encrypted = cipher
        .encrypt(&nonce, secret_key.as_slice())
        .map_err(|_| KeyFileError::EncryptFailed)?;

    let mut out =
        Vec::with_capacity(SPEC_LINE.len() + 1 + SALT_LEN + NONCE_LEN + encrypted.len());
    out.extend_from_slice(SPEC_LINE.as_bytes());
    out.extend_from_slice(b"\n");
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&encrypted);
    Ok(out)
}

/// Decrypt a key file produced by [`seal`].
pub fn open(key_file: &[u8], password: &str) -> Result<Keypair, KeyFileError> {
    let newline_index = key_file
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(KeyFileError::MissingSpecLine)?;

    if &key_file[..newline_index] != SPEC_LINE.as_bytes() {
        return Err(KeyFileError::VersionNotSupported);
    }

    let body = &key_file[newline_index + 1..];
    if body.len() <= SALT_LEN + NONCE_LEN {
        return Err(KeyFileError::Truncated);
    }
    let (salt, rest) = body.split_at(SALT_LEN);
    let (nonce, encrypted) = rest.split_at(NONCE_LEN);

    let encryption_key = derive_key(password, salt)?;
    let cipher = XSalsa20Poly1305::new(Key::from_slice(&encryption_key));
    let decrypted = cipher
        .decrypt(Nonce::from_slice(nonce), encrypted)
        .map_err(|_| KeyFileError::DecryptFailed)?;

    let length = decrypted.len();
    let secret_key: [u8; 32] = decrypted
        .try_into()
        .map_err(|_| KeyFileError::InvalidSecretKeyLength(length))?;

    Ok(Keypair::from_secret_key(&secret_key))
}

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32], KeyFileError> {
    let mut out = [0; 32];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| KeyFileError::KeyDerivation(e.to_string()))?;
    Ok(out)
}
