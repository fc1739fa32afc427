use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::config;
use crate::error::{VaultError, VaultResult};

type HmacSha256 = Hmac<Sha256>;

/// The field a search token was extracted from.
///
/// The source participates in the token hash, so "budget" in a subject and
/// "budget" in a body produce different index rows. That is what makes
/// field-scoped queries work without any extra predicate at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSource {
    Sender,
    Recipient,
    Subject,
    Body,
}

impl TokenSource {
    pub const ALL: [TokenSource; 4] = [
        TokenSource::Subject,
        TokenSource::Body,
        TokenSource::Sender,
        TokenSource::Recipient,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenSource::Sender => "sender",
            TokenSource::Recipient => "recipient",
            TokenSource::Subject => "subject",
            TokenSource::Body => "body",
        }
    }
}

/// Field encryption plus deterministic search-token hashing.
///
/// Two keys live here: the caller-supplied 32-byte field key drives
/// AES-256-GCM over field values (fresh random nonce per encryption, stored
/// as `nonce ∥ ciphertext∥tag`), and a PBKDF2-derived token key drives the
/// HMAC behind [`FieldCipher::token_hash`]. Separate keys mean an oracle for
/// one operation does not directly expose the other.
///
/// Keys are fixed at construction and read-only for the process lifetime.
pub struct FieldCipher {
    cipher: Aes256Gcm,
    token_mac: HmacSha256,
}

impl FieldCipher {
    pub fn new(field_key: &[u8; config::crypto::FIELD_KEY_LEN]) -> VaultResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(field_key)
            .map_err(|_| VaultError::Config("invalid field key length".into()))?;

        let mut token_key = [0u8; config::crypto::FIELD_KEY_LEN];
        pbkdf2_hmac::<Sha256>(
            field_key,
            config::crypto::TOKEN_KEY_SALT,
            config::crypto::PBKDF2_ITERATIONS,
            &mut token_key,
        );
        let token_mac = <HmacSha256 as Mac>::new_from_slice(&token_key)
            .map_err(|_| VaultError::Config("invalid token key length".into()))?;

        Ok(FieldCipher { cipher, token_mac })
    }

    /// Build a cipher straight from a base64-encoded key.
    pub fn from_base64(b64: &str) -> VaultResult<Self> {
        let key = crate::config::decode_field_key(b64)?;
        Self::new(&key)
    }

    /// Encrypt a field value. Output layout: 12-byte nonce followed by the
    /// GCM ciphertext-plus-tag.
    pub fn encrypt(&self, plaintext: &str) -> VaultResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; config::crypto::NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| VaultError::Crypto("field encryption failed".into()))?;

        let mut out = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a field value. Fails with [`VaultError::Crypto`] when the
    /// blob is truncated, the tag does not authenticate, or the plaintext is
    /// not UTF-8.
    pub fn decrypt(&self, blob: &[u8]) -> VaultResult<String> {
        if blob.len() <= config::crypto::NONCE_LEN {
            return Err(VaultError::Crypto("ciphertext too short".into()));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(config::crypto::NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| VaultError::Crypto("authentication failed".into()))?;
        String::from_utf8(plaintext)
            .map_err(|_| VaultError::Crypto("decrypted field is not UTF-8".into()))
    }

    /// Deterministic keyed hash of a search token, truncated to 16 hex
    /// chars. The hash domain is `"{source}:{token}"`, so identical tokens
    /// from different fields never collide by construction.
    pub fn token_hash(&self, source: TokenSource, token: &str) -> String {
        let mut mac = self.token_mac.clone();
        mac.update(source.as_str().as_bytes());
        mac.update(b":");
        mac.update(token.as_bytes());
        let digest = mac.finalize().into_bytes();
        hex::encode(digest)[..config::crypto::TOKEN_HASH_HEX_LEN].to_string()
    }
}
