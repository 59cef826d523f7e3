//! Recipient key material.

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroize;

use crate::error::*;

/// Symmetric secret bytes, zeroized on drop.
#[derive(Clone)]
pub struct Secret {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret").finish_non_exhaustive()
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Secret { bytes: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for Secret {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// A recipient key.
///
/// Which variant is acceptable depends on the key management algorithm:
/// symmetric secrets for `dir`, `A*KW` and `A*GCMKW`, RSA keys for the
/// `RSA1_5`/`RSA-OAEP`/`RSA-OAEP-256` family. Wrapping with an RSA private
/// key uses its public half, as encrypting to oneself is legitimate.
#[derive(Clone, Debug)]
pub enum Key {
    Secret(Secret),
    RsaPublic(RsaPublicKey),
    RsaPrivate(RsaPrivateKey),
}

impl Key {
    /// Create a symmetric key from raw bytes.
    ///
    /// For `dir` the bytes are used directly as the CEK; for the AES key
    /// wrap families they are the key-encryption key.
    pub fn from_secret(bytes: impl AsRef<[u8]>) -> Self {
        Key::Secret(Secret::new(bytes.as_ref().to_vec()))
    }

    /// Generate a random symmetric key of the given byte length.
    pub fn generate_secret(len: usize) -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        Key::Secret(Secret::new(bytes))
    }

    /// Create an RSA public key from a PEM-encoded SPKI or PKCS#1 document.
    pub fn rsa_public_from_pem(pem: &str) -> Result<Self, Error> {
        let pem = pem.trim();
        let pk = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|_| JWEError::InvalidKey)?;
        Ok(Key::RsaPublic(pk))
    }

    /// Create an RSA private key from a PEM-encoded PKCS#8 or PKCS#1 document.
    pub fn rsa_private_from_pem(pem: &str) -> Result<Self, Error> {
        let pem = pem.trim();
        let sk = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|_| JWEError::InvalidKey)?;
        Ok(Key::RsaPrivate(sk))
    }

    /// Create an RSA public key from a DER-encoded SPKI or PKCS#1 document.
    pub fn rsa_public_from_der(der: &[u8]) -> Result<Self, Error> {
        let pk = RsaPublicKey::from_public_key_der(der)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(der))
            .map_err(|_| JWEError::InvalidKey)?;
        Ok(Key::RsaPublic(pk))
    }

    /// Create an RSA private key from a DER-encoded PKCS#8 or PKCS#1 document.
    pub fn rsa_private_from_der(der: &[u8]) -> Result<Self, Error> {
        let sk = RsaPrivateKey::from_pkcs8_der(der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(der))
            .map_err(|_| JWEError::InvalidKey)?;
        Ok(Key::RsaPrivate(sk))
    }

    /// The symmetric secret, or an error for asymmetric keys.
    pub(crate) fn secret(&self) -> Result<&[u8], Error> {
        match self {
            Key::Secret(secret) => Ok(secret.as_bytes()),
            _ => bail!(JWEError::InvalidKey),
        }
    }

    /// An empty symmetric key never validates.
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            Key::Secret(secret) => secret.is_empty(),
            _ => false,
        }
    }
}

impl From<RsaPublicKey> for Key {
    fn from(pk: RsaPublicKey) -> Self {
        Key::RsaPublic(pk)
    }
}

impl From<RsaPrivateKey> for Key {
    fn from(sk: RsaPrivateKey) -> Self {
        Key::RsaPrivate(sk)
    }
}

/// Candidate decryption keys for the multi-recipient JSON path.
///
/// Selection order for each recipient: the key whose identifier matches the
/// recipient's `kid` header, then the designated default key, then the first
/// key in the set.
#[derive(Clone, Debug, Default)]
pub struct KeySet {
    entries: Vec<(Option<String>, Key)>,
    default_key_id: Option<String>,
}

impl KeySet {
    pub fn new() -> Self {
        KeySet::default()
    }

    /// Add a key under an identifier matched against the `kid` header.
    pub fn with_key(mut self, key_id: impl Into<String>, key: Key) -> Self {
        self.entries.push((Some(key_id.into()), key));
        self
    }

    /// Add a key without an identifier; only ever selected as a fallback.
    pub fn with_fallback_key(mut self, key: Key) -> Self {
        self.entries.push((None, key));
        self
    }

    /// Designate the key to use when no `kid` matches.
    pub fn with_default_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.default_key_id = Some(key_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn select(&self, kid: Option<&str>) -> Option<&Key> {
        if let Some(kid) = kid {
            if let Some((_, key)) = self
                .entries
                .iter()
                .find(|(id, _)| id.as_deref() == Some(kid))
            {
                return Some(key);
            }
        }
        if let Some(default_id) = &self.default_key_id {
            if let Some((_, key)) = self
                .entries
                .iter()
                .find(|(id, _)| id.as_ref() == Some(default_id))
            {
                return Some(key);
            }
        }
        self.entries.first().map(|(_, key)| key)
    }
}

impl From<Key> for KeySet {
    fn from(key: Key) -> Self {
        KeySet::new().with_fallback_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_blank_detection() {
        assert!(Key::from_secret(b"").is_blank());
        assert!(!Key::from_secret(b"0123456789abcdef").is_blank());
    }

    #[test]
    fn key_set_selection_order() {
        let set = KeySet::new()
            .with_key("first", Key::from_secret(b"k1"))
            .with_key("second", Key::from_secret(b"k2"))
            .with_default_key_id("second");

        let by_kid = set.select(Some("first")).unwrap();
        assert_eq!(by_kid.secret().unwrap(), b"k1");

        // Unknown kid falls back to the default, then to the first entry.
        let by_default = set.select(Some("nope")).unwrap();
        assert_eq!(by_default.secret().unwrap(), b"k2");
        let no_kid = set.select(None).unwrap();
        assert_eq!(no_kid.secret().unwrap(), b"k2");

        let no_default = KeySet::new().with_key("only", Key::from_secret(b"k3"));
        assert_eq!(no_default.select(None).unwrap().secret().unwrap(), b"k3");
    }

    #[test]
    fn debug_never_prints_secret_bytes() {
        let key = Key::from_secret(b"super secret bytes");
        let printed = format!("{:?}", key);
        assert!(!printed.contains("super"));
    }
}
