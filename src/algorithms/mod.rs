//! Algorithm registries: key management (`alg`) and content encryption (`enc`).

pub(crate) mod aes_gcm_kw;
pub(crate) mod aes_kw;
pub mod content;
pub(crate) mod rsa;

pub use self::content::{ContentEncryption, ALL_CONTENT_ENCRYPTION, CEK};

use self::aes_kw::AesKw;
use self::rsa::RsaScheme;
use crate::error::*;
use crate::header::HeaderMap;
use crate::key::Key;

/// Key management algorithm identifier (`alg` header parameter).
///
/// Every value registered by RFC 7518 section 4.1 resolves; the ECDH-ES and
/// PBES2 families are recognized but not implemented, and using one of them
/// fails with an unsupported-algorithm error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyManagement {
    /// RSAES-PKCS1-v1_5
    Rsa1_5,
    /// RSAES-OAEP with SHA-1 (default)
    #[default]
    RsaOaep,
    /// RSAES-OAEP with SHA-256
    RsaOaep256,
    /// AES-128 Key Wrap
    A128Kw,
    /// AES-192 Key Wrap
    A192Kw,
    /// AES-256 Key Wrap
    A256Kw,
    /// Direct use of a shared symmetric key as the CEK
    Dir,
    EcdhEs,
    EcdhEsA128Kw,
    EcdhEsA192Kw,
    EcdhEsA256Kw,
    /// AES-128-GCM key wrap
    A128GcmKw,
    /// AES-192-GCM key wrap
    A192GcmKw,
    /// AES-256-GCM key wrap
    A256GcmKw,
    Pbes2Hs256A128Kw,
    Pbes2Hs384A192Kw,
    Pbes2Hs512A256Kw,
}

/// Every registered `alg` value, in registry order.
pub const ALL_KEY_MANAGEMENT: &[KeyManagement] = &[
    KeyManagement::Rsa1_5,
    KeyManagement::RsaOaep,
    KeyManagement::RsaOaep256,
    KeyManagement::A128Kw,
    KeyManagement::A192Kw,
    KeyManagement::A256Kw,
    KeyManagement::Dir,
    KeyManagement::EcdhEs,
    KeyManagement::EcdhEsA128Kw,
    KeyManagement::EcdhEsA192Kw,
    KeyManagement::EcdhEsA256Kw,
    KeyManagement::A128GcmKw,
    KeyManagement::A192GcmKw,
    KeyManagement::A256GcmKw,
    KeyManagement::Pbes2Hs256A128Kw,
    KeyManagement::Pbes2Hs384A192Kw,
    KeyManagement::Pbes2Hs512A256Kw,
];

/// Output of a key wrap: the encrypted CEK plus any header parameters the
/// algorithm contributes (the AES-GCM key wrap family adds `iv` and `tag`).
#[derive(Debug)]
pub(crate) struct WrappedKey {
    pub encrypted_key: Vec<u8>,
    pub header_parameters: Option<aes_gcm_kw::HeaderParameters>,
}

impl KeyManagement {
    /// Get the JWE `alg` header value for this algorithm.
    pub fn alg_name(&self) -> &'static str {
        match self {
            KeyManagement::Rsa1_5 => "RSA1_5",
            KeyManagement::RsaOaep => "RSA-OAEP",
            KeyManagement::RsaOaep256 => "RSA-OAEP-256",
            KeyManagement::A128Kw => "A128KW",
            KeyManagement::A192Kw => "A192KW",
            KeyManagement::A256Kw => "A256KW",
            KeyManagement::Dir => "dir",
            KeyManagement::EcdhEs => "ECDH-ES",
            KeyManagement::EcdhEsA128Kw => "ECDH-ES+A128KW",
            KeyManagement::EcdhEsA192Kw => "ECDH-ES+A192KW",
            KeyManagement::EcdhEsA256Kw => "ECDH-ES+A256KW",
            KeyManagement::A128GcmKw => "A128GCMKW",
            KeyManagement::A192GcmKw => "A192GCMKW",
            KeyManagement::A256GcmKw => "A256GCMKW",
            KeyManagement::Pbes2Hs256A128Kw => "PBES2-HS256+A128KW",
            KeyManagement::Pbes2Hs384A192Kw => "PBES2-HS384+A192KW",
            KeyManagement::Pbes2Hs512A256Kw => "PBES2-HS512+A256KW",
        }
    }

    /// Parse a key management algorithm from its JWE name.
    ///
    /// Matching is exact and case-sensitive; unknown names never default.
    pub fn from_alg_name(name: &str) -> Result<Self, Error> {
        match name {
            "RSA1_5" => Ok(KeyManagement::Rsa1_5),
            "RSA-OAEP" => Ok(KeyManagement::RsaOaep),
            "RSA-OAEP-256" => Ok(KeyManagement::RsaOaep256),
            "A128KW" => Ok(KeyManagement::A128Kw),
            "A192KW" => Ok(KeyManagement::A192Kw),
            "A256KW" => Ok(KeyManagement::A256Kw),
            "dir" => Ok(KeyManagement::Dir),
            "ECDH-ES" => Ok(KeyManagement::EcdhEs),
            "ECDH-ES+A128KW" => Ok(KeyManagement::EcdhEsA128Kw),
            "ECDH-ES+A192KW" => Ok(KeyManagement::EcdhEsA192Kw),
            "ECDH-ES+A256KW" => Ok(KeyManagement::EcdhEsA256Kw),
            "A128GCMKW" => Ok(KeyManagement::A128GcmKw),
            "A192GCMKW" => Ok(KeyManagement::A192GcmKw),
            "A256GCMKW" => Ok(KeyManagement::A256GcmKw),
            "PBES2-HS256+A128KW" => Ok(KeyManagement::Pbes2Hs256A128Kw),
            "PBES2-HS384+A192KW" => Ok(KeyManagement::Pbes2Hs384A192Kw),
            "PBES2-HS512+A256KW" => Ok(KeyManagement::Pbes2Hs512A256Kw),
            _ => bail!(JWEError::InvalidAlgorithm(name.to_string())),
        }
    }

    /// Whether this algorithm uses the recipient secret directly as the CEK.
    pub fn is_direct(&self) -> bool {
        matches!(self, KeyManagement::Dir)
    }

    /// Whether wrapping contributes extra header parameters (`iv`, `tag`).
    pub(crate) fn needs_header_parameters(&self) -> bool {
        matches!(
            self,
            KeyManagement::A128GcmKw | KeyManagement::A192GcmKw | KeyManagement::A256GcmKw
        )
    }

    /// Encrypt the CEK for one recipient.
    pub(crate) fn wrap(&self, key: &Key, cek: &[u8]) -> Result<WrappedKey, Error> {
        let wrapped = match self {
            KeyManagement::Dir => {
                // The shared secret is the CEK; nothing travels on the wire.
                key.secret()?;
                return Ok(WrappedKey {
                    encrypted_key: Vec::new(),
                    header_parameters: None,
                });
            }
            KeyManagement::Rsa1_5 => RsaScheme::Pkcs1v15.wrap(key, cek)?,
            KeyManagement::RsaOaep => RsaScheme::OaepSha1.wrap(key, cek)?,
            KeyManagement::RsaOaep256 => RsaScheme::OaepSha256.wrap(key, cek)?,
            KeyManagement::A128Kw => self.kw(key, 16)?.wrap(cek),
            KeyManagement::A192Kw => self.kw(key, 24)?.wrap(cek),
            KeyManagement::A256Kw => self.kw(key, 32)?.wrap(cek),
            KeyManagement::A128GcmKw => return self.gcm_kw_wrap(key, 16, cek),
            KeyManagement::A192GcmKw => return self.gcm_kw_wrap(key, 24, cek),
            KeyManagement::A256GcmKw => return self.gcm_kw_wrap(key, 32, cek),
            _ => bail!(JWEError::UnsupportedAlgorithm(self.alg_name().to_string())),
        };
        Ok(WrappedKey {
            encrypted_key: wrapped,
            header_parameters: None,
        })
    }

    /// Recover the CEK for one recipient.
    ///
    /// `header` is the recipient's fully merged header; the AES-GCM key wrap
    /// family reads its `iv` and `tag` parameters from it.
    pub(crate) fn unwrap(
        &self,
        key: &Key,
        encrypted_cek: &[u8],
        header: &HeaderMap,
    ) -> Result<Vec<u8>, Error> {
        match self {
            KeyManagement::Dir => Ok(key.secret()?.to_vec()),
            KeyManagement::Rsa1_5 => RsaScheme::Pkcs1v15.unwrap(key, encrypted_cek),
            KeyManagement::RsaOaep => RsaScheme::OaepSha1.unwrap(key, encrypted_cek),
            KeyManagement::RsaOaep256 => RsaScheme::OaepSha256.unwrap(key, encrypted_cek),
            KeyManagement::A128Kw => self.kw(key, 16)?.unwrap(encrypted_cek),
            KeyManagement::A192Kw => self.kw(key, 24)?.unwrap(encrypted_cek),
            KeyManagement::A256Kw => self.kw(key, 32)?.unwrap(encrypted_cek),
            KeyManagement::A128GcmKw => aes_gcm_kw::unwrap(key.secret()?, 16, encrypted_cek, header),
            KeyManagement::A192GcmKw => aes_gcm_kw::unwrap(key.secret()?, 24, encrypted_cek, header),
            KeyManagement::A256GcmKw => aes_gcm_kw::unwrap(key.secret()?, 32, encrypted_cek, header),
            _ => bail!(JWEError::UnsupportedAlgorithm(self.alg_name().to_string())),
        }
    }

    fn kw(&self, key: &Key, kek_len: usize) -> Result<AesKw, Error> {
        let kek = key.secret()?;
        ensure!(kek.len() == kek_len, JWEError::InvalidKey);
        AesKw::new(kek)
    }

    fn gcm_kw_wrap(&self, key: &Key, kek_len: usize, cek: &[u8]) -> Result<WrappedKey, Error> {
        let (encrypted_key, parameters) = aes_gcm_kw::wrap(key.secret()?, kek_len, cek)?;
        Ok(WrappedKey {
            encrypted_key,
            header_parameters: Some(parameters),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alg_names_roundtrip() {
        for &alg in ALL_KEY_MANAGEMENT {
            assert_eq!(KeyManagement::from_alg_name(alg.alg_name()).unwrap(), alg);
        }
        for &enc in ALL_CONTENT_ENCRYPTION {
            assert_eq!(
                ContentEncryption::from_alg_name(enc.alg_name()).unwrap(),
                enc
            );
        }
    }

    #[test]
    fn unknown_and_miscased_names_rejected() {
        assert!(KeyManagement::from_alg_name("rsa-oaep").is_err());
        assert!(KeyManagement::from_alg_name("DIR").is_err());
        assert!(KeyManagement::from_alg_name("A128kw").is_err());
        assert!(KeyManagement::from_alg_name("none").is_err());
    }

    #[test]
    fn aes_kw_wrap_unwrap_through_registry() {
        let header = HeaderMap::new();
        for (alg, kek_len) in [
            (KeyManagement::A128Kw, 16usize),
            (KeyManagement::A192Kw, 24),
            (KeyManagement::A256Kw, 32),
        ] {
            let key = Key::from_secret(vec![0x42u8; kek_len]);
            let cek = vec![0x17u8; 32];
            let wrapped = alg.wrap(&key, &cek).unwrap();
            assert_eq!(wrapped.encrypted_key.len(), cek.len() + 8);
            assert!(wrapped.header_parameters.is_none());
            assert_eq!(
                alg.unwrap(&key, &wrapped.encrypted_key, &header).unwrap(),
                cek
            );
        }
    }

    #[test]
    fn wrong_kek_size_for_kw_variant_rejected() {
        let key = Key::from_secret(vec![0u8; 32]);
        assert!(KeyManagement::A128Kw.wrap(&key, &[0u8; 16]).is_err());
    }

    #[test]
    fn gcm_kw_wrap_unwrap_through_registry() {
        let key = Key::from_secret(vec![0x24u8; 16]);
        let cek = vec![0x17u8; 32];
        let wrapped = KeyManagement::A128GcmKw.wrap(&key, &cek).unwrap();
        let parameters = wrapped.header_parameters.expect("iv and tag");
        let mut header = HeaderMap::new();
        header.insert("iv".to_string(), serde_json::Value::String(parameters.iv));
        header.insert("tag".to_string(), serde_json::Value::String(parameters.tag));
        assert_eq!(
            KeyManagement::A128GcmKw
                .unwrap(&key, &wrapped.encrypted_key, &header)
                .unwrap(),
            cek
        );
    }

    #[test]
    fn dir_passes_the_secret_through() {
        let key = Key::from_secret(vec![9u8; 32]);
        let wrapped = KeyManagement::Dir.wrap(&key, &[]).unwrap();
        assert!(wrapped.encrypted_key.is_empty());
        assert_eq!(
            KeyManagement::Dir
                .unwrap(&key, &[], &HeaderMap::new())
                .unwrap(),
            vec![9u8; 32]
        );
    }

    #[test]
    fn recognized_but_unimplemented_families_fail_cleanly() {
        let key = Key::from_secret(vec![0u8; 32]);
        for alg in [
            KeyManagement::EcdhEs,
            KeyManagement::EcdhEsA128Kw,
            KeyManagement::Pbes2Hs256A128Kw,
        ] {
            let err = alg.wrap(&key, &[0u8; 16]).unwrap_err();
            assert!(err.to_string().contains(alg.alg_name()));
        }
    }
}
