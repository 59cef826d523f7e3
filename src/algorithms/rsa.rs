//! RSA key management algorithms: RSA1_5, RSA-OAEP and RSA-OAEP-256.

use rsa::{Oaep, Pkcs1v15Encrypt, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::*;
use crate::key::Key;

/// RSA encryption scheme, one per registered identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RsaScheme {
    /// RSAES-PKCS1-v1_5 (`RSA1_5`)
    Pkcs1v15,
    /// RSAES-OAEP with SHA-1 (`RSA-OAEP`)
    OaepSha1,
    /// RSAES-OAEP with SHA-256 (`RSA-OAEP-256`)
    OaepSha256,
}

impl RsaScheme {
    pub(crate) fn wrap(&self, key: &Key, cek: &[u8]) -> Result<Vec<u8>, Error> {
        let pk: RsaPublicKey = match key {
            Key::RsaPublic(pk) => pk.clone(),
            // Wrapping with a private key uses its public half.
            Key::RsaPrivate(sk) => sk.to_public_key(),
            Key::Secret(_) => bail!(JWEError::InvalidKey),
        };
        let mut rng = rand::thread_rng();
        let encrypted = match self {
            RsaScheme::Pkcs1v15 => pk.encrypt(&mut rng, Pkcs1v15Encrypt, cek),
            RsaScheme::OaepSha1 => pk.encrypt(&mut rng, Oaep::new::<Sha1>(), cek),
            RsaScheme::OaepSha256 => pk.encrypt(&mut rng, Oaep::new::<Sha256>(), cek),
        }
        .map_err(|_| JWEError::InvalidKey)?;
        Ok(encrypted)
    }

    pub(crate) fn unwrap(&self, key: &Key, encrypted_cek: &[u8]) -> Result<Vec<u8>, Error> {
        let sk = match key {
            Key::RsaPrivate(sk) => sk,
            _ => bail!(JWEError::InvalidKey),
        };
        let cek = match self {
            RsaScheme::Pkcs1v15 => sk.decrypt(Pkcs1v15Encrypt, encrypted_cek),
            RsaScheme::OaepSha1 => sk.decrypt(Oaep::new::<Sha1>(), encrypted_cek),
            RsaScheme::OaepSha256 => sk.decrypt(Oaep::new::<Sha256>(), encrypted_cek),
        }
        .map_err(|_| JWEError::DecryptionFailed)?;
        Ok(cek)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::{rsa_test_private_key, rsa_test_public_key};

    const SCHEMES: &[RsaScheme] = &[
        RsaScheme::Pkcs1v15,
        RsaScheme::OaepSha1,
        RsaScheme::OaepSha256,
    ];

    #[test]
    fn wrap_unwrap_roundtrip() {
        let pk = rsa_test_public_key();
        let sk = rsa_test_private_key();
        for scheme in SCHEMES {
            let cek = [0x5au8; 32];
            let encrypted = scheme.wrap(&pk, &cek).unwrap();
            assert_eq!(encrypted.len(), 256); // 2048-bit modulus
            assert_eq!(scheme.unwrap(&sk, &encrypted).unwrap(), cek);
        }
    }

    #[test]
    fn wrap_with_private_key_uses_public_half() {
        let sk = rsa_test_private_key();
        for scheme in SCHEMES {
            let cek = [0x11u8; 16];
            let encrypted = scheme.wrap(&sk, &cek).unwrap();
            assert_eq!(scheme.unwrap(&sk, &encrypted).unwrap(), cek);
        }
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let pk = rsa_test_public_key();
        let sk = rsa_test_private_key();
        for scheme in SCHEMES {
            let mut encrypted = scheme.wrap(&pk, &[0x5au8; 32]).unwrap();
            encrypted[0] ^= 0x01;
            assert!(scheme.unwrap(&sk, &encrypted).is_err());
        }
    }

    #[test]
    fn unwrap_requires_a_private_key() {
        let pk = rsa_test_public_key();
        assert!(RsaScheme::OaepSha1.unwrap(&pk, &[0u8; 256]).is_err());
    }

    #[test]
    fn symmetric_key_rejected() {
        let key = Key::from_secret(b"0123456789abcdef");
        assert!(RsaScheme::OaepSha1.wrap(&key, &[0u8; 16]).is_err());
    }
}
