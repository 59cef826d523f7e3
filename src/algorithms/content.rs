//! Content encryption algorithms (`enc` header parameter).
//!
//! Implements the authenticated constructions from RFC 7518 section 5:
//! AES-CBC with an HMAC-SHA-2 tag, and AES-GCM.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::consts::{U12, U16};
use aes_gcm::{AeadCore, AeadInPlace, Aes128Gcm, Aes256Gcm, KeyInit, Nonce, Tag};
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::*;

type Aes192Gcm = aes_gcm::AesGcm<aes::Aes192, U12>;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Content encryption algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncryption {
    /// AES-128-CBC with HMAC-SHA-256
    A128CbcHs256,
    /// AES-192-CBC with HMAC-SHA-384
    A192CbcHs384,
    /// AES-256-CBC with HMAC-SHA-512
    A256CbcHs512,
    /// AES-128-GCM (default)
    #[default]
    A128Gcm,
    /// AES-192-GCM
    A192Gcm,
    /// AES-256-GCM
    A256Gcm,
}

/// Every registered `enc` value, in registry order.
pub const ALL_CONTENT_ENCRYPTION: &[ContentEncryption] = &[
    ContentEncryption::A128CbcHs256,
    ContentEncryption::A192CbcHs384,
    ContentEncryption::A256CbcHs512,
    ContentEncryption::A128Gcm,
    ContentEncryption::A192Gcm,
    ContentEncryption::A256Gcm,
];

impl ContentEncryption {
    /// Get the JWE `enc` header value for this algorithm.
    pub fn alg_name(&self) -> &'static str {
        match self {
            ContentEncryption::A128CbcHs256 => "A128CBC-HS256",
            ContentEncryption::A192CbcHs384 => "A192CBC-HS384",
            ContentEncryption::A256CbcHs512 => "A256CBC-HS512",
            ContentEncryption::A128Gcm => "A128GCM",
            ContentEncryption::A192Gcm => "A192GCM",
            ContentEncryption::A256Gcm => "A256GCM",
        }
    }

    /// Parse a content encryption algorithm from its JWE name.
    ///
    /// Matching is exact and case-sensitive; unknown names never default.
    pub fn from_alg_name(name: &str) -> Result<Self, Error> {
        match name {
            "A128CBC-HS256" => Ok(ContentEncryption::A128CbcHs256),
            "A192CBC-HS384" => Ok(ContentEncryption::A192CbcHs384),
            "A256CBC-HS512" => Ok(ContentEncryption::A256CbcHs512),
            "A128GCM" => Ok(ContentEncryption::A128Gcm),
            "A192GCM" => Ok(ContentEncryption::A192Gcm),
            "A256GCM" => Ok(ContentEncryption::A256Gcm),
            _ => bail!(JWEError::InvalidEncryption(name.to_string())),
        }
    }

    /// Required CEK length in bytes.
    ///
    /// CBC-HMAC keys are double length: the first half is the MAC key, the
    /// second half the encryption key.
    pub fn key_size(&self) -> usize {
        match self {
            ContentEncryption::A128CbcHs256 => 32,
            ContentEncryption::A192CbcHs384 => 48,
            ContentEncryption::A256CbcHs512 => 64,
            ContentEncryption::A128Gcm => 16,
            ContentEncryption::A192Gcm => 24,
            ContentEncryption::A256Gcm => 32,
        }
    }

    /// Required IV length in bytes.
    pub fn iv_size(&self) -> usize {
        match self {
            ContentEncryption::A128CbcHs256
            | ContentEncryption::A192CbcHs384
            | ContentEncryption::A256CbcHs512 => 16,
            _ => 12,
        }
    }

    /// Authentication tag length in bytes.
    pub fn tag_size(&self) -> usize {
        match self {
            ContentEncryption::A128CbcHs256 => 16,
            ContentEncryption::A192CbcHs384 => 24,
            ContentEncryption::A256CbcHs512 => 32,
            _ => 16,
        }
    }

    /// Generate a random Content Encryption Key for this algorithm.
    pub fn generate_cek(&self) -> Vec<u8> {
        let mut cek = vec![0u8; self.key_size()];
        rand::thread_rng().fill_bytes(&mut cek);
        cek
    }

    /// Generate a random IV for this algorithm.
    pub fn generate_iv(&self) -> Vec<u8> {
        let mut iv = vec![0u8; self.iv_size()];
        rand::thread_rng().fill_bytes(&mut iv);
        iv
    }

    /// Encrypt plaintext, authenticating `aad` alongside it.
    ///
    /// Returns `(ciphertext, authentication_tag)`.
    pub fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        ensure!(
            cek.len() == self.key_size(),
            JWEError::InvalidCEK(self.key_size())
        );
        ensure!(iv.len() == self.iv_size(), JWEError::InvalidIV);

        match self {
            ContentEncryption::A128CbcHs256 => {
                self.cbc_hmac_encrypt::<Aes128CbcEnc>(cek, iv, aad, plaintext)
            }
            ContentEncryption::A192CbcHs384 => {
                self.cbc_hmac_encrypt::<Aes192CbcEnc>(cek, iv, aad, plaintext)
            }
            ContentEncryption::A256CbcHs512 => {
                self.cbc_hmac_encrypt::<Aes256CbcEnc>(cek, iv, aad, plaintext)
            }
            ContentEncryption::A128Gcm => gcm_seal::<Aes128Gcm>(cek, iv, aad, plaintext),
            ContentEncryption::A192Gcm => gcm_seal::<Aes192Gcm>(cek, iv, aad, plaintext),
            ContentEncryption::A256Gcm => gcm_seal::<Aes256Gcm>(cek, iv, aad, plaintext),
        }
    }

    /// Verify the authentication tag and decrypt.
    ///
    /// Any mismatch surfaces as the same error, whether the tag, the
    /// ciphertext or the AAD was altered.
    pub fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        ensure!(
            cek.len() == self.key_size(),
            JWEError::InvalidCEK(self.key_size())
        );
        ensure!(iv.len() == self.iv_size(), JWEError::InvalidIV);

        match self {
            ContentEncryption::A128CbcHs256 => {
                self.cbc_hmac_decrypt::<Aes128CbcDec>(cek, iv, aad, ciphertext, tag)
            }
            ContentEncryption::A192CbcHs384 => {
                self.cbc_hmac_decrypt::<Aes192CbcDec>(cek, iv, aad, ciphertext, tag)
            }
            ContentEncryption::A256CbcHs512 => {
                self.cbc_hmac_decrypt::<Aes256CbcDec>(cek, iv, aad, ciphertext, tag)
            }
            ContentEncryption::A128Gcm => gcm_open::<Aes128Gcm>(cek, iv, aad, ciphertext, tag),
            ContentEncryption::A192Gcm => gcm_open::<Aes192Gcm>(cek, iv, aad, ciphertext, tag),
            ContentEncryption::A256Gcm => gcm_open::<Aes256Gcm>(cek, iv, aad, ciphertext, tag),
        }
    }

    fn cbc_hmac_encrypt<C>(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error>
    where
        C: KeyIvInit + BlockEncryptMut,
    {
        let (mac_key, enc_key) = cek.split_at(self.key_size() / 2);
        let cipher = C::new_from_slices(enc_key, iv).map_err(|_| JWEError::InvalidIV)?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        let tag = self.authentication_tag(mac_key, aad, iv, &ciphertext);
        Ok((ciphertext, tag))
    }

    /// Tag verification runs before any CBC decryption; a mismatch must not
    /// expose anything about the would-be plaintext.
    fn cbc_hmac_decrypt<C>(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error>
    where
        C: KeyIvInit + BlockDecryptMut,
    {
        let (mac_key, enc_key) = cek.split_at(self.key_size() / 2);
        let expected = self.authentication_tag(mac_key, aad, iv, ciphertext);
        ensure!(ct_codecs::verify(&expected, tag), JWEError::DecryptionFailed);

        let cipher = C::new_from_slices(enc_key, iv).map_err(|_| JWEError::InvalidIV)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| JWEError::DecryptionFailed.into())
    }

    /// HMAC over `aad || iv || ciphertext || bitlen(aad)`, truncated to the
    /// MAC key length (RFC 7518 section 5.2.2.1).
    fn authentication_tag(&self, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
        let aad_bits = ((aad.len() as u64) * 8).to_be_bytes();
        match self {
            ContentEncryption::A128CbcHs256 => {
                let mut mac = hmac_sha256::HMAC::new(mac_key);
                mac.update(aad);
                mac.update(iv);
                mac.update(ciphertext);
                mac.update(aad_bits);
                mac.finalize()[..self.tag_size()].to_vec()
            }
            ContentEncryption::A192CbcHs384 => {
                let mut mac = hmac_sha512::sha384::HMAC::new(mac_key);
                mac.update(aad);
                mac.update(iv);
                mac.update(ciphertext);
                mac.update(aad_bits);
                mac.finalize()[..self.tag_size()].to_vec()
            }
            ContentEncryption::A256CbcHs512 => {
                let mut mac = hmac_sha512::HMAC::new(mac_key);
                mac.update(aad);
                mac.update(iv);
                mac.update(ciphertext);
                mac.update(aad_bits);
                mac.finalize()[..self.tag_size()].to_vec()
            }
            _ => unreachable!("not a CBC-HMAC algorithm"),
        }
    }
}

/// AES-GCM encryption shared between content encryption and AES-GCM key wrap.
pub(crate) fn gcm_seal<C>(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), Error>
where
    C: KeyInit + AeadCore<NonceSize = U12, TagSize = U16> + AeadInPlace,
{
    ensure!(iv.len() == 12, JWEError::InvalidIV);
    let cipher = C::new_from_slice(key).map_err(|_| JWEError::InvalidCEK(key.len()))?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer)
        .map_err(|_| JWEError::DecryptionFailed)?;
    Ok((buffer, tag.to_vec()))
}

/// AES-GCM decryption shared between content encryption and AES-GCM key wrap.
///
/// A bad tag and a bad ciphertext surface as the same error.
pub(crate) fn gcm_open<C>(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, Error>
where
    C: KeyInit + AeadCore<NonceSize = U12, TagSize = U16> + AeadInPlace,
{
    ensure!(iv.len() == 12, JWEError::InvalidIV);
    ensure!(tag.len() == 16, JWEError::DecryptionFailed);
    let cipher = C::new_from_slice(key).map_err(|_| JWEError::InvalidCEK(key.len()))?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer, Tag::from_slice(tag))
        .map_err(|_| JWEError::DecryptionFailed)?;
    Ok(buffer)
}

/// A Content Encryption Key, zeroized on drop.
///
/// CEKs never outlive the encrypt or decrypt call that produced them.
#[derive(Clone)]
pub struct CEK {
    key: Vec<u8>,
}

impl CEK {
    pub fn new(key: Vec<u8>) -> Self {
        CEK { key }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for CEK {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl AsRef<[u8]> for CEK {
    fn as_ref(&self) -> &[u8] {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_hex(hex: &str) -> Vec<u8> {
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn roundtrip_all_algorithms() {
        for &enc in ALL_CONTENT_ENCRYPTION {
            let cek = enc.generate_cek();
            let iv = enc.generate_iv();
            let aad = b"additional authenticated data";
            let plaintext = b"Hello, World!";

            let (ciphertext, tag) = enc.encrypt(&cek, &iv, aad, plaintext).unwrap();
            assert_eq!(tag.len(), enc.tag_size());
            let decrypted = enc.decrypt(&cek, &iv, aad, &ciphertext, &tag).unwrap();
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn rfc7518_appendix_b1_test_vector() {
        // A128CBC-HS256 with the fixed key, IV and AAD from the RFC.
        let enc = ContentEncryption::A128CbcHs256;
        let cek = from_hex("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let iv = from_hex("1af38c2dc2b96ffdd86694092341bc04");
        let plaintext: &[u8] = b"A cipher system must not be required to be secret, and it must \
                                 be able to fall into the hands of the enemy without inconvenience";
        let aad: &[u8] = b"The second principle of Auguste Kerckhoffs";

        let (ciphertext, tag) = enc.encrypt(&cek, &iv, aad, plaintext).unwrap();
        assert_eq!(
            ciphertext,
            from_hex(
                "c80edfa32ddf39d5ef00c0b468834279a2e46a1b8049f792f76bfe54b903a9c9\
                 a94ac9b47ad2655c5f10f9aef71427e2fc6f9b3f399a221489f16362c7032336\
                 09d45ac69864e3321cf82935ac4096c86e133314c54019e8ca7980dfa4b9cf1b\
                 384c486f3a54c51078158ee5d79de59fbd34d848b3d69550a67646344427ade5\
                 4b8851ffb598f7f80074b9473c82e2db"
            )
        );
        assert_eq!(tag, from_hex("652c3fa36b0a7c5b3219fab3a30bc1c4"));
        assert_eq!(
            enc.decrypt(&cek, &iv, aad, &ciphertext, &tag).unwrap(),
            plaintext
        );
    }

    #[test]
    fn tampered_ciphertext_fails() {
        for &enc in ALL_CONTENT_ENCRYPTION {
            let cek = enc.generate_cek();
            let iv = enc.generate_iv();
            let (mut ciphertext, tag) = enc.encrypt(&cek, &iv, b"aad", b"payload").unwrap();
            ciphertext[0] ^= 0x01;
            assert!(enc.decrypt(&cek, &iv, b"aad", &ciphertext, &tag).is_err());
        }
    }

    #[test]
    fn tampered_tag_fails() {
        for &enc in ALL_CONTENT_ENCRYPTION {
            let cek = enc.generate_cek();
            let iv = enc.generate_iv();
            let (ciphertext, mut tag) = enc.encrypt(&cek, &iv, b"aad", b"payload").unwrap();
            let last = tag.len() - 1;
            tag[last] ^= 0x80;
            assert!(enc.decrypt(&cek, &iv, b"aad", &ciphertext, &tag).is_err());
        }
    }

    #[test]
    fn tampered_aad_fails() {
        for &enc in ALL_CONTENT_ENCRYPTION {
            let cek = enc.generate_cek();
            let iv = enc.generate_iv();
            let (ciphertext, tag) = enc.encrypt(&cek, &iv, b"aad", b"payload").unwrap();
            assert!(enc.decrypt(&cek, &iv, b"other", &ciphertext, &tag).is_err());
        }
    }

    #[test]
    fn wrong_key_fails() {
        for &enc in ALL_CONTENT_ENCRYPTION {
            let cek = enc.generate_cek();
            let wrong_cek = enc.generate_cek();
            let iv = enc.generate_iv();
            let (ciphertext, tag) = enc.encrypt(&cek, &iv, b"aad", b"payload").unwrap();
            assert!(enc.decrypt(&wrong_cek, &iv, b"aad", &ciphertext, &tag).is_err());
        }
    }

    #[test]
    fn short_cek_rejected_before_any_cipher_work() {
        for &enc in ALL_CONTENT_ENCRYPTION {
            let short_cek = vec![0u8; enc.key_size() - 1];
            let iv = enc.generate_iv();
            assert!(enc.encrypt(&short_cek, &iv, b"", b"payload").is_err());
            assert!(enc.decrypt(&short_cek, &iv, b"", b"ciphertext", b"tag").is_err());
        }
    }

    #[test]
    fn wrong_iv_length_rejected() {
        let enc = ContentEncryption::A128Gcm;
        let cek = enc.generate_cek();
        assert!(enc.encrypt(&cek, &[0u8; 16], b"", b"payload").is_err());
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        for &enc in ALL_CONTENT_ENCRYPTION {
            let cek = enc.generate_cek();
            let iv = enc.generate_iv();
            let (ciphertext, tag) = enc.encrypt(&cek, &iv, b"", b"").unwrap();
            assert_eq!(enc.decrypt(&cek, &iv, b"", &ciphertext, &tag).unwrap(), b"");
        }
    }
}
