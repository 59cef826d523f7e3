//! AES-GCM key wrapping (`A128GCMKW`, `A192GCMKW`, `A256GCMKW`).
//!
//! The CEK is encrypted under the recipient secret with AES-GCM and a fresh
//! 96-bit IV; the IV and tag travel as `iv`/`tag` header parameters
//! (RFC 7518 section 4.7).

use aes_gcm::{Aes128Gcm, Aes256Gcm};
use rand::RngCore;
use serde_json::Value;

use crate::algorithms::content::{gcm_open, gcm_seal};
use crate::base64;
use crate::error::*;
use crate::header::HeaderMap;

type Aes192Gcm = aes_gcm::AesGcm<aes::Aes192, aes_gcm::aead::consts::U12>;

/// Header parameters contributed by a wrap operation, base64url-encoded.
#[derive(Clone, Debug)]
pub(crate) struct HeaderParameters {
    pub iv: String,
    pub tag: String,
}

pub(crate) fn wrap(
    kek: &[u8],
    kek_len: usize,
    cek: &[u8],
) -> Result<(Vec<u8>, HeaderParameters), Error> {
    ensure!(kek.len() == kek_len, JWEError::InvalidKey);

    let mut iv = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut iv);

    let (encrypted_key, tag) = match kek_len {
        16 => gcm_seal::<Aes128Gcm>(kek, &iv, b"", cek)?,
        24 => gcm_seal::<Aes192Gcm>(kek, &iv, b"", cek)?,
        32 => gcm_seal::<Aes256Gcm>(kek, &iv, b"", cek)?,
        _ => bail!(JWEError::InvalidKey),
    };
    let parameters = HeaderParameters {
        iv: base64::encode(iv)?,
        tag: base64::encode(&tag)?,
    };
    Ok((encrypted_key, parameters))
}

pub(crate) fn unwrap(
    kek: &[u8],
    kek_len: usize,
    encrypted_cek: &[u8],
    header: &HeaderMap,
) -> Result<Vec<u8>, Error> {
    ensure!(kek.len() == kek_len, JWEError::InvalidKey);
    let iv = header_bin_parameter(header, "iv")?;
    let tag = header_bin_parameter(header, "tag")?;

    match kek_len {
        16 => gcm_open::<Aes128Gcm>(kek, &iv, b"", encrypted_cek, &tag),
        24 => gcm_open::<Aes192Gcm>(kek, &iv, b"", encrypted_cek, &tag),
        32 => gcm_open::<Aes256Gcm>(kek, &iv, b"", encrypted_cek, &tag),
        _ => bail!(JWEError::InvalidKey),
    }
}

fn header_bin_parameter(header: &HeaderMap, name: &'static str) -> Result<Vec<u8>, Error> {
    match header.get(name) {
        Some(Value::String(b64)) => base64::decode(b64),
        _ => bail!(JWEError::MissingHeaderParameter(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with(parameters: &HeaderParameters) -> HeaderMap {
        let mut header = HeaderMap::new();
        header.insert("iv".to_string(), Value::String(parameters.iv.clone()));
        header.insert("tag".to_string(), Value::String(parameters.tag.clone()));
        header
    }

    #[test]
    fn wrap_unwrap_roundtrip() {
        for &kek_len in &[16usize, 24, 32] {
            let kek = vec![0x24u8; kek_len];
            let cek = vec![0x99u8; 32];
            let (encrypted, parameters) = wrap(&kek, kek_len, &cek).unwrap();
            // AES-GCM key wrap does not expand the key; iv/tag live in the header.
            assert_eq!(encrypted.len(), cek.len());
            let header = header_with(&parameters);
            assert_eq!(unwrap(&kek, kek_len, &encrypted, &header).unwrap(), cek);
        }
    }

    #[test]
    fn tampered_encrypted_key_fails() {
        let kek = [3u8; 16];
        let (mut encrypted, parameters) = wrap(&kek, 16, &[1u8; 16]).unwrap();
        encrypted[0] ^= 0xff;
        assert!(unwrap(&kek, 16, &encrypted, &header_with(&parameters)).is_err());
    }

    #[test]
    fn missing_header_parameters_fail() {
        let kek = [3u8; 16];
        let (encrypted, parameters) = wrap(&kek, 16, &[1u8; 16]).unwrap();
        let mut header = header_with(&parameters);
        header.remove("tag");
        assert!(unwrap(&kek, 16, &encrypted, &header).is_err());
    }

    #[test]
    fn wrong_kek_length_rejected() {
        assert!(wrap(&[0u8; 24], 16, &[1u8; 16]).is_err());
    }
}
