//! Compact serialization: encrypt and decrypt five-segment tokens.

use serde_json::Value;

use crate::algorithms::{ContentEncryption, KeyManagement, CEK};
use crate::base64;
use crate::compression::Compression;
use crate::error::*;
use crate::header::{self, HeaderMap, Validator};
use crate::key::Key;

pub(crate) const MAX_HEADER_LENGTH: usize = 8192;

/// Options for compact encryption.
#[derive(Clone, Debug, Default)]
pub struct EncryptOptions {
    /// Key management algorithm (default `RSA-OAEP`).
    pub key_management: KeyManagement,
    /// Content encryption algorithm (default `A128GCM`).
    pub content_encryption: ContentEncryption,
    /// Extra protected header parameters, merged after `alg` and `enc`.
    /// Set `"zip": "DEF"` here to compress the payload.
    pub extra_headers: HeaderMap,
}

pub(crate) fn encrypt(
    validator: &Validator,
    payload: &[u8],
    key: &Key,
    options: &EncryptOptions,
) -> Result<String, Error> {
    let alg = options.key_management;
    let enc = options.content_encryption;
    let mut header = header::build(alg, enc, &options.extra_headers);
    validator.check(&header, key)?;

    let payload = match compression_for(&header)? {
        Some(compression) => compression.compress(payload)?,
        None => payload.to_vec(),
    };

    let cek = if alg.is_direct() {
        CEK::new(key.secret()?.to_vec())
    } else {
        CEK::new(enc.generate_cek())
    };
    let wrapped = alg.wrap(key, cek.as_bytes())?;
    if let Some(parameters) = wrapped.header_parameters {
        header.insert("iv".to_string(), Value::String(parameters.iv));
        header.insert("tag".to_string(), Value::String(parameters.tag));
    }

    let header_b64 = base64::encode(serde_json::to_string(&header)?)?;
    let iv = enc.generate_iv();
    // The encoded protected header doubles as the additional authenticated
    // data (RFC 7516 section 5.1 step 14).
    let (ciphertext, tag) = enc.encrypt(cek.as_bytes(), &iv, header_b64.as_bytes(), &payload)?;

    Ok(format!(
        "{}.{}.{}.{}.{}",
        header_b64,
        base64::encode(&wrapped.encrypted_key)?,
        base64::encode(&iv)?,
        base64::encode(&ciphertext)?,
        base64::encode(&tag)?
    ))
}

pub(crate) fn decrypt(validator: &Validator, token: &str, key: &Key) -> Result<Vec<u8>, Error> {
    let parts: Vec<&str> = token.split('.').collect();
    ensure!(parts.len() == 5, JWEError::InvalidCompactFormat);
    ensure!(parts[0].len() <= MAX_HEADER_LENGTH, JWEError::HeaderTooLarge);

    let header: HeaderMap =
        serde_json::from_slice(&base64::decode(parts[0])?).map_err(|_| JWEError::InvalidHeader)?;
    validator.check(&header, key)?;
    let alg = KeyManagement::from_alg_name(
        header.get("alg").and_then(Value::as_str).unwrap_or(""),
    )?;
    let enc = ContentEncryption::from_alg_name(
        header.get("enc").and_then(Value::as_str).unwrap_or(""),
    )?;

    let encrypted_key = base64::decode(parts[1])?;
    let iv = base64::decode(parts[2])?;
    let ciphertext = base64::decode(parts[3])?;
    let tag = base64::decode(parts[4])?;

    let cek = CEK::new(alg.unwrap(key, &encrypted_key, &header)?);
    let payload = enc.decrypt(cek.as_bytes(), &iv, parts[0].as_bytes(), &ciphertext, &tag)?;

    match compression_for(&header)? {
        Some(compression) => compression.decompress(&payload),
        None => Ok(payload),
    }
}

/// Resolve the `zip` header. Absent or empty means no compression.
pub(crate) fn compression_for(header: &HeaderMap) -> Result<Option<Compression>, Error> {
    match header.get("zip") {
        None => Ok(None),
        Some(Value::String(name)) if name.is_empty() => Ok(None),
        Some(Value::String(name)) => Ok(Some(Compression::from_zip_name(name)?)),
        Some(_) => bail!(JWEError::InvalidCompression(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_segment_count_rejected() {
        let validator = Validator::new();
        let key = Key::from_secret(vec![0u8; 16]);
        let options = EncryptOptions {
            key_management: KeyManagement::Dir,
            content_encryption: ContentEncryption::A128Gcm,
            ..Default::default()
        };
        let token = encrypt(&validator, b"payload", &key, &options).unwrap();
        assert_eq!(token.split('.').count(), 5);

        let four = token.rsplitn(2, '.').nth(1).unwrap();
        assert!(decrypt(&validator, four, &key).is_err());
        let six = format!("{}.extra", token);
        assert!(decrypt(&validator, &six, &key).is_err());
    }

    #[test]
    fn oversized_header_rejected() {
        let validator = Validator::new();
        let key = Key::from_secret(vec![0u8; 16]);
        let huge = "A".repeat(MAX_HEADER_LENGTH + 1);
        let token = format!("{}....", huge);
        assert!(decrypt(&validator, &token, &key).is_err());
    }

    #[test]
    fn garbage_header_rejected() {
        let validator = Validator::new();
        let key = Key::from_secret(vec![0u8; 16]);
        let header = crate::base64::encode(b"not json").unwrap();
        let token = format!("{}....", header);
        assert!(decrypt(&validator, &token, &key).is_err());
    }
}
