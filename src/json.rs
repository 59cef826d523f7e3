//! JSON serialization (RFC 7516 section 7.2): General and Flattened forms,
//! with multiple recipients sharing one content encryption pass.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::algorithms::{ContentEncryption, KeyManagement, CEK};
use crate::base64;
use crate::error::*;
use crate::header::{self, HeaderMap, Validator};
use crate::key::{Key, KeySet};
use crate::token::compression_for;

/// One recipient of a JSON-serialized message.
#[derive(Clone, Debug)]
pub struct Recipient {
    /// Key the CEK is wrapped with for this recipient.
    pub key: Key,
    /// Per-recipient header parameters (typically `alg` and `kid`).
    pub header: HeaderMap,
}

impl Recipient {
    pub fn new(key: impl Into<Key>) -> Self {
        Recipient {
            key: key.into(),
            header: HeaderMap::new(),
        }
    }

    pub fn with_header_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.header.insert(name.into(), value);
        self
    }
}

/// Which of the two JSON forms to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// The General form, with a `recipients` array.
    #[default]
    General,
    /// The Flattened form, for exactly one recipient.
    Flattened,
}

/// Options for JSON encryption.
///
/// `enc` must appear in the protected or unprotected header; `alg` in one of
/// those or in each recipient's header.
#[derive(Clone, Debug, Default)]
pub struct JsonEncryptOptions {
    /// Integrity-protected shared header.
    pub protected: HeaderMap,
    /// Shared header sent in the clear.
    pub unprotected: HeaderMap,
    /// Extra authenticated data beyond the protected header.
    pub aad: Option<Vec<u8>>,
    pub format: JsonFormat,
}

/// Outcome of a JSON decryption: the plaintext plus which recipient entries
/// (by index) yielded it and which were tried first and failed.
#[derive(Clone, Debug)]
pub struct DecryptionResult {
    pub plaintext: Vec<u8>,
    pub successful_recipients: Vec<usize>,
    pub failed_recipients: Vec<usize>,
}

/// Wire form. Every field is optional so both JSON forms parse into it; the
/// semantic checks happen afterwards.
#[derive(Serialize, Deserialize, Default)]
struct JweJson {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    protected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    unprotected: Option<HeaderMap>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    header: Option<HeaderMap>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    encrypted_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    recipients: Option<Vec<JsonRecipient>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    aad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    iv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    ciphertext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    tag: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
struct JsonRecipient {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    header: Option<HeaderMap>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    encrypted_key: Option<String>,
}

pub(crate) fn encrypt_json(
    validator: &Validator,
    payload: &[u8],
    recipients: &[Recipient],
    options: &JsonEncryptOptions,
) -> Result<String, Error> {
    ensure!(!recipients.is_empty(), JWEError::NoRecipients);
    if options.format == JsonFormat::Flattened {
        ensure!(recipients.len() == 1, JWEError::TooManyRecipients);
    }

    let shared = header::merge_disjoint(&[&options.protected, &options.unprotected])?;
    let enc = content_encryption_for(&shared)?;

    // Resolve and validate every recipient before touching the payload.
    let mut algs = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        let merged = header::merge_disjoint(&[&shared, &recipient.header])?;
        let alg = key_management_for(&merged)?;
        if alg.is_direct() {
            ensure!(
                recipients.len() == 1,
                JWEError::DirectKeyWithMultipleRecipients
            );
        }
        validator.check(&merged, &recipient.key)?;
        algs.push(alg);
    }

    let payload = match compression_for(&shared)? {
        Some(compression) => compression.compress(payload)?,
        None => payload.to_vec(),
    };

    let cek = if algs[0].is_direct() {
        CEK::new(recipients[0].key.secret()?.to_vec())
    } else {
        CEK::new(enc.generate_cek())
    };

    let protected_b64 = if options.protected.is_empty() {
        None
    } else {
        Some(base64::encode(serde_json::to_string(&options.protected)?)?)
    };
    let aad_b64 = match &options.aad {
        Some(aad) => Some(base64::encode(aad)?),
        None => None,
    };
    let aad_input = authenticated_data(protected_b64.as_deref(), aad_b64.as_deref());

    let iv = enc.generate_iv();
    let (ciphertext, tag) = enc.encrypt(cek.as_bytes(), &iv, aad_input.as_bytes(), &payload)?;

    let mut wire_recipients = Vec::with_capacity(recipients.len());
    for (recipient, alg) in recipients.iter().zip(&algs) {
        let wrapped = alg.wrap(&recipient.key, cek.as_bytes())?;
        let mut recipient_header = recipient.header.clone();
        if let Some(parameters) = wrapped.header_parameters {
            recipient_header.insert("iv".to_string(), Value::String(parameters.iv));
            recipient_header.insert("tag".to_string(), Value::String(parameters.tag));
        }
        wire_recipients.push(JsonRecipient {
            header: if recipient_header.is_empty() {
                None
            } else {
                Some(recipient_header)
            },
            encrypted_key: if wrapped.encrypted_key.is_empty() {
                None
            } else {
                Some(base64::encode(&wrapped.encrypted_key)?)
            },
        });
    }

    let mut message = JweJson {
        protected: protected_b64,
        unprotected: if options.unprotected.is_empty() {
            None
        } else {
            Some(options.unprotected.clone())
        },
        aad: aad_b64,
        iv: Some(base64::encode(&iv)?),
        ciphertext: Some(base64::encode(&ciphertext)?),
        tag: Some(base64::encode(&tag)?),
        ..Default::default()
    };
    match options.format {
        JsonFormat::General => message.recipients = Some(wire_recipients),
        JsonFormat::Flattened => {
            let single = wire_recipients.pop().ok_or(JWEError::NoRecipients)?;
            message.header = single.header;
            message.encrypted_key = single.encrypted_key;
        }
    }
    Ok(serde_json::to_string(&message)?)
}

pub(crate) fn decrypt_json(
    validator: &Validator,
    message: &str,
    keys: &KeySet,
) -> Result<DecryptionResult, Error> {
    let parsed: JweJson = serde_json::from_str(message)
        .map_err(|e| JWEError::InvalidJsonFormat(e.to_string()))?;

    let wire_recipients = match parsed.recipients {
        Some(recipients) => {
            ensure!(
                parsed.header.is_none() && parsed.encrypted_key.is_none(),
                JWEError::InvalidJsonFormat(
                    "the recipients array excludes top-level header and encrypted_key".to_string()
                )
            );
            ensure!(
                !recipients.is_empty(),
                JWEError::InvalidJsonFormat("empty recipients array".to_string())
            );
            recipients
        }
        None => vec![JsonRecipient {
            header: parsed.header,
            encrypted_key: parsed.encrypted_key,
        }],
    };
    let ciphertext_b64 = parsed
        .ciphertext
        .ok_or_else(|| JWEError::InvalidJsonFormat("missing ciphertext".to_string()))?;

    let protected_b64 = parsed.protected.unwrap_or_default();
    let protected: HeaderMap = if protected_b64.is_empty() {
        HeaderMap::new()
    } else {
        serde_json::from_slice(&base64::decode(&protected_b64)?)
            .map_err(|_| JWEError::InvalidHeader)?
    };
    let unprotected = parsed.unprotected.unwrap_or_default();

    // The AAD is built from the transmitted strings, not re-encoded values.
    let aad_input = authenticated_data(
        if protected_b64.is_empty() {
            None
        } else {
            Some(protected_b64.as_str())
        },
        parsed.aad.as_deref(),
    );

    let iv = base64::decode(parsed.iv.as_deref().unwrap_or_default())?;
    let ciphertext = base64::decode(&ciphertext_b64)?;
    let tag = base64::decode(parsed.tag.as_deref().unwrap_or_default())?;

    let mut failed_recipients = Vec::new();
    for (index, recipient) in wire_recipients.iter().enumerate() {
        match try_recipient(
            validator,
            recipient,
            &protected,
            &unprotected,
            keys,
            aad_input.as_bytes(),
            &iv,
            &ciphertext,
            &tag,
        ) {
            Ok(plaintext) => {
                return Ok(DecryptionResult {
                    plaintext,
                    successful_recipients: vec![index],
                    failed_recipients,
                });
            }
            Err(_) => failed_recipients.push(index),
        }
    }
    bail!(JWEError::NoMatchingRecipient)
}

#[allow(clippy::too_many_arguments)]
fn try_recipient(
    validator: &Validator,
    recipient: &JsonRecipient,
    protected: &HeaderMap,
    unprotected: &HeaderMap,
    keys: &KeySet,
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, Error> {
    let empty = HeaderMap::new();
    let recipient_header = recipient.header.as_ref().unwrap_or(&empty);
    let merged = header::merge_disjoint(&[protected, unprotected, recipient_header])?;

    let kid = merged.get("kid").and_then(Value::as_str);
    let key = keys.select(kid).ok_or(JWEError::MissingKey)?;
    validator.check(&merged, key)?;
    let alg = key_management_for(&merged)?;
    let enc = content_encryption_for(&merged)?;

    let encrypted_key = match &recipient.encrypted_key {
        Some(encrypted_key) => base64::decode(encrypted_key)?,
        None => Vec::new(),
    };
    let cek = CEK::new(alg.unwrap(key, &encrypted_key, &merged)?);
    let payload = enc.decrypt(cek.as_bytes(), iv, aad, ciphertext, tag)?;

    match compression_for(&merged)? {
        Some(compression) => compression.decompress(&payload),
        None => Ok(payload),
    }
}

/// AAD for the JSON forms (RFC 7516 section 5.1 step 14): the encoded
/// protected header, then a dot and the encoded extra data if present.
fn authenticated_data(protected_b64: Option<&str>, aad_b64: Option<&str>) -> String {
    match (protected_b64, aad_b64) {
        (Some(protected), Some(aad)) => format!("{}.{}", protected, aad),
        (Some(protected), None) => protected.to_string(),
        (None, Some(aad)) => format!(".{}", aad),
        (None, None) => String::new(),
    }
}

fn key_management_for(header: &HeaderMap) -> Result<KeyManagement, Error> {
    let name = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or(JWEError::MissingAlgorithm)?;
    KeyManagement::from_alg_name(name)
}

fn content_encryption_for(header: &HeaderMap) -> Result<ContentEncryption, Error> {
    let name = header
        .get("enc")
        .and_then(Value::as_str)
        .ok_or(JWEError::MissingEncryption)?;
    ContentEncryption::from_alg_name(name)
}
