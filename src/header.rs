//! JOSE header assembly and validation.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::algorithms::{ContentEncryption, KeyManagement};
use crate::compression::Compression;
use crate::error::*;
use crate::key::Key;

/// A JOSE header. Insertion order is preserved when serialized.
pub type HeaderMap = serde_json::Map<String, Value>;

/// Header parameter names registered by RFC 7516 section 4.1.
///
/// Registered names are understood by definition and may not appear in the
/// `crit` list.
pub(crate) const REGISTERED_HEADERS: &[&str] = &[
    "alg", "enc", "zip", "jku", "jwk", "kid", "x5u", "x5c", "x5t", "x5t#S256", "typ", "cty",
    "crit",
];

/// Assemble the protected header for a compact token: `alg` and `enc` first,
/// then the caller's extra parameters in their original order.
pub(crate) fn build(
    alg: KeyManagement,
    enc: ContentEncryption,
    extra: &HeaderMap,
) -> HeaderMap {
    let mut header = HeaderMap::new();
    header.insert("alg".to_string(), Value::String(alg.alg_name().to_string()));
    header.insert("enc".to_string(), Value::String(enc.alg_name().to_string()));
    for (name, value) in extra {
        header.insert(name.clone(), value.clone());
    }
    // An empty zip value means "no compression", not the empty algorithm.
    if header.get("zip") == Some(&Value::String(String::new())) {
        header.remove("zip");
    }
    header
}

/// Merge header parts that must not share parameter names (RFC 7516
/// section 7.2.1). Earlier parts win ordering; any overlap is an error.
pub(crate) fn merge_disjoint(parts: &[&HeaderMap]) -> Result<HeaderMap, Error> {
    let mut merged = HeaderMap::new();
    for part in parts {
        for (name, value) in *part {
            ensure!(
                !merged.contains_key(name),
                JWEError::DuplicateHeaderParameter(name.clone())
            );
            merged.insert(name.clone(), value.clone());
        }
    }
    Ok(merged)
}

/// Validates a fully merged header and the key before any cryptography runs.
///
/// The `crit` checks implement RFC 7516 section 4.1.13: a message carrying a
/// critical extension must be rejected unless the application has declared
/// that extension supported.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    supported_critical_headers: BTreeSet<String>,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    /// Declare a critical extension header as understood and processed.
    pub fn with_supported_critical_header(mut self, name: impl Into<String>) -> Self {
        self.supported_critical_headers.insert(name.into());
        self
    }

    pub(crate) fn check(&self, header: &HeaderMap, key: &Key) -> Result<(), Error> {
        Self::check_alg(header)?;
        Self::check_enc(header)?;
        Self::check_zip(header)?;
        self.check_crit(header)?;
        ensure!(!key.is_blank(), JWEError::MissingKey);
        Ok(())
    }

    fn check_alg(header: &HeaderMap) -> Result<(), Error> {
        let name = header.get("alg").and_then(Value::as_str).unwrap_or("");
        KeyManagement::from_alg_name(name)?;
        Ok(())
    }

    fn check_enc(header: &HeaderMap) -> Result<(), Error> {
        let name = header.get("enc").and_then(Value::as_str).unwrap_or("");
        ContentEncryption::from_alg_name(name)?;
        Ok(())
    }

    fn check_zip(header: &HeaderMap) -> Result<(), Error> {
        match header.get("zip") {
            None => Ok(()),
            Some(Value::String(name)) if name.is_empty() => Ok(()),
            Some(Value::String(name)) => {
                Compression::from_zip_name(name)?;
                Ok(())
            }
            Some(_) => bail!(JWEError::InvalidCompression(String::new())),
        }
    }

    fn check_crit(&self, header: &HeaderMap) -> Result<(), Error> {
        let crit = match header.get("crit") {
            None => return Ok(()),
            Some(value) => value,
        };
        let names = match crit.as_array() {
            Some(names) if !names.is_empty() => names,
            _ => bail!(JWEError::MalformedCriticalHeader),
        };
        for name in names {
            let name = name.as_str().ok_or(JWEError::MalformedCriticalHeader)?;
            ensure!(
                !REGISTERED_HEADERS.contains(&name),
                JWEError::RegisteredCriticalHeader(name.to_string())
            );
            ensure!(
                header.contains_key(name),
                JWEError::MissingCriticalHeader(name.to_string())
            );
            ensure!(
                self.supported_critical_headers.contains(name),
                JWEError::UnsupportedCriticalHeader(name.to_string())
            );
        }
        Ok(())
    }
}
