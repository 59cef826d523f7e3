#[allow(unused)]
pub use anyhow::{anyhow, bail, ensure, Error};

#[derive(Debug, thiserror::Error)]
pub enum JWEError {
    #[error("Internal error: [{0}]")]
    InternalError(String),
    #[error("\"{0}\" is not a valid alg method")]
    InvalidAlgorithm(String),
    #[error("\"{0}\" is not a valid enc method")]
    InvalidEncryption(String),
    #[error("\"{0}\" is not a valid zip method")]
    InvalidCompression(String),
    #[error("The key must not be empty")]
    MissingKey,
    #[error("The key cannot be used with this algorithm")]
    InvalidKey,
    #[error("The supplied key is invalid. Required length: {0}")]
    InvalidCEK(usize),
    #[error("Invalid initialization vector")]
    InvalidIV,
    #[error("Duplicate header parameter: \"{0}\"")]
    DuplicateHeaderParameter(String),
    #[error("\"crit\" header must be a non-empty array of strings")]
    MalformedCriticalHeader,
    #[error("\"{0}\" is a registered header and cannot be in \"crit\"")]
    RegisteredCriticalHeader(String),
    #[error("\"{0}\" is in \"crit\" but not present in header")]
    MissingCriticalHeader(String),
    #[error("Unsupported critical header: \"{0}\"")]
    UnsupportedCriticalHeader(String),
    #[error("\"{0}\" is not implemented")]
    UnsupportedAlgorithm(String),
    #[error("Invalid ciphertext or authentication tag")]
    DecryptionFailed,
    #[error("Invalid base64url encoding")]
    InvalidBase64,
    #[error("Not enough or too many segments")]
    InvalidCompactFormat,
    #[error("Invalid JWE JSON serialization: {0}")]
    InvalidJsonFormat(String),
    #[error("The JWE header is not a valid JSON object")]
    InvalidHeader,
    #[error("Missing \"{0}\" header parameter")]
    MissingHeaderParameter(&'static str),
    #[error("Invalid compressed payload")]
    InvalidCompressedData,
    #[error("JWE header too large")]
    HeaderTooLarge,
    #[error("At least one recipient is required")]
    NoRecipients,
    #[error("Flattened serialization allows only one recipient")]
    TooManyRecipients,
    #[error("\"enc\" is required in the protected or unprotected header")]
    MissingEncryption,
    #[error("\"alg\" is required for every recipient")]
    MissingAlgorithm,
    #[error("\"dir\" can only be used with a single recipient")]
    DirectKeyWithMultipleRecipients,
    #[error("No recipient could decrypt the message")]
    NoMatchingRecipient,
}

impl From<&str> for JWEError {
    fn from(e: &str) -> JWEError {
        JWEError::InternalError(e.into())
    }
}
