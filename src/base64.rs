//! Unpadded, URL-safe base64 as used for every JWE segment.

use ct_codecs::{Base64UrlSafeNoPadding, Decoder, Encoder};

use crate::error::*;

/// Encode bytes as unpadded base64url.
pub fn encode(bin: impl AsRef<[u8]>) -> Result<String, Error> {
    Base64UrlSafeNoPadding::encode_to_string(bin.as_ref())
        .map_err(|e| JWEError::InternalError(e.to_string()).into())
}

/// Decode an unpadded base64url string.
///
/// Padding characters are not accepted; JWE segments are always unpadded.
pub fn decode(b64: impl AsRef<str>) -> Result<Vec<u8>, Error> {
    Base64UrlSafeNoPadding::decode_to_vec(b64.as_ref(), None)
        .map_err(|_| JWEError::InvalidBase64.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let bin = b"\x00\x01\xfe\xffJWE payload";
        let b64 = encode(bin).unwrap();
        assert!(!b64.contains('='));
        assert_eq!(decode(&b64).unwrap(), bin);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(decode("not base64url!").is_err());
    }

    #[test]
    fn empty_input() {
        assert_eq!(encode(b"").unwrap(), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }
}
