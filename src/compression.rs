//! Payload compression (`zip` header parameter).

use std::io::{Read, Write};

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::DeflateEncoder;

use crate::error::*;

/// Compression algorithms registered for the `zip` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    /// Raw DEFLATE (RFC 1951), the `DEF` identifier from RFC 7516.
    Deflate,
}

/// Every registered `zip` value.
pub const ALL_COMPRESSION: &[Compression] = &[Compression::Deflate];

impl Compression {
    /// The JWE `zip` header value for this algorithm.
    pub fn zip_name(&self) -> &'static str {
        match self {
            Compression::Deflate => "DEF",
        }
    }

    /// Resolve a `zip` header value. Matching is exact and case-sensitive.
    pub fn from_zip_name(name: &str) -> Result<Self, Error> {
        match name {
            "DEF" => Ok(Compression::Deflate),
            _ => bail!(JWEError::InvalidCompression(name.to_string())),
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    /// Decompress a payload.
    ///
    /// Early releases of the format emitted zlib-wrapped streams (RFC 1950)
    /// instead of raw DEFLATE; both are accepted so old tokens keep working.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        if ZlibDecoder::new(data).read_to_end(&mut out).is_ok() {
            return Ok(out);
        }
        let mut out = Vec::new();
        DeflateDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|_| JWEError::InvalidCompressedData)?;
        Ok(out)
    }
}
