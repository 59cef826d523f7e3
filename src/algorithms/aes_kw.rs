//! AES Key Wrap (RFC 3394), implemented over the raw AES block cipher.
//!
//! Written directly in terms of 64-bit register/chunk rounds rather than a
//! backend key-wrap mode, so it works on any build of the block cipher.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};

use crate::error::*;

/// Fixed initial value of the integrity register (RFC 3394 section 2.2.3.1).
const KW_IV: [u8; 8] = [0xa6; 8];

/// An AES key-encryption key of any of the three registered sizes.
pub(crate) enum AesKw {
    A128(Aes128),
    A192(Aes192),
    A256(Aes256),
}

impl AesKw {
    pub(crate) fn new(kek: &[u8]) -> Result<Self, Error> {
        match kek.len() {
            16 => Ok(AesKw::A128(Aes128::new(GenericArray::from_slice(kek)))),
            24 => Ok(AesKw::A192(Aes192::new(GenericArray::from_slice(kek)))),
            32 => Ok(AesKw::A256(Aes256::new(GenericArray::from_slice(kek)))),
            _ => bail!(JWEError::InvalidKey),
        }
    }

    fn encrypt_block(&self, block: &mut [u8; 16]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            AesKw::A128(cipher) => cipher.encrypt_block(block),
            AesKw::A192(cipher) => cipher.encrypt_block(block),
            AesKw::A256(cipher) => cipher.encrypt_block(block),
        }
    }

    fn decrypt_block(&self, block: &mut [u8; 16]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            AesKw::A128(cipher) => cipher.decrypt_block(block),
            AesKw::A192(cipher) => cipher.decrypt_block(block),
            AesKw::A256(cipher) => cipher.decrypt_block(block),
        }
    }

    /// Wrap a key. The output is 8 bytes longer than the input.
    ///
    /// The input length must be a positive multiple of 8 bytes; every
    /// registered CEK length is, so a violation is a caller bug.
    pub(crate) fn wrap(&self, cek: &[u8]) -> Vec<u8> {
        assert!(
            !cek.is_empty() && cek.len() % 8 == 0,
            "key wrap input must be a positive multiple of 8 bytes"
        );
        let n = cek.len() / 8;
        let mut register = KW_IV;
        let mut chunks = to_chunks(cek);
        let mut block = [0u8; 16];

        for j in 0..6 {
            for (i, chunk) in chunks.iter_mut().enumerate() {
                block[..8].copy_from_slice(&register);
                block[8..].copy_from_slice(chunk);
                self.encrypt_block(&mut block);
                register.copy_from_slice(&block[..8]);
                xor_counter(&mut register, (n * j + i + 1) as u64);
                chunk.copy_from_slice(&block[8..]);
            }
        }

        let mut wrapped = Vec::with_capacity(cek.len() + 8);
        wrapped.extend_from_slice(&register);
        for chunk in &chunks {
            wrapped.extend_from_slice(chunk);
        }
        wrapped
    }

    /// Unwrap a key, verifying the integrity register.
    ///
    /// Returns an error if the final register differs from the fixed IV:
    /// the wrapped key was tampered with and nothing may be returned.
    pub(crate) fn unwrap(&self, wrapped: &[u8]) -> Result<Vec<u8>, Error> {
        ensure!(
            wrapped.len() >= 16 && wrapped.len() % 8 == 0,
            JWEError::DecryptionFailed
        );
        let n = wrapped.len() / 8 - 1;
        let mut register: [u8; 8] = [0u8; 8];
        register.copy_from_slice(&wrapped[..8]);
        let mut chunks = to_chunks(&wrapped[8..]);
        let mut block = [0u8; 16];

        for j in (0..6).rev() {
            for i in (0..n).rev() {
                xor_counter(&mut register, (n * j + i + 1) as u64);
                block[..8].copy_from_slice(&register);
                block[8..].copy_from_slice(&chunks[i]);
                self.decrypt_block(&mut block);
                register.copy_from_slice(&block[..8]);
                chunks[i].copy_from_slice(&block[8..]);
            }
        }

        ensure!(register == KW_IV, JWEError::DecryptionFailed);
        Ok(chunks.concat())
    }
}

fn to_chunks(data: &[u8]) -> Vec<[u8; 8]> {
    data.chunks_exact(8)
        .map(|chunk| {
            let mut block = [0u8; 8];
            block.copy_from_slice(chunk);
            block
        })
        .collect()
}

/// XOR the round counter into the register, big-endian (RFC 3394 2.2.1).
fn xor_counter(register: &mut [u8; 8], t: u64) {
    for (byte, counter_byte) in register.iter_mut().zip(t.to_be_bytes().iter()) {
        *byte ^= counter_byte;
    }
}
