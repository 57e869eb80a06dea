// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stratum-codec: optional compression and authenticated encryption for
//! slice payloads (§4.1 of the design).
//!
//! A payload is either the raw record array ([`Payload::Plain`]) or an
//! opaque, self-describing binary blob ([`Payload::Binary`]) produced by
//! [`encode`]. The binary form always compresses before it encrypts, so
//! ciphertext size never leaks information that compression would have hidden.
//!
//! Uses AES-256-GCM, an AEAD construction, rather than bare (unauthenticated)
//! CBC, so the encrypted form is both confidential and tamper-evident.

mod keyring;

pub use keyring::CodecKeyring;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::{Read, Write};
use thiserror::Error;

const FORMAT_VERSION: u8 = 1;
const FLAG_COMPRESSED: u8 = 0b01;
const FLAG_ENCRYPTED: u8 = 0b10;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 3;

/// Errors from encoding or decoding a slice payload (§7 `CodecError`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("payload too short to contain a codec header ({0} bytes)")]
    TruncatedHeader(usize),
    #[error("unsupported payload format version {0}")]
    UnsupportedVersion(u8),
    #[error("payload is encrypted with unknown key version {0}")]
    UnknownKeyVersion(u8),
    #[error("malformed ciphertext (authentication failed)")]
    Authentication,
    #[error("compressed stream is malformed: {0}")]
    Inflate(String),
    #[error("record array is not valid JSON: {0}")]
    Json(String),
}

/// Which transforms to apply when encoding a record batch (§4.1 contract).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    pub compress: bool,
    pub encrypt: bool,
}

impl CodecOptions {
    pub const NONE: CodecOptions = CodecOptions { compress: false, encrypt: false };

    pub fn is_plain(&self) -> bool {
        !self.compress && !self.encrypt
    }
}

/// The stored form of a slice's records: either the plain JSON array, or an
/// opaque binary blob (§4.1).
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Plain(Vec<Value>),
    Binary(Vec<u8>),
}

/// Encode a record batch per `opts` (§4.1). All strings are normalized to
/// UTF-8 via `serde_json`'s native UTF-8 string representation before
/// storage; `decode` restores the same UTF-8 text.
pub fn encode(
    records: &[Value],
    opts: CodecOptions,
    keyring: &CodecKeyring,
) -> Result<Payload, CodecError> {
    if opts.is_plain() {
        return Ok(Payload::Plain(records.to_vec()));
    }

    let serialized = serde_json::to_vec(records).map_err(|e| CodecError::Json(e.to_string()))?;

    let after_compress = if opts.compress { deflate(&serialized) } else { serialized };

    let mut out = Vec::with_capacity(HEADER_LEN + after_compress.len());
    let mut flags = 0u8;
    if opts.compress {
        flags |= FLAG_COMPRESSED;
    }

    if opts.encrypt {
        flags |= FLAG_ENCRYPTED;
        let (key_version, key) = keyring.active_key();
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let nonce_bytes = keyring.random_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, after_compress.as_ref())
            .map_err(|_| CodecError::Authentication)?;

        out.push(FORMAT_VERSION);
        out.push(flags);
        out.push(key_version);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
    } else {
        out.push(FORMAT_VERSION);
        out.push(flags);
        out.push(0); // key version unused when not encrypted
        out.extend_from_slice(&after_compress);
    }

    Ok(Payload::Binary(out))
}

/// Decode a payload back into records (§4.1). The binary header is
/// self-describing, so no `CodecOptions` are required to decode.
pub fn decode(payload: &Payload, keyring: &CodecKeyring) -> Result<Vec<Value>, CodecError> {
    match payload {
        Payload::Plain(records) => Ok(records.clone()),
        Payload::Binary(bytes) => decode_binary(bytes, keyring),
    }
}

fn decode_binary(bytes: &[u8], keyring: &CodecKeyring) -> Result<Vec<Value>, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TruncatedHeader(bytes.len()));
    }
    let version = bytes[0];
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let flags = bytes[1];
    let key_version = bytes[2];
    let body = &bytes[HEADER_LEN..];

    let compressed_or_plain = if flags & FLAG_ENCRYPTED != 0 {
        if body.len() < NONCE_LEN {
            return Err(CodecError::TruncatedHeader(bytes.len()));
        }
        let key = keyring.key_for_version(key_version).ok_or(CodecError::UnknownKeyVersion(key_version))?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let (nonce_bytes, ciphertext) = body.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        cipher.decrypt(nonce, ciphertext).map_err(|_| CodecError::Authentication)?
    } else {
        body.to_vec()
    };

    let serialized =
        if flags & FLAG_COMPRESSED != 0 { inflate(&compressed_or_plain)? } else { compressed_or_plain };

    serde_json::from_slice(&serialized).map_err(|e| CodecError::Json(e.to_string()))
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    // Writing to an in-memory Vec<u8> cannot fail.
    #[allow(clippy::unwrap_used)]
    {
        encoder.write_all(data).unwrap();
    }
    #[allow(clippy::unwrap_used)]
    encoder.finish().unwrap()
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| CodecError::Inflate(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
