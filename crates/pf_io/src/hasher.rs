//! crates/pf_io/src/hasher.rs
//!
//! SHA-256 digests, always lowercase 64-hex.
//! - `sha256_hex`, `sha256_stream`, `sha256_file`: raw bytes (input exports are hashed as-is).
//! - `sha256_canonical`: canonical JSON bytes of a serializable value (logged digest of `prediction.json`).

#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::canonical_json::to_canonical_bytes;

/* ----------------------------------- Errors ----------------------------------- */

#[derive(Error, Debug)]
pub enum HashError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("canonicalization error: {0}")]
    Canonical(String),

    #[error("invalid hex (expected lowercase 64-hex): {0}")]
    InvalidHex(String),
}

/* ---------------------------------- Helpers ---------------------------------- */

fn to_lower_hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(LUT[(b >> 4) as usize] as char);
        out.push(LUT[(b & 0x0F) as usize] as char);
    }
    out
}

#[inline]
pub fn is_lower_hex_64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f'))
}

/// First `n` characters of a validated digest, for compact display.
pub fn short_hex(hex64: &str, n: usize) -> Result<&str, HashError> {
    if !is_lower_hex_64(hex64) {
        return Err(HashError::InvalidHex(hex64.to_string()));
    }
    Ok(&hex64[..n.min(64)])
}

/* ------------------------------- Raw hashing ------------------------------- */

pub fn sha256_hex(bytes: &[u8]) -> String {
    to_lower_hex(&Sha256::digest(bytes))
}

pub fn sha256_stream<R: Read>(reader: &mut R) -> Result<String, HashError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_lower_hex(&hasher.finalize()))
}

pub fn sha256_file(path: &Path) -> Result<String, HashError> {
    let mut r = BufReader::new(File::open(path)?);
    sha256_stream(&mut r)
}

/* ---------------------------- Canonical hashing ---------------------------- */

/// SHA-256 over the canonical JSON bytes of `value` (key order of the input does not matter).
pub fn sha256_canonical<T: Serialize>(value: &T) -> Result<String, HashError> {
    let bytes = to_canonical_bytes(value).map_err(|e| HashError::Canonical(e.to_string()))?;
    Ok(sha256_hex(&bytes))
}

/* ------------------------------------ Tests ------------------------------------ */
