//! crates/pf_io/src/lib.rs
//! Local, offline I/O for the PF engine.
//!
//! - `manifest`: JSON manifest naming the historical and current datasets
//! - `loader`: delimited result exports → `pf_core::Dataset`
//! - `canonical_json`: sorted-key compact JSON + atomic file writes
//! - `hasher`: SHA-256 digests of raw input bytes and canonical JSON
//!
//! Shared error type (`IoError`) with `From` conversions used across modules.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod canonical_json;
pub mod hasher;
pub mod loader;
pub mod manifest;

pub use loader::{load_dataset, load_inputs, LoadedInputs};
pub use manifest::{load_and_resolve_manifest, load_verify_manifest, Manifest, ManifestError, ResolvedManifest};

/// Unified error for pf_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, persist, ...).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON serialization/deserialization errors.
    #[error("json error: {0}")]
    Json(String),

    /// Malformed delimited input; `line` is 1-based, 0 when unknown.
    #[error("csv error in {path} at line {line}: {msg}")]
    Csv { path: String, line: u64, msg: String },

    /// Loaded units violate a dataset invariant (duplicate ids, ragged options).
    #[error("dataset {name}: {source}")]
    Dataset {
        name: String,
        #[source]
        source: pf_core::CoreError,
    },

    #[error("hash error: {0}")]
    Hash(#[from] hasher::HashError),

    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),
}

pub type IoResult<T> = Result<T, IoError>;

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json(e.to_string())
    }
}
