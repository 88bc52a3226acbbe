//! # Error Types
//!
//! Defines a small error hierarchy for the cache inspector using `thiserror`.
//! Only the hard failures described as "raised to caller" are modeled here;
//! soft, per-entity warnings are accumulated as plain strings on the report
//! itself rather than surfaced as errors (see `report::HFCacheInfo::warnings`).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for cache scanning and deletion.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The path passed to `scan_cache_dir` does not exist or is not a directory.
    #[error("Cache directory not found or is not a directory: {0}")]
    InvalidCacheRoot(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
