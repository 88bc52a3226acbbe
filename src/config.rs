//! # Cache Root Resolution
//!
//! Locates the cache directory to operate on, honoring an explicit CLI
//! override first and otherwise falling back through the same environment
//! variables the original tooling uses. Grounded on
//! `but-next::config::load_config`'s search-path priority list, adapted
//! from "first existing file on a list of candidate paths" to "first set
//! environment variable on a list of candidate sources".

use std::env;
use std::path::PathBuf;

const DEFAULT_CACHE_SUBDIR: &str = ".cache/huggingface/hub";

/// Resolves the cache root to scan, in priority order:
/// 1. `explicit` (typically the CLI's `--dir` flag)
/// 2. `$HUGGINGFACE_HUB_CACHE`
/// 3. `$HF_HOME/hub`
/// 4. `$HOME/.cache/huggingface/hub`
///
/// Never touches the filesystem — callers are responsible for validating
/// that the resolved path actually exists and is a directory.
pub fn resolve_cache_root(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    if let Some(path) = env::var_os("HUGGINGFACE_HUB_CACHE") {
        return Some(PathBuf::from(path));
    }

    if let Some(hf_home) = env::var_os("HF_HOME") {
        return Some(PathBuf::from(hf_home).join("hub"));
    }

    env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_CACHE_SUBDIR))
}
