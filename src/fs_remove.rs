//! # Path Remover
//!
//! A single operation: best-effort removal of a file or directory tree.
//! Well-known filesystem errors (missing, permission denied) are logged as
//! warnings and swallowed; anything else is logged too, with a generic
//! tail, but still never propagated — the deletion planner's `execute()`
//! must be able to plough through every scheduled path regardless of
//! individual failures (spec.md §4.5).
//!
//! Grounded on `but-next::manifest::delete_snapshot`'s
//! `let _ = std::fs::remove_file(&path);` best-effort pattern, generalized
//! from silent-ignore to classified, logged failures.

use std::io;
use std::path::Path;

/// Attempts to remove `path` (recursively, if it's a directory). Never
/// raises; every failure is logged at `WARNING` level and then discarded.
/// `path_type` is a short tag (`"blob"`, `"snapshot"`, `"ref"`, `"repo"`)
/// used only to make the log message legible.
pub fn try_delete_path(path: &Path, path_type: &str) {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    if let Err(err) = result {
        log_failure(path, path_type, &err);
    }
}

fn log_failure(path: &Path, path_type: &str, err: &io::Error) {
    let reason = match err.kind() {
        io::ErrorKind::NotFound => "file not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => err.to_string(),
    };

    log::warn!(
        "Couldn't delete {path_type}: {reason} ({})\n{}",
        path.display(),
        diagnostic(),
    );
}

/// A stand-in for a stack trace: the real backtrace is only captured when
/// the caller has opted in via `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE`,
/// mirroring the opt-in cost Python's `traceback` module doesn't have but
/// Rust's `std::backtrace` does.
fn diagnostic() -> String {
    let bt = std::backtrace::Backtrace::capture();
    match bt.status() {
        std::backtrace::BacktraceStatus::Captured => format!("Backtrace:\n{bt}"),
        _ => "Backtrace unavailable (set RUST_BACKTRACE=1 for a stack trace)".to_string(),
    }
}
