//! # Scanner
//!
//! Walks a cache root directory, recognises repo folders by the
//! `<type>s--<org>--<name>` naming convention, reads `refs/`, `snapshots/`
//! and `blobs/` subtrees, resolves symlinks, and assembles an `HFCacheInfo`
//! report. Non-fatal problems are accumulated as warnings; the offending
//! repo is dropped and the scan continues — following
//! `but-next::manifest::list_snapshots`'s "skip and warn, never abort on a
//! single bad entry" style.

use crate::error::{CacheError, Result};
use crate::naming::{self, NamingError, RepoType};
use crate::report::{CachedFile, CachedRepo, CachedRevision, HFCacheInfo};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Scans `cache_dir` and returns a full report. Fails hard only if
/// `cache_dir` itself doesn't exist or isn't a directory (spec.md §4.2);
/// every other problem becomes a warning on the returned report.
pub fn scan_cache_dir(cache_dir: &Path) -> Result<HFCacheInfo> {
    if !cache_dir.is_dir() {
        return Err(CacheError::InvalidCacheRoot(cache_dir.to_path_buf()));
    }

    let mut repos = Vec::new();
    let mut warnings = Vec::new();

    for entry in fs::read_dir(cache_dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_dir() {
            warn(&mut warnings, format!("Repo path is not a directory: {}", path.display()));
            continue;
        }

        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let (repo_type, repo_id) = match naming::parse_repo_folder(&basename) {
            Ok(parsed) => parsed,
            Err(NamingError::NotHfCacheDir) => {
                warn(
                    &mut warnings,
                    format!("Repo path is not a valid HuggingFace cache directory: {}", path.display()),
                );
                continue;
            }
            Err(NamingError::UnknownRepoType(prefix)) => {
                warn(
                    &mut warnings,
                    format!(
                        "Repo type must be `dataset`, `model` or `space`, found `{prefix}` ({}).",
                        path.display()
                    ),
                );
                continue;
            }
        };

        match scan_repo(&path, repo_type, repo_id) {
            Ok(repo) => repos.push(repo),
            Err(message) => warn(&mut warnings, message),
        }
    }

    Ok(HFCacheInfo { repos, warnings })
}

fn warn(warnings: &mut Vec<String>, message: String) {
    log::warn!("{message}");
    warnings.push(message);
}

fn scan_repo(repo_path: &Path, repo_type: RepoType, repo_id: String) -> std::result::Result<CachedRepo, String> {
    let snapshots_dir = repo_path.join("snapshots");
    if !snapshots_dir.is_dir() {
        return Err(format!(
            "Snapshots dir doesn't exist in cached repo: {}",
            snapshots_dir.display()
        ));
    }

    let mut revisions: BTreeMap<String, CachedRevision> = BTreeMap::new();

    let snapshot_entries = fs::read_dir(&snapshots_dir).map_err(|e| e.to_string())?;
    for entry in snapshot_entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let snap_path = entry.path();

        if !snap_path.is_dir() {
            return Err(format!(
                "Snapshots folder corrupted. Found a file: {}",
                snap_path.display()
            ));
        }

        let commit_hash = snap_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let files = scan_snapshot_files(&snap_path)?;

        revisions.insert(
            commit_hash.clone(),
            CachedRevision {
                commit_hash,
                snapshot_path: snap_path,
                files,
                refs: BTreeSet::new(),
            },
        );
    }

    let ref_map = scan_refs(repo_path)?;

    let unknown: BTreeMap<&String, &BTreeSet<String>> = ref_map
        .iter()
        .filter(|(hash, _)| !revisions.contains_key(*hash))
        .collect();
    if !unknown.is_empty() {
        return Err(format!(
            "Reference(s) refer to missing commit hashes: {} ({}).",
            format_hash_to_refs(&unknown),
            repo_path.display()
        ));
    }

    for (hash, names) in &ref_map {
        if let Some(rev) = revisions.get_mut(hash) {
            rev.refs = names.clone();
        }
    }

    let mut repo_refs: BTreeMap<String, CachedRevision> = BTreeMap::new();
    for (hash, names) in &ref_map {
        let rev = revisions
            .get(hash)
            .expect("unknown hashes were rejected above");
        for name in names {
            repo_refs.insert(name.clone(), rev.clone());
        }
    }

    Ok(CachedRepo {
        repo_id,
        repo_type,
        repo_path: repo_path.to_path_buf(),
        revisions,
        refs: repo_refs,
    })
}

/// Recursively enumerates symlinked files inside a single snapshot directory.
fn scan_snapshot_files(snap_path: &Path) -> std::result::Result<BTreeSet<CachedFile>, String> {
    let mut files = BTreeSet::new();

    for entry in WalkDir::new(snap_path).min_depth(1) {
        let entry = entry.map_err(|e| e.to_string())?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_symlink() {
            return Err(format!(
                "Snapshot file is not a symlink to a blob: {}",
                entry.path().display()
            ));
        }

        let file_path = entry.path().to_path_buf();
        let link_target = fs::read_link(&file_path).map_err(|e| e.to_string())?;
        let blob_path = if link_target.is_absolute() {
            link_target
        } else {
            file_path
                .parent()
                .expect("walked entry always has a parent")
                .join(link_target)
        };
        let blob_path = fs::canonicalize(&blob_path).unwrap_or(blob_path);

        let metadata = fs::metadata(&blob_path)
            .map_err(|e| format!("Broken symlink to blob {}: {e}", blob_path.display()))?;

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        files.insert(CachedFile {
            file_name,
            file_path,
            blob_path,
            size_on_disk: metadata.len(),
            blob_last_accessed: to_unix_secs(metadata.accessed()),
            blob_last_modified: to_unix_secs(metadata.modified()),
        });
    }

    Ok(files)
}

fn to_unix_secs(time: std::io::Result<std::time::SystemTime>) -> u64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Reads every ref file under `repo_path/refs`, mapping the referenced
/// commit hash to the set of ref names that point at it.
fn scan_refs(repo_path: &Path) -> std::result::Result<BTreeMap<String, BTreeSet<String>>, String> {
    let refs_dir = repo_path.join("refs");
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    if !refs_dir.is_dir() {
        return Ok(map);
    }

    for entry in WalkDir::new(&refs_dir).min_depth(1) {
        let entry = entry.map_err(|e| e.to_string())?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&refs_dir)
            .expect("walked entry is under refs_dir");
        let ref_name = naming::ref_name_from_relative_path(relative);

        let content = fs::read_to_string(entry.path()).map_err(|e| e.to_string())?;
        let hash = content.trim().to_string();

        map.entry(hash).or_default().insert(ref_name);
    }

    Ok(map)
}

/// Renders a hash -> {refnames} map the way Python's `repr(dict)` would,
/// matching the original warning string's exact punctuation.
fn format_hash_to_refs(map: &BTreeMap<&String, &BTreeSet<String>>) -> String {
    let entries: Vec<String> = map
        .iter()
        .map(|(hash, names)| {
            let names_repr = names
                .iter()
                .map(|n| format!("'{n}'"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("'{hash}': {{{names_repr}}}")
        })
        .collect();
    format!("{{{}}}", entries.join(", "))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn make_blob(repo: &Path, hash: &str, contents: &[u8]) -> std::path::PathBuf {
        let blobs = repo.join("blobs");
        fs::create_dir_all(&blobs).unwrap();
        let path = blobs.join(hash);
        fs::write(&path, contents).unwrap();
        path
    }

    fn link_snapshot_file(repo: &Path, commit_hash: &str, relpath: &str, blob: &Path) {
        let snap_file = repo.join("snapshots").join(commit_hash).join(relpath);
        fs::create_dir_all(snap_file.parent().unwrap()).unwrap();
        symlink(blob, &snap_file).unwrap();
    }

    fn write_ref(repo: &Path, ref_path: &str, hash: &str) {
        let path = repo.join("refs").join(ref_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, hash).unwrap();
    }

    #[test]
    fn scan_missing_root_is_hard_error() {
        let err = scan_cache_dir(Path::new("/does/not/exist/at/all")).unwrap_err();
        assert!(matches!(err, CacheError::InvalidCacheRoot(_)));
    }

    #[test]
    fn scan_root_that_is_a_file_is_hard_error() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("file.txt");
        fs::write(&file_path, b"x").unwrap();
        let err = scan_cache_dir(&file_path).unwrap_err();
        assert!(matches!(err, CacheError::InvalidCacheRoot(_)));
    }

    #[test]
    fn scan_clean_repo_with_shared_readme_blob() {
        let tmp = TempDir::new().unwrap();
        let repo_dir = tmp.path().join("models--valid_org--test_scan_repo_a");
        fs::create_dir_all(&repo_dir).unwrap();

        let readme_blob = make_blob(&repo_dir, "readme_blob_hash", b"hello readme");
        let other_blob = make_blob(&repo_dir, "other_blob_hash", b"other content");

        link_snapshot_file(&repo_dir, "main_hash", "README.md", &readme_blob);
        link_snapshot_file(&repo_dir, "main_hash", "config.json", &other_blob);
        link_snapshot_file(&repo_dir, "pr_hash", "README.md", &readme_blob);

        write_ref(&repo_dir, "main", "main_hash");
        write_ref(&repo_dir, "refs/pr/1", "pr_hash");

        let report = scan_cache_dir(tmp.path()).unwrap();
        assert_eq!(report.warnings.len(), 0);
        assert_eq!(report.repos.len(), 1);

        let repo = &report.repos[0];
        assert_eq!(repo.repo_id, "valid_org/test_scan_repo_a");
        assert_eq!(repo.revisions.len(), 2);
        assert_eq!(repo.nb_files(), 2); // readme + config, deduped

        let main_rev = repo.revision("main_hash").unwrap();
        assert_eq!(main_rev.refs, BTreeSet::from(["main".to_string()]));
        let pr_rev = repo.revision("pr_hash").unwrap();
        assert_eq!(pr_rev.refs, BTreeSet::from(["refs/pr/1".to_string()]));

        let main_readme = main_rev
            .files
            .iter()
            .find(|f| f.file_name == "README.md")
            .unwrap();
        let pr_readme = pr_rev
            .files
            .iter()
            .find(|f| f.file_name == "README.md")
            .unwrap();
        assert_ne!(main_readme.file_path, pr_readme.file_path);
        assert_eq!(main_readme.blob_path, pr_readme.blob_path);
    }

    #[test]
    fn stray_file_under_root_is_warned_and_skipped() {
        let tmp = TempDir::new().unwrap();
        let stray = tmp.path().join("a_file_that_should_not_be_there.txt");
        fs::write(&stray, b"x").unwrap();

        let repo_dir = tmp.path().join("models--org--name");
        fs::create_dir_all(repo_dir.join("snapshots")).unwrap();

        let report = scan_cache_dir(tmp.path()).unwrap();
        assert_eq!(report.repos.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0],
            format!("Repo path is not a directory: {}", stray.display())
        );
    }

    #[test]
    fn badly_named_folder_is_warned_and_skipped() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("a_folder_that_should_not_be_there");
        fs::create_dir_all(&bad).unwrap();

        let report = scan_cache_dir(tmp.path()).unwrap();
        assert_eq!(report.repos.len(), 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0],
            format!("Repo path is not a valid HuggingFace cache directory: {}", bad.display())
        );
    }

    #[test]
    fn unknown_repo_type_prefix_is_warned_and_skipped() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("not-models--t5-small");
        fs::create_dir_all(&bad).unwrap();

        let report = scan_cache_dir(tmp.path()).unwrap();
        assert_eq!(report.repos.len(), 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0],
            format!(
                "Repo type must be `dataset`, `model` or `space`, found `not-model` ({}).",
                bad.display()
            )
        );
    }

    #[test]
    fn missing_snapshots_dir_drops_repo() {
        let tmp = TempDir::new().unwrap();
        let repo_dir = tmp.path().join("models--org--name");
        fs::create_dir_all(&repo_dir).unwrap();

        let report = scan_cache_dir(tmp.path()).unwrap();
        assert_eq!(report.repos.len(), 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0],
            format!(
                "Snapshots dir doesn't exist in cached repo: {}",
                repo_dir.join("snapshots").display()
            )
        );
    }

    #[test]
    fn stray_file_in_snapshots_dir_drops_repo() {
        let tmp = TempDir::new().unwrap();
        let repo_dir = tmp.path().join("models--org--name");
        let snapshots = repo_dir.join("snapshots");
        fs::create_dir_all(&snapshots).unwrap();
        let stray = snapshots.join("should_not_be_there");
        fs::write(&stray, b"x").unwrap();

        let report = scan_cache_dir(tmp.path()).unwrap();
        assert_eq!(report.repos.len(), 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0],
            format!("Snapshots folder corrupted. Found a file: {}", stray.display())
        );
    }

    #[test]
    fn ref_to_missing_revision_drops_repo() {
        let tmp = TempDir::new().unwrap();
        let repo_dir = tmp.path().join("models--org--name");
        let blob = make_blob(&repo_dir, "h", b"x");
        link_snapshot_file(&repo_dir, "main_hash", "a.txt", &blob);
        write_ref(&repo_dir, "main", "main_hash");
        write_ref(&repo_dir, "not_main", "revision_hash_that_does_not_exist");

        let report = scan_cache_dir(tmp.path()).unwrap();
        assert_eq!(report.repos.len(), 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0],
            format!(
                "Reference(s) refer to missing commit hashes: {{'revision_hash_that_does_not_exist': {{'not_main'}}}} ({}).",
                repo_dir.display()
            )
        );
    }
}
