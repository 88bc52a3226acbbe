//! # Report Model
//!
//! The immutable data model produced by a cache scan: cache -> repos ->
//! revisions -> files, plus refs and warnings. All entities are plain,
//! publicly-readable records (no opaque handles) so that callers — and
//! tests — can assemble or inspect them directly, mirroring
//! `but-next::manifest::Snapshot`'s plain-record shape.
//!
//! Ref handling follows the design noted in spec.md §9: a revision knows
//! its own ref names (a plain `BTreeSet<String>`), and a repo separately
//! maps ref name -> the revision it points to. There is no object cycle;
//! a revision carries names, not a pointer back to its owning repo.

use crate::naming::RepoType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A single cached file: a symlink inside a snapshot pointing at a blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CachedFile {
    pub file_name: String,
    pub file_path: PathBuf,
    pub blob_path: PathBuf,
    pub size_on_disk: u64,
    pub blob_last_accessed: u64,
    pub blob_last_modified: u64,
}

impl Ord for CachedFile {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.file_path.cmp(&other.file_path)
    }
}
impl PartialOrd for CachedFile {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// One named commit-hash snapshot within a repo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRevision {
    pub commit_hash: String,
    pub snapshot_path: PathBuf,
    pub files: BTreeSet<CachedFile>,
    pub refs: BTreeSet<String>,
}

impl CachedRevision {
    pub fn nb_files(&self) -> usize {
        self.files.len()
    }

    /// Sum of each file's `size_on_disk`. Deliberately NOT deduplicated by
    /// blob path: two symlinks in the same snapshot pointing at the same
    /// blob are both counted, per spec.md §4.3.
    pub fn size_on_disk(&self) -> u64 {
        self.files.iter().map(|f| f.size_on_disk).sum()
    }

    /// The set of distinct blob paths reachable from this revision.
    pub fn blob_paths(&self) -> BTreeSet<&PathBuf> {
        self.files.iter().map(|f| &f.blob_path).collect()
    }

    pub fn last_modified(&self) -> u64 {
        self.files
            .iter()
            .map(|f| f.blob_last_modified)
            .max()
            .unwrap_or(0)
    }
}

/// A repository directory: `<type>s--<org>--<name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRepo {
    pub repo_id: String,
    pub repo_type: RepoType,
    pub repo_path: PathBuf,
    /// Revisions keyed by commit hash.
    pub revisions: BTreeMap<String, CachedRevision>,
    /// Ref name -> the revision it points to (not just its hash), so
    /// callers can reach `snapshot_path`/`files` straight off a ref lookup.
    pub refs: BTreeMap<String, CachedRevision>,
}

impl CachedRepo {
    pub fn revision(&self, commit_hash: &str) -> Option<&CachedRevision> {
        self.revisions.get(commit_hash)
    }

    /// Distinct blob paths reachable from ANY revision of this repo, each
    /// mapped to its size. The basis for deduplicated repo-level accounting.
    fn blob_size_map(&self) -> BTreeMap<&PathBuf, u64> {
        let mut map = BTreeMap::new();
        for rev in self.revisions.values() {
            for file in &rev.files {
                map.insert(&file.blob_path, file.size_on_disk);
            }
        }
        map
    }

    /// Deduplicated size: each distinct blob counted once across all revisions.
    pub fn size_on_disk(&self) -> u64 {
        self.blob_size_map().values().sum()
    }

    /// Deduplicated file count: each distinct blob counted once.
    pub fn nb_files(&self) -> usize {
        self.blob_size_map().len()
    }

    pub fn last_accessed(&self) -> u64 {
        self.revisions
            .values()
            .flat_map(|r| r.files.iter())
            .map(|f| f.blob_last_accessed)
            .max()
            .unwrap_or(0)
    }

    pub fn last_modified(&self) -> u64 {
        self.revisions
            .values()
            .flat_map(|r| r.files.iter())
            .map(|f| f.blob_last_modified)
            .max()
            .unwrap_or(0)
    }
}

/// The full result of a cache scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HFCacheInfo {
    pub repos: Vec<CachedRepo>,
    pub warnings: Vec<String>,
}

impl HFCacheInfo {
    pub fn size_on_disk(&self) -> u64 {
        self.repos.iter().map(|r| r.size_on_disk()).sum()
    }

    pub fn repo_with_id(&self, id: &str) -> Option<&CachedRepo> {
        self.repos.iter().find(|r| r.repo_id == id)
    }

    /// Finds a revision by exact commit hash, or by unique prefix if no
    /// exact match exists. Returns `None` on zero or ambiguous matches —
    /// the deletion planner treats that as "not found" (spec.md §4.4).
    pub fn find_revision(&self, hash_or_prefix: &str) -> Option<(&CachedRepo, &CachedRevision)> {
        for repo in &self.repos {
            if let Some(rev) = repo.revision(hash_or_prefix) {
                return Some((repo, rev));
            }
        }

        let mut matches: Vec<(&CachedRepo, &CachedRevision)> = Vec::new();
        for repo in &self.repos {
            for rev in repo.revisions.values() {
                if rev.commit_hash.starts_with(hash_or_prefix) {
                    matches.push((repo, rev));
                }
            }
        }
        match matches.len() {
            1 => Some(matches[0]),
            _ => None,
        }
    }

    /// Flat iteration of every (repo, revision, file) triple in the cache.
    pub fn iter_files(&self) -> impl Iterator<Item = (&CachedRepo, &CachedRevision, &CachedFile)> {
        self.repos.iter().flat_map(|repo| {
            repo.revisions
                .values()
                .flat_map(move |rev| rev.files.iter().map(move |f| (repo, rev, f)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, blob: &str, size: u64) -> CachedFile {
        CachedFile {
            file_name: name.to_string(),
            file_path: PathBuf::from(format!("/snap/{name}")),
            blob_path: PathBuf::from(format!("/blobs/{blob}")),
            size_on_disk: size,
            blob_last_accessed: 0,
            blob_last_modified: 0,
        }
    }

    fn revision(hash: &str, files: Vec<CachedFile>, refs: &[&str]) -> CachedRevision {
        CachedRevision {
            commit_hash: hash.to_string(),
            snapshot_path: PathBuf::from(format!("/snapshots/{hash}")),
            files: files.into_iter().collect(),
            refs: refs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn repo(revisions: Vec<CachedRevision>) -> CachedRepo {
        let mut refs = BTreeMap::new();
        let mut by_hash = BTreeMap::new();
        for rev in revisions {
            for ref_name in &rev.refs {
                refs.insert(ref_name.clone(), rev.clone());
            }
            by_hash.insert(rev.commit_hash.clone(), rev);
        }
        CachedRepo {
            repo_id: "org/name".to_string(),
            repo_type: RepoType::Model,
            repo_path: PathBuf::from("/cache/models--org--name"),
            revisions: by_hash,
            refs,
        }
    }

    #[test]
    fn repo_dedups_shared_blob_across_revisions() {
        let shared = file("README.md", "readme_hash", 100);
        let rev_main = revision("main_hash", vec![shared.clone()], &["main"]);
        let rev_pr = revision("pr_hash", vec![shared], &["refs/pr/1"]);
        let repo = repo(vec![rev_main, rev_pr]);

        assert_eq!(repo.nb_files(), 1);
        assert_eq!(repo.size_on_disk(), 100);
        let sum_rev_sizes: u64 = repo.revisions.values().map(|r| r.size_on_disk()).sum();
        assert_eq!(sum_rev_sizes, 200);
    }

    #[test]
    fn find_revision_by_unique_prefix() {
        let rev = revision("abcdef0123", vec![file("a", "h", 1)], &[]);
        let repo = repo(vec![rev]);
        let info = HFCacheInfo {
            repos: vec![repo],
            warnings: vec![],
        };

        assert!(info.find_revision("abcdef").is_some());
        assert!(info.find_revision("zzz").is_none());
    }

    #[test]
    fn iter_files_flattens_repo_revision_file() {
        let rev = revision("h1", vec![file("a", "ba", 1), file("b", "bb", 2)], &["main"]);
        let repo = repo(vec![rev]);
        let info = HFCacheInfo {
            repos: vec![repo],
            warnings: vec![],
        };
        assert_eq!(info.iter_files().count(), 2);
    }

    #[test]
    fn refs_map_points_at_correct_revision() {
        let rev_main = revision("main_hash", vec![file("a", "h", 1)], &["main"]);
        let rev_pr = revision("pr_hash", vec![file("b", "h2", 2)], &["refs/pr/1"]);
        let repo = repo(vec![rev_main, rev_pr]);

        assert_eq!(
            repo.refs.get("main").map(|r| r.commit_hash.as_str()),
            Some("main_hash")
        );
        assert_eq!(
            repo.refs.get("refs/pr/1").map(|r| r.commit_hash.as_str()),
            Some("pr_hash")
        );
    }
}
