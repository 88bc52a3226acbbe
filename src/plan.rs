//! # Deletion Planner
//!
//! Given a report and a set of revision hashes, computes a `DeletionPlan`
//! enumerating exactly which blobs, refs, snapshot dirs, and whole-repo
//! dirs must be removed, and how many bytes that will free. Deduplication
//! is a set operation over blob paths, not a reference-count scheme —
//! grounded on `but-next::manifest::delete_snapshot`'s "collect blobs
//! referenced by surviving snapshots, then delete everything else" shape.

use crate::fs_remove::try_delete_path;
use crate::report::{CachedRepo, HFCacheInfo};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A plan enumerating exactly which filesystem paths to remove and how
/// many bytes that is expected to free. A plain value — never mutates the
/// report it was derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    pub expected_freed_size: u64,
    pub blobs: BTreeSet<PathBuf>,
    pub refs: BTreeSet<PathBuf>,
    pub repos: BTreeSet<PathBuf>,
    pub snapshots: BTreeSet<PathBuf>,
}

impl DeletionPlan {
    /// Executes the plan: deletes blobs, then snapshots, then refs, then
    /// whole repos, in that order, so a mid-flight failure leaves an
    /// inspector-visible state (spec.md §4.4). Never aborts early.
    pub fn execute(&self) {
        for path in &self.blobs {
            try_delete_path(path, "blob");
        }
        for path in &self.snapshots {
            try_delete_path(path, "snapshot");
        }
        for path in &self.refs {
            try_delete_path(path, "ref");
        }
        for path in &self.repos {
            try_delete_path(path, "repo");
        }
    }
}

impl HFCacheInfo {
    /// Builds a `DeletionPlan` for the given commit hashes. Hashes that
    /// don't resolve to a known revision are dropped silently from the
    /// plan after a single aggregated `WARNING` log line listing them.
    pub fn delete_revisions(&self, hashes: &[&str]) -> DeletionPlan {
        let mut by_repo: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut unknown: Vec<&str> = Vec::new();

        for &hash in hashes {
            match self.find_revision(hash) {
                Some((repo, rev)) => by_repo.entry(&repo.repo_id).or_default().push(&rev.commit_hash),
                None => unknown.push(hash),
            }
        }

        if !unknown.is_empty() {
            let mut sorted = unknown.clone();
            sorted.sort_unstable();
            log::warn!(
                "Revision(s) not found - cannot delete them: {}",
                sorted.join(", ")
            );
        }

        let mut plan = DeletionPlan::default();

        for (repo_id, hashes_to_delete) in by_repo {
            let repo = self
                .repo_with_id(repo_id)
                .expect("repo_id was derived from a lookup on self");
            plan_repo_deletion(repo, &hashes_to_delete, &mut plan);
        }

        plan
    }
}

fn plan_repo_deletion(repo: &CachedRepo, to_delete: &[&str], plan: &mut DeletionPlan) {
    let to_delete: BTreeSet<&str> = to_delete.iter().copied().collect();
    let remaining: Vec<_> = repo
        .revisions
        .keys()
        .filter(|hash| !to_delete.contains(hash.as_str()))
        .collect();

    if remaining.is_empty() {
        // Full-repo case: the recursive directory removal subsumes blobs,
        // refs, and snapshots, so nothing else is added for this repo.
        plan.repos.insert(repo.repo_path.clone());
        plan.expected_freed_size += repo.size_on_disk();
        return;
    }

    let kept_blobs: BTreeSet<&PathBuf> = remaining
        .iter()
        .flat_map(|hash| repo.revisions[*hash].blob_paths())
        .collect();

    let mut blobs_to_delete: BTreeSet<PathBuf> = BTreeSet::new();
    for hash in &to_delete {
        let rev = &repo.revisions[*hash];
        plan.snapshots.insert(rev.snapshot_path.clone());

        for file in &rev.files {
            if !kept_blobs.contains(&file.blob_path) {
                blobs_to_delete.insert(file.blob_path.clone());
            }
        }

        for ref_name in &rev.refs {
            let ref_path = repo.repo_path.join("refs").join(ref_name);
            plan.refs.insert(ref_path);
        }
    }

    plan.expected_freed_size += blobs_to_delete
        .iter()
        .filter_map(|blob| {
            to_delete.iter().find_map(|hash| {
                repo.revisions[*hash]
                    .files
                    .iter()
                    .find(|f| &f.blob_path == blob)
                    .map(|f| f.size_on_disk)
            })
        })
        .sum::<u64>();

    plan.blobs.extend(blobs_to_delete);
}
