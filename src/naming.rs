//! # Repo Folder Naming
//!
//! Parses the `<type>s--<org>--<name>` folder-naming convention used by the
//! cache layout, and normalizes ref-name paths found under `refs/`.

use std::fmt;

/// The three repo kinds the cache layout recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    Model,
    Dataset,
    Space,
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoType::Model => write!(f, "model"),
            RepoType::Dataset => write!(f, "dataset"),
            RepoType::Space => write!(f, "space"),
        }
    }
}

impl RepoType {
    fn from_plural(plural: &str) -> Option<Self> {
        match plural {
            "models" => Some(RepoType::Model),
            "datasets" => Some(RepoType::Dataset),
            "spaces" => Some(RepoType::Space),
            _ => None,
        }
    }
}

/// Why a repo folder's basename failed to parse as a valid cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    /// The basename has no `--` separator at all (or only the type prefix).
    NotHfCacheDir,
    /// The basename has a `--` separator but the leading segment isn't a
    /// known repo type. Carries the offending singular-ized prefix.
    UnknownRepoType(String),
}

/// Parses a repo folder's basename into its type and reconstructed `repo_id`.
///
/// `models--valid_org--test_scan_repo_a` -> `(Model, "valid_org/test_scan_repo_a")`.
/// Every `--` after the first one is turned into `/`, so
/// `models--org--sub--name` -> `(Model, "org/sub/name")`.
pub fn parse_repo_folder(basename: &str) -> Result<(RepoType, String), NamingError> {
    let Some((prefix, rest)) = basename.split_once("--") else {
        return Err(NamingError::NotHfCacheDir);
    };
    if rest.is_empty() {
        return Err(NamingError::NotHfCacheDir);
    }

    match RepoType::from_plural(prefix) {
        Some(repo_type) => {
            let repo_id = rest.replace("--", "/");
            Ok((repo_type, repo_id))
        }
        None => {
            let singular = prefix.strip_suffix('s').unwrap_or(prefix).to_string();
            Err(NamingError::UnknownRepoType(singular))
        }
    }
}

/// Normalizes a ref file's path (relative to `refs/`) into a ref name,
/// turning OS path separators into `/` for cross-platform consistency.
pub fn ref_name_from_relative_path(relative: &std::path::Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_model_repo() {
        let (ty, id) = parse_repo_folder("models--valid_org--test_scan_repo_a").unwrap();
        assert_eq!(ty, RepoType::Model);
        assert_eq!(id, "valid_org/test_scan_repo_a");
    }

    #[test]
    fn parses_dataset_repo() {
        let (ty, id) = parse_repo_folder("datasets--foo--bar").unwrap();
        assert_eq!(ty, RepoType::Dataset);
        assert_eq!(id, "foo/bar");
    }

    #[test]
    fn further_double_dashes_become_slashes() {
        let (_, id) = parse_repo_folder("models--org--sub--name").unwrap();
        assert_eq!(id, "org/sub/name");
    }

    #[test]
    fn rejects_folder_with_no_separator() {
        assert_eq!(
            parse_repo_folder("a_folder_that_should_not_be_there"),
            Err(NamingError::NotHfCacheDir)
        );
    }

    #[test]
    fn rejects_unknown_type_prefix() {
        assert_eq!(
            parse_repo_folder("not-models--t5-small"),
            Err(NamingError::UnknownRepoType("not-model".to_string()))
        );
    }

    #[test]
    fn ref_name_normalizes_nested_path() {
        let rel = Path::new("refs").join("pr").join("1");
        assert_eq!(ref_name_from_relative_path(&rel), "refs/pr/1");
    }

    #[test]
    fn ref_name_single_component() {
        assert_eq!(ref_name_from_relative_path(Path::new("main")), "main");
    }
}
