use anyhow::{Context, Result};
use repodeck_core::domain::{ArtifactKind, Repository};
use repodeck_core::error::StoreError;
use repodeck_core::ports::RepositoryStore;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

const REPOS_FILE: &str = "repos.json";
const ARTIFACTS_DIR: &str = "artifacts";

/// Repository store backed by a directory: `repos.json` keyed by remote id,
/// plus one file per artifact under `artifacts/<repo-id>/<kind>`
pub struct JsonFileStore {
    dir: PathBuf,
    // serializes read-modify-write of repos.json
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn repos_path(&self) -> PathBuf {
        self.dir.join(REPOS_FILE)
    }

    fn artifact_path(&self, repo_id: &str, kind: ArtifactKind) -> PathBuf {
        let safe_id: String = repo_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(ARTIFACTS_DIR).join(safe_id).join(kind.as_str())
    }

    fn read_all(&self) -> Result<BTreeMap<String, Repository>> {
        let path = self.repos_path();
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err).with_context(|| format!("Failed to read {}", path.display())),
        };
        serde_json::from_slice(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn write_all(&self, repos: &BTreeMap<String, Repository>) -> Result<()> {
        let path = self.repos_path();
        let contents = serde_json::to_vec_pretty(repos).context("Failed to serialize repositories")?;
        write_atomic(&path, &contents)
    }
}

/// Write through a sibling temp file so readers never see a partial file
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))
}

fn backend(source: anyhow::Error) -> StoreError {
    StoreError::Backend { source }
}

impl RepositoryStore for JsonFileStore {
    fn get_all(&self) -> Result<Vec<Repository>, StoreError> {
        Ok(self.read_all().map_err(backend)?.into_values().collect())
    }

    fn upsert_many(&self, repos: &[Repository]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut stored = self.read_all().map_err(backend)?;
        for repo in repos {
            stored.insert(repo.remote_id.clone(), repo.clone());
        }
        self.write_all(&stored).map_err(backend)?;

        debug!(upserted = repos.len(), total = stored.len(), "stored repositories");
        Ok(())
    }

    fn get_artifact(&self, repo_id: &str, kind: ArtifactKind) -> Result<Vec<u8>, StoreError> {
        let path = self.artifact_path(repo_id, kind);
        match fs::read(&path) {
            Ok(data) if !data.is_empty() => Ok(data),
            Ok(_) => Err(StoreError::NotFound {
                what: format!("{kind} for {repo_id}"),
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                what: format!("{kind} for {repo_id}"),
            }),
            Err(err) => Err(backend(
                anyhow::Error::new(err).context(format!("Failed to read {}", path.display())),
            )),
        }
    }

    fn set_artifact(&self, repo_id: &str, kind: ArtifactKind, data: &[u8]) -> Result<(), StoreError> {
        let path = self.artifact_path(repo_id, kind);
        let write = || -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            write_atomic(&path, data)
        };
        write().map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo(id: &str, name: &str) -> Repository {
        Repository {
            remote_id: id.to_string(),
            name: name.to_string(),
            owner: "octo".to_string(),
            ..Repository::default()
        }
    }

    #[test]
    fn test_empty_store() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = JsonFileStore::open(temp_dir.path().join("nested/store"))?;
        assert!(store.get_all()?.is_empty());
        assert!(store.dir().exists());
        Ok(())
    }

    #[test]
    fn test_upsert_is_idempotent() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = JsonFileStore::open(temp_dir.path())?;

        store.upsert_many(&[repo("1", "a"), repo("2", "b")])?;
        let mut renamed = vec![repo("1", "a-renamed"), repo("2", "b")];
        renamed[1].description = "updated".to_string();
        store.upsert_many(&renamed)?;

        let mut all = store.get_all()?;
        all.sort_by(|a, b| a.remote_id.cmp(&b.remote_id));
        assert_eq!(all, renamed);

        store.upsert_one(&repo("3", "c"))?;
        assert_eq!(store.get_all()?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_artifacts() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = JsonFileStore::open(temp_dir.path())?;

        let missing = store.get_artifact("1", ArtifactKind::Readme).unwrap_err();
        assert!(missing.is_not_found());

        store.set_artifact("1", ArtifactKind::Readme, b"# Hello")?;
        assert_eq!(store.get_artifact("1", ArtifactKind::Readme)?, b"# Hello");

        store.set_artifact("1", ArtifactKind::Readme, b"")?;
        assert!(store.get_artifact("1", ArtifactKind::Readme).unwrap_err().is_not_found());
        Ok(())
    }

    #[test]
    fn test_artifact_ids_stay_inside_store() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = JsonFileStore::open(temp_dir.path())?;
        let path = store.artifact_path("../../etc", ArtifactKind::Readme);
        assert!(path.starts_with(temp_dir.path().join(ARTIFACTS_DIR)));
        assert!(!path.to_string_lossy().contains(".."));
        Ok(())
    }
}
