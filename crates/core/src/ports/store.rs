use crate::domain::{ArtifactKind, Repository};
use crate::error::StoreError;

/// Port for the local repository store
pub trait RepositoryStore: Send + Sync {
    fn get_all(&self) -> Result<Vec<Repository>, StoreError>;

    /// Insert or fully replace records, keyed by `remote_id`
    fn upsert_many(&self, repos: &[Repository]) -> Result<(), StoreError>;

    fn upsert_one(&self, repo: &Repository) -> Result<(), StoreError> {
        self.upsert_many(std::slice::from_ref(repo))
    }

    /// Returns [`StoreError::NotFound`] when no artifact of `kind` is stored
    fn get_artifact(&self, repo_id: &str, kind: ArtifactKind) -> Result<Vec<u8>, StoreError>;

    fn set_artifact(&self, repo_id: &str, kind: ArtifactKind, data: &[u8]) -> Result<(), StoreError>;
}
