use crate::cancel::CancelToken;
use crate::domain::{ProviderType, Repository};
use anyhow::Result;
use std::sync::Arc;

/// Port for a hosting provider's repository API
pub trait RepositoryClient: Send + Sync {
    /// List every repository owned by or accessible to `username`.
    /// Implementations paginate transparently and check `cancel` between pages.
    fn list_repositories_for_user(&self, username: &str, cancel: &CancelToken) -> Result<Vec<Repository>>;

    /// Fetch a single repository
    fn get_one(&self, username: &str, name: &str) -> Result<Repository>;

    /// README contents, or an empty string when the repository has none
    fn get_readme(&self, username: &str, name: &str) -> Result<String>;
}

/// Builds provider clients; the one place that maps a provider type to a client
pub trait ClientFactory: Send + Sync {
    fn build(&self, provider: ProviderType, credential: &str) -> Result<Arc<dyn RepositoryClient>>;
}
