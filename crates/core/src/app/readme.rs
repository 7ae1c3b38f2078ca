use thiserror::Error;
use tracing::debug;

use crate::cache::ProviderClientCache;
use crate::domain::{ArtifactKind, Repository, Source};
use crate::error::StoreError;
use crate::ports::RepositoryStore;

#[derive(Error, Debug)]
pub enum ReadmeError {
    #[error("{repo} has no readme")]
    Missing { repo: String },

    #[error("no source configured to fetch {repo}")]
    NoSource { repo: String },

    #[error("failed to fetch readme for {repo}: {error:#}")]
    Fetch {
        repo: String,
        #[source]
        error: anyhow::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The source a repository is fetched through: the account that owns it,
/// else the first configured source
pub fn source_for<'a>(sources: &'a [Source], owner: &str) -> Option<&'a Source> {
    sources
        .iter()
        .find(|source| source.username.eq_ignore_ascii_case(owner))
        .or_else(|| sources.first())
}

/// Serve a readme from the store, fetching and caching it on a miss
pub fn load_readme(
    store: &dyn RepositoryStore,
    clients: &ProviderClientCache,
    sources: &[Source],
    repo: &Repository,
) -> Result<String, ReadmeError> {
    match store.get_artifact(&repo.remote_id, ArtifactKind::Readme) {
        Ok(data) => return Ok(String::from_utf8_lossy(&data).into_owned()),
        Err(err) if err.is_not_found() => debug!(repo = %repo, "readme not cached"),
        Err(err) => return Err(err.into()),
    }

    let source = source_for(sources, &repo.owner).ok_or_else(|| ReadmeError::NoSource {
        repo: repo.display_name(),
    })?;

    let fetch_error = |error| ReadmeError::Fetch {
        repo: repo.display_name(),
        error,
    };
    let client = clients
        .get_or_create(source.provider, &source.credential.resolve())
        .map_err(fetch_error)?;
    let readme = client
        .get_readme(&repo.owner, &repo.name)
        .map_err(fetch_error)?;

    if readme.is_empty() {
        return Err(ReadmeError::Missing {
            repo: repo.display_name(),
        });
    }

    store.set_artifact(&repo.remote_id, ArtifactKind::Readme, readme.as_bytes())?;
    Ok(readme)
}
