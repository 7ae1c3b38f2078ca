use crate::domain::Repository;

/// Read-only, searchable projection of the stored repositories
#[derive(Debug, Default)]
pub struct SearchProjection {
    repositories: Vec<Repository>,
    query: String,
    /// Indices into `repositories` matching `query`, in display order
    matches: Vec<usize>,
}

impl SearchProjection {
    pub fn new(mut repositories: Vec<Repository>) -> Self {
        repositories.sort_by_cached_key(|repo| repo.display_name().to_lowercase());
        let matches = (0..repositories.len()).collect();
        Self {
            repositories,
            query: String::new(),
            matches,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.matches = self
            .repositories
            .iter()
            .enumerate()
            .filter(|(_, repo)| repo.matches_query(&self.query))
            .map(|(index, _)| index)
            .collect();
    }

    /// Number of repositories matching the query
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn total(&self) -> usize {
        self.repositories.len()
    }

    /// The `index`th match
    pub fn get(&self, index: usize) -> Option<&Repository> {
        self.matches.get(index).map(|&i| &self.repositories[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.matches.iter().map(|&i| &self.repositories[i])
    }

    /// Look up a repository by `owner/name`, ignoring the query
    pub fn find(&self, display_name: &str) -> Option<&Repository> {
        self.repositories
            .iter()
            .find(|repo| repo.display_name().eq_ignore_ascii_case(display_name))
    }
}
