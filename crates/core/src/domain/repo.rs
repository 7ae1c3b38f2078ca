use serde::{Deserialize, Serialize};

/// A remote repository as reported by a hosting provider.
///
/// Persistence identity is `remote_id`; clone-status identity is `clone_url`.
/// A later sync replaces every field for the same `remote_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Repository {
    pub remote_id: String,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub description: String,
    pub html_url: String,
    pub clone_url: String,
    pub clone_ssh_url: String,
    #[serde(default)]
    pub is_fork: bool,
    /// Parent repository URL, empty unless this is a fork
    #[serde(default)]
    pub fork_url: String,
}

impl Repository {
    /// `owner/name`, the string clone-directory matchers are tested against
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Case-insensitive match against the display name and description
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        self.display_name().to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Kinds of per-repository artifacts kept next to the repository records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Readme,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Readme => "repo.readme",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Repository {
        Repository {
            remote_id: "42".to_string(),
            name: "repodeck".to_string(),
            owner: "octo".to_string(),
            description: "Terminal repository launcher".to_string(),
            ..Repository::default()
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(sample().display_name(), "octo/repodeck");
        assert_eq!(format!("{}", sample()), "octo/repodeck");
    }

    #[test]
    fn test_matches_query() {
        let repo = sample();
        assert!(repo.matches_query(""));
        assert!(repo.matches_query("OCTO/"));
        assert!(repo.matches_query("launcher"));
        assert!(!repo.matches_query("gitlab"));
    }
}
