//! Where repositories are cloned to, and whether they are.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::CloneStatusCache;
use crate::commander::{RenderError, Template, TemplateContext};
use crate::domain::Repository;
use crate::error::ConfigError;
use crate::ports::PathProbe;

pub const DEFAULT_CLONE_DIR: &str = "~/src/{{ .Repo.Owner }}/{{ .Repo.Name }}";

// `*` must not cross a `/`, so `foo/*` matches `foo/bar` but `*` alone does not
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A glob over `owner/name` and the directory template used when it matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    #[serde(rename = "match")]
    pub pattern: String,
    pub dir: String,
}

impl Matcher {
    pub fn new(pattern: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            dir: dir.into(),
        }
    }
}

/// Ordered clone directory rules with a mandatory fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneDirectories {
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub matchers: Vec<Matcher>,
}

impl Default for CloneDirectories {
    fn default() -> Self {
        Self {
            default: DEFAULT_CLONE_DIR.to_string(),
            matchers: Vec::new(),
        }
    }
}

impl CloneDirectories {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    /// The directory template for `display_name`: first matching rule, else the default
    pub fn find_match(&self, display_name: &str) -> &str {
        self.matchers
            .iter()
            .find(|m| {
                Pattern::new(&m.pattern)
                    .map(|p| p.matches_with(display_name, MATCH_OPTIONS))
                    .unwrap_or(false)
            })
            .map(|m| m.dir.as_str())
            .unwrap_or(&self.default)
    }

    fn compile(&self) -> Result<Compiled, ConfigError> {
        if self.default.trim().is_empty() {
            return Err(ConfigError::MissingDefaultCloneDir);
        }

        let mut rules = Vec::with_capacity(self.matchers.len());
        for (index, matcher) in self.matchers.iter().enumerate() {
            if matcher.pattern.is_empty() {
                return Err(ConfigError::MissingMatch { index });
            }
            let pattern = Pattern::new(&matcher.pattern)
                .map_err(|source| ConfigError::InvalidGlob { index, source })?;
            if matcher.dir.trim().is_empty() {
                return Err(ConfigError::MissingMatchDirectory { index });
            }
            rules.push((pattern, parse_dir_template(&matcher.dir)?));
        }

        Ok(Compiled {
            rules,
            default: parse_dir_template(&self.default)?,
        })
    }
}

fn parse_dir_template(dir: &str) -> Result<Template, ConfigError> {
    let invalid = |source| ConfigError::InvalidDirTemplate {
        template: dir.to_string(),
        source,
    };
    let template = Template::parse(dir).map_err(invalid)?;
    if !template.is_repo_only() {
        return Err(invalid(RenderError::Unavailable {
            name: "CloneDir".to_string(),
        }));
    }
    Ok(template)
}

struct Compiled {
    rules: Vec<(Pattern, Template)>,
    default: Template,
}

/// Resolves clone directories and answers clone status, caching by clone URL
pub struct RepoFs {
    compiled: Compiled,
    cache: Arc<CloneStatusCache>,
    probe: Arc<dyn PathProbe>,
}

impl RepoFs {
    pub fn new(
        dirs: &CloneDirectories,
        cache: Arc<CloneStatusCache>,
        probe: Arc<dyn PathProbe>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            compiled: dirs.compile()?,
            cache,
            probe,
        })
    }

    pub fn clone_directory(&self, repo: &Repository) -> Result<PathBuf, RenderError> {
        let display_name = repo.display_name();
        let template = self
            .compiled
            .rules
            .iter()
            .find(|(pattern, _)| pattern.matches_with(&display_name, MATCH_OPTIONS))
            .map(|(_, template)| template)
            .unwrap_or(&self.compiled.default);

        let rendered = template.render(&TemplateContext {
            repo,
            clone_dir: None,
        })?;
        Ok(PathBuf::from(rendered))
    }

    /// Cached clone status, probing the filesystem on a miss
    pub fn is_cloned(&self, repo: &Repository) -> bool {
        match self.cache.get(&repo.clone_url) {
            Some(cloned) => cloned,
            None => self.refresh(repo),
        }
    }

    /// Probe the filesystem and overwrite the cached status
    pub fn refresh(&self, repo: &Repository) -> bool {
        let exists = match self.clone_directory(repo) {
            Ok(dir) => self.probe.exists(&dir),
            Err(err) => {
                warn!(repo = %repo, error = %err, "failed to resolve clone directory");
                false
            }
        };
        debug!(repo = %repo, exists, "refreshed clone status");
        self.cache.set(&repo.clone_url, exists);
        exists
    }
}
