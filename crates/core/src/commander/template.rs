//! Command and directory templates.
//!
//! `{{ .Repo.HTMLURL }}` and `{{Repo.HTMLURL}}` are equivalent. Values may be
//! piped through filters: `{{ .Repo.Name | lower }}`.

use thiserror::Error;

use crate::domain::Repository;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("unclosed action starting at offset {offset}")]
    Unclosed { offset: usize },

    #[error("empty action at offset {offset}")]
    EmptyAction { offset: usize },

    #[error("unknown value '{name}'")]
    UnknownValue { name: String },

    #[error("unknown filter '{name}'")]
    UnknownFilter { name: String },

    #[error("'{name}' is not available in this template")]
    Unavailable { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepoField {
    RemoteId,
    Name,
    Owner,
    Description,
    HtmlUrl,
    CloneUrl,
    CloneSshUrl,
    IsFork,
    ForkUrl,
    DisplayName,
}

impl RepoField {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "RemoteID" => RepoField::RemoteId,
            "Name" => RepoField::Name,
            "Owner" | "Username" => RepoField::Owner,
            "Description" => RepoField::Description,
            "HTMLURL" => RepoField::HtmlUrl,
            "CloneURL" => RepoField::CloneUrl,
            "CloneSSHURL" => RepoField::CloneSshUrl,
            "IsFork" => RepoField::IsFork,
            "ForkURL" => RepoField::ForkUrl,
            "DisplayName" => RepoField::DisplayName,
            _ => return None,
        })
    }

    fn get(self, repo: &Repository) -> String {
        match self {
            RepoField::RemoteId => repo.remote_id.clone(),
            RepoField::Name => repo.name.clone(),
            RepoField::Owner => repo.owner.clone(),
            RepoField::Description => repo.description.clone(),
            RepoField::HtmlUrl => repo.html_url.clone(),
            RepoField::CloneUrl => repo.clone_url.clone(),
            RepoField::CloneSshUrl => repo.clone_ssh_url.clone(),
            RepoField::IsFork => repo.is_fork.to_string(),
            RepoField::ForkUrl => repo.fork_url.clone(),
            RepoField::DisplayName => repo.display_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    CloneDir,
    Repo(RepoField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Lower,
    Upper,
    Trim,
}

impl Filter {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "lower" => Some(Filter::Lower),
            "upper" => Some(Filter::Upper),
            "trim" => Some(Filter::Trim),
            _ => None,
        }
    }

    fn apply(self, value: String) -> String {
        match self {
            Filter::Lower => value.to_lowercase(),
            Filter::Upper => value.to_uppercase(),
            Filter::Trim => value.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Action { value: Value, filters: Vec<Filter> },
}

/// Values a template is rendered against
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub repo: &'a Repository,
    /// `None` while the clone directory itself is being rendered
    pub clone_dir: Option<&'a str>,
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, RenderError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }

            let body_start = start + OPEN.len();
            let end = rest[body_start..]
                .find(CLOSE)
                .ok_or(RenderError::Unclosed { offset: offset + start })?;

            let body = &rest[body_start..body_start + end];
            segments.push(parse_action(body, offset + start)?);

            let consumed = body_start + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn render(&self, ctx: &TemplateContext<'_>) -> Result<String, RenderError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Action { value, filters } => {
                    let resolved = match value {
                        Value::Repo(field) => field.get(ctx.repo),
                        Value::CloneDir => ctx
                            .clone_dir
                            .ok_or_else(|| RenderError::Unavailable {
                                name: "CloneDir".to_string(),
                            })?
                            .to_string(),
                    };
                    let filtered = filters.iter().fold(resolved, |acc, filter| filter.apply(acc));
                    out.push_str(&filtered);
                }
            }
        }
        Ok(out)
    }

    /// True when the template never references `CloneDir`
    pub fn is_repo_only(&self) -> bool {
        !self.segments.iter().any(|segment| {
            matches!(segment, Segment::Action { value: Value::CloneDir, .. })
        })
    }
}

fn parse_action(body: &str, offset: usize) -> Result<Segment, RenderError> {
    let mut parts = body.split('|').map(str::trim);

    let path = parts.next().unwrap_or_default();
    if path.is_empty() {
        return Err(RenderError::EmptyAction { offset });
    }

    let path = path.strip_prefix('.').unwrap_or(path);
    let value = match path.split_once('.') {
        None if path == "CloneDir" => Value::CloneDir,
        Some(("Repo", field)) => RepoField::from_name(field)
            .map(Value::Repo)
            .ok_or_else(|| RenderError::UnknownValue {
                name: path.to_string(),
            })?,
        _ => {
            return Err(RenderError::UnknownValue {
                name: path.to_string(),
            })
        }
    };

    let filters = parts
        .map(|name| {
            Filter::from_name(name).ok_or_else(|| RenderError::UnknownFilter {
                name: name.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Segment::Action { value, filters })
}

/// Render `template` against a repository and its resolved clone directory.
/// Deterministic and side-effect free.
pub fn render(template: &str, repo: &Repository, clone_dir: &str) -> Result<String, RenderError> {
    Template::parse(template)?.render(&TemplateContext {
        repo,
        clone_dir: Some(clone_dir),
    })
}
