//! Key binding resolution and execution.

pub mod action;
pub mod app_action;
pub mod keybinds;
pub mod template;

pub use action::{Action, ActionError, ActionOutcome, Completion};
pub use app_action::AppAction;
pub use keybinds::{KeyBindings, KeyCommand, Mode, RESERVED_KEYS};
pub use template::{render, RenderError, Template, TemplateContext};

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::bus::EventBus;
use crate::domain::{RepoClonedEvent, Repository};
use crate::ports::Executor;
use crate::repofs::RepoFs;

/// Rendered commands starting with this clone a repository
const CLONE_PREFIX: &str = "git clone";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no command bound to '{key}'")]
    Unbound { key: String },

    #[error("failed to resolve clone directory for {repo}: {source}")]
    CloneDir { repo: String, source: RenderError },

    #[error("command bound to '{key}' could not be rendered: {source}")]
    Render { key: String, source: RenderError },

    #[error("unknown built-in action in '{command}'")]
    UnknownAppAction { command: String },

    #[error("{action} is not available yet")]
    NotYetAvailable { action: AppAction },
}

/// Turns a key press on a repository into a runnable [`Action`]
pub struct Commander {
    bindings: KeyBindings,
    repofs: Arc<RepoFs>,
    executor: Arc<dyn Executor>,
    bus: Arc<EventBus>,
}

impl Commander {
    pub fn new(
        bindings: KeyBindings,
        repofs: Arc<RepoFs>,
        executor: Arc<dyn Executor>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            bindings,
            repofs,
            executor,
            bus,
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn resolve(&self, key: &str, repo: &Repository) -> Result<Action, ResolveError> {
        let binding = self.bindings.get(key).ok_or_else(|| ResolveError::Unbound {
            key: key.to_string(),
        })?;

        let clone_dir = self
            .repofs
            .clone_directory(repo)
            .map_err(|source| ResolveError::CloneDir {
                repo: repo.display_name(),
                source,
            })?;

        let command = render(&binding.cmd, repo, &clone_dir.to_string_lossy()).map_err(|source| {
            ResolveError::Render {
                key: key.to_string(),
                source,
            }
        })?;
        debug!(key, %command, "resolved key binding");

        if app_action::matches(&command) {
            return match app_action::parse(&command) {
                Some((AppAction::Exit, message)) => Ok(Action::exit(message)),
                Some((action @ AppAction::Fork, _)) => Err(ResolveError::NotYetAvailable { action }),
                None => Err(ResolveError::UnknownAppAction { command }),
            };
        }

        let is_clone = command.starts_with(CLONE_PREFIX);
        let mut action = Action::shell(command, binding.mode, Arc::clone(&self.executor));

        if is_clone {
            let bus = Arc::clone(&self.bus);
            let repo = repo.clone();
            action.on_finished(move |outcome| {
                if outcome.is_ok() {
                    bus.publish_repo_cloned(RepoClonedEvent { repo, clone_dir });
                }
            });
        }

        Ok(action)
    }
}
