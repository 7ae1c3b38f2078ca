use std::path::PathBuf;

use super::repo::Repository;

/// Topics the event bus dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    RepoCloned,
}

impl Topic {
    pub const ALL: [Topic; 1] = [Topic::RepoCloned];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::RepoCloned => "repo.cloned",
        }
    }
}

/// A repository finished cloning into `clone_dir`
#[derive(Debug, Clone, PartialEq)]
pub struct RepoClonedEvent {
    pub repo: Repository,
    pub clone_dir: PathBuf,
}

/// Domain events published on the event bus
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RepoCloned(RepoClonedEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::RepoCloned(_) => Topic::RepoCloned,
        }
    }
}
