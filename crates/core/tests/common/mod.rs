//! Test doubles shared by the integration tests
#![allow(dead_code)]

use anyhow::{bail, Result};
use repodeck_core::cancel::CancelToken;
use repodeck_core::domain::{ArtifactKind, ProviderType, Repository};
use repodeck_core::error::StoreError;
use repodeck_core::ports::{
    Attach, ClientFactory, CommandHandle, ExecError, Executor, PathProbe, RepositoryClient, RepositoryStore,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn repo(owner: &str, name: &str) -> Repository {
    Repository {
        remote_id: format!("{owner}-{name}"),
        name: name.to_string(),
        owner: owner.to_string(),
        description: format!("{name} by {owner}"),
        html_url: format!("https://example.com/{owner}/{name}"),
        clone_url: format!("https://example.com/{owner}/{name}.git"),
        clone_ssh_url: format!("git@example.com:{owner}/{name}.git"),
        ..Repository::default()
    }
}

/// In-memory store keyed by remote id
#[derive(Default)]
pub struct MemoryStore {
    pub repos: Mutex<HashMap<String, Repository>>,
    pub artifacts: Mutex<HashMap<(String, ArtifactKind), Vec<u8>>>,
    pub upserts: AtomicUsize,
}

impl MemoryStore {
    pub fn count(&self) -> usize {
        self.repos.lock().unwrap().len()
    }
}

impl RepositoryStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<Repository>, StoreError> {
        Ok(self.repos.lock().unwrap().values().cloned().collect())
    }

    fn upsert_many(&self, repos: &[Repository]) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.repos.lock().unwrap();
        for repo in repos {
            stored.insert(repo.remote_id.clone(), repo.clone());
        }
        Ok(())
    }

    fn get_artifact(&self, repo_id: &str, kind: ArtifactKind) -> Result<Vec<u8>, StoreError> {
        self.artifacts
            .lock()
            .unwrap()
            .get(&(repo_id.to_string(), kind))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: format!("{kind} for {repo_id}"),
            })
    }

    fn set_artifact(&self, repo_id: &str, kind: ArtifactKind, data: &[u8]) -> Result<(), StoreError> {
        self.artifacts
            .lock()
            .unwrap()
            .insert((repo_id.to_string(), kind), data.to_vec());
        Ok(())
    }
}

/// Serves canned repositories per username and records concurrency
#[derive(Default)]
pub struct FakeClient {
    pub accounts: HashMap<String, Vec<Repository>>,
    pub readmes: HashMap<String, String>,
    pub delay: Duration,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
    pub readme_calls: AtomicUsize,
    /// Cancel this token when the named user is listed
    pub cancel_on: Option<(String, CancelToken)>,
}

impl FakeClient {
    pub fn with_accounts(accounts: impl IntoIterator<Item = (&'static str, Vec<Repository>)>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|(name, repos)| (name.to_string(), repos))
                .collect(),
            ..Self::default()
        }
    }
}

impl RepositoryClient for FakeClient {
    fn list_repositories_for_user(&self, username: &str, _cancel: &CancelToken) -> Result<Vec<Repository>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        std::thread::sleep(self.delay);
        if let Some((name, token)) = &self.cancel_on {
            if name == username {
                token.cancel();
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.accounts.get(username) {
            Some(repos) => Ok(repos.clone()),
            None => bail!("no such account: {username}"),
        }
    }

    fn get_one(&self, username: &str, name: &str) -> Result<Repository> {
        self.accounts
            .get(username)
            .and_then(|repos| repos.iter().find(|repo| repo.name == name))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{username}/{name} not found"))
    }

    fn get_readme(&self, username: &str, name: &str) -> Result<String> {
        self.readme_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .readmes
            .get(&format!("{username}/{name}"))
            .cloned()
            .unwrap_or_default())
    }
}

/// Hands out one shared client regardless of credential
pub struct SharedFactory(pub Arc<FakeClient>);

impl ClientFactory for SharedFactory {
    fn build(&self, _provider: ProviderType, _credential: &str) -> Result<Arc<dyn RepositoryClient>> {
        Ok(self.0.clone())
    }
}

/// Records commands; commands mentioning "false" fail
#[derive(Default)]
pub struct RecordingExecutor {
    pub commands: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    fn outcome(command: &str) -> Result<(), ExecError> {
        if command.contains("false") {
            return Err(ExecError::Exit {
                command: command.to_string(),
                code: Some(1),
            });
        }
        Ok(())
    }
}

struct RecordedHandle {
    command: String,
}

impl CommandHandle for RecordedHandle {
    fn start(&mut self) -> Result<(), ExecError> {
        Ok(())
    }

    fn wait(&mut self) -> Result<(), ExecError> {
        RecordingExecutor::outcome(&self.command)
    }

    fn output(&self) -> Option<crossbeam_channel::Receiver<String>> {
        None
    }
}

impl Executor for RecordingExecutor {
    fn run(&self, command: &str) -> Result<(), ExecError> {
        self.commands.lock().unwrap().push(command.to_string());
        Self::outcome(command)
    }

    fn run_interactive(&self, command: &str, _attach: Attach) -> Result<Box<dyn CommandHandle>, ExecError> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(Box::new(RecordedHandle {
            command: command.to_string(),
        }))
    }
}

/// Answers a fixed existence result and counts probes
pub struct CountingProbe {
    pub exists: bool,
    pub calls: AtomicUsize,
}

impl CountingProbe {
    pub fn new(exists: bool) -> Self {
        Self {
            exists,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PathProbe for CountingProbe {
    fn exists(&self, _path: &Path) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.exists
    }
}
