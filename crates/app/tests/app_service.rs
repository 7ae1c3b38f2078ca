//! AppService wired with the JSON store and fake providers

use anyhow::{bail, Result};
use crossbeam_channel::Receiver;
use repodeck::adapters::store::JsonFileStore;
use repodeck::services::AppService;
use repodeck_core::app::SyncError;
use repodeck_core::cancel::CancelToken;
use repodeck_core::commander::{KeyBindings, Mode};
use repodeck_core::domain::{Credential, ProviderType, Repository, Source};
use repodeck_core::ports::{
    AppConfig, Attach, ClientFactory, CommandHandle, ExecError, Executor, PathProbe, RepositoryClient,
};
use repodeck_core::repofs::CloneDirectories;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn repo(owner: &str, name: &str) -> Repository {
    Repository {
        remote_id: format!("{owner}-{name}"),
        name: name.to_string(),
        owner: owner.to_string(),
        clone_url: format!("https://example.com/{owner}/{name}.git"),
        clone_ssh_url: format!("git@example.com:{owner}/{name}.git"),
        ..Repository::default()
    }
}

#[derive(Default)]
struct Provider {
    accounts: HashMap<String, Vec<Repository>>,
    readme_calls: AtomicUsize,
    renamed: Mutex<Option<String>>,
    interrupt: Mutex<Option<CancelToken>>,
}

impl RepositoryClient for Provider {
    fn list_repositories_for_user(&self, username: &str, _cancel: &CancelToken) -> Result<Vec<Repository>> {
        if let Some(token) = self.interrupt.lock().unwrap().as_ref() {
            token.cancel();
        }
        match self.accounts.get(username) {
            Some(repos) => Ok(repos.clone()),
            None => bail!("unknown account {username}"),
        }
    }

    fn get_one(&self, username: &str, name: &str) -> Result<Repository> {
        let mut repo = repo(username, name);
        if let Some(description) = self.renamed.lock().unwrap().clone() {
            repo.description = description;
        }
        Ok(repo)
    }

    fn get_readme(&self, _username: &str, name: &str) -> Result<String> {
        self.readme_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("# {name}"))
    }
}

struct Factory(Arc<Provider>);

impl ClientFactory for Factory {
    fn build(&self, _provider: ProviderType, _credential: &str) -> Result<Arc<dyn RepositoryClient>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct Recorder {
    commands: Mutex<Vec<String>>,
}

struct Done;

impl CommandHandle for Done {
    fn start(&mut self) -> Result<(), ExecError> {
        Ok(())
    }

    fn wait(&mut self) -> Result<(), ExecError> {
        Ok(())
    }

    fn output(&self) -> Option<Receiver<String>> {
        None
    }
}

impl Executor for Recorder {
    fn run(&self, command: &str) -> Result<(), ExecError> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(())
    }

    fn run_interactive(&self, command: &str, _attach: Attach) -> Result<Box<dyn CommandHandle>, ExecError> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(Box::new(Done))
    }
}

struct NothingCloned;

impl PathProbe for NothingCloned {
    fn exists(&self, _path: &Path) -> bool {
        false
    }
}

struct Fixture {
    service: AppService,
    provider: Arc<Provider>,
    executor: Arc<Recorder>,
    _dir: TempDir,
}

fn fixture() -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let mut provider = Provider::default();
    provider
        .accounts
        .insert("octo".to_string(), vec![repo("octo", "web"), repo("octo", "api")]);
    provider.accounts.insert("acme".to_string(), vec![repo("acme", "tool")]);
    let provider = Arc::new(provider);
    let executor = Arc::new(Recorder::default());

    let config = AppConfig {
        concurrency: 2,
        sources: vec![
            Source::new(ProviderType::GitHub, "octo", Credential::Inline("t1".to_string())),
            Source::new(ProviderType::GitHub, "acme", Credential::Inline("t2".to_string())),
        ],
        key_bindings: KeyBindings::defaults(),
        clone_directories: CloneDirectories {
            default: "/src/{{ .Repo.Owner }}/{{ .Repo.Name }}".to_string(),
            matchers: Vec::new(),
        },
        ..AppConfig::default()
    };

    let store = Arc::new(JsonFileStore::open(dir.path().join("store"))?);
    let service = AppService::with_ports(
        config,
        store,
        Arc::new(Factory(provider.clone())),
        executor.clone(),
        Arc::new(NothingCloned),
    )?;

    Ok(Fixture {
        service,
        provider,
        executor,
        _dir: dir,
    })
}

fn wait_for(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_cache_then_search() -> Result<()> {
    let fx = fixture()?;
    assert!(fx.service.repositories()?.is_empty());

    let summary = fx.service.cache(&CancelToken::new(), &|_| {})?;
    assert_eq!(summary.sources, 2);
    assert_eq!(summary.repositories, 3);

    let mut projection = fx.service.projection()?;
    let names: Vec<String> = projection.iter().map(Repository::display_name).collect();
    assert_eq!(names, ["acme/tool", "octo/api", "octo/web"]);

    projection.set_query("octo");
    assert_eq!(projection.len(), 2);

    assert_eq!(fx.service.find("octo/api")?.remote_id, "octo-api");
    assert!(fx.service.find("octo/missing").is_err());
    Ok(())
}

#[test]
fn test_readme_is_fetched_once() -> Result<()> {
    let fx = fixture()?;
    fx.service.cache(&CancelToken::new(), &|_| {})?;
    let repo = fx.service.find("acme/tool")?;

    assert_eq!(fx.service.readme(&repo)?, "# tool");
    assert_eq!(fx.service.readme(&repo)?, "# tool");
    assert_eq!(fx.provider.readme_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_refresh_updates_stored_repository() -> Result<()> {
    let fx = fixture()?;
    fx.service.cache(&CancelToken::new(), &|_| {})?;
    *fx.provider.renamed.lock().unwrap() = Some("fresh".to_string());

    let refreshed = fx.service.refresh("octo/web")?;
    assert_eq!(refreshed.description, "fresh");
    assert_eq!(fx.service.find("octo/web")?.description, "fresh");
    assert_eq!(fx.service.repositories()?.len(), 3);

    assert!(fx.service.refresh("not-a-name").is_err());
    Ok(())
}

#[test]
fn test_clone_binding_marks_repository_cloned() -> Result<()> {
    let fx = fixture()?;
    let repo = repo("octo", "web");
    assert!(!fx.service.repofs().is_cloned(&repo));

    let mut action = fx.service.commander().resolve("ctrl+p", &repo)?;
    assert_eq!(action.mode(), Mode::ReadOnly);
    assert_eq!(action.run(), Ok(()));

    assert_eq!(
        fx.executor.commands.lock().unwrap().as_slice(),
        ["git clone 'git@example.com:octo/web.git' '/src/octo/web'"]
    );
    assert!(wait_for(|| fx.service.clone_status().get(&repo.clone_url) == Some(true)));
    assert!(fx.service.repofs().is_cloned(&repo));
    Ok(())
}

#[test]
fn test_exit_binding_carries_clone_directory() -> Result<()> {
    let fx = fixture()?;
    let action = fx.service.commander().resolve("enter", &repo("acme", "tool"))?;
    assert_eq!(action.exit_message(), Some("/src/acme/tool"));
    Ok(())
}

#[test]
fn test_shutdown_is_idempotent() -> Result<()> {
    let mut fx = fixture()?;
    fx.service.shutdown();
    fx.service.shutdown();
    assert!(fx.service.cancel_token().is_cancelled());
    Ok(())
}

#[test]
fn test_cancelled_sync_persists_nothing_and_keeps_bus_running() -> Result<()> {
    let fx = fixture()?;
    let cancel = CancelToken::new();
    *fx.provider.interrupt.lock().unwrap() = Some(cancel.clone());

    let err = fx.service.cache(&cancel, &|_| {}).unwrap_err();
    assert!(matches!(err, SyncError::Cancelled), "{err}");
    assert!(fx.service.repositories()?.is_empty());
    assert!(!fx.service.cancel_token().is_cancelled());

    // the bus still marks clones
    let repo = repo("acme", "tool");
    let mut action = fx.service.commander().resolve("ctrl+p", &repo)?;
    assert_eq!(action.run(), Ok(()));
    assert!(wait_for(|| fx.service.clone_status().get(&repo.clone_url) == Some(true)));

    // a fresh token syncs normally
    fx.provider.interrupt.lock().unwrap().take();
    assert_eq!(fx.service.cache(&CancelToken::new(), &|_| {})?.repositories, 3);
    Ok(())
}

#[test]
fn test_sync_after_shutdown_is_cancelled() -> Result<()> {
    let mut fx = fixture()?;
    fx.service.shutdown();
    let err = fx.service.cache(&CancelToken::new(), &|_| {}).unwrap_err();
    assert!(matches!(err, SyncError::Cancelled), "{err}");
    Ok(())
}
