use anyhow::{anyhow, Context, Result};
use repodeck_core::app::{load_readme, source_for, ReadmeError, SearchProjection, SyncError, SyncPipeline, SyncProgress, SyncSummary};
use repodeck_core::bus::{EventBus, DEFAULT_CAPACITY};
use repodeck_core::cache::{CloneStatusCache, ProviderClientCache};
use repodeck_core::cancel::CancelToken;
use repodeck_core::commander::Commander;
use repodeck_core::domain::Repository;
use repodeck_core::ports::{AppConfig, ClientFactory, Executor, PathProbe, RepositoryStore};
use repodeck_core::repofs::RepoFs;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};

use crate::adapters::exec::ShellExecutor;
use crate::adapters::fs::OsProbe;
use crate::adapters::github::HttpClientFactory;
use crate::adapters::store::JsonFileStore;

/// The composition root: owns every long-lived component and the
/// process-lifetime cancellation token
pub struct AppService {
    config: AppConfig,
    store: Arc<dyn RepositoryStore>,
    clients: Arc<ProviderClientCache>,
    clone_status: Arc<CloneStatusCache>,
    repofs: Arc<RepoFs>,
    commander: Arc<Commander>,
    sync: SyncPipeline,
    cancel: CancelToken,
    bus_handle: Option<JoinHandle<()>>,
}

impl AppService {
    /// Wire the production adapters
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = Arc::new(JsonFileStore::open(&config.store.dir)?);
        let executor = Arc::new(ShellExecutor::new(config.shell.clone()));
        Self::with_ports(config, store, Arc::new(HttpClientFactory), executor, Arc::new(OsProbe))
    }

    pub fn with_ports(
        config: AppConfig,
        store: Arc<dyn RepositoryStore>,
        factory: Arc<dyn ClientFactory>,
        executor: Arc<dyn Executor>,
        probe: Arc<dyn PathProbe>,
    ) -> Result<Self> {
        let bus = Arc::new(EventBus::new(DEFAULT_CAPACITY));
        let clone_status = Arc::new(CloneStatusCache::new());
        clone_status.subscribe(&bus);

        let cancel = CancelToken::new();
        let bus_handle = bus
            .start(cancel.clone())
            .context("Failed to start event bus")?;

        let clients = Arc::new(ProviderClientCache::new(factory));
        let repofs = Arc::new(RepoFs::new(&config.clone_directories, clone_status.clone(), probe)?);
        let commander = Arc::new(Commander::new(
            config.key_bindings.clone(),
            repofs.clone(),
            executor,
            bus,
        ));
        let sync = SyncPipeline::new(clients.clone(), store.clone(), config.concurrency);

        info!("AppService ready");
        Ok(Self {
            config,
            store,
            clients,
            clone_status,
            repofs,
            commander,
            sync,
            cancel,
            bus_handle: Some(bus_handle),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn commander(&self) -> &Arc<Commander> {
        &self.commander
    }

    pub fn repofs(&self) -> &Arc<RepoFs> {
        &self.repofs
    }

    pub fn clone_status(&self) -> &Arc<CloneStatusCache> {
        &self.clone_status
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Sync every configured source into the store. `cancel` belongs to
    /// this sync alone; cancelling it leaves the event bus running.
    pub fn cache(
        &self,
        cancel: &CancelToken,
        progress: &(dyn Fn(SyncProgress) + Sync),
    ) -> Result<SyncSummary, SyncError> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        self.sync.run(&self.config.sources, cancel, progress)
    }

    pub fn repositories(&self) -> Result<Vec<Repository>> {
        self.store.get_all().context("Failed to load repositories")
    }

    pub fn projection(&self) -> Result<SearchProjection> {
        Ok(SearchProjection::new(self.repositories()?))
    }

    /// Find a stored repository by `owner/name`
    pub fn find(&self, display_name: &str) -> Result<Repository> {
        self.projection()?
            .find(display_name)
            .cloned()
            .ok_or_else(|| anyhow!("repository {display_name} is not in the store; run `repodeck cache` first"))
    }

    pub fn readme(&self, repo: &Repository) -> Result<String, ReadmeError> {
        load_readme(self.store.as_ref(), &self.clients, &self.config.sources, repo)
    }

    /// Fetch one repository from its provider and upsert it
    pub fn refresh(&self, display_name: &str) -> Result<Repository> {
        let (owner, name) = display_name
            .split_once('/')
            .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
            .ok_or_else(|| anyhow!("expected owner/name, got '{display_name}'"))?;

        let source = source_for(&self.config.sources, owner)
            .ok_or_else(|| anyhow!("no source configured to fetch {display_name}"))?;
        let client = self
            .clients
            .get_or_create(source.provider, &source.credential.resolve())?;

        let repo = client
            .get_one(owner, name)
            .with_context(|| format!("Failed to fetch {display_name}"))?;
        self.store.upsert_one(&repo)?;

        info!(repo = %repo, "refreshed repository");
        Ok(repo)
    }

    /// Stop the event bus; idempotent
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.bus_handle.take() {
            if handle.join().is_err() {
                error!("event bus thread panicked");
            }
        }
    }
}

impl Drop for AppService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
