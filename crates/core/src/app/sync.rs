//! Fetch every configured source and persist the merged result.

use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::ProviderClientCache;
use crate::cancel::CancelToken;
use crate::domain::{Repository, Source};
use crate::error::StoreError;
use crate::ports::RepositoryStore;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("sync cancelled")]
    Cancelled,

    #[error("failed to create client for {origin}: {error:#}")]
    Client {
        origin: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("failed to fetch repositories for {origin}: {error:#}")]
    Fetch {
        origin: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("failed to persist repositories: {0}")]
    Persist(#[from] StoreError),

    #[error("failed to build sync worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("sync aggregator failed: {reason}")]
    Aggregator { reason: String },
}

/// Emitted after each source finishes fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub sources_done: usize,
    pub sources_total: usize,
    /// Running total of repositories seen so far
    pub repositories: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncSummary {
    pub sources: usize,
    pub repositories: usize,
}

/// All-or-nothing sync: when any source fails, or the sync is cancelled,
/// nothing is written to the store.
pub struct SyncPipeline {
    clients: Arc<ProviderClientCache>,
    store: Arc<dyn RepositoryStore>,
    concurrency: usize,
}

impl SyncPipeline {
    /// `concurrency` below 1 is treated as 1
    pub fn new(clients: Arc<ProviderClientCache>, store: Arc<dyn RepositoryStore>, concurrency: usize) -> Self {
        Self {
            clients,
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn run(
        &self,
        sources: &[Source],
        cancel: &CancelToken,
        progress: &(dyn Fn(SyncProgress) + Sync),
    ) -> Result<SyncSummary, SyncError> {
        if sources.is_empty() {
            info!("No sources configured, nothing to sync");
            return Ok(SyncSummary::default());
        }
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let workers = self.concurrency.min(sources.len());
        info!(sources = sources.len(), workers, "Starting sync");

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sync-{i}"))
            .build()?;

        // the aggregator drains while producers run, so the queue stays small
        let (tx, rx) = crossbeam_channel::bounded::<Vec<Repository>>(workers);
        let aggregator = thread::Builder::new()
            .name("sync-aggregator".to_string())
            .spawn(move || {
                let mut all = Vec::new();
                for batch in rx {
                    all.extend(batch);
                }
                all
            })
            .map_err(|err| SyncError::Aggregator {
                reason: err.to_string(),
            })?;

        let first_error: Mutex<Option<SyncError>> = Mutex::new(None);
        let sources_done = AtomicUsize::new(0);
        let seen = AtomicUsize::new(0);

        {
            let first_error = &first_error;
            let sources_done = &sources_done;
            let seen = &seen;

            pool.scope(|scope| {
                for source in sources {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        if cancel.is_cancelled() || has_failed(first_error) {
                            debug!(%source, "skipping source");
                            return;
                        }

                        match self.fetch(source, cancel) {
                            Ok(repos) => {
                                let count = repos.len();
                                debug!(%source, count, "fetched source");
                                if tx.send(repos).is_err() {
                                    warn!(%source, "sync aggregator is gone");
                                }
                                let total = seen.fetch_add(count, Ordering::SeqCst) + count;
                                let done = sources_done.fetch_add(1, Ordering::SeqCst) + 1;
                                progress(SyncProgress {
                                    sources_done: done,
                                    sources_total: sources.len(),
                                    repositories: total,
                                });
                            }
                            Err(err) => {
                                warn!(%source, error = %err, "source failed");
                                first_error
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .get_or_insert(err);
                            }
                        }
                    });
                }
            });
        }

        drop(tx);
        let repos = aggregator.join().map_err(|_| SyncError::Aggregator {
            reason: "aggregator thread panicked".to_string(),
        })?;

        if cancel.is_cancelled() {
            info!("Sync cancelled, nothing persisted");
            return Err(SyncError::Cancelled);
        }
        if let Some(err) = first_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(err);
        }

        self.store.upsert_many(&repos)?;
        info!(repositories = repos.len(), "Sync complete");

        Ok(SyncSummary {
            sources: sources.len(),
            repositories: repos.len(),
        })
    }

    fn fetch(&self, source: &Source, cancel: &CancelToken) -> Result<Vec<Repository>, SyncError> {
        let credential = source.credential.resolve();
        let client = self
            .clients
            .get_or_create(source.provider, &credential)
            .map_err(|error| SyncError::Client {
                origin: source.to_string(),
                error,
            })?;

        client
            .list_repositories_for_user(&source.username, cancel)
            .map_err(|error| SyncError::Fetch {
                origin: source.to_string(),
                error,
            })
    }
}

fn has_failed(first_error: &Mutex<Option<SyncError>>) -> bool {
    first_error
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}
