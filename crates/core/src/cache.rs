//! Shared lookup caches.
//!
//! Readers proceed concurrently; writers exclude everyone. No lock is held
//! while a client is constructed or the filesystem is probed.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::bus::EventBus;
use crate::domain::ProviderType;
use crate::ports::{ClientFactory, RepositoryClient};

/// Whether a repository's clone directory exists, keyed by clone URL
#[derive(Debug, Default)]
pub struct CloneStatusCache {
    entries: RwLock<HashMap<String, bool>>,
}

impl CloneStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, clone_url: &str) -> Option<bool> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(clone_url)
            .copied()
    }

    pub fn set(&self, clone_url: &str, cloned: bool) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(clone_url.to_string(), cloned);
    }

    /// Mark repositories cloned as "repository cloned" events arrive
    pub fn subscribe(self: &Arc<Self>, bus: &EventBus) {
        let cache = Arc::clone(self);
        bus.subscribe_repo_cloned(move |event| {
            debug!(repo = %event.repo, "marking repository cloned");
            cache.set(&event.repo.clone_url, true);
        });
    }
}

type ClientKey = (ProviderType, String);

/// Provider clients, built once per provider and credential
pub struct ProviderClientCache {
    factory: Arc<dyn ClientFactory>,
    clients: RwLock<HashMap<ClientKey, Arc<dyn RepositoryClient>>>,
}

impl ProviderClientCache {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, provider: ProviderType, credential: &str) -> Result<Arc<dyn RepositoryClient>> {
        let key = (provider, credential.to_string());

        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(client));
        }

        debug!(%provider, "building provider client");
        let built = self.factory.build(provider, credential)?;

        // a concurrent caller may have won the race; keep whichever landed first
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(clients.entry(key).or_insert(built)))
    }

    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
