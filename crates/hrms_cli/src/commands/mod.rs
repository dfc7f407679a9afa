//! CLI commands.

pub mod bootstrap;
pub mod config;
pub mod gate;
pub mod search;

use anyhow::{Context, Result};
use hrms_core::{
    CacheStore, Config, FileGateStore, IdentityContext, InMemoryRecordService,
    LocalIdentityProvider, NotificationCenter, RecordClient, Seed, Subject,
};
use std::path::Path;
use std::sync::Arc;

/// Loads hrms.toml from `root`, falling back to defaults.
pub fn load_config(root: &Path) -> Result<Config> {
    Config::load(root).with_context(|| format!("Failed to load config from {}", root.display()))
}

/// Gate store at the configured location under `root`.
pub fn gate_store(root: &Path, config: &Config) -> FileGateStore {
    FileGateStore::new(root.join(&config.gate.file_name))
}

/// Single-threaded runtime, matching the client's cooperative model.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start async runtime")
}

/// Client wired to a seeded in-memory record service.
pub struct Wiring {
    pub client: Arc<RecordClient>,
    pub service: Arc<InMemoryRecordService>,
}

/// Builds the client stack. The identity is restored as `subject`, if given.
pub async fn wire(config: &Config, seed: &Path, subject: Option<&str>) -> Result<Wiring> {
    let seed = Seed::load(seed).with_context(|| format!("Failed to read seed {}", seed.display()))?;
    let service = Arc::new(InMemoryRecordService::from_seed(seed));
    let provider = match subject {
        Some(subject) => LocalIdentityProvider::signed_in(Subject::new(subject)),
        None => LocalIdentityProvider::new(),
    };
    let identity = Arc::new(IdentityContext::new(Arc::new(provider)));
    identity.initialize().await;

    let client = Arc::new(RecordClient::new(
        Arc::new(CacheStore::new(config.cache.clone())),
        service.clone(),
        identity,
        Arc::new(NotificationCenter::new()),
    ));
    Ok(Wiring { client, service })
}
