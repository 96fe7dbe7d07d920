pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;

use std::sync::Arc;

use config::Config;
use db::memory::MemoryStore;
use db::store::{IdentitySource, MessageStore};
use gateway::presence::OnlineTracker;
use gateway::registry::ConnectionRegistry;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentitySource>,
    pub messages: Arc<dyn MessageStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub online: Arc<OnlineTracker>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentitySource>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            identity,
            messages,
            registry: Arc::new(ConnectionRegistry::new()),
            online: Arc::new(OnlineTracker::new()),
            config: Arc::new(config),
        }
    }

    /// State backed by a single in-memory store serving both collaborators.
    pub fn in_memory(config: Config, store: Arc<MemoryStore>) -> Self {
        Self::new(config, store.clone(), store)
    }
}
