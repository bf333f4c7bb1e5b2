//! Command persistence
//!
//! The API and the agent operate exclusively through [`CommandStore`],
//! so the in-memory backend and the PostgreSQL backend are interchangeable.

use anyhow::Result;
use async_trait::async_trait;
use office_types::{Command, CommandAction, CommandStatus};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::{StoreBackend, StoreConfig};

mod memory;
#[cfg(feature = "database")]
mod postgres;

pub use memory::MemoryCommandStore;
#[cfg(feature = "database")]
pub use postgres::PgCommandStore;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

/// A command about to be inserted
#[derive(Debug, Clone)]
pub struct CommandDraft {
    pub text: Option<String>,
    pub action: CommandAction,
}

/// Listing filter, also the query string of `GET /api/commands`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandFilter {
    pub status: Option<CommandStatus>,
    pub limit: Option<usize>,
}

impl CommandFilter {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// Open the configured backend
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn CommandStore>> {
    let store: Arc<dyn CommandStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryCommandStore::new()),
        #[cfg(feature = "database")]
        StoreBackend::Postgres => Arc::new(PgCommandStore::connect(config).await?),
        #[cfg(not(feature = "database"))]
        StoreBackend::Postgres => {
            anyhow::bail!("PostgreSQL store requested but built without the `database` feature")
        }
    };
    info!(backend = store.backend_name(), "Command store ready");
    Ok(store)
}

#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Short backend name for health output and logs
    fn backend_name(&self) -> &'static str;

    /// Insert a new command in `pending` state
    async fn insert(&self, draft: CommandDraft) -> Result<Command>;

    async fn get(&self, id: Uuid) -> Result<Option<Command>>;

    /// Newest first
    async fn list(&self, filter: &CommandFilter) -> Result<Vec<Command>>;

    /// Move up to `limit` of the oldest pending commands to `processing` and
    /// return them. A command is handed out at most once.
    async fn claim_pending(&self, limit: usize) -> Result<Vec<Command>>;

    /// `processing -> completed`. `None` when the command is missing or not processing.
    async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<Option<Command>>;

    /// Mark failed with an error text. `None` when the command is missing.
    async fn fail(&self, id: Uuid, error: &str) -> Result<Option<Command>>;

    /// Manual status change. Resetting to `pending` clears result and error.
    async fn update_status(
        &self,
        id: Uuid,
        status: CommandStatus,
        error: Option<&str>,
    ) -> Result<Option<Command>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}
