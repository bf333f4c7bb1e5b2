//! PostgreSQL command store
//!
//! Table layout lives in `migrations/001_commands.sql`. The action is kept
//! as JSONB next to a plain `action_type` column for filtering in SQL.

use super::{CommandDraft, CommandFilter, CommandStore};
use crate::config::{mask_database_url, StoreConfig};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use office_types::{Command, CommandAction, CommandStatus};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

const MIGRATION: &str = include_str!("../../migrations/001_commands.sql");

const COMMAND_COLUMNS: &str =
    "id, text, action, status, result, error, created_at, updated_at";

#[derive(Debug, FromRow)]
struct CommandRow {
    id: Uuid,
    text: Option<String>,
    action: Json<CommandAction>,
    status: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CommandRow> for Command {
    type Error = anyhow::Error;

    fn try_from(row: CommandRow) -> Result<Self> {
        let status: CommandStatus = row
            .status
            .parse()
            .map_err(|e| anyhow!("Command {} has bad status: {}", row.id, e))?;
        Ok(Command {
            id: row.id,
            text: row.text,
            action: row.action.0,
            status,
            result: row.result,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_commands(rows: Vec<CommandRow>) -> Result<Vec<Command>> {
    rows.into_iter().map(Command::try_from).collect()
}

/// Command store over a PostgreSQL pool
#[derive(Clone, Debug)]
pub struct PgCommandStore {
    pool: PgPool,
}

impl PgCommandStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with the given configuration and make sure the table exists
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        info!(
            "Connecting to database: {}",
            mask_database_url(&config.database_url)
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout())
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                e
            })
            .context("Failed to connect to database")?;

        let store = Self::new(pool);
        store.run_migrations().await?;
        info!("Database connection pool created successfully");
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION)
            .execute(&self.pool)
            .await
            .context("Failed to apply commands migration")?;
        Ok(())
    }
}

#[async_trait]
impl CommandStore for PgCommandStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, draft: CommandDraft) -> Result<Command> {
        let row = sqlx::query_as::<_, CommandRow>(&format!(
            r#"
            INSERT INTO commands (id, text, action_type, action, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'pending', NOW(), NOW())
            RETURNING {}
            "#,
            COMMAND_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&draft.text)
        .bind(draft.action.kind())
        .bind(Json(&draft.action))
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert command")?;

        let command = Command::try_from(row)?;
        info!(id = %command.id, action = command.action.kind(), "Created command");
        Ok(command)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Command>> {
        let row = sqlx::query_as::<_, CommandRow>(&format!(
            "SELECT {} FROM commands WHERE id = $1",
            COMMAND_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get command by ID")?;

        row.map(Command::try_from).transpose()
    }

    async fn list(&self, filter: &CommandFilter) -> Result<Vec<Command>> {
        let rows = sqlx::query_as::<_, CommandRow>(&format!(
            r#"
            SELECT {}
            FROM commands
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            COMMAND_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.effective_limit() as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list commands")?;

        into_commands(rows)
    }

    async fn claim_pending(&self, limit: usize) -> Result<Vec<Command>> {
        let rows = sqlx::query_as::<_, CommandRow>(&format!(
            r#"
            UPDATE commands
            SET status = 'processing', updated_at = NOW()
            WHERE id IN (
                SELECT id FROM commands
                WHERE status = 'pending'
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            COMMAND_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to claim pending commands")?;

        let mut commands = into_commands(rows)?;
        commands.sort_by_key(|c| c.created_at);
        Ok(commands)
    }

    async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<Option<Command>> {
        let row = sqlx::query_as::<_, CommandRow>(&format!(
            r#"
            UPDATE commands
            SET status = 'completed', result = $2, error = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING {}
            "#,
            COMMAND_COLUMNS
        ))
        .bind(id)
        .bind(result)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to complete command")?;

        row.map(Command::try_from).transpose()
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<Option<Command>> {
        let row = sqlx::query_as::<_, CommandRow>(&format!(
            r#"
            UPDATE commands
            SET status = 'failed', error = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COMMAND_COLUMNS
        ))
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to mark command failed")?;

        row.map(Command::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CommandStatus,
        error: Option<&str>,
    ) -> Result<Option<Command>> {
        let row = sqlx::query_as::<_, CommandRow>(&format!(
            r#"
            UPDATE commands
            SET status = $2,
                result = CASE WHEN $2 = 'pending' THEN NULL ELSE result END,
                error = CASE WHEN $2 = 'pending' THEN NULL ELSE COALESCE($3, error) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COMMAND_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update command status")?;

        row.map(Command::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM commands WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete command")?;

        Ok(result.rows_affected() > 0)
    }
}
