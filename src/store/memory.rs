//! In-process command store
//!
//! Keeps commands in a map behind a tokio `RwLock`. Insertion order is
//! tracked with a sequence number so listing and claiming stay stable even
//! when two commands share a timestamp.

use super::{CommandDraft, CommandFilter, CommandStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use office_types::{Command, CommandStatus};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    commands: HashMap<Uuid, (u64, Command)>,
    next_seq: u64,
}

#[derive(Default)]
pub struct MemoryCommandStore {
    inner: RwLock<Inner>,
}

impl MemoryCommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.commands.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CommandStore for MemoryCommandStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, draft: CommandDraft) -> Result<Command> {
        let now = Utc::now();
        let command = Command {
            id: Uuid::new_v4(),
            text: draft.text,
            action: draft.action,
            status: CommandStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.commands.insert(command.id, (seq, command.clone()));

        debug!(id = %command.id, action = command.action.kind(), "Command stored");
        Ok(command)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Command>> {
        let inner = self.inner.read().await;
        Ok(inner.commands.get(&id).map(|(_, c)| c.clone()))
    }

    async fn list(&self, filter: &CommandFilter) -> Result<Vec<Command>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<&(u64, Command)> = inner
            .commands
            .values()
            .filter(|(_, c)| filter.status.map_or(true, |s| c.status == s))
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(rows
            .into_iter()
            .take(filter.effective_limit())
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn claim_pending(&self, limit: usize) -> Result<Vec<Command>> {
        let mut inner = self.inner.write().await;

        let mut pending: Vec<(u64, Uuid)> = inner
            .commands
            .values()
            .filter(|(_, c)| c.status == CommandStatus::Pending)
            .map(|(seq, c)| (*seq, c.id))
            .collect();
        pending.sort();
        pending.truncate(limit);

        let now = Utc::now();
        let mut claimed = Vec::with_capacity(pending.len());
        for (_, id) in pending {
            if let Some((_, command)) = inner.commands.get_mut(&id) {
                command.status = CommandStatus::Processing;
                command.updated_at = now;
                claimed.push(command.clone());
            }
        }
        Ok(claimed)
    }

    async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<Option<Command>> {
        let mut inner = self.inner.write().await;
        match inner.commands.get_mut(&id) {
            Some((_, command)) if command.status == CommandStatus::Processing => {
                command.status = CommandStatus::Completed;
                command.result = Some(result);
                command.error = None;
                command.updated_at = Utc::now();
                Ok(Some(command.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<Option<Command>> {
        let mut inner = self.inner.write().await;
        Ok(inner.commands.get_mut(&id).map(|(_, command)| {
            command.status = CommandStatus::Failed;
            command.error = Some(error.to_string());
            command.updated_at = Utc::now();
            command.clone()
        }))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CommandStatus,
        error: Option<&str>,
    ) -> Result<Option<Command>> {
        let mut inner = self.inner.write().await;
        Ok(inner.commands.get_mut(&id).map(|(_, command)| {
            command.status = status;
            if status == CommandStatus::Pending {
                command.result = None;
                command.error = None;
            } else if let Some(error) = error {
                command.error = Some(error.to_string());
            }
            command.updated_at = Utc::now();
            command.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.commands.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use office_types::{CommandAction, DocumentParams, TemplateType};

    fn draft(apartment: &str) -> CommandDraft {
        CommandDraft {
            text: Some(format!("create handover act for apartment {}", apartment)),
            action: CommandAction::CreateDocument {
                template_type: TemplateType::HandoverAct,
                params: DocumentParams {
                    apartment: Some(apartment.to_string()),
                    ..Default::default()
                },
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryCommandStore::new();
        let command = store.insert(draft("1")).await.unwrap();

        assert_eq!(command.status, CommandStatus::Pending);
        assert!(command.updated_at >= command.created_at);

        let loaded = store.get(command.id).await.unwrap().unwrap();
        assert_eq!(loaded, command);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let store = MemoryCommandStore::new();
        let first = store.insert(draft("1")).await.unwrap();
        let second = store.insert(draft("2")).await.unwrap();
        let third = store.insert(draft("3")).await.unwrap();
        store
            .update_status(second.id, CommandStatus::Failed, Some("manual"))
            .await
            .unwrap();

        let all = store.list(&CommandFilter::default()).await.unwrap();
        let ids: Vec<Uuid> = all.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        let pending = store
            .list(&CommandFilter {
                status: Some(CommandStatus::Pending),
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, third.id);
    }

    #[tokio::test]
    async fn test_claim_pending_is_fifo_and_exclusive() {
        let store = MemoryCommandStore::new();
        let first = store.insert(draft("1")).await.unwrap();
        let second = store.insert(draft("2")).await.unwrap();
        let third = store.insert(draft("3")).await.unwrap();

        let batch = store.claim_pending(2).await.unwrap();
        let ids: Vec<Uuid> = batch.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(batch.iter().all(|c| c.status == CommandStatus::Processing));

        let next = store.claim_pending(10).await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, third.id);

        assert!(store.claim_pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_requires_processing() {
        let store = MemoryCommandStore::new();
        let command = store.insert(draft("7")).await.unwrap();

        let early = store
            .complete(command.id, serde_json::json!({"file_path": "x"}))
            .await
            .unwrap();
        assert!(early.is_none());

        store.claim_pending(1).await.unwrap();
        let done = store
            .complete(command.id, serde_json::json!({"file_path": "x"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, CommandStatus::Completed);
        assert_eq!(done.result.unwrap()["file_path"], "x");
    }

    #[tokio::test]
    async fn test_terminal_commands_are_not_claimed() {
        let store = MemoryCommandStore::new();
        let command = store.insert(draft("8")).await.unwrap();
        store.fail(command.id, "boom").await.unwrap();

        assert!(store.claim_pending(10).await.unwrap().is_empty());

        let reset = store
            .update_status(command.id, CommandStatus::Pending, None)
            .await
            .unwrap()
            .unwrap();
        assert!(reset.error.is_none());
        assert_eq!(store.claim_pending(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryCommandStore::new();
        let command = store.insert(draft("9")).await.unwrap();
        assert!(store.delete(command.id).await.unwrap());
        assert!(!store.delete(command.id).await.unwrap());
        assert!(store.is_empty().await);
    }
}
