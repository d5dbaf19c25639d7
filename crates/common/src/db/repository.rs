//! Repository pattern for database operations
//!
//! Postgres-backed implementations of the paper store and the chat
//! history sink.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::feed::RawResult;
use crate::history::{ChatHistorySink, SessionTitle};
use crate::metrics;
use crate::store::{new_paper, refresh_paper, PaperStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, Unchanged,
};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Row a candidate dedups against: external id when present, else title
    async fn find_existing(&self, candidate: &RawResult) -> Result<Option<Paper>> {
        let query = match &candidate.external_id {
            Some(external_id) => {
                PaperEntity::find().filter(PaperColumn::ExternalId.eq(external_id.as_str()))
            }
            None => PaperEntity::find()
                .filter(PaperColumn::Title.eq(candidate.title.as_str()))
                .order_by_asc(PaperColumn::CreatedAt),
        };

        query.one(self.conn()).await.map_err(Into::into)
    }

    async fn refresh(
        &self,
        existing: Paper,
        candidate: &RawResult,
        topic: &str,
        now: DateTime<Utc>,
    ) -> Result<Paper> {
        // RETURNING hands back the row as stored, including a summary
        // written after `existing` was read
        let updated = rediscovery_changes(&existing, candidate, topic, now)
            .update(self.conn())
            .await?;

        metrics::record_upsert(false);
        Ok(updated)
    }

    // ========================================================================
    // Chat Session Operations
    // ========================================================================

    async fn latest_session(&self, user_id: &str) -> Result<Option<ChatSession>> {
        ChatSessionEntity::find()
            .filter(ChatSessionColumn::UserId.eq(user_id))
            .order_by_desc(ChatSessionColumn::UpdatedAt)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }
}

/// Columns a re-discovery writes. Summary columns and `created_at` stay
/// `NotSet` so a concurrent `save_summary` is never overwritten.
fn rediscovery_changes(
    existing: &Paper,
    candidate: &RawResult,
    topic: &str,
    now: DateTime<Utc>,
) -> PaperActiveModel {
    let mut refreshed = existing.clone();
    refresh_paper(&mut refreshed, candidate, topic, now);

    let mut changes = PaperActiveModel {
        id: Unchanged(existing.id),
        topic: Set(refreshed.topic),
        title: Set(refreshed.title),
        authors: Set(refreshed.authors),
        abstract_display: Set(refreshed.abstract_display),
        pdf_url: Set(refreshed.pdf_url),
        source_url: Set(refreshed.source_url),
        published_at: Set(refreshed.published_at),
        updated_at: Set(refreshed.updated_at),
        ..Default::default()
    };

    if refreshed.abstract_raw != existing.abstract_raw {
        changes.abstract_raw = Set(refreshed.abstract_raw);
    }
    if refreshed.external_id != existing.external_id {
        changes.external_id = Set(refreshed.external_id);
    }

    changes
}

#[async_trait]
impl PaperStore for Repository {
    async fn upsert(&self, candidate: &RawResult, topic: &str) -> Result<Paper> {
        let now = Utc::now();

        if let Some(existing) = self.find_existing(candidate).await? {
            return self.refresh(existing, candidate, topic, now).await;
        }

        let paper = new_paper(candidate, topic, now);
        match PaperActiveModel::from(paper).reset_all().insert(self.conn()).await {
            Ok(created) => {
                metrics::record_upsert(true);
                Ok(created)
            }
            // Another request inserted the same external id first
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                debug!(
                    external_id = ?candidate.external_id,
                    "Concurrent insert detected, updating existing paper"
                );
                let existing = self
                    .find_existing(candidate)
                    .await?
                    .ok_or(AppError::Database(err))?;
                self.refresh(existing, candidate, topic, now).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Paper>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: HashMap<Uuid, Paper> = PaperEntity::find()
            .filter(PaperColumn::Id.is_in(ids.iter().copied()))
            .all(self.conn())
            .await?
            .into_iter()
            .map(|paper| (paper.id, paper))
            .collect();

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn save_summary(&self, id: Uuid, summary: &str, at: DateTime<Utc>) -> Result<()> {
        let model = PaperActiveModel {
            id: Set(id),
            ai_summary: Set(Some(summary.to_string())),
            ai_summary_at: Set(Some(at.into())),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        match model.update(self.conn()).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(AppError::PaperNotFound { id: id.to_string() }),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl ChatHistorySink for Repository {
    async fn append_exchange(
        &self,
        user_id: &str,
        user_text: &str,
        bot_text: &str,
        title: SessionTitle,
    ) -> Result<()> {
        let now = Utc::now();
        let exchange = ChatMessage::exchange(user_text, bot_text, now);

        match self.latest_session(user_id).await? {
            Some(session) => {
                let mut messages: Vec<ChatMessage> = serde_json::from_value(session.messages.clone())?;
                messages.extend(exchange);

                let mut active: ChatSessionActiveModel = session.into();
                active.messages = Set(serde_json::to_value(&messages)?);
                active.updated_at = Set(now.into());
                active.update(self.conn()).await?;
            }
            None => {
                let session = ChatSessionActiveModel {
                    id: Set(Uuid::now_v7()),
                    user_id: Set(user_id.to_string()),
                    title: Set(title.resolve(user_text)),
                    messages: Set(serde_json::to_value(exchange)?),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                session.insert(self.conn()).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{paper, raw};
    use sea_orm::ActiveValue;

    #[test]
    fn test_rediscovery_leaves_summary_columns_alone() {
        let mut existing = paper("Graph Attention Networks", "original abstract");
        existing.external_id = Some("1710.10903".to_string());
        existing.ai_summary = Some("stale summary".to_string());
        existing.ai_summary_at = Some(Utc::now().into());

        let mut candidate = raw(Some("1710.10903"), "Graph Attention Networks", "revised abstract");
        candidate.authors = vec!["Petar Velickovic".to_string()];

        let changes = rediscovery_changes(&existing, &candidate, "gnn", Utc::now());

        assert!(matches!(changes.ai_summary, ActiveValue::NotSet));
        assert!(matches!(changes.ai_summary_at, ActiveValue::NotSet));
        assert!(matches!(changes.created_at, ActiveValue::NotSet));
        assert!(matches!(changes.abstract_raw, ActiveValue::NotSet));
        assert!(matches!(changes.external_id, ActiveValue::NotSet));
        assert_eq!(changes.id, ActiveValue::Unchanged(existing.id));
        assert_eq!(changes.topic, ActiveValue::Set("gnn".to_string()));
        assert_eq!(changes.abstract_display, ActiveValue::Set("revised abstract".to_string()));
        assert_eq!(changes.authors, ActiveValue::Set(vec!["Petar Velickovic".to_string()]));
    }

    #[test]
    fn test_rediscovery_fills_missing_identity() {
        let existing = paper("Untracked Paper", "");
        let candidate = raw(Some("2401.00001"), "Untracked Paper", "now with an abstract");

        let changes = rediscovery_changes(&existing, &candidate, "t", Utc::now());

        assert_eq!(changes.abstract_raw, ActiveValue::Set("now with an abstract".to_string()));
        assert_eq!(changes.external_id, ActiveValue::Set(Some("2401.00001".to_string())));
    }
}
