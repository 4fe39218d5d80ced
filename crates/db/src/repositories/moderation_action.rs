//! Moderation action repository.

use std::sync::Arc;

use crate::entities::{ModerationAction, moderation_action};
use failstate_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Append-only access to the moderation audit trail.
#[derive(Clone)]
pub struct ModerationActionRepository {
    db: Arc<DatabaseConnection>,
}

impl ModerationActionRepository {
    /// Create a new moderation action repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record an action inside the transaction that made the change.
    pub async fn create_in(
        &self,
        txn: &DatabaseTransaction,
        model: moderation_action::ActiveModel,
    ) -> AppResult<moderation_action::Model> {
        model
            .insert(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the actions taken on a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<moderation_action::Model>> {
        ModerationAction::find()
            .filter(moderation_action::Column::UserId.eq(user_id))
            .order_by_desc(moderation_action::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
