//! Account administration: manual suspensions and reinstatement.
//!
//! Every status change is recorded in the moderation audit trail inside the
//! same transaction as the change itself.

use std::sync::Arc;

use chrono::Utc;
use failstate_common::{AppError, AppResult, IdGenerator};
use failstate_db::{
    entities::{
        moderation_action::{self, ModerationActionKind},
        user::{self, AccountStatus},
    },
    repositories::{ModerationActionRepository, UserRepository},
};
use sea_orm::{DatabaseConnection, DatabaseTransaction, Set, TransactionTrait};

use crate::policy::{Action, Actor, Table, authorize, authorize_update};

/// Columns written by suspension changes.
const STATUS_COLUMNS: [&str; 2] = ["account_status", "ban_reason"];

/// Longest accepted suspension reason.
const MAX_REASON_LEN: usize = 256;

/// Account service.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    action_repo: ModerationActionRepository,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            user_repo: UserRepository::new(Arc::clone(&db)),
            action_repo: ModerationActionRepository::new(Arc::clone(&db)),
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Suspend a user by hand.
    pub async fn suspend_user(
        &self,
        actor: &Actor,
        user_id: &str,
        reason: &str,
    ) -> AppResult<user::Model> {
        authorize_update(actor, Table::User, Some(user_id), &STATUS_COLUMNS)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::BadRequest(
                "Suspension reason is required".to_string(),
            ));
        }
        if reason.len() > MAX_REASON_LEN {
            return Err(AppError::BadRequest(
                "Suspension reason too long".to_string(),
            ));
        }

        let txn = self.begin().await?;

        let user = self
            .user_repo
            .find_by_id_in(&txn, user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        if user.is_admin {
            return Err(AppError::Forbidden("Cannot suspend an admin".to_string()));
        }
        if user.account_status == AccountStatus::Suspended {
            return Err(AppError::BadRequest("User already suspended".to_string()));
        }

        let mut active: user::ActiveModel = user.into();
        active.account_status = Set(AccountStatus::Suspended);
        active.ban_reason = Set(Some(reason.to_string()));
        active.updated_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update_in(&txn, active).await?;

        self.record(&txn, actor, user_id, ModerationActionKind::UserSuspended, reason)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_id = %user_id, by = %actor.label(), "Suspended user");
        Ok(user)
    }

    /// Lift a suspension. Rejection history and penalty records stay as they are,
    /// so the next rejection suspends again.
    pub async fn reinstate_user(&self, actor: &Actor, user_id: &str) -> AppResult<user::Model> {
        authorize_update(actor, Table::User, Some(user_id), &STATUS_COLUMNS)?;

        let txn = self.begin().await?;

        let user = self
            .user_repo
            .find_by_id_in(&txn, user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        if user.account_status != AccountStatus::Suspended {
            return Err(AppError::BadRequest(format!(
                "User {user_id} is not suspended"
            )));
        }

        let reason = format!(
            "Suspension lifted (was: {})",
            user.ban_reason.as_deref().unwrap_or("no reason recorded")
        );

        let mut active: user::ActiveModel = user.into();
        active.account_status = Set(AccountStatus::Active);
        active.ban_reason = Set(None);
        active.updated_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update_in(&txn, active).await?;

        self.record(&txn, actor, user_id, ModerationActionKind::UserReinstated, &reason)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_id = %user_id, by = %actor.label(), "Reinstated suspended user");
        Ok(user)
    }

    /// List suspended users.
    pub async fn list_suspended(
        &self,
        actor: &Actor,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        authorize(actor, Table::User, Action::Read, None)?;
        self.user_repo
            .find_suspended(limit.clamp(1, 500), offset)
            .await
    }

    /// Count suspended users.
    pub async fn count_suspended(&self, actor: &Actor) -> AppResult<u64> {
        authorize(actor, Table::User, Action::Read, None)?;
        self.user_repo.count_suspended().await
    }

    /// Moderation actions taken on a user, newest first.
    pub async fn moderation_history(
        &self,
        actor: &Actor,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<moderation_action::Model>> {
        authorize(actor, Table::ModerationAction, Action::Read, None)?;
        self.action_repo
            .find_by_user(user_id, limit.clamp(1, 500))
            .await
    }

    async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn record(
        &self,
        txn: &DatabaseTransaction,
        actor: &Actor,
        user_id: &str,
        kind: ModerationActionKind,
        reason: &str,
    ) -> AppResult<moderation_action::Model> {
        let model = moderation_action::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            issue_id: Set(None),
            action: Set(kind),
            performed_by: Set(actor.label().to_string()),
            reason: Set(reason.to_string()),
            created_at: Set(Utc::now().into()),
        };
        self.action_repo.create_in(txn, model).await
    }
}
