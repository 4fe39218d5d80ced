//! User repository.

use std::sync::Arc;

use crate::entities::{
    User,
    user::{self, AccountStatus},
};
use failstate_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find a user by ID inside a transaction.
    pub async fn find_by_id_in(
        &self,
        txn: &DatabaseTransaction,
        id: &str,
    ) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user inside a transaction.
    pub async fn update_in(
        &self,
        txn: &DatabaseTransaction,
        model: user::ActiveModel,
    ) -> AppResult<user::Model> {
        model
            .update(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add `delta` to a user's point balance (single UPDATE query, no fetch).
    ///
    /// Returns the number of rows touched; zero means the user does not exist.
    pub async fn adjust_points(&self, user_id: &str, delta: i32) -> AppResult<u64> {
        let result = User::update_many()
            .col_expr(user::Column::Points, Expr::col(user::Column::Points).add(delta))
            .col_expr(user::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Get a user's current point balance.
    pub async fn get_points(&self, user_id: &str) -> AppResult<i32> {
        Ok(self.get_by_id(user_id).await?.points)
    }

    /// Get suspended users (paginated, most recently updated first).
    pub async fn find_suspended(&self, limit: u64, offset: u64) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::AccountStatus.eq(AccountStatus::Suspended))
            .order_by_desc(user::Column::UpdatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count suspended users.
    pub async fn count_suspended(&self) -> AppResult<u64> {
        User::find()
            .filter(user::Column::AccountStatus.eq(AccountStatus::Suspended))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
