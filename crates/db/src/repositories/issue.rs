//! Issue repository.

use std::sync::Arc;

use crate::entities::{
    Issue,
    issue::{self, VerificationStatus},
};
use failstate_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// Issue repository for database operations.
#[derive(Clone)]
pub struct IssueRepository {
    db: Arc<DatabaseConnection>,
}

impl IssueRepository {
    /// Create a new issue repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an issue by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<issue::Model>> {
        Issue::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an issue by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<issue::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::IssueNotFound(id.to_string()))
    }

    /// Find an issue by ID inside a transaction.
    pub async fn find_by_id_in(
        &self,
        txn: &DatabaseTransaction,
        id: &str,
    ) -> AppResult<Option<issue::Model>> {
        Issue::find_by_id(id)
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new issue.
    pub async fn create(&self, model: issue::ActiveModel) -> AppResult<issue::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an issue inside a transaction.
    pub async fn update_in(
        &self,
        txn: &DatabaseTransaction,
        model: issue::ActiveModel,
    ) -> AppResult<issue::Model> {
        model
            .update(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a reporter's rejected issues, leaving out `excluding_issue_id`.
    ///
    /// Derived from the issue rows every time, so edits made outside the
    /// evaluator are picked up on the next rejection.
    pub async fn count_rejected_by_reporter_in(
        &self,
        txn: &DatabaseTransaction,
        reporter_id: &str,
        excluding_issue_id: &str,
    ) -> AppResult<u64> {
        Issue::find()
            .filter(issue::Column::ReportedBy.eq(reporter_id))
            .filter(issue::Column::VerificationStatus.eq(VerificationStatus::Rejected))
            .filter(issue::Column::Id.ne(excluding_issue_id))
            .count(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get rejected issues, newest rejection first, optionally filtered by reason.
    pub async fn find_rejected(
        &self,
        reason: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<issue::Model>> {
        let mut query = Issue::find()
            .filter(issue::Column::VerificationStatus.eq(VerificationStatus::Rejected));

        if let Some(r) = reason {
            query = query.filter(issue::Column::RejectionReason.eq(r));
        }

        query
            .order_by_desc(issue::Column::LastRejectionAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
