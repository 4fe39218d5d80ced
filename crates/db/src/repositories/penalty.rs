//! Penalty repository: the write-once penalty ledger and its summary view.

use std::sync::Arc;

use crate::entities::{UserPenalty, user::AccountStatus, user_penalty};
use failstate_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
    prelude::DateTimeWithTimeZone,
};
use serde::Serialize;

/// One row of the `user_penalty_summary` view.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct PenaltySummary {
    pub user_id: String,
    pub username: String,
    pub account_status: AccountStatus,
    pub total_rejections: i64,
    pub total_penalties: i64,
    pub last_rejection_at: Option<DateTimeWithTimeZone>,
    pub last_penalty_at: Option<DateTimeWithTimeZone>,
    pub total_points_deducted: i64,
}

const SUMMARY_COLUMNS: &str = "user_id, username, account_status, total_rejections, \
     total_penalties, last_rejection_at, last_penalty_at, total_points_deducted";

/// Penalty repository for database operations.
///
/// No update or delete: penalty rows are an audit trail.
#[derive(Clone)]
pub struct PenaltyRepository {
    db: Arc<DatabaseConnection>,
}

impl PenaltyRepository {
    /// Create a new penalty repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a penalty record inside a transaction.
    pub async fn create_in(
        &self,
        txn: &DatabaseTransaction,
        model: user_penalty::ActiveModel,
    ) -> AppResult<user_penalty::Model> {
        model
            .insert(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user's penalty records, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user_penalty::Model>> {
        UserPenalty::find()
            .filter(user_penalty::Column::UserId.eq(user_id))
            .order_by_desc(user_penalty::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a user's penalty records.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        UserPenalty::find()
            .filter(user_penalty::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the penalty summary for one user.
    ///
    /// `None` when the user has no rejected issues.
    pub async fn get_summary(&self, user_id: &str) -> AppResult<Option<PenaltySummary>> {
        let sql = format!("SELECT {SUMMARY_COLUMNS} FROM user_penalty_summary WHERE user_id = $1");

        PenaltySummary::find_by_statement(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            &sql,
            [user_id.into()],
        ))
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List penalty summaries, most rejections first.
    pub async fn list_summaries(&self, limit: u64, offset: u64) -> AppResult<Vec<PenaltySummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM user_penalty_summary \
             ORDER BY total_rejections DESC, user_id ASC LIMIT $1 OFFSET $2"
        );

        PenaltySummary::find_by_statement(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            &sql,
            [(limit as i64).into(), (offset as i64).into()],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::user_penalty::PenaltyTier;
    use chrono::Utc;
    use sea_orm::{MockDatabase, Set, TransactionTrait, Value};
    use std::collections::BTreeMap;

    fn create_test_penalty(id: &str, user_id: &str, count: i32) -> user_penalty::Model {
        let tier = PenaltyTier::for_rejection_count(count as u32);
        user_penalty::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            issue_id: Some(format!("issue_{id}")),
            penalty_type: tier,
            points_deducted: tier.points_deducted(),
            reason: "Image is a screenshot of a meme".to_string(),
            rejection_count: count,
            created_at: Utc::now().into(),
        }
    }

    fn summary_row(user_id: &str, rejections: i64, points: i64) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! {
            "user_id" => Value::from(user_id),
            "username" => Value::from(format!("user_{user_id}")),
            "account_status" => Value::from("active"),
            "total_rejections" => Value::BigInt(Some(rejections)),
            "total_penalties" => Value::BigInt(Some(rejections)),
            "last_rejection_at" => Value::from(Option::<DateTimeWithTimeZone>::None),
            "last_penalty_at" => Value::from(Option::<DateTimeWithTimeZone>::None),
            "total_points_deducted" => Value::BigInt(Some(points)),
        }
    }

    #[tokio::test]
    async fn test_create_in_transaction() {
        let penalty = create_test_penalty("pen1", "user1", 3);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[penalty.clone()]])
                .into_connection(),
        );

        let repo = PenaltyRepository::new(db.clone());
        let txn = db.begin().await.unwrap();
        let model = user_penalty::ActiveModel {
            id: Set(penalty.id.clone()),
            user_id: Set(penalty.user_id.clone()),
            issue_id: Set(penalty.issue_id.clone()),
            penalty_type: Set(penalty.penalty_type),
            points_deducted: Set(penalty.points_deducted),
            reason: Set(penalty.reason.clone()),
            rejection_count: Set(penalty.rejection_count),
            created_at: Set(penalty.created_at),
        };
        let created = repo.create_in(&txn, model).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(created.penalty_type, PenaltyTier::PointsDeduction);
        assert_eq!(created.points_deducted, 10);
    }

    #[tokio::test]
    async fn test_find_by_user() {
        let p1 = create_test_penalty("pen2", "user1", 2);
        let p2 = create_test_penalty("pen1", "user1", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1, p2]])
                .into_connection(),
        );

        let repo = PenaltyRepository::new(db);
        let result = repo.find_by_user("user1", 10).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].penalty_type, PenaltyTier::SecondWarning);
    }

    #[tokio::test]
    async fn test_get_summary() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[summary_row("user1", 4, 35)]])
                .into_connection(),
        );

        let repo = PenaltyRepository::new(db);
        let summary = repo.get_summary("user1").await.unwrap().unwrap();

        assert_eq!(summary.user_id, "user1");
        assert_eq!(summary.total_rejections, 4);
        assert_eq!(summary.total_points_deducted, 35);
        assert_eq!(summary.account_status, AccountStatus::Active);
        assert!(summary.last_penalty_at.is_none());
    }

    #[tokio::test]
    async fn test_get_summary_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
                .into_connection(),
        );

        let repo = PenaltyRepository::new(db);
        assert!(repo.get_summary("clean_user").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_summaries() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[summary_row("user1", 6, 135), summary_row("user2", 1, 0)]])
                .into_connection(),
        );

        let repo = PenaltyRepository::new(db);
        let result = repo.list_summaries(50, 0).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].total_rejections, 6);
    }
}
