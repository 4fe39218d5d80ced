//! Create the `user_penalty_summary` reporting view.
//!
//! One row per user with at least one rejected issue. Aggregates are
//! computed on read.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(CREATE_VIEW_SQL)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP VIEW IF EXISTS user_penalty_summary;")
            .await?;

        Ok(())
    }
}

const CREATE_VIEW_SQL: &str = r#"
CREATE OR REPLACE VIEW user_penalty_summary AS
SELECT
    u.id AS user_id,
    u.username,
    u.account_status,
    r.total_rejections,
    COALESCE(p.total_penalties, 0) AS total_penalties,
    r.last_rejection_at,
    p.last_penalty_at,
    COALESCE(p.total_points_deducted, 0) AS total_points_deducted
FROM "user" u
JOIN (
    SELECT
        reported_by,
        COUNT(*) AS total_rejections,
        MAX(last_rejection_at) AS last_rejection_at
    FROM issue
    WHERE verification_status = 'rejected'
    GROUP BY reported_by
) r ON r.reported_by = u.id
LEFT JOIN (
    SELECT
        user_id,
        COUNT(*) AS total_penalties,
        MAX(created_at) AS last_penalty_at,
        SUM(points_deducted)::BIGINT AS total_points_deducted
    FROM user_penalty
    GROUP BY user_id
) p ON p.user_id = u.id;
"#;
