//! Create `user_penalty` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserPenalty::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserPenalty::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(UserPenalty::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(UserPenalty::IssueId).string_len(32))
                    .col(ColumnDef::new(UserPenalty::PenaltyType).string_len(32).not_null())
                    .col(
                        ColumnDef::new(UserPenalty::PointsDeducted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(UserPenalty::Reason).text().not_null())
                    .col(ColumnDef::new(UserPenalty::RejectionCount).integer().not_null())
                    .col(
                        ColumnDef::new(UserPenalty::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_penalty_user")
                            .from(UserPenalty::Table, UserPenalty::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_penalty_issue")
                            .from(UserPenalty::Table, UserPenalty::IssueId)
                            .to(Issue::Table, Issue::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id
        manager
            .create_index(
                Index::create()
                    .name("idx_user_penalty_user_id")
                    .table(UserPenalty::Table)
                    .col(UserPenalty::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: created_at
        manager
            .create_index(
                Index::create()
                    .name("idx_user_penalty_created_at")
                    .table(UserPenalty::Table)
                    .col(UserPenalty::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserPenalty::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserPenalty {
    Table,
    Id,
    UserId,
    IssueId,
    PenaltyType,
    PointsDeducted,
    Reason,
    RejectionCount,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Issue {
    Table,
    Id,
}
