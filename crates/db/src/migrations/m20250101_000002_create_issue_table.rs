//! Create issue table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issue::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Issue::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Issue::ReportedBy).string_len(32).not_null())
                    .col(ColumnDef::new(Issue::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Issue::Description).text().not_null())
                    .col(ColumnDef::new(Issue::Category).string_len(32).not_null().default("other"))
                    .col(
                        ColumnDef::new(Issue::VerificationStatus)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Issue::ReportedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Issue::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issue_reported_by")
                            .from(Issue::Table, Issue::ReportedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: verification_status (pending/verified/rejected queues)
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_verification_status")
                    .table(Issue::Table)
                    .col(Issue::VerificationStatus)
                    .to_owned(),
            )
            .await?;

        // Index: reported_at
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_reported_at")
                    .table(Issue::Table)
                    .col(Issue::ReportedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Issue::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Issue {
    Table,
    Id,
    ReportedBy,
    Title,
    Description,
    Category,
    VerificationStatus,
    ReportedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
