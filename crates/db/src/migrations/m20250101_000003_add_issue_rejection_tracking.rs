//! Add rejection tracking columns to issue.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Issue::Table)
                    .add_column(ColumnDef::new(Issue::RejectionReason).string_len(256).null())
                    .add_column(
                        ColumnDef::new(Issue::RejectionCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .add_column(
                        ColumnDef::new(Issue::LastRejectionAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (reported_by, verification_status) for per-user rejection counts
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_reported_by_status")
                    .table(Issue::Table)
                    .col(Issue::ReportedBy)
                    .col(Issue::VerificationStatus)
                    .to_owned(),
            )
            .await?;

        // Index: rejection_reason (admin filtering)
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_rejection_reason")
                    .table(Issue::Table)
                    .col(Issue::RejectionReason)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_issue_rejection_reason")
                    .table(Issue::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_issue_reported_by_status")
                    .table(Issue::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Issue::Table)
                    .drop_column(Issue::RejectionReason)
                    .drop_column(Issue::RejectionCount)
                    .drop_column(Issue::LastRejectionAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Issue {
    Table,
    ReportedBy,
    VerificationStatus,
    RejectionReason,
    RejectionCount,
    LastRejectionAt,
}
