//! Create `moderation_action` audit table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ModerationAction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModerationAction::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModerationAction::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(ModerationAction::IssueId).string_len(32))
                    .col(ColumnDef::new(ModerationAction::Action).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ModerationAction::PerformedBy)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationAction::Reason).text().not_null())
                    .col(
                        ColumnDef::new(ModerationAction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_moderation_action_user")
                            .from(ModerationAction::Table, ModerationAction::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at) for per-user history
        manager
            .create_index(
                Index::create()
                    .name("idx_moderation_action_user_created")
                    .table(ModerationAction::Table)
                    .col(ModerationAction::UserId)
                    .col(ModerationAction::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Backend-only, like the rest of the enforcement data
        manager
            .get_connection()
            .execute_unprepared(
                r"
ALTER TABLE moderation_action ENABLE ROW LEVEL SECURITY;

CREATE POLICY moderation_action_service_all ON moderation_action
    FOR ALL
    USING (current_setting('app.role', true) = 'service')
    WITH CHECK (current_setting('app.role', true) = 'service');
",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModerationAction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ModerationAction {
    Table,
    Id,
    UserId,
    IssueId,
    Action,
    PerformedBy,
    Reason,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
