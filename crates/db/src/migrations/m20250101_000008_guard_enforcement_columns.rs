//! Keep enforcement columns out of reach of owner updates.
//!
//! Row level security decides which rows a signed-in user may update, not
//! which columns. These triggers reject changes to status, points and
//! rejection tracking from sessions acting as a user (`app.current_user_id`
//! set) unless the session is the backend (`app.role = 'service'`).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(GUARD_SQL)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DROP_GUARD_SQL)
            .await?;

        Ok(())
    }
}

const GUARD_SQL: &str = r#"
CREATE OR REPLACE FUNCTION acting_as_user() RETURNS boolean AS $$
    SELECT COALESCE(current_setting('app.role', true), '') <> 'service'
       AND COALESCE(current_setting('app.current_user_id', true), '') <> '';
$$ LANGUAGE sql STABLE;

CREATE OR REPLACE FUNCTION guard_user_enforcement_columns() RETURNS trigger AS $$
BEGIN
    IF acting_as_user() AND (
        NEW.id IS DISTINCT FROM OLD.id
        OR NEW.points IS DISTINCT FROM OLD.points
        OR NEW.account_status IS DISTINCT FROM OLD.account_status
        OR NEW.ban_reason IS DISTINCT FROM OLD.ban_reason
        OR NEW.is_admin IS DISTINCT FROM OLD.is_admin
    ) THEN
        RAISE EXCEPTION 'only the backend may change status or points of user %', OLD.id
            USING ERRCODE = 'insufficient_privilege';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE OR REPLACE FUNCTION guard_issue_enforcement_columns() RETURNS trigger AS $$
BEGIN
    IF acting_as_user() AND (
        NEW.id IS DISTINCT FROM OLD.id
        OR NEW.reported_by IS DISTINCT FROM OLD.reported_by
        OR NEW.reported_at IS DISTINCT FROM OLD.reported_at
        OR NEW.verification_status IS DISTINCT FROM OLD.verification_status
        OR NEW.rejection_reason IS DISTINCT FROM OLD.rejection_reason
        OR NEW.rejection_count IS DISTINCT FROM OLD.rejection_count
        OR NEW.last_rejection_at IS DISTINCT FROM OLD.last_rejection_at
    ) THEN
        RAISE EXCEPTION 'only the backend may change verification of issue %', OLD.id
            USING ERRCODE = 'insufficient_privilege';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER user_guard_enforcement_columns
    BEFORE UPDATE ON "user"
    FOR EACH ROW EXECUTE FUNCTION guard_user_enforcement_columns();

CREATE TRIGGER issue_guard_enforcement_columns
    BEFORE UPDATE ON issue
    FOR EACH ROW EXECUTE FUNCTION guard_issue_enforcement_columns();
"#;

const DROP_GUARD_SQL: &str = r#"
DROP TRIGGER IF EXISTS issue_guard_enforcement_columns ON issue;
DROP TRIGGER IF EXISTS user_guard_enforcement_columns ON "user";
DROP FUNCTION IF EXISTS guard_issue_enforcement_columns();
DROP FUNCTION IF EXISTS guard_user_enforcement_columns();
DROP FUNCTION IF EXISTS acting_as_user();
"#;
