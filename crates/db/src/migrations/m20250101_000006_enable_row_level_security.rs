//! Enable row level security on user-owned tables.
//!
//! Policies read the caller from two session settings:
//! `app.current_user_id` (the signed-in user) and `app.role`
//! (`service` for the backend identity). The service layer applies the
//! same rules in `failstate_core::policy`, so connections made as the
//! table owner (which RLS does not restrict unless forced) stay correct.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(DROP_RLS_SQL).await?;

        Ok(())
    }
}

const RLS_SQL: &str = r#"
-- ============================================================
-- Enable RLS
-- ============================================================

ALTER TABLE "user" ENABLE ROW LEVEL SECURITY;
ALTER TABLE issue ENABLE ROW LEVEL SECURITY;
ALTER TABLE user_penalty ENABLE ROW LEVEL SECURITY;

-- ============================================================
-- issue: public read, owner update, backend writes
-- ============================================================

CREATE POLICY issue_public_read ON issue
    FOR SELECT USING (true);

CREATE POLICY issue_owner_update ON issue
    FOR UPDATE
    USING (reported_by = current_setting('app.current_user_id', true))
    WITH CHECK (reported_by = current_setting('app.current_user_id', true));

CREATE POLICY issue_service_all ON issue
    FOR ALL
    USING (current_setting('app.role', true) = 'service')
    WITH CHECK (current_setting('app.role', true) = 'service');

-- ============================================================
-- user: owner read/update, backend writes
-- ============================================================

CREATE POLICY user_owner_read ON "user"
    FOR SELECT USING (id = current_setting('app.current_user_id', true));

CREATE POLICY user_owner_update ON "user"
    FOR UPDATE
    USING (id = current_setting('app.current_user_id', true))
    WITH CHECK (id = current_setting('app.current_user_id', true));

CREATE POLICY user_service_all ON "user"
    FOR ALL
    USING (current_setting('app.role', true) = 'service')
    WITH CHECK (current_setting('app.role', true) = 'service');

-- ============================================================
-- user_penalty: owner read, backend writes (no owner updates)
-- ============================================================

CREATE POLICY user_penalty_owner_read ON user_penalty
    FOR SELECT USING (user_id = current_setting('app.current_user_id', true));

CREATE POLICY user_penalty_service_all ON user_penalty
    FOR ALL
    USING (current_setting('app.role', true) = 'service')
    WITH CHECK (current_setting('app.role', true) = 'service');

-- The summary view must evaluate policies as the caller, not the view owner
ALTER VIEW user_penalty_summary SET (security_invoker = true);
"#;

const DROP_RLS_SQL: &str = r#"
ALTER VIEW user_penalty_summary RESET (security_invoker);

DROP POLICY IF EXISTS user_penalty_service_all ON user_penalty;
DROP POLICY IF EXISTS user_penalty_owner_read ON user_penalty;
DROP POLICY IF EXISTS user_service_all ON "user";
DROP POLICY IF EXISTS user_owner_update ON "user";
DROP POLICY IF EXISTS user_owner_read ON "user";
DROP POLICY IF EXISTS issue_service_all ON issue;
DROP POLICY IF EXISTS issue_owner_update ON issue;
DROP POLICY IF EXISTS issue_public_read ON issue;

ALTER TABLE user_penalty DISABLE ROW LEVEL SECURITY;
ALTER TABLE issue DISABLE ROW LEVEL SECURITY;
ALTER TABLE "user" DISABLE ROW LEVEL SECURITY;
"#;
