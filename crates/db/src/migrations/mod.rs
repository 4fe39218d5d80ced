//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_issue_table;
mod m20250101_000003_add_issue_rejection_tracking;
mod m20250101_000004_create_user_penalty_table;
mod m20250101_000005_create_penalty_summary_view;
mod m20250101_000006_enable_row_level_security;
mod m20250101_000007_create_moderation_action_table;
mod m20250101_000008_guard_enforcement_columns;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_issue_table::Migration),
            Box::new(m20250101_000003_add_issue_rejection_tracking::Migration),
            Box::new(m20250101_000004_create_user_penalty_table::Migration),
            Box::new(m20250101_000005_create_penalty_summary_view::Migration),
            Box::new(m20250101_000006_enable_row_level_security::Migration),
            Box::new(m20250101_000007_create_moderation_action_table::Migration),
            Box::new(m20250101_000008_guard_enforcement_columns::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_unique() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();

        assert_eq!(names.len(), 8);
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }
}
