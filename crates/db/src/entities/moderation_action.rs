//! Moderation action entity.
//!
//! Audit trail of operator decisions on accounts and issues. Rows are
//! written once and never updated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of operator decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ModerationActionKind {
    #[sea_orm(string_value = "user_suspended")]
    UserSuspended,
    #[sea_orm(string_value = "user_reinstated")]
    UserReinstated,
    #[sea_orm(string_value = "rejection_overridden")]
    RejectionOverridden,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moderation_action")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user the decision applies to.
    pub user_id: String,

    /// Issue involved, for rejection overrides.
    #[sea_orm(nullable)]
    pub issue_id: Option<String>,

    pub action: ModerationActionKind,

    /// Who made the decision.
    pub performed_by: String,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
