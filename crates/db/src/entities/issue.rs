//! Issue entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Verification status of a submitted issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum VerificationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Reporter
    pub reported_by: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub category: String,

    pub verification_status: VerificationStatus,

    #[sea_orm(nullable)]
    pub rejection_reason: Option<String>,

    /// Ordinal of this rejection among the reporter's rejected issues (denormalized)
    #[sea_orm(default_value = 0)]
    pub rejection_count: i32,

    #[sea_orm(nullable)]
    pub last_rejection_at: Option<DateTimeWithTimeZone>,

    pub reported_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReportedBy",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Reporter,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reporter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
