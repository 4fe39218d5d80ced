//! User penalty entity.
//!
//! One row per rejection event. Rows are written once and never updated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Points taken for the third rejection.
pub const POINTS_DEDUCTION_POINTS: i32 = 10;
/// Points taken for the fourth rejection.
pub const SEVERE_PENALTY_POINTS: i32 = 25;
/// Points taken from the fifth rejection onwards.
pub const SUSPENSION_POINTS: i32 = 50;

/// Enforcement tier reached by a user's cumulative rejection count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PenaltyTier {
    #[sea_orm(string_value = "none")]
    #[serde(rename = "none")]
    NoPenalty,
    #[sea_orm(string_value = "first_warning")]
    FirstWarning,
    #[sea_orm(string_value = "second_warning")]
    SecondWarning,
    #[sea_orm(string_value = "points_deduction")]
    PointsDeduction,
    #[sea_orm(string_value = "severe_penalty")]
    SeverePenalty,
    #[sea_orm(string_value = "account_suspended")]
    AccountSuspended,
}

impl PenaltyTier {
    /// Tier for a 1-based rejection count. Zero rejections maps to [`Self::NoPenalty`].
    #[must_use]
    pub const fn for_rejection_count(count: u32) -> Self {
        match count {
            0 => Self::NoPenalty,
            1 => Self::FirstWarning,
            2 => Self::SecondWarning,
            3 => Self::PointsDeduction,
            4 => Self::SeverePenalty,
            _ => Self::AccountSuspended,
        }
    }

    /// Points removed from the user's balance at this tier.
    #[must_use]
    pub const fn points_deducted(self) -> i32 {
        match self {
            Self::NoPenalty | Self::FirstWarning | Self::SecondWarning => 0,
            Self::PointsDeduction => POINTS_DEDUCTION_POINTS,
            Self::SeverePenalty => SEVERE_PENALTY_POINTS,
            Self::AccountSuspended => SUSPENSION_POINTS,
        }
    }

    /// Whether reaching this tier suspends the account.
    #[must_use]
    pub const fn suspends_account(self) -> bool {
        matches!(self, Self::AccountSuspended)
    }

    /// Label as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoPenalty => "none",
            Self::FirstWarning => "first_warning",
            Self::SecondWarning => "second_warning",
            Self::PointsDeduction => "points_deduction",
            Self::SeverePenalty => "severe_penalty",
            Self::AccountSuspended => "account_suspended",
        }
    }

    /// Message shown to the user after the penalty is applied.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoPenalty => "Your submission was rejected. No penalty has been applied.",
            Self::FirstWarning => {
                "First warning: your submission was rejected as not a genuine civic issue. \
                 Please only report real problems."
            }
            Self::SecondWarning => {
                "Second warning: another submission was rejected. \
                 Further fake reports will cost you points."
            }
            Self::PointsDeduction => {
                "10 points deducted: you have submitted three rejected reports. \
                 Continued violations will lead to heavier penalties."
            }
            Self::SeverePenalty => {
                "Final warning: 25 points deducted. \
                 One more rejected report will suspend your account."
            }
            Self::AccountSuspended => {
                "Account suspended: 50 points deducted after repeated fake submissions. \
                 Contact support to appeal."
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_penalty")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    /// Issue whose rejection triggered this penalty
    #[sea_orm(nullable)]
    pub issue_id: Option<String>,

    pub penalty_type: PenaltyTier,

    /// Intended deduction, recorded even if the ledger call failed
    pub points_deducted: i32,

    /// Audit reason (verification reasoning)
    #[sea_orm(column_type = "Text")]
    pub reason: String,

    /// Rejection count in effect when the penalty was applied
    pub rejection_count: i32,

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

    #[sea_orm(
        belongs_to = "super::issue::Entity",
        from = "Column::IssueId",
        to = "super::issue::Column::Id",
        on_delete = "SetNull"
    )]
    Issue,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
