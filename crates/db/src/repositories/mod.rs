//! Data access repositories.
//!
//! Methods suffixed with `_in` run against an open transaction so the
//! caller controls the unit of work.

mod issue;
mod moderation_action;
mod penalty;
mod user;

pub use issue::IssueRepository;
pub use moderation_action::ModerationActionRepository;
pub use penalty::{PenaltyRepository, PenaltySummary};
pub use user::UserRepository;
