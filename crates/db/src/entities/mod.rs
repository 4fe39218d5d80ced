//! Database entities.

pub mod issue;
pub mod moderation_action;
pub mod user;
pub mod user_penalty;

pub use issue::Entity as Issue;
pub use moderation_action::Entity as ModerationAction;
pub use user::Entity as User;
pub use user_penalty::Entity as UserPenalty;
