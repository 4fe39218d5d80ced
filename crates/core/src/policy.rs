//! Service-layer access policy.
//!
//! Mirrors the row level security policies installed by the database
//! migrations: issues and reference tables are readable by anyone, writes
//! belong to the backend identity, and a signed-in user may read or update
//! only rows they own.

use failstate_common::{AppError, AppResult};

/// The identity an operation runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// No authenticated user.
    Anonymous,
    /// A signed-in user.
    User(String),
    /// The privileged backend identity (verification worker, operators).
    Backend,
}

impl Actor {
    /// The signed-in user's ID, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Anonymous | Self::Backend => None,
        }
    }

    /// Whether this is the backend identity.
    #[must_use]
    pub const fn is_backend(&self) -> bool {
        matches!(self, Self::Backend)
    }

    /// Name recorded in audit rows.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Anonymous => "anonymous",
            Self::User(id) => id,
            Self::Backend => "backend",
        }
    }
}

/// Tables (and views) covered by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Issue,
    User,
    UserPenalty,
    PenaltySummary,
    ModerationAction,
    District,
    DistrictAuthority,
    Milestone,
    RedeemableItem,
}

impl Table {
    /// Readable without signing in.
    #[must_use]
    pub const fn is_public_read(self) -> bool {
        matches!(
            self,
            Self::Issue
                | Self::District
                | Self::DistrictAuthority
                | Self::Milestone
                | Self::RedeemableItem
        )
    }

    /// Rows can never be changed by their owner.
    #[must_use]
    pub const fn is_owner_immutable(self) -> bool {
        matches!(
            self,
            Self::UserPenalty
                | Self::PenaltySummary
                | Self::ModerationAction
                | Self::District
                | Self::DistrictAuthority
                | Self::Milestone
                | Self::RedeemableItem
        )
    }

    /// Columns an owner may change on their own row. Everything else
    /// (status, points, verification) is written by the backend only.
    #[must_use]
    pub const fn owner_writable_columns(self) -> &'static [&'static str] {
        match self {
            Self::User => &["username", "email"],
            Self::Issue => &["title", "description", "category"],
            _ => &[],
        }
    }
}

/// Operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Insert,
    Update,
    Delete,
}

/// Check whether `actor` may perform `action` on a row of `table`.
///
/// `owner_id` is the user that owns the row (`None` for rows without an owner
/// or when the row is not known yet).
pub fn authorize(
    actor: &Actor,
    table: Table,
    action: Action,
    owner_id: Option<&str>,
) -> AppResult<()> {
    if actor.is_backend() {
        return Ok(());
    }

    if action == Action::Read && table.is_public_read() {
        return Ok(());
    }

    let Some(user_id) = actor.user_id() else {
        tracing::debug!(?table, ?action, "Anonymous access denied");
        return Err(AppError::Unauthorized);
    };

    let owns_row = owner_id == Some(user_id);
    let allowed = match action {
        Action::Read => owns_row,
        Action::Update => owns_row && !table.is_owner_immutable(),
        Action::Insert | Action::Delete => false,
    };

    if allowed {
        Ok(())
    } else {
        tracing::debug!(user_id = %user_id, ?table, ?action, "Access denied");
        Err(AppError::Forbidden(format!(
            "{action:?} on {table:?} is not permitted"
        )))
    }
}

/// Check an update touching `columns` of a row owned by `owner_id`.
///
/// Row ownership alone is not enough for a signed-in user: every column must
/// be one the owner is allowed to change.
pub fn authorize_update(
    actor: &Actor,
    table: Table,
    owner_id: Option<&str>,
    columns: &[&str],
) -> AppResult<()> {
    authorize(actor, table, Action::Update, owner_id)?;

    if actor.is_backend() {
        return Ok(());
    }

    let writable = table.owner_writable_columns();
    match columns.iter().copied().find(|c| !writable.contains(c)) {
        None => Ok(()),
        Some(column) => {
            tracing::debug!(?table, column = %column, "Owner update of protected column denied");
            Err(AppError::Forbidden(format!(
                "{column} on {table:?} can only be changed by the backend"
            )))
        }
    }
}
