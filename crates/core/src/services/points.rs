//! Points ledger capability.
//!
//! The rewards system owns point balances. Services only need to move a
//! balance up or down, so they depend on this trait instead of the rewards
//! implementation.

use async_trait::async_trait;
use failstate_common::config::PointsConfig;
use failstate_db::repositories::UserRepository;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a points ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger cannot be reached or is switched off.
    #[error("Points ledger unavailable")]
    Unavailable,

    /// The ledger has no balance for this user.
    #[error("No point balance for user: {0}")]
    UserNotFound(String),

    /// The underlying store failed.
    #[error("Points ledger store error: {0}")]
    Database(String),
}

/// Trait for adjusting user point balances.
#[async_trait]
pub trait PointsLedger: Send + Sync {
    /// Add `delta` (negative to deduct) to a user's balance.
    async fn adjust_points(&self, user_id: &str, delta: i32) -> Result<(), LedgerError>;
}

/// Ledger writing straight to the `user.points` column.
#[derive(Clone)]
pub struct DatabasePointsLedger {
    user_repo: UserRepository,
}

impl DatabasePointsLedger {
    /// Create a ledger over the user table.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl PointsLedger for DatabasePointsLedger {
    async fn adjust_points(&self, user_id: &str, delta: i32) -> Result<(), LedgerError> {
        let touched = self
            .user_repo
            .adjust_points(user_id, delta)
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        if touched == 0 {
            return Err(LedgerError::UserNotFound(user_id.to_string()));
        }

        tracing::debug!(user_id = %user_id, delta, "Adjusted point balance");
        Ok(())
    }
}

/// Ledger used when the rewards system is disabled. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePointsLedger;

#[async_trait]
impl PointsLedger for UnavailablePointsLedger {
    async fn adjust_points(&self, _user_id: &str, _delta: i32) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable)
    }
}

/// Type alias for a shared points ledger.
pub type PointsLedgerService = Arc<dyn PointsLedger>;

/// Build the ledger selected by configuration.
#[must_use]
pub fn ledger_from_config(config: &PointsConfig, db: Arc<DatabaseConnection>) -> PointsLedgerService {
    if config.enabled {
        Arc::new(DatabasePointsLedger::new(UserRepository::new(db)))
    } else {
        tracing::info!("Points ledger disabled; deductions will be recorded but not applied");
        Arc::new(UnavailablePointsLedger)
    }
}
