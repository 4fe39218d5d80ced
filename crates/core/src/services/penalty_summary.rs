//! Penalty summary service.

use std::sync::Arc;

use failstate_common::AppResult;
use failstate_db::repositories::{PenaltyRepository, PenaltySummary};
use sea_orm::DatabaseConnection;

use crate::policy::{Action, Actor, Table, authorize};

/// Read access to the per-user penalty summary view.
#[derive(Clone)]
pub struct PenaltySummaryService {
    penalty_repo: PenaltyRepository,
}

impl PenaltySummaryService {
    /// Create a new penalty summary service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            penalty_repo: PenaltyRepository::new(db),
        }
    }

    /// Get one user's summary. `None` if the user has never been rejected.
    pub async fn get_for_user(
        &self,
        actor: &Actor,
        user_id: &str,
    ) -> AppResult<Option<PenaltySummary>> {
        authorize(actor, Table::PenaltySummary, Action::Read, Some(user_id))?;
        self.penalty_repo.get_summary(user_id).await
    }

    /// List summaries, most rejections first.
    pub async fn list(
        &self,
        actor: &Actor,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<PenaltySummary>> {
        authorize(actor, Table::PenaltySummary, Action::Read, None)?;
        self.penalty_repo
            .list_summaries(limit.clamp(1, 500), offset)
            .await
    }
}
