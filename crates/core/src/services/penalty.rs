//! Penalty service: progressive enforcement against fake submissions.
//!
//! Each rejected issue moves its reporter one step up the tier ladder
//! ([`PenaltyTier`]). The issue update, the optional suspension and the
//! penalty record are written in one transaction. Point deductions go through
//! the [`PointsLedger`](super::points::PointsLedger) only after commit and
//! never fail the operation.
//!
//! Two rejections of the same user processed concurrently can read the same
//! count and land on the same tier. Callers that need strict ordering must
//! serialize rejections per user.

use std::sync::Arc;

use chrono::Utc;
use failstate_common::{AppError, AppResult, IdGenerator};
use failstate_db::{
    entities::{
        issue::{self, VerificationStatus},
        moderation_action::{self, ModerationActionKind},
        user::{self, AccountStatus},
        user_penalty::{self, PenaltyTier},
    },
    repositories::{IssueRepository, ModerationActionRepository, PenaltyRepository, UserRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::points::PointsLedgerService;
use crate::policy::{Action, Actor, Table, authorize, authorize_update};

/// Largest page returned by listing operations.
const MAX_PAGE_SIZE: u64 = 500;

/// Points returned to a reporter whose rejection is overturned.
pub const OVERRIDE_BONUS_POINTS: i32 = 15;

/// Verdict categories produced by submission verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NsfwContentDetected,
    ScreenshotOrMemeDetected,
    NotGenuineCivicIssue,
}

impl RejectionReason {
    /// Pick the reason for a failed verification. NSFW wins over screenshot.
    #[must_use]
    pub const fn classify(is_nsfw: bool, is_screenshot: bool) -> Self {
        if is_nsfw {
            Self::NsfwContentDetected
        } else if is_screenshot {
            Self::ScreenshotOrMemeDetected
        } else {
            Self::NotGenuineCivicIssue
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NsfwContentDetected => "nsfw_content_detected",
            Self::ScreenshotOrMemeDetected => "screenshot_or_meme_detected",
            Self::NotGenuineCivicIssue => "not_genuine_civic_issue",
        }
    }
}

/// Input for applying a fake-submission penalty.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyPenaltyInput {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub issue_id: String,
    #[validate(length(min = 1, max = 256))]
    pub rejection_reason: String,
    #[validate(length(max = 4000))]
    #[serde(default)]
    pub ai_reasoning: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence_score: f64,
}

/// Outcome of a penalty evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PenaltyResult {
    /// Tier reached by this rejection.
    pub penalty_applied: PenaltyTier,
    /// 1-based ordinal of this rejection among the user's rejected issues.
    pub rejection_count: u32,
    /// Points the tier calls for.
    pub points_deducted: i32,
    /// Points actually removed by the ledger during this call.
    pub points_deducted_this_call: i32,
    /// Balance after the call; 0 if it could not be read.
    pub current_points: i32,
    pub account_status: AccountStatus,
    pub message: String,
}

/// Outcome of overturning a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideResult {
    pub issue_id: String,
    pub user_id: String,
    /// Bonus actually credited; 0 if the ledger refused it.
    pub bonus_points_awarded: i32,
}

/// Penalty service.
#[derive(Clone)]
pub struct PenaltyService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    issue_repo: IssueRepository,
    penalty_repo: PenaltyRepository,
    action_repo: ModerationActionRepository,
    ledger: PointsLedgerService,
    id_gen: IdGenerator,
}

impl PenaltyService {
    /// Create a new penalty service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, ledger: PointsLedgerService) -> Self {
        Self {
            user_repo: UserRepository::new(Arc::clone(&db)),
            issue_repo: IssueRepository::new(Arc::clone(&db)),
            penalty_repo: PenaltyRepository::new(Arc::clone(&db)),
            action_repo: ModerationActionRepository::new(Arc::clone(&db)),
            db,
            ledger,
            id_gen: IdGenerator::new(),
        }
    }

    /// Reject an issue and apply the penalty tier its reporter has reached.
    ///
    /// Not idempotent: calling twice for the same issue records two penalties.
    pub async fn apply_fake_submission_penalty(
        &self,
        actor: &Actor,
        input: ApplyPenaltyInput,
    ) -> AppResult<PenaltyResult> {
        authorize(actor, Table::UserPenalty, Action::Insert, Some(&input.user_id))?;
        input.validate()?;

        tracing::debug!(
            user_id = %input.user_id,
            issue_id = %input.issue_id,
            reason = %input.rejection_reason,
            confidence = input.confidence_score,
            "Evaluating fake submission penalty"
        );

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let user = self
            .user_repo
            .find_by_id_in(&txn, &input.user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(input.user_id.clone()))?;

        let issue = self
            .issue_repo
            .find_by_id_in(&txn, &input.issue_id)
            .await?
            .ok_or_else(|| AppError::IssueNotFound(input.issue_id.clone()))?;

        if issue.reported_by != user.id {
            return Err(AppError::BadRequest(format!(
                "Issue {} was not reported by user {}",
                issue.id, user.id
            )));
        }

        let prior = self
            .issue_repo
            .count_rejected_by_reporter_in(&txn, &user.id, &issue.id)
            .await?;
        let rejection_count = u32::try_from(prior).unwrap_or(u32::MAX - 1) + 1;
        let stored_count = i32::try_from(rejection_count).unwrap_or(i32::MAX);
        let tier = PenaltyTier::for_rejection_count(rejection_count);
        let now = Utc::now();

        let mut issue_update: issue::ActiveModel = issue.into();
        issue_update.verification_status = Set(VerificationStatus::Rejected);
        issue_update.rejection_reason = Set(Some(input.rejection_reason.clone()));
        issue_update.rejection_count = Set(stored_count);
        issue_update.last_rejection_at = Set(Some(now.into()));
        issue_update.updated_at = Set(Some(now.into()));
        let issue = self.issue_repo.update_in(&txn, issue_update).await?;

        let mut account_status = user.account_status;
        if tier.suspends_account() {
            let mut user_update: user::ActiveModel = user.into();
            user_update.account_status = Set(AccountStatus::Suspended);
            user_update.ban_reason = Set(Some(format!(
                "Suspended after {rejection_count} rejected submissions (latest: {})",
                input.rejection_reason
            )));
            user_update.updated_at = Set(Some(now.into()));
            account_status = self.user_repo.update_in(&txn, user_update).await?.account_status;
        }

        let reason = if input.ai_reasoning.is_empty() {
            input.rejection_reason.clone()
        } else {
            input.ai_reasoning.clone()
        };

        let record = user_penalty::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(input.user_id.clone()),
            issue_id: Set(Some(issue.id.clone())),
            penalty_type: Set(tier),
            points_deducted: Set(tier.points_deducted()),
            reason: Set(reason),
            rejection_count: Set(stored_count),
            created_at: Set(now.into()),
        };
        self.penalty_repo.create_in(&txn, record).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            user_id = %input.user_id,
            issue_id = %issue.id,
            rejection_count,
            tier = tier.as_str(),
            "Applied fake submission penalty"
        );
        if tier.suspends_account() {
            tracing::info!(user_id = %input.user_id, "Account suspended");
        }

        let points_deducted_this_call = self.deduct_points(&input.user_id, tier).await;

        let current_points = match self.user_repo.get_points(&input.user_id).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(user_id = %input.user_id, error = %e, "Failed to read point balance");
                0
            }
        };

        Ok(PenaltyResult {
            penalty_applied: tier,
            rejection_count,
            points_deducted: tier.points_deducted(),
            points_deducted_this_call,
            current_points,
            account_status,
            message: tier.message().to_string(),
        })
    }

    /// Forward the tier's deduction to the ledger. Returns what was removed.
    async fn deduct_points(&self, user_id: &str, tier: PenaltyTier) -> i32 {
        let points = tier.points_deducted();
        if points == 0 {
            return 0;
        }

        match self.ledger.adjust_points(user_id, -points).await {
            Ok(()) => points,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    points,
                    error = %e,
                    "Points ledger rejected deduction; penalty kept without it"
                );
                0
            }
        }
    }

    /// Overturn a rejection: the issue goes back to verified and its reporter
    /// gets [`OVERRIDE_BONUS_POINTS`]. Penalty records already written stay.
    pub async fn override_rejection(
        &self,
        actor: &Actor,
        issue_id: &str,
        reason: &str,
    ) -> AppResult<OverrideResult> {
        authorize_update(
            actor,
            Table::Issue,
            None,
            &["verification_status", "rejection_reason"],
        )?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::BadRequest("Override reason is required".to_string()));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let issue = self
            .issue_repo
            .find_by_id_in(&txn, issue_id)
            .await?
            .ok_or_else(|| AppError::IssueNotFound(issue_id.to_string()))?;

        if issue.verification_status != VerificationStatus::Rejected {
            return Err(AppError::BadRequest(format!(
                "Issue {issue_id} is not rejected"
            )));
        }

        let user_id = issue.reported_by.clone();
        let now = Utc::now();

        let mut issue_update: issue::ActiveModel = issue.into();
        issue_update.verification_status = Set(VerificationStatus::Verified);
        issue_update.rejection_reason = Set(None);
        issue_update.updated_at = Set(Some(now.into()));
        self.issue_repo.update_in(&txn, issue_update).await?;

        let action = moderation_action::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.clone()),
            issue_id: Set(Some(issue_id.to_string())),
            action: Set(ModerationActionKind::RejectionOverridden),
            performed_by: Set(actor.label().to_string()),
            reason: Set(reason.to_string()),
            created_at: Set(now.into()),
        };
        self.action_repo.create_in(&txn, action).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(issue_id = %issue_id, user_id = %user_id, by = %actor.label(), "Overrode rejection");

        let bonus_points_awarded = match self
            .ledger
            .adjust_points(&user_id, OVERRIDE_BONUS_POINTS)
            .await
        {
            Ok(()) => OVERRIDE_BONUS_POINTS,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Points ledger rejected override bonus");
                0
            }
        };

        Ok(OverrideResult {
            issue_id: issue_id.to_string(),
            user_id,
            bonus_points_awarded,
        })
    }

    /// List rejected issues, newest rejection first.
    pub async fn list_rejected_issues(
        &self,
        actor: &Actor,
        reason: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<issue::Model>> {
        authorize(actor, Table::Issue, Action::Read, None)?;
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        self.issue_repo.find_rejected(reason, limit, offset).await
    }

    /// Get a user's penalty records, newest first.
    pub async fn penalty_history(
        &self,
        actor: &Actor,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user_penalty::Model>> {
        authorize(actor, Table::UserPenalty, Action::Read, Some(user_id))?;
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        self.penalty_repo.find_by_user(user_id, limit).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::points::{LedgerError, PointsLedger, UnavailablePointsLedger};
    use async_trait::async_trait;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, Value};
    use std::sync::Mutex;

    /// Ledger that records every call.
    #[derive(Default)]
    struct RecordingLedger {
        calls: Mutex<Vec<(String, i32)>>,
    }

    #[async_trait]
    impl PointsLedger for RecordingLedger {
        async fn adjust_points(&self, user_id: &str, delta: i32) -> Result<(), LedgerError> {
            self.calls.lock().unwrap().push((user_id.to_string(), delta));
            Ok(())
        }
    }

    fn create_test_user(id: &str, points: i32, status: AccountStatus) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            email: format!("{id}@example.com"),
            points,
            account_status: status,
            ban_reason: None,
            is_admin: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_issue(id: &str, reporter: &str, status: VerificationStatus) -> issue::Model {
        issue::Model {
            id: id.to_string(),
            reported_by: reporter.to_string(),
            title: "Pothole on Main St".to_string(),
            description: "Large pothole near the crossing".to_string(),
            category: "roads".to_string(),
            verification_status: status,
            rejection_reason: None,
            rejection_count: 0,
            last_rejection_at: None,
            reported_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_penalty(user_id: &str, count: u32) -> user_penalty::Model {
        let tier = PenaltyTier::for_rejection_count(count);
        user_penalty::Model {
            id: format!("penalty{count}"),
            user_id: user_id.to_string(),
            issue_id: Some("issue1".to_string()),
            penalty_type: tier,
            points_deducted: tier.points_deducted(),
            reason: "Image is a meme".to_string(),
            rejection_count: count as i32,
            created_at: Utc::now().into(),
        }
    }

    fn transaction_log(db: Arc<DatabaseConnection>) -> Vec<String> {
        Arc::try_unwrap(db)
            .ok()
            .unwrap()
            .into_transaction_log()
            .iter()
            .flat_map(|t| t.statements().iter().map(|s| s.sql.clone()).collect::<Vec<_>>())
            .collect()
    }

    fn create_test_action(kind: ModerationActionKind) -> moderation_action::Model {
        moderation_action::Model {
            id: "action1".to_string(),
            user_id: "user1".to_string(),
            issue_id: Some("issue1".to_string()),
            action: kind,
            performed_by: "backend".to_string(),
            reason: "Photo is genuine".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        maplit::btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    fn input() -> ApplyPenaltyInput {
        ApplyPenaltyInput {
            user_id: "user1".to_string(),
            issue_id: "issue1".to_string(),
            rejection_reason: RejectionReason::ScreenshotOrMemeDetected.as_str().to_string(),
            ai_reasoning: "Image is a meme".to_string(),
            confidence_score: 0.93,
        }
    }

    /// Queue the rows one full evaluation reads, given `prior` earlier rejections.
    fn append_evaluation(
        mut mock: MockDatabase,
        prior: i64,
        balance_after: Option<i32>,
    ) -> MockDatabase {
        let count = u32::try_from(prior).unwrap() + 1;
        let tier = PenaltyTier::for_rejection_count(count);
        let user = create_test_user("user1", 100, AccountStatus::Active);
        let mut rejected = create_test_issue("issue1", "user1", VerificationStatus::Rejected);
        rejected.rejection_count = count as i32;

        mock = mock
            .append_query_results([[user.clone()]])
            .append_query_results([[create_test_issue("issue1", "user1", VerificationStatus::Pending)]])
            .append_query_results([[count_row(prior)]])
            .append_query_results([[rejected]]);

        if tier.suspends_account() {
            let mut suspended = user.clone();
            suspended.account_status = AccountStatus::Suspended;
            mock = mock.append_query_results([[suspended]]);
        }

        mock = mock.append_query_results([[create_test_penalty("user1", count)]]);

        if let Some(points) = balance_after {
            let mut after = user;
            after.points = points;
            mock = mock.append_query_results([[after]]);
        }

        mock
    }

    fn evaluation_db(prior: i64, balance_after: Option<i32>) -> Arc<DatabaseConnection> {
        let mock = append_evaluation(
            MockDatabase::new(DatabaseBackend::Postgres),
            prior,
            balance_after,
        );
        Arc::new(mock.into_connection())
    }

    #[test]
    fn test_classify_rejection_reason() {
        assert_eq!(
            RejectionReason::classify(true, true),
            RejectionReason::NsfwContentDetected
        );
        assert_eq!(
            RejectionReason::classify(false, true),
            RejectionReason::ScreenshotOrMemeDetected
        );
        assert_eq!(
            RejectionReason::classify(false, false).as_str(),
            "not_genuine_civic_issue"
        );
    }

    #[test]
    fn test_input_validation() {
        assert!(input().validate().is_ok());

        let mut bad = input();
        bad.confidence_score = 1.5;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.rejection_reason = String::new();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.ai_reasoning = "x".repeat(4001);
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn test_first_rejection_is_first_warning() {
        let ledger = Arc::new(RecordingLedger::default());
        let service = PenaltyService::new(evaluation_db(0, Some(100)), ledger.clone());

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await
            .unwrap();

        assert_eq!(result.penalty_applied, PenaltyTier::FirstWarning);
        assert_eq!(result.rejection_count, 1);
        assert_eq!(result.points_deducted, 0);
        assert_eq!(result.points_deducted_this_call, 0);
        assert_eq!(result.current_points, 100);
        assert_eq!(result.account_status, AccountStatus::Active);
        assert!(ledger.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_third_rejection_deducts_ten_points() {
        let ledger = Arc::new(RecordingLedger::default());
        let service = PenaltyService::new(evaluation_db(2, Some(90)), ledger.clone());

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await
            .unwrap();

        assert_eq!(result.penalty_applied, PenaltyTier::PointsDeduction);
        assert_eq!(result.points_deducted, 10);
        assert_eq!(result.points_deducted_this_call, 10);
        assert_eq!(result.current_points, 90);
        assert_eq!(
            *ledger.calls.lock().unwrap(),
            vec![("user1".to_string(), -10)]
        );
    }

    #[tokio::test]
    async fn test_fifth_rejection_suspends_account() {
        let ledger = Arc::new(RecordingLedger::default());
        let service = PenaltyService::new(evaluation_db(4, Some(50)), ledger.clone());

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await
            .unwrap();

        assert_eq!(result.penalty_applied, PenaltyTier::AccountSuspended);
        assert_eq!(result.rejection_count, 5);
        assert_eq!(result.points_deducted, 50);
        assert_eq!(result.account_status, AccountStatus::Suspended);
        assert_eq!(
            *ledger.calls.lock().unwrap(),
            vec![("user1".to_string(), -50)]
        );
    }

    #[tokio::test]
    async fn test_ledger_failure_keeps_penalty() {
        let service = PenaltyService::new(evaluation_db(3, Some(100)), Arc::new(UnavailablePointsLedger));

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await
            .unwrap();

        assert_eq!(result.penalty_applied, PenaltyTier::SeverePenalty);
        assert_eq!(result.points_deducted, 25);
        assert_eq!(result.points_deducted_this_call, 0);
        assert_eq!(result.current_points, 100);
    }

    #[tokio::test]
    async fn test_unreadable_balance_reports_zero() {
        let service = PenaltyService::new(
            evaluation_db(0, None),
            Arc::new(RecordingLedger::default()),
        );

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await
            .unwrap();

        assert_eq!(result.current_points, 0);
    }

    #[tokio::test]
    async fn test_repeated_calls_record_each_rejection() {
        let mock = MockDatabase::new(DatabaseBackend::Postgres);
        let mock = append_evaluation(mock, 0, Some(100));
        let mock = append_evaluation(mock, 1, Some(100));
        let db = Arc::new(mock.into_connection());
        let service = PenaltyService::new(db.clone(), Arc::new(RecordingLedger::default()));

        let first = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await
            .unwrap();
        let second = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await
            .unwrap();

        assert_eq!(first.penalty_applied, PenaltyTier::FirstWarning);
        assert_eq!(second.penalty_applied, PenaltyTier::SecondWarning);

        drop(service);
        let inserts = transaction_log(db)
            .iter()
            .filter(|sql| sql.starts_with("INSERT INTO \"user_penalty\""))
            .count();
        assert_eq!(inserts, 2);
    }

    #[tokio::test]
    async fn test_failed_penalty_insert_rolls_back() {
        let user = create_test_user("user1", 100, AccountStatus::Active);
        let mut suspended = user.clone();
        suspended.account_status = AccountStatus::Suspended;
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[create_test_issue("issue1", "user1", VerificationStatus::Pending)]])
                .append_query_results([[count_row(4)]])
                .append_query_results([[create_test_issue("issue1", "user1", VerificationStatus::Rejected)]])
                .append_query_results([[suspended]])
                .append_query_errors([DbErr::Custom("insert failed".to_string())])
                .into_connection(),
        );
        let ledger = Arc::new(RecordingLedger::default());
        let service = PenaltyService::new(db.clone(), ledger.clone());

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(ledger.calls.lock().unwrap().is_empty());

        drop(service);
        let log = transaction_log(db);
        assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!log.iter().any(|sql| sql == "COMMIT"));
    }

    #[tokio::test]
    async fn test_override_rejection_restores_issue_and_awards_bonus() {
        let mut rejected = create_test_issue("issue1", "user1", VerificationStatus::Rejected);
        rejected.rejection_reason = Some("screenshot_or_meme_detected".to_string());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[rejected]])
                .append_query_results([[create_test_issue("issue1", "user1", VerificationStatus::Verified)]])
                .append_query_results([[create_test_action(ModerationActionKind::RejectionOverridden)]])
                .into_connection(),
        );
        let ledger = Arc::new(RecordingLedger::default());
        let service = PenaltyService::new(db.clone(), ledger.clone());

        let result = service
            .override_rejection(&Actor::Backend, "issue1", "Photo is genuine")
            .await
            .unwrap();

        assert_eq!(result.user_id, "user1");
        assert_eq!(result.bonus_points_awarded, OVERRIDE_BONUS_POINTS);
        assert_eq!(
            *ledger.calls.lock().unwrap(),
            vec![("user1".to_string(), 15)]
        );

        drop(service);
        let log = transaction_log(db);
        assert!(log.iter().any(|sql| sql.starts_with("UPDATE \"issue\"")));
        assert!(log.iter().any(|sql| sql.starts_with("INSERT INTO \"moderation_action\"")));
        assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_override_keeps_result_when_ledger_fails() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_issue("issue1", "user1", VerificationStatus::Rejected)]])
                .append_query_results([[create_test_issue("issue1", "user1", VerificationStatus::Verified)]])
                .append_query_results([[create_test_action(ModerationActionKind::RejectionOverridden)]])
                .into_connection(),
        );
        let service = PenaltyService::new(db, Arc::new(UnavailablePointsLedger));

        let result = service
            .override_rejection(&Actor::Backend, "issue1", "Photo is genuine")
            .await
            .unwrap();

        assert_eq!(result.bonus_points_awarded, 0);
    }

    #[tokio::test]
    async fn test_override_requires_rejected_issue() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_issue("issue1", "user1", VerificationStatus::Verified)]])
                .into_connection(),
        );
        let ledger = Arc::new(RecordingLedger::default());
        let service = PenaltyService::new(db, ledger.clone());

        let result = service
            .override_rejection(&Actor::Backend, "issue1", "Photo is genuine")
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(ledger.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reporter_cannot_override_own_rejection() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = PenaltyService::new(db, Arc::new(RecordingLedger::default()));

        let result = service
            .override_rejection(&Actor::User("user1".to_string()), "issue1", "It is real")
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let blank = service.override_rejection(&Actor::Backend, "issue1", "  ").await;
        assert!(matches!(blank, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let ledger = Arc::new(RecordingLedger::default());
        let service = PenaltyService::new(db, ledger.clone());

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await;

        match result {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "user1"),
            other => panic!("Expected UserNotFound error, got {other:?}"),
        }
        assert!(ledger.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_issue_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("user1", 100, AccountStatus::Active)]])
                .append_query_results([Vec::<issue::Model>::new()])
                .into_connection(),
        );
        let service = PenaltyService::new(db, Arc::new(RecordingLedger::default()));

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await;

        assert!(matches!(result, Err(AppError::IssueNotFound(id)) if id == "issue1"));
    }

    #[tokio::test]
    async fn test_issue_of_other_user_is_rejected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("user1", 100, AccountStatus::Active)]])
                .append_query_results([[create_test_issue("issue1", "user2", VerificationStatus::Pending)]])
                .into_connection(),
        );
        let service = PenaltyService::new(db, Arc::new(RecordingLedger::default()));

        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, input())
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_only_backend_applies_penalties() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = PenaltyService::new(db, Arc::new(RecordingLedger::default()));

        let as_user = service
            .apply_fake_submission_penalty(&Actor::User("user1".to_string()), input())
            .await;
        assert!(matches!(as_user, Err(AppError::Forbidden(_))));

        let anonymous = service
            .apply_fake_submission_penalty(&Actor::Anonymous, input())
            .await;
        assert!(matches!(anonymous, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_queries() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = PenaltyService::new(db, Arc::new(RecordingLedger::default()));

        let mut bad = input();
        bad.user_id = String::new();
        let result = service
            .apply_fake_submission_penalty(&Actor::Backend, bad)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_penalty_history_owner_only() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_penalty("user1", 1), create_test_penalty("user1", 2)]])
                .into_connection(),
        );
        let service = PenaltyService::new(db, Arc::new(RecordingLedger::default()));

        let history = service
            .penalty_history(&Actor::User("user1".to_string()), "user1", 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);

        let other = service
            .penalty_history(&Actor::User("user2".to_string()), "user1", 10)
            .await;
        assert!(matches!(other, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_rejected_issues_is_public() {
        let mut rejected = create_test_issue("issue1", "user1", VerificationStatus::Rejected);
        rejected.rejection_reason = Some("nsfw_content_detected".to_string());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[rejected]])
                .into_connection(),
        );
        let service = PenaltyService::new(db, Arc::new(RecordingLedger::default()));

        let issues = service
            .list_rejected_issues(&Actor::Anonymous, Some("nsfw_content_detected"), 0, 0)
            .await
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].verification_status, VerificationStatus::Rejected);
    }
}
