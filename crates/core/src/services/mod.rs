//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod penalty;
pub mod penalty_summary;
pub mod points;

pub use account::AccountService;
pub use penalty::{
    ApplyPenaltyInput, OVERRIDE_BONUS_POINTS, OverrideResult, PenaltyResult, PenaltyService,
    RejectionReason,
};
pub use penalty_summary::PenaltySummaryService;
pub use points::{
    DatabasePointsLedger, LedgerError, PointsLedger, PointsLedgerService,
    UnavailablePointsLedger, ledger_from_config,
};
