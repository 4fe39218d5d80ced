//! failstate operator binary.
//!
//! ```text
//! failstate [migrate]
//! failstate summary [limit]
//! failstate reinstate <user_id>
//! failstate suspend <user_id> <reason>
//! failstate reject <issue_id> <reason> [reasoning]
//! failstate override <issue_id> <reason>
//! failstate help [command]
//! ```

use std::sync::Arc;

use anyhow::{Context, bail};
use failstate_common::{AppError, Config};
use failstate_core::{
    AccountService, Actor, ApplyPenaltyInput, PenaltyService, PenaltySummaryService,
    ledger_from_config,
};
use failstate_db::repositories::IssueRepository;
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Confidence recorded for rejections entered by an operator.
const OPERATOR_CONFIDENCE: f64 = 1.0;

const MIGRATE_USAGE: &str = "usage: failstate migrate\n\nApply pending database migrations.";
const SUMMARY_USAGE: &str =
    "usage: failstate summary [limit]\n\nPrint penalty summaries as JSON (default limit 20).";
const REINSTATE_USAGE: &str =
    "usage: failstate reinstate <user_id>\n\nLift a suspension. Rejection history is kept.";
const SUSPEND_USAGE: &str =
    "usage: failstate suspend <user_id> <reason>\n\nSuspend an account by hand.";
const REJECT_USAGE: &str = "usage: failstate reject <issue_id> <reason> [reasoning]\n\n\
Reject an issue and apply the penalty its reporter has reached.";
const OVERRIDE_USAGE: &str = "usage: failstate override <issue_id> <reason>\n\n\
Overturn a rejection and credit the reporter's bonus points.";

fn usage(topic: Option<&str>) -> String {
    match topic {
        Some("migrate") => MIGRATE_USAGE.to_string(),
        Some("summary") => SUMMARY_USAGE.to_string(),
        Some("reinstate") => REINSTATE_USAGE.to_string(),
        Some("suspend") => SUSPEND_USAGE.to_string(),
        Some("reject") => REJECT_USAGE.to_string(),
        Some("override") => OVERRIDE_USAGE.to_string(),
        _ => [
            MIGRATE_USAGE,
            SUMMARY_USAGE,
            REINSTATE_USAGE,
            SUSPEND_USAGE,
            REJECT_USAGE,
            OVERRIDE_USAGE,
        ]
        .iter()
        .filter_map(|u| u.lines().next())
        .collect::<Vec<_>>()
        .join("\n"),
    }
}

fn is_help_flag(arg: &str) -> bool {
    matches!(arg, "--help" | "-h")
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help { topic: Option<String> },
    Migrate,
    Summary { limit: u64 },
    Reinstate { user_id: String },
    Suspend { user_id: String, reason: String },
    Reject {
        issue_id: String,
        reason: String,
        reasoning: String,
    },
    Override { issue_id: String, reason: String },
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    if args.iter().any(|a| is_help_flag(a)) {
        let topic = args.first().filter(|a| !is_help_flag(a)).cloned();
        return Ok(Command::Help { topic });
    }

    match args.first().map(String::as_str) {
        Some("help") => Ok(Command::Help {
            topic: args.get(1).cloned(),
        }),
        None | Some("migrate") => Ok(Command::Migrate),
        Some("summary") => {
            let limit = match args.get(1) {
                Some(raw) => raw.parse().context("summary limit must be a number")?,
                None => 20,
            };
            Ok(Command::Summary { limit })
        }
        Some("reinstate") => match args.get(1) {
            Some(user_id) => Ok(Command::Reinstate {
                user_id: user_id.clone(),
            }),
            None => bail!(REINSTATE_USAGE),
        },
        Some("suspend") => match (args.get(1), args.get(2)) {
            (Some(user_id), Some(reason)) => Ok(Command::Suspend {
                user_id: user_id.clone(),
                reason: reason.clone(),
            }),
            _ => bail!(SUSPEND_USAGE),
        },
        Some("reject") => match (args.get(1), args.get(2)) {
            (Some(issue_id), Some(reason)) => Ok(Command::Reject {
                issue_id: issue_id.clone(),
                reason: reason.clone(),
                reasoning: args.get(3).cloned().unwrap_or_default(),
            }),
            _ => bail!(REJECT_USAGE),
        },
        Some("override") => match (args.get(1), args.get(2)) {
            (Some(issue_id), Some(reason)) => Ok(Command::Override {
                issue_id: issue_id.clone(),
                reason: reason.clone(),
            }),
            _ => bail!(OVERRIDE_USAGE),
        },
        Some(other) => bail!("unknown command: {other}\n\n{}", usage(None)),
    }
}

/// Log a failed command with its error code before it is returned.
fn report_failure(err: &anyhow::Error) {
    match err.downcast_ref::<AppError>() {
        Some(app) if app.is_server_error() => {
            error!(code = app.error_code(), error = %app, "Command failed");
        }
        Some(app) => warn!(code = app.error_code(), error = %app, "Command rejected"),
        None => error!(error = %err, "Command failed"),
    }
}

async fn run(command: Command, config: &Config, db: Arc<DatabaseConnection>) -> anyhow::Result<()> {
    match command {
        Command::Help { .. } | Command::Migrate => {}
        Command::Summary { limit } => {
            let summaries = PenaltySummaryService::new(db)
                .list(&Actor::Backend, limit, 0)
                .await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Reinstate { user_id } => {
            let user = AccountService::new(db)
                .reinstate_user(&Actor::Backend, &user_id)
                .await?;
            info!(user_id = %user.id, "User reinstated");
        }
        Command::Suspend { user_id, reason } => {
            let user = AccountService::new(db)
                .suspend_user(&Actor::Backend, &user_id, &reason)
                .await?;
            info!(user_id = %user.id, "User suspended");
        }
        Command::Reject {
            issue_id,
            reason,
            reasoning,
        } => {
            let issue = IssueRepository::new(db.clone()).get_by_id(&issue_id).await?;
            let ledger = ledger_from_config(&config.points, db.clone());
            let result = PenaltyService::new(db, ledger)
                .apply_fake_submission_penalty(
                    &Actor::Backend,
                    ApplyPenaltyInput {
                        user_id: issue.reported_by,
                        issue_id,
                        rejection_reason: reason,
                        ai_reasoning: reasoning,
                        confidence_score: OPERATOR_CONFIDENCE,
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Override { issue_id, reason } => {
            let ledger = ledger_from_config(&config.points, db.clone());
            let result = PenaltyService::new(db, ledger)
                .override_rejection(&Actor::Backend, &issue_id, &reason)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "failstate=debug".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    if let Command::Help { topic } = &command {
        println!("{}", usage(topic.as_deref()));
        return Ok(());
    }

    let config = Config::load()?;

    let db = failstate_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    failstate_db::migrate(&db).await?;
    info!("Migrations completed");

    let result = run(command, &config, Arc::new(db)).await;
    if let Err(e) = &result {
        report_failure(e);
    }
    result
}
