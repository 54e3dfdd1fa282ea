//! Transactional operations over the grading core.
//!
//! Each service is a unit struct with associated async functions. They read
//! the stored facts, ask the `grading` crate what may happen, and write the
//! result back inside a single transaction. Time always comes from a
//! [`util::clock::Clock`].

pub mod content_rules;
pub mod content_service;
pub mod error;
pub mod gradebook_service;
pub mod grading_service;
pub mod requests;
pub mod submission_service;

#[cfg(test)]
mod fixtures;

pub use content_service::ContentService;
pub use error::{ServiceError, ServiceResult};
pub use gradebook_service::GradebookService;
pub use grading_service::GradingService;
pub use submission_service::SubmissionService;

use chrono::{DateTime, Utc};
use db::models::submission;
use grading::{Action, TransitionContext};
use sea_orm::ConnectionTrait;
use std::path::Path;
use util::grading_options::GradingOptions;

/// Grading options from the path configured in `GRADING_OPTIONS_PATH`.
pub fn load_grading_options() -> ServiceResult<GradingOptions> {
    GradingOptions::load().map_err(ServiceError::Config)
}

pub fn load_grading_options_from(path: impl AsRef<Path>) -> ServiceResult<GradingOptions> {
    GradingOptions::load_from(path).map_err(ServiceError::Config)
}

/// Runs `action` through the state machine and writes the outcome, guarded by
/// the state it was computed from.
pub(crate) async fn apply_transition<C: ConnectionTrait>(
    db: &C,
    current: &submission::Model,
    action: &Action,
    ctx: &TransitionContext,
    now: DateTime<Utc>,
) -> ServiceResult<submission::Model> {
    let outcome = grading::transition(current.state, action, ctx)?;
    let updated = submission::Model::transition_state(db, current.id, &outcome, now)
        .await?
        .ok_or_else(|| {
            ServiceError::Conflict(format!(
                "Submission {} changed while it was being updated",
                current.id
            ))
        })?;

    tracing::info!(
        submission_id = current.id,
        from = %outcome.from,
        to = %outcome.to,
        attempt = outcome.attempt_number,
        actor = %ctx.actor,
        "Submission state changed"
    );
    Ok(updated)
}
