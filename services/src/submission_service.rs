use crate::apply_transition;
use crate::content_rules::ContentRules;
use crate::error::{ServiceError, ServiceResult};
use crate::requests::{ReturnForRevisionRequest, SaveDraftRequest};
use db::models::{grade_record, submission};
use grading::types::{Actor, SubmissionState};
use grading::{Action, GradingError};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use util::clock::Clock;
use util::grading_options::GradingOptions;
use validator::Validate;

pub struct SubmissionService;

pub(crate) async fn load_submission<C: ConnectionTrait>(
    db: &C,
    submission_id: i64,
    options: &GradingOptions,
) -> ServiceResult<(submission::Model, ContentRules)> {
    let submission = submission::Model::find_by_id(db, submission_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Submission {submission_id}")))?;
    let rules = ContentRules::load(db, submission.content_id, options).await?;
    Ok((submission, rules))
}

impl SubmissionService {
    /// Creates or updates the student's draft for a content item.
    ///
    /// A submission that was returned for revision is first reopened into a
    /// new draft attempt. A graded or locked submission that used up its
    /// attempts reports the limit. Any other non-draft state is rejected.
    ///
    /// A new row continues the attempt count of soft-deleted ones.
    pub async fn save_draft(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        req: SaveDraftRequest,
    ) -> ServiceResult<submission::Model> {
        req.validate()?;
        let now = clock.now();
        let txn = db.begin().await?;

        let rules = ContentRules::load(&txn, req.content_id, options).await?;
        if !rules.is_visible(now) {
            return Err(GradingError::ContentNotPublished.into());
        }
        let snapshot = if rules.is_group { req.group_snapshot } else { None };

        let existing =
            submission::Model::find_by_parent_and_student(&txn, req.content_id, req.student_id)
                .await?;

        let draft = match existing {
            None => {
                // Attempts used by deleted rows still count against the limit.
                let attempt =
                    submission::Model::max_attempt_for(&txn, req.content_id, req.student_id)
                        .await?
                        .map_or(1, |n| n + 1);
                if attempt > rules.max_attempts {
                    return Err(GradingError::AttemptLimitExceeded {
                        attempt,
                        max: rules.max_attempts,
                    }
                    .into());
                }
                let created = submission::Model::create_draft(
                    &txn,
                    req.content_id,
                    req.student_id,
                    attempt,
                    req.content,
                    snapshot,
                    now,
                )
                .await?;
                tracing::info!(
                    submission_id = created.id,
                    content_id = req.content_id,
                    student_id = req.student_id,
                    attempt,
                    "Draft created"
                );
                created
            }
            Some(current) => {
                let state = current.state;
                let current = match state {
                    SubmissionState::Draft => current,
                    SubmissionState::ReturnedForRevision => {
                        let ctx = rules.transition_context(
                            Actor::System,
                            now,
                            current.attempt(),
                            options,
                        );
                        apply_transition(&txn, &current, &Action::Reopen, &ctx, now).await?
                    }
                    SubmissionState::Graded | SubmissionState::Locked
                        if current.attempt() >= rules.max_attempts =>
                    {
                        return Err(GradingError::AttemptLimitExceeded {
                            attempt: current.attempt() + 1,
                            max: rules.max_attempts,
                        }
                        .into());
                    }
                    other => {
                        return Err(GradingError::InvalidStateTransition {
                            from: other,
                            to: SubmissionState::Draft,
                        }
                        .into());
                    }
                };
                submission::Model::update_draft(&txn, current.id, req.content, snapshot, now)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Conflict(format!(
                            "Submission {} is no longer a draft",
                            current.id
                        ))
                    })?
            }
        };

        txn.commit().await?;
        Ok(draft)
    }

    /// Hands in a draft. Marked `late` with the number of days late when past
    /// the due date.
    pub async fn submit(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
    ) -> ServiceResult<submission::Model> {
        Self::run(db, clock, options, submission_id, Actor::Student, Action::Submit).await
    }

    pub async fn open_for_review(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
    ) -> ServiceResult<submission::Model> {
        Self::run(db, clock, options, submission_id, Actor::Grader, Action::OpenForReview).await
    }

    /// Sends a graded submission back to the student. The feedback is stored
    /// on the grade of the current attempt.
    pub async fn return_for_revision(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
        req: ReturnForRevisionRequest,
    ) -> ServiceResult<submission::Model> {
        req.validate()?;
        let now = clock.now();
        let txn = db.begin().await?;

        let (current, rules) = load_submission(&txn, submission_id, options).await?;
        let ctx = rules.transition_context(Actor::Grader, now, current.attempt(), options);
        let action = Action::ReturnForRevision {
            feedback: req.feedback.clone(),
        };
        let returned = apply_transition(&txn, &current, &action, &ctx, now).await?;

        let attempt = current.attempt();
        let grade =
            grade_record::Model::set_feedback(&txn, submission_id, attempt, &req.feedback, now)
                .await?;
        if grade.is_none() {
            tracing::warn!(
                submission_id,
                attempt,
                "Returned submission has no grade to attach feedback to"
            );
        }

        txn.commit().await?;
        Ok(returned)
    }

    /// Starts the next attempt of a returned submission.
    pub async fn reopen(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
        actor: Actor,
    ) -> ServiceResult<submission::Model> {
        Self::run(db, clock, options, submission_id, actor, Action::Reopen).await
    }

    pub async fn lock(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
        actor: Actor,
    ) -> ServiceResult<submission::Model> {
        Self::run(db, clock, options, submission_id, actor, Action::Lock).await
    }

    /// Locks the submission when nothing more can happen to it: the content is
    /// no longer visible, or the last attempt has been graded.
    ///
    /// Returns `None` when the submission stays open.
    pub async fn lock_if_closed(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
    ) -> ServiceResult<Option<submission::Model>> {
        let now = clock.now();
        let txn = db.begin().await?;

        let (current, rules) = load_submission(&txn, submission_id, options).await?;
        if current.state.is_terminal() {
            return Ok(None);
        }

        let exhausted = current.attempt() >= rules.max_attempts;
        let closed = !rules.is_visible(now)
            || (exhausted && current.state == SubmissionState::Graded);
        if !closed {
            return Ok(None);
        }

        let ctx = rules.transition_context(Actor::System, now, current.attempt(), options);
        let locked = apply_transition(&txn, &current, &Action::Lock, &ctx, now).await?;
        txn.commit().await?;
        Ok(Some(locked))
    }

    /// Hides the submission. Its grade records are kept.
    pub async fn soft_delete(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        submission_id: i64,
    ) -> ServiceResult<()> {
        let txn = db.begin().await?;
        if submission::Model::find_by_id(&txn, submission_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Submission {submission_id}")));
        }
        submission::Model::soft_delete(&txn, submission_id, clock.now()).await?;
        txn.commit().await?;

        tracing::info!(submission_id, "Submission deleted");
        Ok(())
    }

    async fn run(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
        actor: Actor,
        action: Action,
    ) -> ServiceResult<submission::Model> {
        let now = clock.now();
        let txn = db.begin().await?;

        let (current, rules) = load_submission(&txn, submission_id, options).await?;
        let ctx = rules.transition_context(actor, now, current.attempt(), options);
        let updated = apply_transition(&txn, &current, &action, &ctx, now).await?;

        txn.commit().await?;
        Ok(updated)
    }
}
