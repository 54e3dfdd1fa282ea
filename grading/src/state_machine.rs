//! # Submission State Machine
//!
//! Decides whether a submission may move from one [`SubmissionState`] to
//! another. [`transition`] is pure: it receives everything it needs through a
//! [`TransitionContext`] and returns the resulting state together with the
//! fields the caller must persist (attempt number, submit timestamp, late days).
//!
//! Persisting the outcome is the caller's job, and the write must be guarded by
//! the state that was passed in as `current`.

use crate::error::GradingError;
use crate::types::{Actor, SubmissionState};
use chrono::{DateTime, Utc};

/// Maximum length of revision feedback unless configured otherwise.
pub const DEFAULT_FEEDBACK_MAX_CHARS: usize = 1000;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A request to move a submission along its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Submit,
    OpenForReview,
    RecordGrade,
    ReturnForRevision { feedback: String },
    Reopen,
    Lock,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::OpenForReview => "open for review",
            Action::RecordGrade => "record a grade",
            Action::ReturnForRevision { .. } => "return for revision",
            Action::Reopen => "reopen",
            Action::Lock => "lock",
        }
    }

    /// State the action leads to when it is allowed.
    pub fn target(&self) -> SubmissionState {
        match self {
            Action::Submit => SubmissionState::Submitted,
            Action::OpenForReview => SubmissionState::UnderReview,
            Action::RecordGrade => SubmissionState::Graded,
            Action::ReturnForRevision { .. } => SubmissionState::ReturnedForRevision,
            Action::Reopen => SubmissionState::Draft,
            Action::Lock => SubmissionState::Locked,
        }
    }

    fn permits(&self, actor: Actor) -> bool {
        match self {
            Action::Submit => actor == Actor::Student,
            Action::ReturnForRevision { .. } => actor == Actor::Grader,
            Action::OpenForReview | Action::RecordGrade | Action::Lock => {
                matches!(actor, Actor::Grader | Actor::System)
            }
            Action::Reopen => matches!(actor, Actor::Student | Actor::System),
        }
    }
}

/// Facts about the submission and its content needed to judge a transition.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub now: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub attempt_number: u32,
    pub max_attempts: u32,
    pub allow_resubmission: bool,
    /// Result of the publish window check for the parent content.
    pub content_visible: bool,
    pub actor: Actor,
    pub feedback_max_chars: usize,
}

impl TransitionContext {
    /// First attempt of a single-attempt item with no due date.
    pub fn new(actor: Actor, now: DateTime<Utc>) -> Self {
        Self {
            now,
            due_date: None,
            attempt_number: 1,
            max_attempts: 1,
            allow_resubmission: false,
            content_visible: true,
            actor,
            feedback_max_chars: DEFAULT_FEEDBACK_MAX_CHARS,
        }
    }

    pub fn with_due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_attempts(mut self, attempt_number: u32, max_attempts: u32) -> Self {
        self.attempt_number = attempt_number;
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_resubmission(mut self, allowed: bool) -> Self {
        self.allow_resubmission = allowed;
        self
    }

    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.content_visible = visible;
        self
    }

    pub fn with_feedback_limit(mut self, max_chars: usize) -> Self {
        self.feedback_max_chars = max_chars;
        self
    }

    fn attempts_exhausted(&self) -> bool {
        self.attempt_number >= self.max_attempts
    }
}

/// Written once, when a draft is handed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitStamp {
    pub submitted_at: DateTime<Utc>,
    /// `None` when handed in on time.
    pub late_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: SubmissionState,
    pub to: SubmissionState,
    pub attempt_number: u32,
    pub stamp: Option<SubmitStamp>,
}

/// Whole days past the due date, rounded up. Zero or negative lateness is on time.
pub fn late_days(now: DateTime<Utc>, due_date: DateTime<Utc>) -> Option<u32> {
    let late_ms = (now - due_date).num_milliseconds();
    if late_ms <= 0 {
        return None;
    }
    let days = (late_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    Some(u32::try_from(days).unwrap_or(u32::MAX))
}

/// Apply `action` to a submission currently in `current`.
pub fn transition(
    current: SubmissionState,
    action: &Action,
    ctx: &TransitionContext,
) -> Result<TransitionOutcome, GradingError> {
    let to = action.target();
    let invalid = GradingError::InvalidStateTransition { from: current, to };

    let allowed_from = match action {
        Action::Submit => current == SubmissionState::Draft,
        Action::OpenForReview => current.is_awaiting_grade(),
        Action::RecordGrade => matches!(
            current,
            SubmissionState::UnderReview | SubmissionState::Graded
        ),
        Action::ReturnForRevision { .. } => current == SubmissionState::Graded,
        Action::Reopen => current == SubmissionState::ReturnedForRevision,
        Action::Lock => !current.is_terminal(),
    };
    if !allowed_from {
        return Err(invalid);
    }

    if !action.permits(ctx.actor) {
        return Err(GradingError::ActorNotPermitted {
            actor: ctx.actor,
            action: action.name(),
        });
    }

    let mut outcome = TransitionOutcome {
        from: current,
        to,
        attempt_number: ctx.attempt_number,
        stamp: None,
    };

    match action {
        Action::Submit => {
            if !ctx.content_visible {
                return Err(GradingError::ContentNotPublished);
            }
            if ctx.attempt_number > ctx.max_attempts {
                return Err(GradingError::AttemptLimitExceeded {
                    attempt: ctx.attempt_number,
                    max: ctx.max_attempts,
                });
            }
            let late = ctx.due_date.and_then(|due| late_days(ctx.now, due));
            if late.is_some() {
                outcome.to = SubmissionState::Late;
            }
            outcome.stamp = Some(SubmitStamp {
                submitted_at: ctx.now,
                late_days: late,
            });
        }
        Action::ReturnForRevision { feedback } => {
            validate_feedback(feedback, ctx.feedback_max_chars)?;
            if !ctx.allow_resubmission {
                return Err(GradingError::ResubmissionNotAllowed);
            }
            if ctx.attempts_exhausted() {
                return Err(GradingError::AttemptLimitExceeded {
                    attempt: ctx.attempt_number + 1,
                    max: ctx.max_attempts,
                });
            }
        }
        Action::Reopen => {
            if ctx.attempts_exhausted() {
                return Err(GradingError::AttemptLimitExceeded {
                    attempt: ctx.attempt_number + 1,
                    max: ctx.max_attempts,
                });
            }
            outcome.attempt_number = ctx.attempt_number + 1;
        }
        Action::Lock => {
            if !ctx.attempts_exhausted() && ctx.content_visible {
                return Err(invalid);
            }
        }
        Action::OpenForReview | Action::RecordGrade => {}
    }

    Ok(outcome)
}

fn validate_feedback(feedback: &str, max_chars: usize) -> Result<(), GradingError> {
    if feedback.trim().is_empty() {
        return Err(GradingError::InvalidFeedback(
            "feedback is required when returning a submission".into(),
        ));
    }
    let len = feedback.chars().count();
    if len > max_chars {
        return Err(GradingError::InvalidFeedback(format!(
            "feedback is {len} characters, the limit is {max_chars}"
        )));
    }
    Ok(())
}
