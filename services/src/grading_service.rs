use crate::apply_transition;
use crate::content_rules::ContentRules;
use crate::error::{ServiceError, ServiceResult};
use crate::requests::GradeRequest;
use crate::submission_service::load_submission;
use chrono::{DateTime, Utc};
use db::models::grade_record::{self, NewGrade};
use db::models::submission;
use grading::autograde::autograde;
use grading::gradebook::select_attempt;
use grading::types::{Actor, QuestionScore, SubmissionState};
use grading::{
    Action, GradingError, LatePenalty, PolicyKind, ScoreBreakdown, ScoreInput, ScoringPolicy,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use serde::Serialize;
use util::clock::Clock;
use util::grading_options::GradingOptions;
use validator::Validate;

pub struct GradingService;

/// A submission together with the grade just written for its current attempt.
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub submission: submission::Model,
    pub grade: grade_record::Model,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone)]
pub enum AutogradeOutcome {
    /// Every question was auto-graded and the grade is recorded.
    Graded(GradedSubmission),
    /// Some questions need a grader. The submission is left under review with
    /// the auto-graded part of the scores.
    NeedsReview {
        submission: submission::Model,
        scores: Vec<QuestionScore>,
    },
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, DbErr> {
    serde_json::to_value(value).map_err(|e| DbErr::Json(e.to_string()))
}

impl GradingService {
    pub async fn resolve_policy(
        db: &DatabaseConnection,
        options: &GradingOptions,
        content_id: i64,
    ) -> ServiceResult<ScoringPolicy> {
        let rules = ContentRules::load(db, content_id, options).await?;
        rules.policy(db).await
    }

    /// Scores the current attempt and marks the submission graded.
    ///
    /// Submitted and late work is opened for review first. Grading an already
    /// graded attempt replaces its grade.
    pub async fn record_grade(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
        req: GradeRequest,
    ) -> ServiceResult<GradedSubmission> {
        req.validate()?;
        let now = clock.now();
        let txn = db.begin().await?;

        let (current, rules) = load_submission(&txn, submission_id, options).await?;
        let policy = rules.policy(&txn).await?;
        let graded = Self::grade_in_txn(&txn, now, options, current, &rules, &policy, req).await?;

        txn.commit().await?;
        Ok(graded)
    }

    /// Grades a quiz submission from its stored answers.
    ///
    /// Answers are read from the `answers` key of the submission content, or
    /// from the content itself when that key is absent.
    pub async fn autograde_quiz(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        submission_id: i64,
    ) -> ServiceResult<AutogradeOutcome> {
        let now = clock.now();
        let txn = db.begin().await?;

        let (current, rules) = load_submission(&txn, submission_id, options).await?;
        if !current.state.is_awaiting_grade() {
            return Err(GradingError::InvalidStateTransition {
                from: current.state,
                to: SubmissionState::Graded,
            }
            .into());
        }
        let policy = rules.policy(&txn).await?;
        let PolicyKind::QuestionRules(question_rules) = &policy.kind else {
            return Err(GradingError::ScoreInputMismatch {
                expected: policy.kind.name(),
            }
            .into());
        };

        let answers = current.content.get("answers").unwrap_or(&current.content);
        let scores = autograde(question_rules, answers);

        if question_rules.iter().any(|r| !r.auto_graded) {
            let submission =
                Self::open_if_waiting(&txn, now, options, current, &rules, Actor::System).await?;
            txn.commit().await?;
            tracing::info!(
                submission_id,
                auto_graded = scores.len(),
                "Quiz has manual questions, left for review"
            );
            return Ok(AutogradeOutcome::NeedsReview { submission, scores });
        }

        let req = GradeRequest {
            input: ScoreInput::Questions(scores),
            feedback: None,
            grader_id: None,
        };
        let graded = Self::grade_in_txn(&txn, now, options, current, &rules, &policy, req).await?;

        txn.commit().await?;
        Ok(AutogradeOutcome::Graded(graded))
    }

    /// The grade that counts for the submission under the configured policy.
    pub async fn effective_grade(
        db: &DatabaseConnection,
        options: &GradingOptions,
        submission_id: i64,
    ) -> ServiceResult<Option<grade_record::Model>> {
        if submission::Model::find_by_id(db, submission_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Submission {submission_id}")));
        }
        let records = grade_record::Model::find_by_submission(db, submission_id).await?;
        Ok(pick_counted(options, records)?)
    }

    async fn open_if_waiting<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
        options: &GradingOptions,
        current: submission::Model,
        rules: &ContentRules,
        actor: Actor,
    ) -> ServiceResult<submission::Model> {
        if !matches!(current.state, SubmissionState::Submitted | SubmissionState::Late) {
            return Ok(current);
        }
        let ctx = rules.transition_context(actor, now, current.attempt(), options);
        apply_transition(db, &current, &Action::OpenForReview, &ctx, now).await
    }

    async fn grade_in_txn<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
        options: &GradingOptions,
        current: submission::Model,
        rules: &ContentRules,
        policy: &ScoringPolicy,
        req: GradeRequest,
    ) -> ServiceResult<GradedSubmission> {
        let actor = if req.grader_id.is_some() {
            Actor::Grader
        } else {
            Actor::System
        };

        let late = LatePenalty::new(rules.late_penalty, current.late_days());
        let breakdown = grading::compute(policy, &req.input, late, &options.grade_scale)?;

        let current = Self::open_if_waiting(db, now, options, current, rules, actor).await?;
        let ctx = rules.transition_context(actor, now, current.attempt(), options);
        // Validate the move before the grade is written.
        grading::transition(current.state, &Action::RecordGrade, &ctx)?;

        let (rubric_scores, question_scores) = match &req.input {
            ScoreInput::Raw(_) => (None, None),
            ScoreInput::Criteria(scores) => (Some(to_json(scores)?), None),
            ScoreInput::Questions(scores) => (None, Some(to_json(scores)?)),
        };

        let grade = grade_record::Model::upsert(
            db,
            NewGrade {
                submission_id: current.id,
                attempt_number: current.attempt(),
                breakdown: &breakdown,
                feedback: req.feedback,
                rubric_scores,
                question_scores,
                grader_id: req.grader_id,
            },
            now,
        )
        .await?;

        let submission = apply_transition(db, &current, &Action::RecordGrade, &ctx, now).await?;

        tracing::info!(
            submission_id = submission.id,
            attempt = grade.attempt_number,
            final_score = %breakdown.final_score,
            max_score = %breakdown.max_score,
            grade = %breakdown.grade,
            "Grade recorded"
        );

        Ok(GradedSubmission {
            submission,
            grade,
            breakdown,
        })
    }
}

/// Picks the counted grade record by the configured grading policy.
pub(crate) fn pick_counted(
    options: &GradingOptions,
    records: Vec<grade_record::Model>,
) -> Result<Option<grade_record::Model>, DbErr> {
    let scores = records
        .iter()
        .map(|r| r.to_attempt_score())
        .collect::<Result<Vec<_>, _>>()?;
    let Some(chosen) = select_attempt(options.grading_policy, &scores) else {
        return Ok(None);
    };
    let attempt = chosen.attempt_number as i32;
    Ok(records.into_iter().find(|r| r.attempt_number == attempt))
}
