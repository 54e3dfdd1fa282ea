use crate::{decimal_text, parse_decimal};
use chrono::{DateTime, Utc};
use grading::gradebook::AttemptScore;
use grading::scorer::ScoreBreakdown;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};

/// Scored outcome of one attempt of a submission.
///
/// Rows are written by grading and updated by re-grading the same attempt.
/// Nothing in this crate deletes them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "grade_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
    pub attempt_number: i32,
    pub raw_score: String,
    pub final_score: String,
    pub max_score: String,
    pub grade: String,
    pub feedback: Option<String>,
    pub rubric_scores: Option<Json>,
    pub question_scores: Option<Json>,
    pub grader_id: Option<i64>,
    pub graded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::submission::Entity",
        from = "Column::SubmissionId",
        to = "super::submission::Column::Id"
    )]
    Submission,
}

impl Related<super::submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Everything needed to write a grade for one attempt.
#[derive(Debug, Clone)]
pub struct NewGrade<'a> {
    pub submission_id: i64,
    pub attempt_number: u32,
    pub breakdown: &'a ScoreBreakdown,
    pub feedback: Option<String>,
    pub rubric_scores: Option<Json>,
    pub question_scores: Option<Json>,
    pub grader_id: Option<i64>,
}

impl Model {
    /// Writes the grade for `(submission_id, attempt_number)`, replacing an
    /// earlier grade for the same attempt.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        grade: NewGrade<'_>,
        now: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let b = grade.breakdown;
        match Self::find_for_attempt(db, grade.submission_id, grade.attempt_number).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.raw_score = Set(decimal_text(b.raw_score));
                active.final_score = Set(decimal_text(b.final_score));
                active.max_score = Set(decimal_text(b.max_score));
                active.grade = Set(b.grade.clone());
                active.feedback = Set(grade.feedback);
                active.rubric_scores = Set(grade.rubric_scores);
                active.question_scores = Set(grade.question_scores);
                active.grader_id = Set(grade.grader_id);
                active.graded_at = Set(now);
                active.updated_at = Set(now);
                active.update(db).await
            }
            None => {
                let active = ActiveModel {
                    submission_id: Set(grade.submission_id),
                    attempt_number: Set(grade.attempt_number as i32),
                    raw_score: Set(decimal_text(b.raw_score)),
                    final_score: Set(decimal_text(b.final_score)),
                    max_score: Set(decimal_text(b.max_score)),
                    grade: Set(b.grade.clone()),
                    feedback: Set(grade.feedback),
                    rubric_scores: Set(grade.rubric_scores),
                    question_scores: Set(grade.question_scores),
                    grader_id: Set(grade.grader_id),
                    graded_at: Set(now),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.insert(db).await
            }
        }
    }

    pub async fn find_for_attempt<C: ConnectionTrait>(
        db: &C,
        submission_id: i64,
        attempt_number: u32,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .filter(Column::AttemptNumber.eq(attempt_number as i32))
            .one(db)
            .await
    }

    /// Replaces the feedback on an attempt's grade, if that attempt was graded.
    pub async fn set_feedback<C: ConnectionTrait>(
        db: &C,
        submission_id: i64,
        attempt_number: u32,
        feedback: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, DbErr> {
        let Some(existing) = Self::find_for_attempt(db, submission_id, attempt_number).await? else {
            return Ok(None);
        };
        let mut active = existing.into_active_model();
        active.feedback = Set(Some(feedback.to_string()));
        active.updated_at = Set(now);
        active.update(db).await.map(Some)
    }

    /// All grades of a submission, oldest attempt first.
    pub async fn find_by_submission<C: ConnectionTrait>(
        db: &C,
        submission_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .order_by_asc(Column::AttemptNumber)
            .all(db)
            .await
    }

    pub fn final_score(&self) -> Result<Decimal, DbErr> {
        parse_decimal("grade_records.final_score", &self.final_score)
    }

    pub fn raw_score(&self) -> Result<Decimal, DbErr> {
        parse_decimal("grade_records.raw_score", &self.raw_score)
    }

    pub fn max_score(&self) -> Result<Decimal, DbErr> {
        parse_decimal("grade_records.max_score", &self.max_score)
    }

    pub fn to_attempt_score(&self) -> Result<AttemptScore, DbErr> {
        Ok(AttemptScore {
            attempt_number: u32::try_from(self.attempt_number).unwrap_or(0),
            final_score: self.final_score()?,
            max_score: self.max_score()?,
        })
    }
}
