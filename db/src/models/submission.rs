use chrono::{DateTime, Utc};
use grading::state_machine::TransitionOutcome;
use grading::types::SubmissionState;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ConnectionTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};

/// A student's work on one content item.
///
/// There is one live row per (content, student). Each revision cycle bumps
/// `attempt_number` on the same row; grades per attempt live in
/// `grade_records`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub content_id: i64,
    pub student_id: i64,
    pub state: SubmissionState,
    pub attempt_number: i32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub late_days: Option<i32>,
    /// Opaque payload; quizzes keep their answers under `answers`.
    pub content: Json,
    /// Group membership captured at submission time.
    pub group_snapshot: Option<Json>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::module_content::Entity",
        from = "Column::ContentId",
        to = "super::module_content::Column::Id"
    )]
    Content,
    #[sea_orm(has_many = "super::grade_record::Entity")]
    GradeRecords,
}

impl Related<super::module_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Content.def()
    }
}

impl Related<super::grade_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GradeRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creates a new live draft for a student at `attempt_number`.
    pub async fn create_draft<C: ConnectionTrait>(
        db: &C,
        content_id: i64,
        student_id: i64,
        attempt_number: u32,
        content: Json,
        group_snapshot: Option<Json>,
        now: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let active = ActiveModel {
            content_id: Set(content_id),
            student_id: Set(student_id),
            state: Set(SubmissionState::Draft),
            attempt_number: Set(attempt_number as i32),
            submitted_at: Set(None),
            late_days: Set(None),
            content: Set(content),
            group_snapshot: Set(group_snapshot),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await
    }

    /// Finds a live submission by ID.
    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(db)
            .await
    }

    /// The live submission of `student_id` for `content_id`, if any.
    pub async fn find_by_parent_and_student<C: ConnectionTrait>(
        db: &C,
        content_id: i64,
        student_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::ContentId.eq(content_id))
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::DeletedAt.is_null())
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// Highest attempt number used by `student_id` on `content_id`, counting
    /// soft-deleted rows.
    pub async fn max_attempt_for<C: ConnectionTrait>(
        db: &C,
        content_id: i64,
        student_id: i64,
    ) -> Result<Option<u32>, DbErr> {
        let latest = Entity::find()
            .filter(Column::ContentId.eq(content_id))
            .filter(Column::StudentId.eq(student_id))
            .order_by_desc(Column::AttemptNumber)
            .one(db)
            .await?;
        Ok(latest.map(|s| s.attempt()))
    }

    /// Replaces the payload of a draft. Returns `None` if the row is no longer
    /// a draft.
    pub async fn update_draft<C: ConnectionTrait>(
        db: &C,
        id: i64,
        content: Json,
        group_snapshot: Option<Json>,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, DbErr> {
        let result = Entity::update_many()
            .col_expr(Column::Content, Expr::value(content))
            .col_expr(Column::GroupSnapshot, Expr::value(group_snapshot))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::State.eq(SubmissionState::Draft))
            .filter(Column::DeletedAt.is_null())
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        Self::find_by_id(db, id).await
    }

    /// Writes a state machine outcome, guarded by the state it was computed from.
    ///
    /// Returns `None` when the stored state no longer equals `outcome.from`,
    /// i.e. someone else moved the submission first.
    pub async fn transition_state<C: ConnectionTrait>(
        db: &C,
        id: i64,
        outcome: &TransitionOutcome,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, DbErr> {
        let mut update = Entity::update_many()
            .col_expr(Column::State, Expr::value(outcome.to))
            .col_expr(Column::AttemptNumber, Expr::value(outcome.attempt_number as i32))
            .col_expr(Column::UpdatedAt, Expr::value(now));

        if let Some(stamp) = outcome.stamp {
            update = update
                .col_expr(Column::SubmittedAt, Expr::value(Some(stamp.submitted_at)))
                .col_expr(Column::LateDays, Expr::value(stamp.late_days.map(|d| d as i32)));
        } else if outcome.to == SubmissionState::Draft {
            // A reopened draft has not been handed in yet.
            update = update
                .col_expr(Column::SubmittedAt, Expr::value(Option::<DateTime<Utc>>::None))
                .col_expr(Column::LateDays, Expr::value(Option::<i32>::None));
        }

        let result = update
            .filter(Column::Id.eq(id))
            .filter(Column::State.eq(outcome.from))
            .filter(Column::DeletedAt.is_null())
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            tracing::warn!(
                submission_id = id,
                expected = %outcome.from,
                target = %outcome.to,
                "Submission state changed before the transition was written"
            );
            return Ok(None);
        }
        Self::find_by_id(db, id).await
    }

    /// Marks the submission deleted. Grade records are kept.
    pub async fn soft_delete<C: ConnectionTrait>(
        db: &C,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let Some(submission) = Self::find_by_id(db, id).await? else {
            return Err(DbErr::RecordNotFound(format!("Submission {id} not found")));
        };
        let mut active = submission.into_active_model();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await.map(|_| ())
    }

    pub fn attempt(&self) -> u32 {
        u32::try_from(self.attempt_number).unwrap_or(1)
    }

    pub fn late_days(&self) -> Option<u32> {
        self.late_days.and_then(|d| u32::try_from(d).ok())
    }
}
