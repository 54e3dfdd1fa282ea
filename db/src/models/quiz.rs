use crate::{decimal_text, parse_decimal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, QueryFilter, Set};

/// Attempt rules for a `QUIZ` content item.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "quizzes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub content_id: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub time_limit_minutes: Option<i32>,
    pub max_attempts: i32,
    /// Whether a graded attempt may be returned for another try.
    pub allow_retake: bool,
    pub late_penalty: String,
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
    #[sea_orm(has_one = "super::grading_config::Entity")]
    GradingConfig,
}

impl Related<super::module_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Content.def()
    }
}

impl Related<super::grading_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GradingConfig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizSettings {
    pub due_date: Option<DateTime<Utc>>,
    pub time_limit_minutes: Option<u32>,
    pub max_attempts: u32,
    pub allow_retake: bool,
    pub late_penalty: Decimal,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            due_date: None,
            time_limit_minutes: None,
            max_attempts: 1,
            allow_retake: false,
            late_penalty: Decimal::ZERO,
        }
    }
}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        content_id: i64,
        settings: &QuizSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        if settings.max_attempts == 0 {
            return Err(DbErr::Custom("max_attempts must be at least 1".into()));
        }
        let active = ActiveModel {
            content_id: Set(content_id),
            due_date: Set(settings.due_date),
            time_limit_minutes: Set(settings.time_limit_minutes.map(|m| m as i32)),
            max_attempts: Set(settings.max_attempts as i32),
            allow_retake: Set(settings.allow_retake),
            late_penalty: Set(decimal_text(settings.late_penalty)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_by_content_id<C: ConnectionTrait>(
        db: &C,
        content_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::ContentId.eq(content_id))
            .one(db)
            .await
    }

    pub fn late_penalty(&self) -> Result<Decimal, DbErr> {
        parse_decimal("quizzes.late_penalty", &self.late_penalty)
    }

    pub fn max_attempts(&self) -> u32 {
        u32::try_from(self.max_attempts).unwrap_or(1).max(1)
    }
}
