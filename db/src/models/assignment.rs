use crate::{decimal_text, parse_decimal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, QueryFilter, Set};

/// Submission rules for an `ASSIGNMENT` or `DISCUSSION` content item.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub content_id: i64,
    /// Flat points, used when no rubric is configured. Decimal text.
    pub points: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub max_attempts: i32,
    pub allow_resubmission: bool,
    /// Per-day fractional deduction. Decimal text.
    pub late_penalty: String,
    pub is_group: bool,
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
pub struct AssignmentSettings {
    pub points: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub max_attempts: u32,
    pub allow_resubmission: bool,
    pub late_penalty: Decimal,
    pub is_group: bool,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            points: None,
            due_date: None,
            max_attempts: 1,
            allow_resubmission: false,
            late_penalty: Decimal::ZERO,
            is_group: false,
        }
    }
}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        content_id: i64,
        settings: &AssignmentSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        if settings.max_attempts == 0 {
            return Err(DbErr::Custom("max_attempts must be at least 1".into()));
        }
        let active = ActiveModel {
            content_id: Set(content_id),
            points: Set(settings.points.map(decimal_text)),
            due_date: Set(settings.due_date),
            max_attempts: Set(settings.max_attempts as i32),
            allow_resubmission: Set(settings.allow_resubmission),
            late_penalty: Set(decimal_text(settings.late_penalty)),
            is_group: Set(settings.is_group),
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

    pub fn points(&self) -> Result<Option<Decimal>, DbErr> {
        self.points
            .as_deref()
            .map(|p| parse_decimal("assignments.points", p))
            .transpose()
    }

    pub fn late_penalty(&self) -> Result<Decimal, DbErr> {
        parse_decimal("assignments.late_penalty", &self.late_penalty)
    }

    pub fn max_attempts(&self) -> u32 {
        u32::try_from(self.max_attempts).unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::module_content;
    use crate::test_utils::setup_test_db;
    use grading::types::ContentType;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_create_and_read_decimals() {
        let db = setup_test_db().await;
        let now = Utc::now();
        let content =
            module_content::Model::create(&db, 1, "Essay", ContentType::Assignment, 1, now)
                .await
                .unwrap();

        let settings = AssignmentSettings {
            points: Some(dec!(20)),
            max_attempts: 3,
            allow_resubmission: true,
            late_penalty: dec!(0.05),
            ..Default::default()
        };
        let created = Model::create(&db, content.id, &settings, now).await.unwrap();

        let found = Model::find_by_content_id(&db, content.id).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.points().unwrap(), Some(dec!(20)));
        assert_eq!(found.late_penalty().unwrap(), dec!(0.05));
        assert_eq!(found.max_attempts(), 3);
        assert!(found.allow_resubmission);
    }

    #[tokio::test]
    async fn test_zero_attempts_rejected() {
        let db = setup_test_db().await;
        let settings = AssignmentSettings {
            max_attempts: 0,
            ..Default::default()
        };
        let err = Model::create(&db, 1, &settings, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbErr::Custom(_)));
    }

    #[test]
    fn test_bad_decimal_text_is_reported() {
        let model = Model {
            id: 1,
            content_id: 1,
            points: Some("twenty".into()),
            due_date: None,
            max_attempts: 1,
            allow_resubmission: false,
            late_penalty: "0".into(),
            is_group: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(model.points(), Err(DbErr::Custom(_))));
    }
}
