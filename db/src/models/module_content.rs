use chrono::{DateTime, Utc};
use grading::publish_window;
use grading::types::ContentType;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};

/// An item inside a module section.
///
/// Visibility is driven by the three publish timestamps; see
/// [`grading::publish_window`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "module_contents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub module_section_id: i64,
    pub title: String,
    pub content_type: ContentType,
    /// Unique within the section.
    pub position: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub unpublished_at: Option<DateTime<Utc>>,
    pub to_publish_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::assignment::Entity")]
    Assignment,
    #[sea_orm(has_one = "super::quiz::Entity")]
    Quiz,
    #[sea_orm(has_many = "super::submission::Entity")]
    Submissions,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl Related<super::quiz::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quiz.def()
    }
}

impl Related<super::submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// New values for the publish timestamps. `None` leaves a field untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct PublishWindowUpdate {
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub unpublished_at: Option<Option<DateTime<Utc>>>,
    pub to_publish_at: Option<Option<DateTime<Utc>>>,
}

impl Model {
    /// Creates a content item in a section. Fails if `position` is taken.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        module_section_id: i64,
        title: &str,
        content_type: ContentType,
        position: i32,
        now: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let active = ActiveModel {
            module_section_id: Set(module_section_id),
            title: Set(title.to_string()),
            content_type: Set(content_type),
            position: Set(position),
            published_at: Set(None),
            unpublished_at: Set(None),
            to_publish_at: Set(None),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await
    }

    /// Finds a content item by ID, skipping soft-deleted rows.
    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(db)
            .await
    }

    /// All live items of a section in display order.
    pub async fn find_in_section<C: ConnectionTrait>(
        db: &C,
        module_section_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::ModuleSectionId.eq(module_section_id))
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::Position)
            .all(db)
            .await
    }

    /// Live items whose schedule has come due but that are not published yet.
    pub async fn find_due_for_promotion<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::DeletedAt.is_null())
            .filter(Column::PublishedAt.is_null())
            .filter(Column::ToPublishAt.lte(now))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    pub async fn update_publish_window<C: ConnectionTrait>(
        db: &C,
        id: i64,
        update: PublishWindowUpdate,
        now: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let Some(content) = Self::find_by_id(db, id).await? else {
            return Err(DbErr::RecordNotFound(format!("Module content {id} not found")));
        };

        let mut active = content.into_active_model();
        if let Some(v) = update.published_at {
            active.published_at = Set(v);
        }
        if let Some(v) = update.unpublished_at {
            active.unpublished_at = Set(v);
        }
        if let Some(v) = update.to_publish_at {
            active.to_publish_at = Set(v);
        }
        active.updated_at = Set(now);
        active.update(db).await
    }

    pub async fn soft_delete<C: ConnectionTrait>(
        db: &C,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let Some(content) = Self::find_by_id(db, id).await? else {
            return Err(DbErr::RecordNotFound(format!("Module content {id} not found")));
        };
        let mut active = content.into_active_model();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await.map(|_| ())
    }

    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        publish_window::is_visible(
            now,
            self.published_at,
            self.unpublished_at,
            self.to_publish_at,
        )
    }

    pub fn publish_status(&self, now: DateTime<Utc>) -> publish_window::PublishStatus {
        publish_window::publish_status(
            now,
            self.published_at,
            self.unpublished_at,
            self.to_publish_at,
        )
    }
}
