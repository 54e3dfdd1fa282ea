use crate::content_rules::ContentRules;
use crate::error::{ServiceError, ServiceResult};
use crate::requests::{AssignmentRequest, CreateContentRequest, QuizRequest};
use chrono::{DateTime, Utc};
use db::models::assignment::{self, AssignmentSettings};
use db::models::module_content::{self, PublishWindowUpdate};
use db::models::quiz::{self, QuizSettings};
use db::models::grading_config;
use grading::publish_window::PublishStatus;
use grading::types::{ContentType, GradingConfig};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use util::clock::Clock;
use util::grading_options::GradingOptions;
use validator::Validate;

pub struct ContentService;

async fn find_content<C: ConnectionTrait>(
    db: &C,
    content_id: i64,
) -> ServiceResult<module_content::Model> {
    module_content::Model::find_by_id(db, content_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Content {content_id}")))
}

async fn insert_content<C: ConnectionTrait>(
    db: &C,
    req: &CreateContentRequest,
    now: DateTime<Utc>,
) -> ServiceResult<module_content::Model> {
    let taken = module_content::Model::find_in_section(db, req.module_section_id)
        .await?
        .iter()
        .any(|c| c.position == req.position);
    if taken {
        return Err(ServiceError::Validation(format!(
            "Position {} is already used in section {}",
            req.position, req.module_section_id
        )));
    }
    Ok(module_content::Model::create(
        db,
        req.module_section_id,
        req.title.trim(),
        req.content_type,
        req.position,
        now,
    )
    .await?)
}

impl ContentService {
    /// Creates an unpublished content item of any type.
    pub async fn create_content(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        req: CreateContentRequest,
    ) -> ServiceResult<module_content::Model> {
        req.validate()?;
        let content = insert_content(db, &req, clock.now()).await?;
        tracing::info!(
            content_id = content.id,
            content_type = %content.content_type,
            "Content created"
        );
        Ok(content)
    }

    pub async fn create_assignment(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        req: AssignmentRequest,
    ) -> ServiceResult<(module_content::Model, assignment::Model)> {
        req.validate()?;
        if !matches!(
            req.content.content_type,
            ContentType::Assignment | ContentType::Discussion
        ) {
            return Err(ServiceError::Validation(format!(
                "{} content cannot carry assignment settings",
                req.content.content_type
            )));
        }

        let now = clock.now();
        let txn = db.begin().await?;
        let content = insert_content(&txn, &req.content, now).await?;
        let settings = AssignmentSettings {
            points: req.points,
            due_date: req.due_date,
            max_attempts: req.max_attempts,
            allow_resubmission: req.allow_resubmission,
            late_penalty: req.late_penalty,
            is_group: req.is_group,
        };
        let created = assignment::Model::create(&txn, content.id, &settings, now).await?;
        txn.commit().await?;

        tracing::info!(content_id = content.id, assignment_id = created.id, "Assignment created");
        Ok((content, created))
    }

    pub async fn create_quiz(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        req: QuizRequest,
    ) -> ServiceResult<(module_content::Model, quiz::Model)> {
        req.validate()?;
        if req.content.content_type != ContentType::Quiz {
            return Err(ServiceError::Validation(format!(
                "{} content cannot carry quiz settings",
                req.content.content_type
            )));
        }

        let now = clock.now();
        let txn = db.begin().await?;
        let content = insert_content(&txn, &req.content, now).await?;
        let settings = QuizSettings {
            due_date: req.due_date,
            time_limit_minutes: req.time_limit_minutes,
            max_attempts: req.max_attempts,
            allow_retake: req.allow_retake,
            late_penalty: req.late_penalty,
        };
        let created = quiz::Model::create(&txn, content.id, &settings, now).await?;
        txn.commit().await?;

        tracing::info!(content_id = content.id, quiz_id = created.id, "Quiz created");
        Ok((content, created))
    }

    /// Stores the grading config of an assignment or quiz. The config must
    /// resolve to a scoring policy before it is saved.
    pub async fn set_grading_config(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        options: &GradingOptions,
        content_id: i64,
        config: GradingConfig,
    ) -> ServiceResult<grading_config::Model> {
        let txn = db.begin().await?;
        let rules = ContentRules::load(&txn, content_id, options).await?;
        let owner = rules.config_owner.ok_or_else(|| {
            ServiceError::Validation(format!(
                "Content {content_id} has no assignment or quiz settings"
            ))
        })?;

        grading::resolve(rules.content.content_type, Some(&config), rules.points)?;
        let saved = grading_config::Model::save_for(&txn, owner, &config, clock.now()).await?;
        txn.commit().await?;

        tracing::info!(content_id, config_id = saved.id, "Grading config saved");
        Ok(saved)
    }

    /// Publishes now and drops any schedule or close date.
    pub async fn publish(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        content_id: i64,
    ) -> ServiceResult<module_content::Model> {
        let now = clock.now();
        let update = PublishWindowUpdate {
            published_at: Some(Some(now)),
            unpublished_at: Some(None),
            to_publish_at: Some(None),
        };
        let content = Self::write_window(db, content_id, update, now).await?;
        tracing::info!(content_id, "Content published");
        Ok(content)
    }

    /// Closes the publish window now.
    pub async fn unpublish(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        content_id: i64,
    ) -> ServiceResult<module_content::Model> {
        let now = clock.now();
        let update = PublishWindowUpdate {
            unpublished_at: Some(Some(now)),
            to_publish_at: Some(None),
            ..Default::default()
        };
        let content = Self::write_window(db, content_id, update, now).await?;
        tracing::info!(content_id, "Content unpublished");
        Ok(content)
    }

    /// Schedules publication at `to_publish_at`. The item stays hidden until
    /// [`ContentService::promote_scheduled`] picks it up.
    pub async fn schedule(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        content_id: i64,
        to_publish_at: DateTime<Utc>,
    ) -> ServiceResult<module_content::Model> {
        let now = clock.now();
        if to_publish_at <= now {
            return Err(ServiceError::Validation(
                "Scheduled publish time must be in the future".into(),
            ));
        }
        let update = PublishWindowUpdate {
            published_at: Some(None),
            unpublished_at: Some(None),
            to_publish_at: Some(Some(to_publish_at)),
        };
        let content = Self::write_window(db, content_id, update, now).await?;
        tracing::info!(content_id, %to_publish_at, "Content scheduled");
        Ok(content)
    }

    pub async fn is_visible(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        content_id: i64,
    ) -> ServiceResult<bool> {
        Ok(find_content(db, content_id).await?.is_visible(clock.now()))
    }

    pub async fn publish_status(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        content_id: i64,
    ) -> ServiceResult<PublishStatus> {
        Ok(find_content(db, content_id).await?.publish_status(clock.now()))
    }

    /// Publishes every item whose schedule has come due, as of its scheduled
    /// time. Returns the promoted ids. Meant to be called periodically by
    /// whatever runs background jobs.
    pub async fn promote_scheduled(
        db: &DatabaseConnection,
        clock: &dyn Clock,
    ) -> ServiceResult<Vec<i64>> {
        let now = clock.now();
        let txn = db.begin().await?;

        let due = module_content::Model::find_due_for_promotion(&txn, now).await?;
        let mut promoted = Vec::with_capacity(due.len());
        for content in due {
            let update = PublishWindowUpdate {
                published_at: Some(content.to_publish_at),
                unpublished_at: Some(None),
                to_publish_at: Some(None),
            };
            module_content::Model::update_publish_window(&txn, content.id, update, now).await?;
            promoted.push(content.id);
        }
        txn.commit().await?;

        if !promoted.is_empty() {
            tracing::info!(count = promoted.len(), ids = ?promoted, "Promoted scheduled content");
        }
        Ok(promoted)
    }

    /// Hides the item and frees its position in the section. Submissions
    /// and grades are kept.
    pub async fn soft_delete(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        content_id: i64,
    ) -> ServiceResult<()> {
        let txn = db.begin().await?;
        find_content(&txn, content_id).await?;
        module_content::Model::soft_delete(&txn, content_id, clock.now()).await?;
        txn.commit().await?;

        tracing::info!(content_id, "Content deleted");
        Ok(())
    }

    async fn write_window(
        db: &DatabaseConnection,
        content_id: i64,
        update: PublishWindowUpdate,
        now: DateTime<Utc>,
    ) -> ServiceResult<module_content::Model> {
        find_content(db, content_id).await?;
        Ok(module_content::Model::update_publish_window(db, content_id, update, now).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::t0;
    use chrono::Duration;
    use db::test_utils::setup_test_db;
    use grading::types::RubricCriterion;
    use grading::GradingError;
    use rust_decimal_macros::dec;
    use util::clock::FixedClock;

    fn content_req(title: &str, content_type: ContentType, position: i32) -> CreateContentRequest {
        CreateContentRequest {
            module_section_id: 1,
            title: title.into(),
            content_type,
            position,
        }
    }

    fn assignment_req(position: i32) -> AssignmentRequest {
        AssignmentRequest {
            content: content_req("Essay", ContentType::Assignment, position),
            points: Some(dec!(20)),
            due_date: None,
            max_attempts: 2,
            allow_resubmission: true,
            late_penalty: dec!(0.1),
            is_group: false,
        }
    }

    #[tokio::test]
    async fn test_create_assignment_and_unique_position() {
        let db = setup_test_db().await;
        let clock = FixedClock::new(t0());

        let (content, a) = ContentService::create_assignment(&db, &clock, assignment_req(1))
            .await
            .unwrap();
        assert_eq!(a.content_id, content.id);
        assert_eq!(a.max_attempts(), 2);
        assert_eq!(content.publish_status(t0()), PublishStatus::Draft);

        let err = ContentService::create_assignment(&db, &clock, assignment_req(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_settings_must_match_content_type() {
        let db = setup_test_db().await;
        let clock = FixedClock::new(t0());

        let mut req = assignment_req(1);
        req.content.content_type = ContentType::Quiz;
        let err = ContentService::create_assignment(&db, &clock, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let quiz = QuizRequest {
            content: content_req("Quiz", ContentType::Quiz, 2),
            due_date: None,
            time_limit_minutes: Some(20),
            max_attempts: 1,
            allow_retake: false,
            late_penalty: dec!(0),
        };
        let (_, q) = ContentService::create_quiz(&db, &clock, quiz).await.unwrap();
        assert_eq!(q.time_limit_minutes, Some(20));
    }

    #[tokio::test]
    async fn test_set_grading_config_validates() {
        let db = setup_test_db().await;
        let clock = FixedClock::new(t0());
        let options = GradingOptions::default();
        let (content, _) = ContentService::create_assignment(&db, &clock, assignment_req(1))
            .await
            .unwrap();

        let bad = GradingConfig {
            rubric_schema: Some(vec![RubricCriterion {
                id: "a".into(),
                name: "A".into(),
                max_points: dec!(0),
                description: None,
            }]),
            ..Default::default()
        };
        let err = ContentService::set_grading_config(&db, &clock, &options, content.id, bad)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Grading(GradingError::InvalidGradingConfig(_))
        ));

        let good = GradingConfig {
            weight: dec!(0.5),
            ..Default::default()
        };
        let saved = ContentService::set_grading_config(&db, &clock, &options, content.id, good)
            .await
            .unwrap();
        assert_eq!(saved.to_config().unwrap().weight, dec!(0.5));

        let notes = content_req("Notes", ContentType::Lesson, 2);
        let lesson = ContentService::create_content(&db, &clock, notes).await.unwrap();
        let empty = GradingConfig::default();
        let err = ContentService::set_grading_config(&db, &clock, &options, lesson.id, empty)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Grading(GradingError::NotGradable(ContentType::Lesson))
        ));
    }

    #[tokio::test]
    async fn test_publish_and_unpublish() {
        let db = setup_test_db().await;
        let clock = FixedClock::new(t0());
        let notes = content_req("Notes", ContentType::Lesson, 1);
        let content = ContentService::create_content(&db, &clock, notes).await.unwrap();
        assert!(!ContentService::is_visible(&db, &clock, content.id).await.unwrap());

        ContentService::publish(&db, &clock, content.id).await.unwrap();
        assert!(ContentService::is_visible(&db, &clock, content.id).await.unwrap());

        clock.advance(Duration::days(1));
        ContentService::unpublish(&db, &clock, content.id).await.unwrap();
        assert!(!ContentService::is_visible(&db, &clock, content.id).await.unwrap());
        assert_eq!(
            ContentService::publish_status(&db, &clock, content.id).await.unwrap(),
            PublishStatus::Unpublished
        );

        let err = ContentService::publish(&db, &clock, content.id + 100).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_schedule_then_promote() {
        let db = setup_test_db().await;
        let clock = FixedClock::new(t0());
        let req = content_req("Week 1", ContentType::Video, 1);
        let early = ContentService::create_content(&db, &clock, req).await.unwrap();
        let req = content_req("Week 2", ContentType::Video, 2);
        let later = ContentService::create_content(&db, &clock, req).await.unwrap();

        let at = t0() + Duration::hours(1);
        ContentService::schedule(&db, &clock, early.id, at).await.unwrap();
        ContentService::schedule(&db, &clock, later.id, t0() + Duration::days(7)).await.unwrap();
        assert!(ContentService::schedule(&db, &clock, early.id, t0()).await.is_err());

        assert!(ContentService::promote_scheduled(&db, &clock).await.unwrap().is_empty());
        assert_eq!(
            ContentService::publish_status(&db, &clock, early.id).await.unwrap(),
            PublishStatus::Scheduled
        );

        clock.advance(Duration::hours(2));
        assert_eq!(ContentService::promote_scheduled(&db, &clock).await.unwrap(), vec![early.id]);
        assert!(ContentService::is_visible(&db, &clock, early.id).await.unwrap());
        assert!(!ContentService::is_visible(&db, &clock, later.id).await.unwrap());

        let promoted = module_content::Model::find_by_id(&db, early.id).await.unwrap().unwrap();
        assert_eq!(promoted.published_at, Some(at));
        assert_eq!(promoted.to_publish_at, None);

        // A second pass finds nothing new.
        assert!(ContentService::promote_scheduled(&db, &clock).await.unwrap().is_empty());
    }

    /// A deleted item frees its position for a new one.
    #[tokio::test]
    async fn test_soft_delete_frees_position() {
        let db = setup_test_db().await;
        let clock = FixedClock::new(t0());
        let (old, _) = ContentService::create_assignment(&db, &clock, assignment_req(1))
            .await
            .unwrap();

        ContentService::soft_delete(&db, &clock, old.id).await.unwrap();
        let err = ContentService::is_visible(&db, &clock, old.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = ContentService::soft_delete(&db, &clock, old.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let (new, _) = ContentService::create_assignment(&db, &clock, assignment_req(1))
            .await
            .unwrap();
        assert_ne!(new.id, old.id);
        assert_eq!(new.position, 1);

        let err = ContentService::create_assignment(&db, &clock, assignment_req(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
