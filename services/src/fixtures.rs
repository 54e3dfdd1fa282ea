use chrono::{DateTime, Duration, TimeZone, Utc};
use db::models::assignment::AssignmentSettings;
use db::models::grading_config::ConfigOwner;
use db::models::module_content::PublishWindowUpdate;
use db::models::quiz::QuizSettings;
use db::models::{assignment, grading_config, module_content, quiz};
use grading::types::{ContentType, GradingConfig};
use sea_orm::DatabaseConnection;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
}

/// A content item published a day before [`t0`].
pub async fn published_content(
    db: &DatabaseConnection,
    title: &str,
    content_type: ContentType,
    position: i32,
) -> module_content::Model {
    let created = module_content::Model::create(db, 1, title, content_type, position, t0())
        .await
        .unwrap();
    module_content::Model::update_publish_window(
        db,
        created.id,
        PublishWindowUpdate {
            published_at: Some(Some(t0() - Duration::days(1))),
            ..Default::default()
        },
        t0(),
    )
    .await
    .unwrap()
}

pub async fn assignment_with(
    db: &DatabaseConnection,
    position: i32,
    settings: AssignmentSettings,
    config: Option<GradingConfig>,
) -> (module_content::Model, assignment::Model) {
    let content = published_content(db, "Essay", ContentType::Assignment, position).await;
    let a = assignment::Model::create(db, content.id, &settings, t0()).await.unwrap();
    if let Some(config) = config {
        grading_config::Model::save_for(db, ConfigOwner::Assignment(a.id), &config, t0())
            .await
            .unwrap();
    }
    (content, a)
}

pub async fn quiz_with(
    db: &DatabaseConnection,
    position: i32,
    settings: QuizSettings,
    config: GradingConfig,
) -> (module_content::Model, quiz::Model) {
    let content = published_content(db, "Quiz", ContentType::Quiz, position).await;
    let q = quiz::Model::create(db, content.id, &settings, t0()).await.unwrap();
    grading_config::Model::save_for(db, ConfigOwner::Quiz(q.id), &config, t0())
        .await
        .unwrap();
    (content, q)
}
