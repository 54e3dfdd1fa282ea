use crate::content_rules::ContentRules;
use crate::error::ServiceResult;
use crate::grading_service::pick_counted;
use db::models::{grade_record, module_content, submission};
use grading::gradebook::{WeightedScore, weighted_percentage};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use util::grading_options::GradingOptions;

pub struct GradebookService;

impl GradebookService {
    /// Weighted percentage of a student over the given content items.
    ///
    /// Each item contributes the grade picked by the grading policy, weighted
    /// by its grading config (1 without one). Ungraded, deleted and
    /// non-gradable items are skipped. `None` when nothing counts.
    pub async fn weighted_total(
        db: &DatabaseConnection,
        options: &GradingOptions,
        student_id: i64,
        content_ids: &[i64],
    ) -> ServiceResult<Option<Decimal>> {
        let mut items = Vec::new();

        for &content_id in content_ids {
            let Some(content) = module_content::Model::find_by_id(db, content_id).await? else {
                continue;
            };
            if !content.content_type.is_gradable() {
                continue;
            }
            let Some(sub) =
                submission::Model::find_by_parent_and_student(db, content_id, student_id).await?
            else {
                continue;
            };
            let records = grade_record::Model::find_by_submission(db, sub.id).await?;
            let Some(counted) = pick_counted(options, records)? else {
                continue;
            };

            let rules = ContentRules::for_content(db, content, options).await?;
            let weight = rules
                .grading_config(db)
                .await?
                .map(|c| c.weight)
                .unwrap_or(Decimal::ONE);

            items.push(WeightedScore {
                weight,
                final_score: counted.final_score()?,
                max_score: counted.max_score()?,
            });
        }

        let total = weighted_percentage(&items);
        tracing::debug!(
            student_id,
            counted = items.len(),
            total = ?total,
            "Computed weighted total"
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assignment_with, published_content, t0};
    use crate::requests::{GradeRequest, SaveDraftRequest};
    use crate::{GradingService, SubmissionService};
    use db::models::assignment::AssignmentSettings;
    use db::test_utils::setup_test_db;
    use grading::ScoreInput;
    use grading::types::{ContentType, GradingConfig};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use util::clock::FixedClock;

    async fn graded(
        db: &DatabaseConnection,
        clock: &FixedClock,
        options: &GradingOptions,
        content_id: i64,
        student_id: i64,
        score: Decimal,
    ) {
        let draft = SubmissionService::save_draft(
            db,
            clock,
            options,
            SaveDraftRequest {
                content_id,
                student_id,
                content: json!({}),
                group_snapshot: None,
            },
        )
        .await
        .unwrap();
        SubmissionService::submit(db, clock, options, draft.id).await.unwrap();
        GradingService::record_grade(
            db,
            clock,
            options,
            draft.id,
            GradeRequest {
                input: ScoreInput::Raw(score),
                feedback: None,
                grader_id: Some(1),
            },
        )
        .await
        .unwrap();
    }

    fn points(p: Decimal) -> AssignmentSettings {
        AssignmentSettings {
            points: Some(p),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_weighted_total_skips_ungraded() {
        let db = setup_test_db().await;
        let clock = FixedClock::new(t0());
        let options = GradingOptions::default();

        let heavy = GradingConfig {
            weight: dec!(3),
            ..Default::default()
        };
        let (exam, _) = assignment_with(&db, 1, points(dec!(100)), Some(heavy)).await;
        let (essay, _) = assignment_with(&db, 2, points(dec!(20)), None).await;
        let (pending, _) = assignment_with(&db, 3, points(dec!(10)), None).await;
        let lesson = published_content(&db, "Notes", ContentType::Lesson, 4).await;

        graded(&db, &clock, &options, exam.id, 1, dec!(80)).await;
        graded(&db, &clock, &options, essay.id, 1, dec!(10)).await;

        let ids = [exam.id, essay.id, pending.id, lesson.id, 9999];
        let total = GradebookService::weighted_total(&db, &options, 1, &ids).await.unwrap();
        // (3 * 0.8 + 1 * 0.5) / 4 * 100
        assert_eq!(total, Some(dec!(72.50)));

        let nobody = GradebookService::weighted_total(&db, &options, 2, &ids).await.unwrap();
        assert_eq!(nobody, None);
    }
}
