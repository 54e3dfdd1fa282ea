use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use db::models::grading_config::ConfigOwner;
use db::models::{assignment, grading_config, module_content, quiz};
use grading::state_machine::TransitionContext;
use grading::types::{Actor, ContentType, GradingConfig};
use grading::{GradingError, ScoringPolicy};
use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use util::grading_options::GradingOptions;

/// Submission rules of one gradable content item.
///
/// Merges the content row with its assignment or quiz settings. A gradable
/// item without a settings row falls back to the configured defaults.
#[derive(Debug, Clone)]
pub struct ContentRules {
    pub content: module_content::Model,
    pub due_date: Option<DateTime<Utc>>,
    pub max_attempts: u32,
    /// `allow_resubmission` for assignments, `allow_retake` for quizzes.
    pub allow_resubmission: bool,
    pub late_penalty: Decimal,
    pub points: Option<Decimal>,
    pub is_group: bool,
    pub config_owner: Option<ConfigOwner>,
}

impl ContentRules {
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        content_id: i64,
        options: &GradingOptions,
    ) -> ServiceResult<Self> {
        let content = module_content::Model::find_by_id(db, content_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Content {content_id}")))?;
        Self::for_content(db, content, options).await
    }

    pub async fn for_content<C: ConnectionTrait>(
        db: &C,
        content: module_content::Model,
        options: &GradingOptions,
    ) -> ServiceResult<Self> {
        let mut rules = ContentRules {
            due_date: None,
            max_attempts: options.default_max_attempts.max(1),
            allow_resubmission: false,
            late_penalty: options.default_late_penalty,
            points: None,
            is_group: false,
            config_owner: None,
            content,
        };

        match rules.content.content_type {
            ContentType::Quiz => {
                if let Some(q) = quiz::Model::find_by_content_id(db, rules.content.id).await? {
                    rules.due_date = q.due_date;
                    rules.max_attempts = q.max_attempts();
                    rules.allow_resubmission = q.allow_retake;
                    rules.late_penalty = q.late_penalty()?;
                    rules.config_owner = Some(ConfigOwner::Quiz(q.id));
                }
            }
            ContentType::Assignment | ContentType::Discussion => {
                let found = assignment::Model::find_by_content_id(db, rules.content.id).await?;
                if let Some(a) = found {
                    rules.due_date = a.due_date;
                    rules.max_attempts = a.max_attempts();
                    rules.allow_resubmission = a.allow_resubmission;
                    rules.late_penalty = a.late_penalty()?;
                    rules.points = a.points()?;
                    rules.is_group = a.is_group;
                    rules.config_owner = Some(ConfigOwner::Assignment(a.id));
                }
            }
            other => return Err(GradingError::NotGradable(other).into()),
        }

        Ok(rules)
    }

    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.content.is_visible(now)
    }

    pub fn transition_context(
        &self,
        actor: Actor,
        now: DateTime<Utc>,
        attempt_number: u32,
        options: &GradingOptions,
    ) -> TransitionContext {
        TransitionContext::new(actor, now)
            .with_due_date(self.due_date)
            .with_attempts(attempt_number, self.max_attempts)
            .with_resubmission(self.allow_resubmission)
            .with_visibility(self.is_visible(now))
            .with_feedback_limit(options.feedback_max_chars)
    }

    pub async fn grading_config<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> ServiceResult<Option<GradingConfig>> {
        let Some(owner) = self.config_owner else {
            return Ok(None);
        };
        match grading_config::Model::find_for(db, owner).await? {
            Some(row) => Ok(Some(row.to_config()?)),
            None => Ok(None),
        }
    }

    pub async fn policy<C: ConnectionTrait>(&self, db: &C) -> ServiceResult<ScoringPolicy> {
        let config = self.grading_config(db).await?;
        Ok(grading::resolve(
            self.content.content_type,
            config.as_ref(),
            self.points,
        )?)
    }
}
