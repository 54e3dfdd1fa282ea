use crate::{decimal_text, parse_decimal};
use chrono::{DateTime, Utc};
use grading::types::{CurveSettings, GradingConfig, QuestionRule, RubricCriterion};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, IntoActiveModel, QueryFilter, Set};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Scoring configuration. Belongs to exactly one assignment or one quiz.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "grading_configs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: Option<i64>,
    pub quiz_id: Option<i64>,
    pub weight: String,
    pub is_curved: bool,
    pub curve_settings: Option<Json>,
    pub rubric_schema: Option<Json>,
    pub question_rules: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignment::Entity",
        from = "Column::AssignmentId",
        to = "super::assignment::Column::Id"
    )]
    Assignment,
    #[sea_orm(
        belongs_to = "super::quiz::Entity",
        from = "Column::QuizId",
        to = "super::quiz::Column::Id"
    )]
    Quiz,
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

impl ActiveModelBehavior for ActiveModel {}

/// The single parent of a grading config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOwner {
    Assignment(i64),
    Quiz(i64),
}

impl ConfigOwner {
    fn ids(self) -> (Option<i64>, Option<i64>) {
        match self {
            ConfigOwner::Assignment(id) => (Some(id), None),
            ConfigOwner::Quiz(id) => (None, Some(id)),
        }
    }
}

fn to_json<T: Serialize>(column: &str, value: &Option<T>) -> Result<Option<Json>, DbErr> {
    value
        .as_ref()
        .map(|v| {
            serde_json::to_value(v)
                .map_err(|e| DbErr::Custom(format!("failed to encode {column}: {e}")))
        })
        .transpose()
}

fn from_json<T: DeserializeOwned>(column: &str, value: &Option<Json>) -> Result<Option<T>, DbErr> {
    value
        .as_ref()
        .map(|v| {
            serde_json::from_value(v.clone())
                .map_err(|e| DbErr::Custom(format!("invalid {column}: {e}")))
        })
        .transpose()
}

impl Model {
    /// Inserts or replaces the config for `owner`.
    pub async fn save_for<C: ConnectionTrait>(
        db: &C,
        owner: ConfigOwner,
        config: &GradingConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let curve_settings = to_json("curve_settings", &config.curve_settings)?;
        let rubric_schema = to_json("rubric_schema", &config.rubric_schema)?;
        let question_rules = to_json("question_rules", &config.question_rules)?;

        match Self::find_for(db, owner).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.weight = Set(decimal_text(config.weight));
                active.is_curved = Set(config.is_curved);
                active.curve_settings = Set(curve_settings);
                active.rubric_schema = Set(rubric_schema);
                active.question_rules = Set(question_rules);
                active.updated_at = Set(now);
                active.update(db).await
            }
            None => {
                let (assignment_id, quiz_id) = owner.ids();
                let active = ActiveModel {
                    assignment_id: Set(assignment_id),
                    quiz_id: Set(quiz_id),
                    weight: Set(decimal_text(config.weight)),
                    is_curved: Set(config.is_curved),
                    curve_settings: Set(curve_settings),
                    rubric_schema: Set(rubric_schema),
                    question_rules: Set(question_rules),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.insert(db).await
            }
        }
    }

    pub async fn find_for<C: ConnectionTrait>(
        db: &C,
        owner: ConfigOwner,
    ) -> Result<Option<Self>, DbErr> {
        let query = match owner {
            ConfigOwner::Assignment(id) => Entity::find().filter(Column::AssignmentId.eq(id)),
            ConfigOwner::Quiz(id) => Entity::find().filter(Column::QuizId.eq(id)),
        };
        query.one(db).await
    }

    pub fn owner(&self) -> Result<ConfigOwner, DbErr> {
        match (self.assignment_id, self.quiz_id) {
            (Some(id), None) => Ok(ConfigOwner::Assignment(id)),
            (None, Some(id)) => Ok(ConfigOwner::Quiz(id)),
            _ => Err(DbErr::Custom(format!(
                "grading config {} must belong to exactly one assignment or quiz",
                self.id
            ))),
        }
    }

    /// Decodes the stored columns into the domain config.
    pub fn to_config(&self) -> Result<GradingConfig, DbErr> {
        Ok(GradingConfig {
            weight: parse_decimal("grading_configs.weight", &self.weight)?,
            is_curved: self.is_curved,
            curve_settings: from_json::<CurveSettings>("curve_settings", &self.curve_settings)?,
            rubric_schema: from_json::<Vec<RubricCriterion>>("rubric_schema", &self.rubric_schema)?,
            question_rules: from_json::<Vec<QuestionRule>>("question_rules", &self.question_rules)?,
        })
    }
}
