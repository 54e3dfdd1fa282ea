//! # Types Module
//!
//! Core data structures shared by the state machine, the policy resolver and
//! the score computer. `ContentType` and `SubmissionState` can be stored
//! directly in SeaORM entities when the `sea-orm` feature is enabled.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of item inside a module section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "Text")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ASSIGNMENT"))]
    Assignment,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "QUIZ"))]
    Quiz,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "LESSON"))]
    Lesson,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DISCUSSION"))]
    Discussion,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "FILE"))]
    File,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "URL"))]
    Url,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "VIDEO"))]
    Video,
}

impl ContentType {
    pub const ALL: &'static [ContentType] = &[
        Self::Assignment,
        Self::Quiz,
        Self::Lesson,
        Self::Discussion,
        Self::File,
        Self::Url,
        Self::Video,
    ];

    /// Whether students hand in work for this kind of item.
    pub fn is_gradable(&self) -> bool {
        matches!(self, Self::Assignment | Self::Quiz | Self::Discussion)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "ASSIGNMENT",
            Self::Quiz => "QUIZ",
            Self::Lesson => "LESSON",
            Self::Discussion => "DISCUSSION",
            Self::File => "FILE",
            Self::Url => "URL",
            Self::Video => "VIDEO",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("invalid content type: {s}"))
    }
}

/// Lifecycle state of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "Text")
)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Saved by the student, not handed in.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "draft"))]
    Draft,
    /// Handed in on time.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "submitted"))]
    Submitted,
    /// Handed in after the due date.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "late"))]
    Late,
    /// Opened by a grader; grade not yet released.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "under_review"))]
    UnderReview,
    /// A grade record exists for the current attempt.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "graded"))]
    Graded,
    /// Sent back to the student with feedback.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "returned_for_revision"))]
    ReturnedForRevision,
    /// No further changes accepted.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "locked"))]
    Locked,
}

impl SubmissionState {
    pub const ALL: &'static [SubmissionState] = &[
        Self::Draft,
        Self::Submitted,
        Self::Late,
        Self::UnderReview,
        Self::Graded,
        Self::ReturnedForRevision,
        Self::Locked,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Handed in and waiting for (or under) review.
    pub fn is_awaiting_grade(&self) -> bool {
        matches!(self, Self::Submitted | Self::Late | Self::UnderReview)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Late => "late",
            Self::UnderReview => "under_review",
            Self::Graded => "graded",
            Self::ReturnedForRevision => "returned_for_revision",
            Self::Locked => "locked",
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|state| state.as_str() == s)
            .copied()
            .ok_or_else(|| {
                format!(
                    "invalid submission state '{s}'. Valid values: {}",
                    Self::ALL.iter().map(|st| st.as_str()).collect::<Vec<_>>().join(", ")
                )
            })
    }
}

/// Who is asking for a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Student,
    Grader,
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Actor::Student => "student",
            Actor::Grader => "grader",
            Actor::System => "system",
        };
        f.write_str(s)
    }
}

/// Curve applied uniformly to raw scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CurveSettings {
    /// `raw + shift`
    Linear { shift: Decimal },
    /// `raw * factor`
    Scale { factor: Decimal },
}

impl CurveSettings {
    pub fn apply(&self, raw: Decimal) -> Decimal {
        match self {
            CurveSettings::Linear { shift } => raw + shift,
            CurveSettings::Scale { factor } => raw * factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub id: String,
    pub name: String,
    pub max_points: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRule {
    pub question_id: String,
    pub points: Decimal,
    /// Graded by comparing the answer against `answer_key`.
    #[serde(default = "default_auto_graded")]
    pub auto_graded: bool,
    #[serde(default)]
    pub answer_key: Option<serde_json::Value>,
    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_auto_graded() -> bool {
    true
}

/// Scoring policy attached to an assignment or quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    #[serde(default = "default_weight")]
    pub weight: Decimal,
    #[serde(default)]
    pub is_curved: bool,
    #[serde(default)]
    pub curve_settings: Option<CurveSettings>,
    #[serde(default)]
    pub rubric_schema: Option<Vec<RubricCriterion>>,
    #[serde(default)]
    pub question_rules: Option<Vec<QuestionRule>>,
}

fn default_weight() -> Decimal {
    Decimal::ONE
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            weight: default_weight(),
            is_curved: false,
            curve_settings: None,
            rubric_schema: None,
            question_rules: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion_id: String,
    pub score: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_id: String,
    pub score: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn state_strings_roundtrip() {
        for state in SubmissionState::ALL {
            assert_eq!(state.as_str().parse::<SubmissionState>().unwrap(), *state);
            let json = serde_json::to_string(state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
        assert!("finished".parse::<SubmissionState>().is_err());
    }

    #[test]
    fn content_type_parsing_is_case_insensitive() {
        assert_eq!("quiz".parse::<ContentType>().unwrap(), ContentType::Quiz);
        assert_eq!("VIDEO".parse::<ContentType>().unwrap(), ContentType::Video);
        assert!("podcast".parse::<ContentType>().is_err());
        assert!(ContentType::Discussion.is_gradable());
        assert!(!ContentType::Url.is_gradable());
    }

    #[test]
    fn grading_config_reads_tagged_curves() {
        let cfg: GradingConfig = serde_json::from_str(
            r#"{
                "is_curved": true,
                "curve_settings": { "type": "linear", "shift": "2.5" },
                "rubric_schema": [
                    { "id": "c1", "name": "Clarity", "max_points": 10 },
                    { "id": "c2", "name": "Depth", "max_points": "10" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.weight, Decimal::ONE);
        assert_eq!(cfg.curve_settings, Some(CurveSettings::Linear { shift: dec!(2.5) }));
        assert_eq!(cfg.rubric_schema.as_ref().map(Vec::len), Some(2));
        assert!(cfg.question_rules.is_none());
    }

    #[test]
    fn question_rules_default_to_auto_graded() {
        let rule: QuestionRule =
            serde_json::from_str(r#"{ "question_id": "q1", "points": 2 }"#).unwrap();
        assert!(rule.auto_graded);
        assert!(!rule.case_sensitive);
        assert!(rule.answer_key.is_none());
    }
}
