//! # Grading Config Resolver
//!
//! Turns a content item's type and its optional [`GradingConfig`] into the
//! [`ScoringPolicy`] used by the score computer. Resolution is a pure function
//! and validates the configuration eagerly, so a broken rubric is reported to
//! the content author rather than surfacing halfway through grading.

use crate::error::GradingError;
use crate::types::{ContentType, CurveSettings, GradingConfig, QuestionRule, RubricCriterion};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// How raw scores are broken down for a piece of content.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyKind {
    Rubric(Vec<RubricCriterion>),
    QuestionRules(Vec<QuestionRule>),
    /// Single number out of the assignment's `points`.
    FlatPoints,
}

impl PolicyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Rubric(_) => "rubric",
            PolicyKind::QuestionRules(_) => "question rules",
            PolicyKind::FlatPoints => "flat points",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPolicy {
    pub kind: PolicyKind,
    pub max_score: Decimal,
    /// Present only when the config is curved and has settings.
    pub curve: Option<CurveSettings>,
    /// Relative weight when aggregating into a gradebook total.
    pub weight: Decimal,
}

/// Resolve the scoring policy for a content item.
///
/// `assignment_points` is the `points` field of the assignment, used when no
/// rubric is configured.
pub fn resolve(
    content_type: ContentType,
    config: Option<&GradingConfig>,
    assignment_points: Option<Decimal>,
) -> Result<ScoringPolicy, GradingError> {
    if !content_type.is_gradable() {
        return Err(GradingError::NotGradable(content_type));
    }

    if let Some(cfg) = config {
        validate_common(cfg)?;
    }

    let (kind, max_score) = match content_type {
        ContentType::Quiz => {
            let rules = config
                .and_then(|c| c.question_rules.as_ref())
                .filter(|rules| !rules.is_empty())
                .ok_or(GradingError::MissingGradingConfig(content_type))?;
            validate_rules(rules)?;
            let max: Decimal = rules.iter().map(|r| r.points).sum();
            (PolicyKind::QuestionRules(rules.clone()), max)
        }
        _ => {
            let rubric = config
                .and_then(|c| c.rubric_schema.as_ref())
                .filter(|criteria| !criteria.is_empty());

            match (rubric, assignment_points) {
                (Some(criteria), _) => {
                    validate_rubric(criteria)?;
                    let max: Decimal = criteria.iter().map(|c| c.max_points).sum();
                    (PolicyKind::Rubric(criteria.clone()), max)
                }
                (None, Some(points)) => {
                    if points <= Decimal::ZERO {
                        return Err(GradingError::InvalidGradingConfig(format!(
                            "assignment points must be positive, got {points}"
                        )));
                    }
                    (PolicyKind::FlatPoints, points)
                }
                (None, None) => return Err(GradingError::MissingGradingConfig(content_type)),
            }
        }
    };

    let curve = config
        .filter(|c| c.is_curved)
        .and_then(|c| c.curve_settings.clone());
    let weight = config.map(|c| c.weight).unwrap_or(Decimal::ONE);

    tracing::debug!(
        content_type = %content_type,
        policy = kind.name(),
        %max_score,
        curved = curve.is_some(),
        "Resolved scoring policy"
    );

    Ok(ScoringPolicy {
        kind,
        max_score,
        curve,
        weight,
    })
}

fn validate_common(cfg: &GradingConfig) -> Result<(), GradingError> {
    if cfg.weight < Decimal::ZERO {
        return Err(GradingError::InvalidGradingConfig(format!(
            "weight must not be negative, got {}",
            cfg.weight
        )));
    }
    if let Some(CurveSettings::Scale { factor }) = &cfg.curve_settings {
        if *factor <= Decimal::ZERO {
            return Err(GradingError::InvalidGradingConfig(format!(
                "curve scale factor must be positive, got {factor}"
            )));
        }
    }
    Ok(())
}

fn validate_rubric(criteria: &[RubricCriterion]) -> Result<(), GradingError> {
    let mut seen = HashSet::new();
    for c in criteria {
        if c.max_points <= Decimal::ZERO {
            return Err(GradingError::InvalidGradingConfig(format!(
                "criterion '{}' must have positive max points",
                c.id
            )));
        }
        if !seen.insert(c.id.as_str()) {
            return Err(GradingError::InvalidGradingConfig(format!(
                "duplicate criterion id '{}'",
                c.id
            )));
        }
    }
    Ok(())
}

fn validate_rules(rules: &[QuestionRule]) -> Result<(), GradingError> {
    let mut seen = HashSet::new();
    for r in rules {
        if r.points <= Decimal::ZERO {
            return Err(GradingError::InvalidGradingConfig(format!(
                "question '{}' must be worth positive points",
                r.question_id
            )));
        }
        if !seen.insert(r.question_id.as_str()) {
            return Err(GradingError::InvalidGradingConfig(format!(
                "duplicate question id '{}'",
                r.question_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn criterion(id: &str, max: Decimal) -> RubricCriterion {
        RubricCriterion {
            id: id.into(),
            name: id.to_uppercase(),
            max_points: max,
            description: None,
        }
    }

    fn rule(id: &str, points: Decimal) -> QuestionRule {
        QuestionRule {
            question_id: id.into(),
            points,
            auto_graded: true,
            answer_key: None,
            case_sensitive: false,
        }
    }

    #[test]
    fn test_quiz_without_config_is_missing() {
        let err = resolve(ContentType::Quiz, None, None).unwrap_err();
        assert_eq!(err, GradingError::MissingGradingConfig(ContentType::Quiz));

        let empty = GradingConfig {
            question_rules: Some(vec![]),
            ..Default::default()
        };
        let err = resolve(ContentType::Quiz, Some(&empty), None).unwrap_err();
        assert_eq!(err, GradingError::MissingGradingConfig(ContentType::Quiz));
    }

    #[test]
    fn test_quiz_sums_question_points() {
        let cfg = GradingConfig {
            question_rules: Some(vec![rule("q1", dec!(2)), rule("q2", dec!(3.5))]),
            ..Default::default()
        };
        let policy = resolve(ContentType::Quiz, Some(&cfg), None).unwrap();
        assert_eq!(policy.max_score, dec!(5.5));
        assert!(matches!(policy.kind, PolicyKind::QuestionRules(ref r) if r.len() == 2));
    }

    #[test]
    fn test_rubric_takes_precedence_over_points() {
        let cfg = GradingConfig {
            rubric_schema: Some(vec![criterion("a", dec!(12)), criterion("b", dec!(8))]),
            ..Default::default()
        };
        let policy = resolve(ContentType::Assignment, Some(&cfg), Some(dec!(100))).unwrap();
        assert_eq!(policy.max_score, dec!(20));
        assert_eq!(policy.kind.name(), "rubric");
    }

    #[test]
    fn test_flat_points_without_rubric() {
        let policy = resolve(ContentType::Discussion, None, Some(dec!(10))).unwrap();
        assert_eq!(policy.kind, PolicyKind::FlatPoints);
        assert_eq!(policy.max_score, dec!(10));
        assert_eq!(policy.weight, Decimal::ONE);
        assert!(policy.curve.is_none());
    }

    #[test]
    fn test_assignment_with_nothing_is_missing() {
        let empty = GradingConfig::default();
        let err = resolve(ContentType::Assignment, Some(&empty), None).unwrap_err();
        assert_eq!(err, GradingError::MissingGradingConfig(ContentType::Assignment));
    }

    #[test]
    fn test_non_gradable_content() {
        for ct in [ContentType::Lesson, ContentType::File, ContentType::Url, ContentType::Video] {
            let err = resolve(ct, None, Some(dec!(5))).unwrap_err();
            assert_eq!(err, GradingError::NotGradable(ct));
        }
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let dup = GradingConfig {
            rubric_schema: Some(vec![criterion("a", dec!(1)), criterion("a", dec!(2))]),
            ..Default::default()
        };
        let zero = GradingConfig {
            rubric_schema: Some(vec![criterion("a", dec!(0))]),
            ..Default::default()
        };
        let negative_weight = GradingConfig {
            weight: dec!(-1),
            ..Default::default()
        };
        let bad_factor = GradingConfig {
            is_curved: true,
            curve_settings: Some(CurveSettings::Scale { factor: dec!(0) }),
            ..Default::default()
        };

        for cfg in [dup, zero, negative_weight, bad_factor] {
            assert!(matches!(
                resolve(ContentType::Assignment, Some(&cfg), Some(dec!(10))),
                Err(GradingError::InvalidGradingConfig(_))
            ));
        }

        let dup_questions = GradingConfig {
            question_rules: Some(vec![rule("q", dec!(1)), rule("q", dec!(1))]),
            ..Default::default()
        };
        assert!(matches!(
            resolve(ContentType::Quiz, Some(&dup_questions), None),
            Err(GradingError::InvalidGradingConfig(_))
        ));
    }

    #[test]
    fn test_curve_only_when_enabled() {
        let mut cfg = GradingConfig {
            curve_settings: Some(CurveSettings::Linear { shift: dec!(2) }),
            weight: dec!(0.25),
            ..Default::default()
        };
        let policy = resolve(ContentType::Assignment, Some(&cfg), Some(dec!(10))).unwrap();
        assert!(policy.curve.is_none());
        assert_eq!(policy.weight, dec!(0.25));

        cfg.is_curved = true;
        let policy = resolve(ContentType::Assignment, Some(&cfg), Some(dec!(10))).unwrap();
        assert_eq!(policy.curve, Some(CurveSettings::Linear { shift: dec!(2) }));
    }

    /// Resolving the same config twice gives the same policy.
    #[test]
    fn test_resolution_is_repeatable() {
        let cfg = GradingConfig {
            is_curved: true,
            curve_settings: Some(CurveSettings::Scale { factor: dec!(1.1) }),
            rubric_schema: Some(vec![criterion("a", dec!(5)), criterion("b", dec!(5))]),
            ..Default::default()
        };
        let first = resolve(ContentType::Assignment, Some(&cfg), None).unwrap();
        let second = resolve(ContentType::Assignment, Some(&cfg), None).unwrap();
        assert_eq!(first, second);
    }
}
