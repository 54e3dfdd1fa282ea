//! # Score Computer
//!
//! Computes the final score for a submission from grader input and a resolved
//! [`ScoringPolicy`]:
//!
//! 1. per-item scores are range checked and summed into a raw score
//! 2. the curve, if any, is applied and clamped to `[0, max_score]`
//! 3. the late penalty `curved * (1 - rate * days)` is applied, clamped at 0
//! 4. the result is rounded to two places (half-up) and mapped to a grade label
//!
//! All arithmetic is done in [`Decimal`].

use crate::error::GradingError;
use crate::resolver::{PolicyKind, ScoringPolicy};
use crate::types::{CriterionScore, QuestionScore};
use crate::round2;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use util::grading_options::GradeScale;

/// What the grader (or the auto-grader) hands in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "scores", rename_all = "snake_case")]
pub enum ScoreInput {
    /// A single total, accepted for every policy.
    Raw(Decimal),
    Criteria(Vec<CriterionScore>),
    Questions(Vec<QuestionScore>),
}

/// Per-day fractional deduction and the number of days it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatePenalty {
    pub rate: Decimal,
    pub days: u32,
}

impl LatePenalty {
    pub fn new(rate: Decimal, days: Option<u32>) -> Self {
        Self {
            rate,
            days: days.unwrap_or(0),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    fn factor(&self) -> Decimal {
        Decimal::ONE - self.rate * Decimal::from(self.days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub raw_score: Decimal,
    pub curved_score: Decimal,
    pub final_score: Decimal,
    pub max_score: Decimal,
    pub percentage: Decimal,
    pub grade: String,
}

/// Compute the final score for `input` under `policy`.
pub fn compute(
    policy: &ScoringPolicy,
    input: &ScoreInput,
    late: LatePenalty,
    scale: &GradeScale,
) -> Result<ScoreBreakdown, GradingError> {
    if late.rate < Decimal::ZERO {
        return Err(GradingError::InvalidGradingConfig(format!(
            "late penalty must not be negative, got {}",
            late.rate
        )));
    }

    let max = policy.max_score;
    let raw = raw_score(policy, input)?;

    let curved = match &policy.curve {
        Some(curve) => clamp(curve.apply(raw), Decimal::ZERO, max),
        None => raw,
    };

    let penalised = (curved * late.factor()).max(Decimal::ZERO);
    let final_score = round2(penalised).min(max);

    let percentage = if max.is_zero() {
        Decimal::ZERO
    } else {
        round2(final_score / max * Decimal::ONE_HUNDRED)
    };
    let grade = scale.label_for(percentage).to_string();

    Ok(ScoreBreakdown {
        raw_score: raw,
        curved_score: curved,
        final_score,
        max_score: max,
        percentage,
        grade,
    })
}

fn raw_score(policy: &ScoringPolicy, input: &ScoreInput) -> Result<Decimal, GradingError> {
    match (input, &policy.kind) {
        (ScoreInput::Raw(score), _) => {
            check_range("raw score", *score, policy.max_score)?;
            Ok(*score)
        }
        (ScoreInput::Criteria(scores), PolicyKind::Rubric(criteria)) => {
            let limits: HashMap<&str, Decimal> = criteria
                .iter()
                .map(|c| (c.id.as_str(), c.max_points))
                .collect();
            sum_items(
                scores.iter().map(|s| (s.criterion_id.as_str(), s.score)),
                &limits,
            )
        }
        (ScoreInput::Questions(scores), PolicyKind::QuestionRules(rules)) => {
            let limits: HashMap<&str, Decimal> = rules
                .iter()
                .map(|r| (r.question_id.as_str(), r.points))
                .collect();
            sum_items(
                scores.iter().map(|s| (s.question_id.as_str(), s.score)),
                &limits,
            )
        }
        (_, kind) => Err(GradingError::ScoreInputMismatch {
            expected: kind.name(),
        }),
    }
}

/// Items missing from `items` count as zero.
fn sum_items<'a>(
    items: impl Iterator<Item = (&'a str, Decimal)>,
    limits: &HashMap<&str, Decimal>,
) -> Result<Decimal, GradingError> {
    let mut seen = HashSet::new();
    let mut total = Decimal::ZERO;

    for (id, score) in items {
        let max = limits
            .get(id)
            .copied()
            .ok_or_else(|| GradingError::UnknownScoreItem(id.to_string()))?;
        if !seen.insert(id) {
            return Err(GradingError::UnknownScoreItem(id.to_string()));
        }
        check_range(id, score, max)?;
        total += score;
    }

    Ok(total)
}

fn check_range(item: &str, score: Decimal, max: Decimal) -> Result<(), GradingError> {
    if score < Decimal::ZERO || score > max {
        return Err(GradingError::ScoreOutOfRange {
            item: item.to_string(),
            score,
            max,
        });
    }
    Ok(())
}

fn clamp(value: Decimal, lo: Decimal, hi: Decimal) -> Decimal {
    value.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CurveSettings, QuestionRule, RubricCriterion};
    use rust_decimal_macros::dec;

    fn rubric_policy() -> ScoringPolicy {
        ScoringPolicy {
            kind: PolicyKind::Rubric(vec![
                RubricCriterion {
                    id: "content".into(),
                    name: "Content".into(),
                    max_points: dec!(12),
                    description: None,
                },
                RubricCriterion {
                    id: "style".into(),
                    name: "Style".into(),
                    max_points: dec!(8),
                    description: None,
                },
            ]),
            max_score: dec!(20),
            curve: None,
            weight: Decimal::ONE,
        }
    }

    fn flat(max: Decimal) -> ScoringPolicy {
        ScoringPolicy {
            kind: PolicyKind::FlatPoints,
            max_score: max,
            curve: None,
            weight: Decimal::ONE,
        }
    }

    fn on_time(policy: &ScoringPolicy, input: &ScoreInput) -> Result<ScoreBreakdown, GradingError> {
        compute(policy, input, LatePenalty::none(), &GradeScale::default())
    }

    fn criteria(scores: &[(&str, Decimal)]) -> ScoreInput {
        ScoreInput::Criteria(
            scores
                .iter()
                .map(|(id, score)| CriterionScore {
                    criterion_id: id.to_string(),
                    score: *score,
                })
                .collect(),
        )
    }

    /// 18 out of 20 with 0.05 per day over two late days ends on 16.20.
    #[test]
    fn test_late_penalty_on_rubric_scores() {
        let input = criteria(&[("content", dec!(11)), ("style", dec!(7))]);
        let out = compute(
            &rubric_policy(),
            &input,
            LatePenalty::new(dec!(0.05), Some(2)),
            &GradeScale::default(),
        )
        .unwrap();

        assert_eq!(out.raw_score, dec!(18));
        assert_eq!(out.final_score, dec!(16.20));
        assert_eq!(out.percentage, dec!(81));
        assert_eq!(out.grade, "B");
    }

    #[test]
    fn test_missing_criteria_count_as_zero() {
        let input = criteria(&[("content", dec!(12))]);
        let out = on_time(&rubric_policy(), &input).unwrap();
        assert_eq!(out.final_score, dec!(12));
        assert_eq!(out.percentage, dec!(60));
        assert_eq!(out.grade, "D");
    }

    #[test]
    fn test_criterion_above_max_is_out_of_range() {
        let input = criteria(&[("style", dec!(8.5))]);
        let err = on_time(&rubric_policy(), &input).unwrap_err();
        assert_eq!(
            err,
            GradingError::ScoreOutOfRange {
                item: "style".into(),
                score: dec!(8.5),
                max: dec!(8),
            }
        );
    }

    #[test]
    fn test_negative_raw_is_out_of_range() {
        let err = on_time(&flat(dec!(10)), &ScoreInput::Raw(dec!(-1))).unwrap_err();
        assert!(matches!(err, GradingError::ScoreOutOfRange { .. }));
    }

    #[test]
    fn test_unknown_and_duplicate_items() {
        let unknown = criteria(&[("bonus", dec!(1))]);
        assert_eq!(
            on_time(&rubric_policy(), &unknown).unwrap_err(),
            GradingError::UnknownScoreItem("bonus".into())
        );

        let twice = criteria(&[("style", dec!(4)), ("style", dec!(4))]);
        assert_eq!(
            on_time(&rubric_policy(), &twice).unwrap_err(),
            GradingError::UnknownScoreItem("style".into())
        );
    }

    #[test]
    fn test_input_must_match_policy() {
        let questions = ScoreInput::Questions(vec![QuestionScore {
            question_id: "q1".into(),
            score: dec!(1),
        }]);
        let err = on_time(&rubric_policy(), &questions).unwrap_err();
        assert_eq!(err, GradingError::ScoreInputMismatch { expected: "rubric" });

        // A plain total is fine for a rubric.
        let out = on_time(&rubric_policy(), &ScoreInput::Raw(dec!(15))).unwrap();
        assert_eq!(out.final_score, dec!(15));
    }

    #[test]
    fn test_question_scores_are_summed() {
        let policy = ScoringPolicy {
            kind: PolicyKind::QuestionRules(vec![
                QuestionRule {
                    question_id: "q1".into(),
                    points: dec!(2),
                    auto_graded: true,
                    answer_key: None,
                    case_sensitive: false,
                },
                QuestionRule {
                    question_id: "q2".into(),
                    points: dec!(3),
                    auto_graded: false,
                    answer_key: None,
                    case_sensitive: false,
                },
            ]),
            max_score: dec!(5),
            curve: None,
            weight: Decimal::ONE,
        };
        let input = ScoreInput::Questions(vec![
            QuestionScore { question_id: "q1".into(), score: dec!(2) },
            QuestionScore { question_id: "q2".into(), score: dec!(1.5) },
        ]);
        let out = on_time(&policy, &input).unwrap();
        assert_eq!(out.final_score, dec!(3.5));
        assert_eq!(out.percentage, dec!(70));
    }

    #[test]
    fn test_curve_is_clamped_to_max() {
        let mut policy = flat(dec!(10));
        policy.curve = Some(CurveSettings::Linear { shift: dec!(3) });
        let out = on_time(&policy, &ScoreInput::Raw(dec!(9))).unwrap();
        assert_eq!(out.curved_score, dec!(10));
        assert_eq!(out.final_score, dec!(10));

        policy.curve = Some(CurveSettings::Linear { shift: dec!(-5) });
        let out = on_time(&policy, &ScoreInput::Raw(dec!(2))).unwrap();
        assert_eq!(out.final_score, dec!(0));
    }

    #[test]
    fn test_scale_curve_then_penalty() {
        let mut policy = flat(dec!(50));
        policy.curve = Some(CurveSettings::Scale { factor: dec!(1.1) });
        let out = compute(
            &policy,
            &ScoreInput::Raw(dec!(40)),
            LatePenalty::new(dec!(0.1), Some(1)),
            &GradeScale::default(),
        )
        .unwrap();
        // 40 * 1.1 = 44, then * 0.9
        assert_eq!(out.curved_score, dec!(44.0));
        assert_eq!(out.final_score, dec!(39.60));
    }

    #[test]
    fn test_heavy_penalty_floors_at_zero() {
        let out = compute(
            &flat(dec!(10)),
            &ScoreInput::Raw(dec!(10)),
            LatePenalty::new(dec!(0.25), Some(7)),
            &GradeScale::default(),
        )
        .unwrap();
        assert_eq!(out.final_score, Decimal::ZERO);
        assert_eq!(out.grade, "F");
    }

    #[test]
    fn test_rounds_half_up() {
        // 7 * (1 - 0.015 * 1) = 6.895
        let out = compute(
            &flat(dec!(10)),
            &ScoreInput::Raw(dec!(7)),
            LatePenalty::new(dec!(0.015), Some(1)),
            &GradeScale::default(),
        )
        .unwrap();
        assert_eq!(out.final_score, dec!(6.90));
    }

    #[test]
    fn test_negative_rate_is_rejected() {
        let err = compute(
            &flat(dec!(10)),
            &ScoreInput::Raw(dec!(5)),
            LatePenalty::new(dec!(-0.1), Some(1)),
            &GradeScale::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GradingError::InvalidGradingConfig(_)));
    }

    /// Final scores stay within `[0, max]` across a spread of inputs.
    #[test]
    fn test_final_score_always_in_bounds() {
        let curves = [
            None,
            Some(CurveSettings::Linear { shift: dec!(4) }),
            Some(CurveSettings::Linear { shift: dec!(-4) }),
            Some(CurveSettings::Scale { factor: dec!(1.5) }),
            Some(CurveSettings::Scale { factor: dec!(0.5) }),
        ];
        for curve in curves {
            for raw in 0..=20 {
                for days in 0..6 {
                    let mut policy = flat(dec!(20));
                    policy.curve = curve.clone();
                    let out = compute(
                        &policy,
                        &ScoreInput::Raw(Decimal::from(raw)),
                        LatePenalty::new(dec!(0.15), Some(days)),
                        &GradeScale::default(),
                    )
                    .unwrap();
                    assert!(out.final_score >= Decimal::ZERO);
                    assert!(out.final_score <= out.max_score);
                }
            }
        }
    }
}
