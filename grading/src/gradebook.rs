//! Attempt selection and weighted totals.

use crate::round2;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use util::grading_options::GradingPolicy;

/// Graded result of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptScore {
    pub attempt_number: u32,
    pub final_score: Decimal,
    pub max_score: Decimal,
}

impl AttemptScore {
    pub fn ratio(&self) -> Decimal {
        if self.max_score <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            self.final_score / self.max_score
        }
    }
}

/// Pick the attempt that counts under `policy`.
///
/// `Best` compares score ratios and breaks ties in favour of the later attempt.
pub fn select_attempt(policy: GradingPolicy, attempts: &[AttemptScore]) -> Option<&AttemptScore> {
    match policy {
        GradingPolicy::Last => attempts.iter().max_by_key(|a| a.attempt_number),
        GradingPolicy::Best => attempts.iter().max_by(|a, b| match a.ratio().cmp(&b.ratio()) {
            Ordering::Equal => a.attempt_number.cmp(&b.attempt_number),
            ord => ord,
        }),
    }
}

/// One graded item feeding a weighted total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedScore {
    pub weight: Decimal,
    pub final_score: Decimal,
    pub max_score: Decimal,
}

/// `Σ weight * final / max / Σ weight * 100`, rounded to two places.
///
/// Items with a non-positive weight or max are skipped. Returns `None` when
/// nothing counts.
pub fn weighted_percentage(items: &[WeightedScore]) -> Option<Decimal> {
    let counted: Vec<&WeightedScore> = items
        .iter()
        .filter(|i| i.weight > Decimal::ZERO && i.max_score > Decimal::ZERO)
        .collect();

    let total_weight: Decimal = counted.iter().map(|i| i.weight).sum();
    if total_weight.is_zero() {
        return None;
    }

    let weighted: Decimal = counted
        .iter()
        .map(|i| i.weight * i.final_score / i.max_score)
        .sum();

    Some(round2(weighted / total_weight * Decimal::ONE_HUNDRED))
}
