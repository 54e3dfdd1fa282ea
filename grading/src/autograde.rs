//! Quiz auto-grading against answer keys.
//!
//! Answers arrive as a JSON object keyed by question id. Scalars are compared
//! after normalisation (strings are trimmed and, unless the rule is case
//! sensitive, lower-cased; numbers are compared by value), arrays are compared
//! as unordered sets, and anything else must match structurally.

use crate::types::{QuestionRule, QuestionScore};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Score every auto-graded rule. Manual questions are left for a grader and do
/// not appear in the result.
pub fn autograde(rules: &[QuestionRule], answers: &Value) -> Vec<QuestionScore> {
    rules
        .iter()
        .filter(|rule| rule.auto_graded)
        .map(|rule| {
            let correct = match (&rule.answer_key, answers.get(&rule.question_id)) {
                (Some(key), Some(answer)) => matches_key(key, answer, rule.case_sensitive),
                _ => false,
            };
            QuestionScore {
                question_id: rule.question_id.clone(),
                score: if correct { rule.points } else { Decimal::ZERO },
            }
        })
        .collect()
}

fn matches_key(key: &Value, answer: &Value, case_sensitive: bool) -> bool {
    match (key, answer) {
        (Value::Array(expected), Value::Array(given)) => {
            let expected = normalise_all(expected, case_sensitive);
            let given = normalise_all(given, case_sensitive);
            matches!((expected, given), (Some(e), Some(g)) if e == g)
        }
        (Value::Array(_), _) | (_, Value::Array(_)) => false,
        _ => match (normalise(key, case_sensitive), normalise(answer, case_sensitive)) {
            (Some(k), Some(a)) => k == a,
            _ => key == answer,
        },
    }
}

fn normalise_all(values: &[Value], case_sensitive: bool) -> Option<BTreeSet<String>> {
    values.iter().map(|v| normalise(v, case_sensitive)).collect()
}

fn normalise(value: &Value, case_sensitive: bool) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            // Numeric text is compared by value so "4.0" matches 4.
            if let Ok(n) = Decimal::from_str(trimmed) {
                return Some(n.normalize().to_string());
            }
            Some(if case_sensitive {
                trimmed.to_string()
            } else {
                trimmed.to_lowercase()
            })
        }
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .map(|d| d.normalize().to_string())
            .ok()
            .or_else(|| Some(n.to_string())),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn rule(id: &str, points: Decimal, key: Value) -> QuestionRule {
        QuestionRule {
            question_id: id.into(),
            points,
            auto_graded: true,
            answer_key: Some(key),
            case_sensitive: false,
        }
    }

    fn score_of(scores: &[QuestionScore], id: &str) -> Decimal {
        scores
            .iter()
            .find(|s| s.question_id == id)
            .map(|s| s.score)
            .unwrap()
    }

    #[test]
    fn test_strings_trimmed_and_case_insensitive() {
        let rules = vec![rule("capital", dec!(2), json!("Paris"))];
        let scores = autograde(&rules, &json!({ "capital": "  paris " }));
        assert_eq!(score_of(&scores, "capital"), dec!(2));
    }

    #[test]
    fn test_case_sensitive_rule() {
        let mut r = rule("symbol", dec!(1), json!("Na"));
        r.case_sensitive = true;
        let scores = autograde(&[r], &json!({ "symbol": "NA" }));
        assert_eq!(score_of(&scores, "symbol"), Decimal::ZERO);
    }

    #[test]
    fn test_arrays_are_unordered_sets() {
        let rules = vec![rule("primes", dec!(3), json!([2, 3, 5]))];
        let right = autograde(&rules, &json!({ "primes": [5, "2", 3] }));
        assert_eq!(score_of(&right, "primes"), dec!(3));

        let wrong = autograde(&rules, &json!({ "primes": [2, 3] }));
        assert_eq!(score_of(&wrong, "primes"), Decimal::ZERO);
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let rules = vec![rule("sum", dec!(1), json!(4))];
        let scores = autograde(&rules, &json!({ "sum": 4.0 }));
        assert_eq!(score_of(&scores, "sum"), dec!(1));
    }

    #[test]
    fn test_objects_compare_structurally() {
        let rules = vec![rule("pair", dec!(1), json!({ "a": 1, "b": [1, 2] }))];
        let scores = autograde(&rules, &json!({ "pair": { "b": [1, 2], "a": 1 } }));
        assert_eq!(score_of(&scores, "pair"), dec!(1));
    }

    #[test]
    fn test_missing_answers_and_manual_questions() {
        let mut essay = rule("essay", dec!(10), json!(null));
        essay.auto_graded = false;
        let rules = vec![rule("q1", dec!(2), json!(true)), essay];

        let scores = autograde(&rules, &json!({}));
        assert_eq!(scores.len(), 1);
        assert_eq!(score_of(&scores, "q1"), Decimal::ZERO);
    }
}
