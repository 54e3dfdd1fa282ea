//! Request payloads accepted by the services, validated eagerly.

use chrono::{DateTime, Utc};
use grading::scorer::ScoreInput;
use grading::types::ContentType;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative"));
    }
    Ok(())
}

fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("not_positive"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContentRequest {
    pub module_section_id: i64,

    #[validate(
        length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"),
        custom(function = "not_blank", message = "Title must not be blank")
    )]
    pub title: String,

    pub content_type: ContentType,

    #[validate(range(min = 0, message = "Position must not be negative"))]
    pub position: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignmentRequest {
    #[validate(nested)]
    pub content: CreateContentRequest,

    #[validate(custom(function = "positive", message = "Points must be positive"))]
    pub points: Option<Decimal>,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(range(min = 1, message = "Max attempts must be at least 1"))]
    pub max_attempts: u32,

    #[serde(default)]
    pub allow_resubmission: bool,

    #[serde(default)]
    #[validate(custom(function = "non_negative", message = "Late penalty must not be negative"))]
    pub late_penalty: Decimal,

    #[serde(default)]
    pub is_group: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuizRequest {
    #[validate(nested)]
    pub content: CreateContentRequest,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(range(min = 1, message = "Time limit must be at least one minute"))]
    pub time_limit_minutes: Option<u32>,

    #[validate(range(min = 1, message = "Max attempts must be at least 1"))]
    pub max_attempts: u32,

    #[serde(default)]
    pub allow_retake: bool,

    #[serde(default)]
    #[validate(custom(function = "non_negative", message = "Late penalty must not be negative"))]
    pub late_penalty: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveDraftRequest {
    pub content_id: i64,
    pub student_id: i64,
    pub content: serde_json::Value,
    #[serde(default)]
    pub group_snapshot: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReturnForRevisionRequest {
    /// Length is checked against the configured limit when the return is applied.
    #[validate(custom(function = "not_blank", message = "Feedback is required"))]
    pub feedback: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GradeRequest {
    pub input: ScoreInput,

    #[validate(length(max = 1000, message = "Feedback must be at most 1000 characters"))]
    pub feedback: Option<String>,

    /// `None` when the grade comes from auto-grading.
    pub grader_id: Option<i64>,
}
