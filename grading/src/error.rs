//! Grading Error Types
//!
//! This module defines [`GradingError`], the single error type returned by the
//! state machine, the policy resolver and the score computer. Each variant names
//! the rule that was broken so callers can map it to a user-facing message.
//!
//! # Example
//!
//! ```rust
//! use grading::error::GradingError;
//! use grading::types::ContentType;
//!
//! fn require_config(found: bool) -> Result<(), GradingError> {
//!     if !found {
//!         return Err(GradingError::MissingGradingConfig(ContentType::Quiz));
//!     }
//!     Ok(())
//! }
//! ```

use crate::types::{Actor, ContentType, SubmissionState};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GradingError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: SubmissionState,
        to: SubmissionState,
    },

    #[error("No grading configuration for {0} content")]
    MissingGradingConfig(ContentType),

    #[error("Score {score} for '{item}' is outside [0, {max}]")]
    ScoreOutOfRange {
        item: String,
        score: Decimal,
        max: Decimal,
    },

    #[error("Attempt {attempt} exceeds the limit of {max}")]
    AttemptLimitExceeded { attempt: u32, max: u32 },

    #[error("Content is not published")]
    ContentNotPublished,

    #[error("{actor} may not {action}")]
    ActorNotPermitted { actor: Actor, action: &'static str },

    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    #[error("Resubmission is not allowed for this content")]
    ResubmissionNotAllowed,

    #[error("{0} content is not gradable")]
    NotGradable(ContentType),

    #[error("Invalid grading configuration: {0}")]
    InvalidGradingConfig(String),

    #[error("Unknown or duplicated score item '{0}'")]
    UnknownScoreItem(String),

    #[error("Score input does not match the {expected} policy")]
    ScoreInputMismatch { expected: &'static str },
}
