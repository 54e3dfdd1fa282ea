//! # Grading Core
//!
//! Pure domain logic for the coursework submission lifecycle. Nothing in this
//! crate touches the database or the clock; callers pass `now` and the stored
//! facts in, and persist whatever comes back.
//!
//! ## Key Concepts
//! - **State machine** ([`state_machine`]): which lifecycle moves are allowed
//!   for a submission.
//! - **Resolver** ([`resolver`]): picks rubric, question-rule or flat-points
//!   scoring for a content item.
//! - **Scorer** ([`scorer`]): turns grader input into a curved, late-penalised,
//!   rounded score and grade.
//! - **Publish window** ([`publish_window`]): visibility of content from its publish timestamps.
//! - **Auto-grading** ([`autograde`]) and **gradebook** helpers ([`gradebook`]).
//!
//! With the `sea-orm` feature enabled, [`types::ContentType`] and
//! [`types::SubmissionState`] derive `DeriveActiveEnum` and can be used as
//! entity columns directly.

pub mod autograde;
pub mod error;
pub mod gradebook;
pub mod publish_window;
pub mod resolver;
pub mod scorer;
pub mod state_machine;
pub mod types;

pub use error::GradingError;
pub use resolver::{PolicyKind, ScoringPolicy, resolve};
pub use scorer::{LatePenalty, ScoreBreakdown, ScoreInput, compute};
pub use state_machine::{Action, TransitionContext, TransitionOutcome, transition};
pub use types::{Actor, ContentType, SubmissionState};

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two decimal places, halves away from zero.
///
/// Scores are never negative, so this is the usual round-half-up.
pub fn round2(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
