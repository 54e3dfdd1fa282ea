use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::config;

/// Which graded attempt counts towards the gradebook.
#[derive(Debug, Clone, Deserialize, Serialize, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GradingPolicy {
    Best, // highest percentage across attempts
    #[default]
    Last, // the most recent attempt
}

/// One band of the letter-grade table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GradeBand {
    /// Minimum percentage (0–100, inclusive) needed for this band.
    pub min_percent: Decimal,
    pub label: String,
}

/// Letter-grade table. Bands are kept sorted by descending `min_percent`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(from = "Vec<GradeBand>", into = "Vec<GradeBand>")]
pub struct GradeScale {
    bands: Vec<GradeBand>,
}

impl GradeScale {
    pub fn new(mut bands: Vec<GradeBand>) -> Self {
        bands.sort_by(|a, b| b.min_percent.cmp(&a.min_percent));
        Self { bands }
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    /// Label for a percentage. Anything below the lowest band falls into it.
    pub fn label_for(&self, percentage: Decimal) -> &str {
        self.bands
            .iter()
            .find(|band| percentage >= band.min_percent)
            .or_else(|| self.bands.last())
            .map(|band| band.label.as_str())
            .unwrap_or("")
    }
}

impl Default for GradeScale {
    fn default() -> Self {
        default_grade_scale()
    }
}

impl From<Vec<GradeBand>> for GradeScale {
    fn from(bands: Vec<GradeBand>) -> Self {
        GradeScale::new(bands)
    }
}

impl From<GradeScale> for Vec<GradeBand> {
    fn from(scale: GradeScale) -> Self {
        scale.bands
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GradingOptions {
    #[serde(default = "default_grade_scale")]
    pub grade_scale: GradeScale,

    #[serde(default)]
    pub grading_policy: GradingPolicy,

    /// Attempt limit used when a content item does not set its own.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,

    /// Per-day fractional deduction used when a content item does not set its own.
    #[serde(default = "default_late_penalty")]
    pub default_late_penalty: Decimal,

    /// Upper bound on revision feedback length, in characters.
    #[serde(default = "default_feedback_max_chars")]
    pub feedback_max_chars: usize,
}

impl Default for GradingOptions {
    fn default() -> Self {
        Self {
            grade_scale: default_grade_scale(),
            grading_policy: GradingPolicy::default(),
            default_max_attempts: default_max_attempts(),
            default_late_penalty: default_late_penalty(),
            feedback_max_chars: default_feedback_max_chars(),
        }
    }
}

impl GradingOptions {
    /// Load options from `path`. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No grading options at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read grading options at {path:?}: {e}"))?;

        serde_json::from_str(&contents)
            .map_err(|e| format!("Invalid grading options JSON at {path:?}: {e}"))
    }

    /// Load options from the path configured in `GRADING_OPTIONS_PATH`.
    pub fn load() -> Result<Self, String> {
        Self::load_from(config::grading_options_path())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create options directory: {e:?}"))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize grading options: {e}"))?;

        fs::write(path, json).map_err(|e| format!("Failed to write grading options: {e:?}"))
    }
}

//Default Functions

fn default_grade_scale() -> GradeScale {
    GradeScale::new(vec![
        GradeBand { min_percent: Decimal::from(90), label: "A".into() },
        GradeBand { min_percent: Decimal::from(80), label: "B".into() },
        GradeBand { min_percent: Decimal::from(70), label: "C".into() },
        GradeBand { min_percent: Decimal::from(60), label: "D".into() },
        GradeBand { min_percent: Decimal::ZERO, label: "F".into() },
    ])
}

fn default_max_attempts() -> u32 {
    1
}

fn default_late_penalty() -> Decimal {
    Decimal::ZERO
}

fn default_feedback_max_chars() -> usize {
    1000
}
