//! Configuration structures for tests and the course.
//!
//! These are plain `serde` shapes with the same defaults the authoring
//! tools emit, so a course definition can be parsed from TOML or JSON
//! without a separate intermediate layer.

use serde::Deserialize;

use crate::reset::ResetStrength;

/// Configuration for a single test.
#[derive(Debug, Clone, Deserialize)]
pub struct TestConfig {
    /// Unique identifier for this test.
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Disabled tests are never registered.
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    /// Whether this test's score contributes to the course total.
    #[serde(default = "default_true")]
    pub is_score_included: bool,
    #[serde(default)]
    pub attempts: AttemptsConfig,
    #[serde(default)]
    pub passmark: PassmarkConfig,
    #[serde(default)]
    pub reset: ResetConfig,
    /// Display settings pushed into every owned question.
    #[serde(default)]
    pub questions: QuestionVisibilityConfig,
    /// Hold marking back until no attempts remain.
    #[serde(default)]
    pub suppress_marking: bool,
    /// Emit flat legacy-shape state payloads alongside lifecycle events.
    #[serde(default = "default_true")]
    pub emit_legacy_state: bool,
}

/// Attempt limit and history retention settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptsConfig {
    /// Allowed attempts; a non-positive value or `"infinite"` means unlimited.
    #[serde(default = "default_limit", deserialize_with = "deserialize_limit")]
    pub limit: i64,
    /// Once an attempt passes, later lower-scoring attempts keep the pass.
    #[serde(default)]
    pub keep_passed: bool,
    /// The externally visible score never regresses below the best attempt.
    #[serde(default)]
    pub keep_highest_score: bool,
    /// Retain the full attempt history instead of only the latest entry.
    #[serde(default)]
    pub store_all_attempts: bool,
}

impl Default for AttemptsConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            keep_passed: false,
            keep_highest_score: false,
            store_all_attempts: false,
        }
    }
}

fn default_limit() -> i64 {
    1
}

fn deserialize_limit<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawLimit {
        Count(i64),
        Keyword(String),
    }

    match RawLimit::deserialize(deserializer)? {
        RawLimit::Count(n) => Ok(n),
        RawLimit::Keyword(s) if s == "infinite" => Ok(-1),
        RawLimit::Keyword(s) => Err(serde::de::Error::custom(format!(
            "unknown attempt limit: {s}"
        ))),
    }
}

/// Pass thresholds for a single test.
#[derive(Debug, Clone, Deserialize)]
pub struct PassmarkConfig {
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    /// Course-level only: every test must also be passed for completion.
    #[serde(default)]
    pub requires_passed_subsets: bool,
    #[serde(default = "default_threshold")]
    pub score: f64,
    #[serde(default = "default_threshold")]
    pub correctness: f64,
    /// Compare thresholds against percentage-scaled values instead of raw ones.
    #[serde(default = "default_true")]
    pub is_scaled: bool,
}

impl Default for PassmarkConfig {
    fn default() -> Self {
        Self {
            is_enabled: true,
            requires_passed_subsets: false,
            score: default_threshold(),
            correctness: default_threshold(),
            is_scaled: true,
        }
    }
}

fn default_threshold() -> f64 {
    100.0
}

/// Reset behavior for a single test.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    #[serde(default = "default_true")]
    pub reload_page: bool,
    #[serde(default = "default_true")]
    pub scroll_to: bool,
    /// Reset strength applied to question components.
    #[serde(default = "default_hard")]
    pub scoring: ResetStrength,
    /// Reset strength applied to presentational components.
    #[serde(default = "default_soft")]
    pub non_scoring: ResetStrength,
    #[serde(default)]
    pub failed: RevisitConfig,
    #[serde(default)]
    pub passed: RevisitConfig,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            reload_page: true,
            scroll_to: true,
            scoring: ResetStrength::Hard,
            non_scoring: ResetStrength::Soft,
            failed: RevisitConfig::default(),
            passed: RevisitConfig::default(),
        }
    }
}

fn default_hard() -> ResetStrength {
    ResetStrength::Hard
}

fn default_soft() -> ResetStrength {
    ResetStrength::Soft
}

/// Reset rules applied when arriving back at a test in a given pass state.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RevisitConfig {
    #[serde(default = "default_true")]
    pub can_reset: bool,
    #[serde(default = "default_true")]
    pub reset_on_revisit: bool,
}

impl Default for RevisitConfig {
    fn default() -> Self {
        Self {
            can_reset: true,
            reset_on_revisit: true,
        }
    }
}

/// Question display settings owned by the test.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct QuestionVisibilityConfig {
    #[serde(default)]
    pub can_show_feedback: bool,
    #[serde(default)]
    pub can_show_marking: bool,
    #[serde(default)]
    pub can_show_model_answer: bool,
}

/// Course-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseConfig {
    #[serde(default = "default_course_passmark")]
    pub passmark: PassmarkConfig,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            passmark: default_course_passmark(),
        }
    }
}

fn default_course_passmark() -> PassmarkConfig {
    PassmarkConfig {
        is_enabled: true,
        requires_passed_subsets: true,
        score: 75.0,
        correctness: 50.0,
        is_scaled: true,
    }
}

fn default_true() -> bool {
    true
}
