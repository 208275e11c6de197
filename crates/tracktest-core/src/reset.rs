//! Reset policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ResetConfig, RevisitConfig};

/// How much of a component's state a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetStrength {
    /// Clear completion only; keep the learner's answers.
    Soft,
    /// Clear completion and answers.
    Hard,
}

impl fmt::Display for ResetStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetStrength::Soft => write!(f, "soft"),
            ResetStrength::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for ResetStrength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "soft" => Ok(ResetStrength::Soft),
            "hard" => Ok(ResetStrength::Hard),
            other => Err(format!("unknown reset strength: {other}")),
        }
    }
}

/// Reset rules applied when arriving back at a test in a given pass state.
#[derive(Debug, Clone, Copy)]
pub struct RevisitRule {
    pub can_reset: bool,
    pub reset_on_revisit: bool,
}

impl RevisitRule {
    fn new(config: &RevisitConfig) -> Self {
        Self {
            can_reset: config.can_reset,
            reset_on_revisit: config.reset_on_revisit,
        }
    }
}

/// Immutable policy describing reset behavior for one test.
///
/// The passed and failed sub-rules are independently configurable; callers
/// select between them from the current pass state.
#[derive(Debug, Clone)]
pub struct ResetPolicy {
    reload_page: bool,
    scroll_to: bool,
    scoring: ResetStrength,
    non_scoring: ResetStrength,
    failed: RevisitRule,
    passed: RevisitRule,
}

impl ResetPolicy {
    pub fn new(config: &ResetConfig) -> Self {
        Self {
            reload_page: config.reload_page,
            scroll_to: config.scroll_to,
            scoring: config.scoring,
            non_scoring: config.non_scoring,
            failed: RevisitRule::new(&config.failed),
            passed: RevisitRule::new(&config.passed),
        }
    }

    /// Whether to reload the page after a reset.
    pub fn reload_page(&self) -> bool {
        self.reload_page
    }

    /// Whether to scroll to the test after a reset.
    pub fn scroll_to(&self) -> bool {
        self.scroll_to
    }

    /// Reset strength for question components.
    pub fn scoring(&self) -> ResetStrength {
        self.scoring
    }

    /// Reset strength for presentational components.
    pub fn non_scoring(&self) -> ResetStrength {
        self.non_scoring
    }

    /// Rules applied while the test is failed.
    pub fn failed(&self) -> &RevisitRule {
        &self.failed
    }

    /// Rules applied while the test is passed.
    pub fn passed(&self) -> &RevisitRule {
        &self.passed
    }
}
