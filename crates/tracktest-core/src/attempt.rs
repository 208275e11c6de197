//! A single attempt and its saved-state tuple.

use serde_json::{json, Value};

use crate::error::StateError;

/// The four aggregate values captured from the owning test.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreMetrics {
    pub min_score: f64,
    pub max_score: f64,
    pub score: f64,
    pub correctness: f64,
}

/// One complete play-through cycle of a test, from start to end.
///
/// `is_in_session` is transient: it reflects whether the learner is
/// currently viewing content governed by this attempt, is cleared on every
/// navigation event, and is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    is_in_session: bool,
    is_in_progress: bool,
    metrics: ScoreMetrics,
    is_complete: bool,
    is_passed: bool,
    question_refs: Option<Vec<String>>,
}

impl Default for Attempt {
    fn default() -> Self {
        Self::new()
    }
}

impl Attempt {
    pub fn new() -> Self {
        Self {
            is_in_session: false,
            is_in_progress: false,
            metrics: ScoreMetrics::default(),
            is_complete: false,
            is_passed: false,
            question_refs: None,
        }
    }

    /// Start the attempt.
    ///
    /// Idempotent while the attempt has not ended; starting an ended
    /// attempt is ignored (lifecycle ordering is enforced by the owning
    /// test, not here).
    pub fn start(&mut self) {
        if self.is_complete {
            return;
        }
        self.is_in_session = true;
        self.is_in_progress = true;
    }

    /// Capture the live aggregate values from the owning test.
    pub fn capture(&mut self, metrics: ScoreMetrics) {
        self.metrics = metrics;
    }

    /// Record which question instances contributed to this attempt.
    pub fn set_question_refs(&mut self, refs: Option<Vec<String>>) {
        self.question_refs = refs;
    }

    /// End the attempt with the given pass outcome.
    pub fn end(&mut self, passed: bool) {
        self.is_in_progress = false;
        self.is_complete = true;
        self.is_passed = passed;
    }

    /// Clear the learner-is-viewing flag on a navigation event.
    pub fn leave_session(&mut self) {
        self.is_in_session = false;
    }

    /// Reset every field back to its starting default.
    ///
    /// Does not alter `is_in_session`.
    pub fn reset(&mut self) {
        self.is_in_progress = false;
        self.metrics = ScoreMetrics::default();
        self.is_complete = false;
        self.is_passed = false;
        self.question_refs = None;
    }

    pub(crate) fn mark_passed(&mut self) {
        self.is_passed = true;
    }

    pub(crate) fn replace_metrics(&mut self, metrics: ScoreMetrics) {
        self.metrics = metrics;
    }

    pub fn is_in_session(&self) -> bool {
        self.is_in_session
    }

    pub fn is_in_progress(&self) -> bool {
        self.is_in_progress
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn is_passed(&self) -> bool {
        self.is_passed
    }

    pub fn metrics(&self) -> ScoreMetrics {
        self.metrics
    }

    pub fn min_score(&self) -> f64 {
        self.metrics.min_score
    }

    pub fn max_score(&self) -> f64 {
        self.metrics.max_score
    }

    pub fn score(&self) -> f64 {
        self.metrics.score
    }

    pub fn correctness(&self) -> f64 {
        self.metrics.correctness
    }

    pub fn question_refs(&self) -> Option<&[String]> {
        self.question_refs.as_deref()
    }

    /// The saved-state tuple.
    ///
    /// `[in_progress, min, max, score, correctness, complete, passed]`,
    /// flags as the literals `0`/`1`, with the ordered question refs
    /// appended as a trailing array only when present.
    pub fn save_state(&self) -> Value {
        let mut state = vec![
            json!(flag_to_wire(self.is_in_progress)),
            json!(self.metrics.min_score),
            json!(self.metrics.max_score),
            json!(self.metrics.score),
            json!(self.metrics.correctness),
            json!(flag_to_wire(self.is_complete)),
            json!(flag_to_wire(self.is_passed)),
        ];
        if let Some(refs) = &self.question_refs {
            state.push(json!(refs));
        }
        Value::Array(state)
    }

    /// Rehydrate from a saved-state tuple; the exact inverse of
    /// [`save_state`](Self::save_state).
    ///
    /// Does not alter `is_in_session`. Shape violations reject the whole
    /// restore.
    pub fn restore(&mut self, data: &Value) -> Result<(), StateError> {
        let items = data.as_array().ok_or(StateError::TypeMismatch {
            expected: "attempt tuple array",
        })?;
        if items.len() != 7 && items.len() != 8 {
            return Err(StateError::WrongArity {
                expected: "7 or 8",
                found: items.len(),
            });
        }
        let question_refs = match items.get(7) {
            Some(refs) => Some(wire_to_refs(refs)?),
            None => None,
        };
        self.is_in_progress = wire_to_flag(&items[0])?;
        self.metrics = ScoreMetrics {
            min_score: wire_to_number(&items[1])?,
            max_score: wire_to_number(&items[2])?,
            score: wire_to_number(&items[3])?,
            correctness: wire_to_number(&items[4])?,
        };
        self.is_complete = wire_to_flag(&items[5])?;
        self.is_passed = wire_to_flag(&items[6])?;
        self.question_refs = question_refs;
        Ok(())
    }
}

fn flag_to_wire(flag: bool) -> u8 {
    if flag {
        1
    } else {
        0
    }
}

fn wire_to_flag(value: &Value) -> Result<bool, StateError> {
    let number = wire_to_number(value)?;
    match number {
        n if n == 0.0 => Ok(false),
        n if n == 1.0 => Ok(true),
        n => Err(StateError::InvalidFlag(n)),
    }
}

fn wire_to_number(value: &Value) -> Result<f64, StateError> {
    value.as_f64().ok_or(StateError::TypeMismatch {
        expected: "number",
    })
}

fn wire_to_refs(value: &Value) -> Result<Vec<String>, StateError> {
    let items = value.as_array().ok_or(StateError::TypeMismatch {
        expected: "question ref array",
    })?;
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or(StateError::TypeMismatch {
                    expected: "question ref string",
                })
        })
        .collect()
}
