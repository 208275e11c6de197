//! Attempt history, spend counter and retention rules.

use serde_json::{json, Value};

use crate::attempt::{Attempt, ScoreMetrics};
use crate::config::AttemptsConfig;
use crate::error::StateError;

/// How recorded attempts are merged into the retained history.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// A pass, once achieved, is never lost to a later lower-scoring attempt.
    pub keep_passed: bool,
    /// The retained metrics never regress below the best attempt so far.
    pub keep_highest_score: bool,
    /// Keep every attempt instead of only the latest entry.
    pub store_all_attempts: bool,
}

/// Ordered attempt history plus the spend counter.
///
/// With single-entry retention the history never grows past one record;
/// each `record` call replaces the sole entry, carrying pass state and best
/// metrics forward per the policy.
#[derive(Debug, Clone)]
pub struct Attempts {
    limit: i64,
    used: u32,
    history: Vec<Attempt>,
    retention: RetentionPolicy,
}

impl Attempts {
    pub fn new(config: &AttemptsConfig) -> Self {
        Self {
            limit: config.limit,
            used: 0,
            history: Vec::new(),
            retention: RetentionPolicy {
                keep_passed: config.keep_passed,
                keep_highest_score: config.keep_highest_score,
                store_all_attempts: config.store_all_attempts,
            },
        }
    }

    /// Spend one attempt.
    ///
    /// No upper bound is enforced here; callers consult
    /// [`has_remaining`](Self::has_remaining) first.
    pub fn spend(&mut self) {
        self.used += 1;
    }

    /// Record an ended attempt into the history.
    pub fn record(&mut self, attempt: Attempt) {
        let attempt = merge_for_record(attempt, self.last(), self.highest_scored(), self.retention);
        if !self.retention.store_all_attempts {
            self.history.clear();
        }
        self.history.push(attempt);
    }

    /// Rehydrate the counter and history from a saved-state pair.
    pub fn restore(&mut self, data: &Value) -> Result<(), StateError> {
        let items = data.as_array().ok_or(StateError::TypeMismatch {
            expected: "attempts state array",
        })?;
        if items.len() != 2 {
            return Err(StateError::WrongArity {
                expected: "2",
                found: items.len(),
            });
        }
        let counters = items[0].as_array().ok_or(StateError::TypeMismatch {
            expected: "used counter array",
        })?;
        if counters.len() != 1 {
            return Err(StateError::WrongArity {
                expected: "1",
                found: counters.len(),
            });
        }
        let used = counters[0].as_i64().ok_or(StateError::TypeMismatch {
            expected: "used counter number",
        })?;
        if used < 0 {
            return Err(StateError::InvalidCount(used));
        }
        let entries = items[1].as_array().ok_or(StateError::TypeMismatch {
            expected: "attempt history array",
        })?;
        let mut history = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut attempt = Attempt::new();
            attempt.restore(entry)?;
            history.push(attempt);
        }
        self.used = used as u32;
        self.history = history;
        Ok(())
    }

    /// The saved-state pair: `[[used], [attempt tuples...]]`.
    ///
    /// The counter is wrapped in its own singleton array for symmetry with
    /// the history array, as the wire serializer requires nesting.
    pub fn save_state(&self) -> Value {
        json!([
            [self.used],
            self.history
                .iter()
                .map(Attempt::save_state)
                .collect::<Vec<_>>(),
        ])
    }

    /// The configured attempt limit; non-positive means infinite.
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Attempts spent so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Attempts remaining when the limit is finite.
    pub fn remaining(&self) -> i64 {
        self.limit - i64::from(self.used)
    }

    /// Whether the learner has unlimited attempts.
    pub fn is_infinite(&self) -> bool {
        self.limit <= 0
    }

    /// Whether another attempt may be spent.
    pub fn has_remaining(&self) -> bool {
        self.is_infinite() || self.remaining() > 0
    }

    /// The retained history, oldest first.
    pub fn history(&self) -> &[Attempt] {
        &self.history
    }

    /// The most recent history entry.
    pub fn last(&self) -> Option<&Attempt> {
        self.history.last()
    }

    /// The entry with the highest score.
    ///
    /// Strict comparison; the earliest entry wins ties.
    pub fn highest_scored(&self) -> Option<&Attempt> {
        self.history
            .iter()
            .reduce(|best, attempt| if attempt.score() > best.score() { attempt } else { best })
    }

    /// The settled pass state.
    pub fn was_passed(&self) -> bool {
        if self.retention.keep_passed {
            self.history.iter().any(Attempt::is_passed)
        } else {
            self.last().is_some_and(Attempt::is_passed)
        }
    }

    /// The settled completion state.
    pub fn was_complete(&self) -> bool {
        self.last().is_some_and(Attempt::is_complete)
    }

    /// The settled metrics, sourced per the retention policy.
    pub fn settled_metrics(&self) -> ScoreMetrics {
        let source = if self.retention.keep_highest_score {
            self.highest_scored()
        } else {
            self.last()
        };
        source.map(Attempt::metrics).unwrap_or_default()
    }

    pub fn min_score(&self) -> f64 {
        self.settled_metrics().min_score
    }

    pub fn max_score(&self) -> f64 {
        self.settled_metrics().max_score
    }

    pub fn score(&self) -> f64 {
        self.settled_metrics().score
    }

    pub fn correctness(&self) -> f64 {
        self.settled_metrics().correctness
    }
}

/// Apply the carry-forward rules to an attempt about to enter the history.
///
/// `last` and `highest` are evaluated against the history as it stood
/// before this record.
fn merge_for_record(
    mut attempt: Attempt,
    last: Option<&Attempt>,
    highest: Option<&Attempt>,
    policy: RetentionPolicy,
) -> Attempt {
    if policy.keep_passed && last.is_some_and(Attempt::is_passed) {
        attempt.mark_passed();
    }
    if policy.keep_highest_score {
        if let Some(highest) = highest {
            if attempt.score() < highest.score() {
                attempt.replace_metrics(highest.metrics());
            }
        }
    }
    attempt
}
