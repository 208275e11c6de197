//! One scored test bound to a content subtree.
//!
//! Owns the passmark, reset policy, attempt history and the current
//! attempt; derives live and settled aggregates; and drives the
//! reset/retry lifecycle from navigation and completion events.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::attempt::{Attempt, ScoreMetrics};
use crate::attempts::Attempts;
use crate::config::TestConfig;
use crate::error::StateError;
use crate::events::{LegacyState, LifecyclePoint, TestSnapshot};
use crate::marking::Marking;
use crate::passmark::Passmark;
use crate::reset::ResetPolicy;
use crate::scaling::scaled_from_min_max;
use crate::traits::{
    ComponentModel, ContentKind, ContentSubtree, HostContext, Location, QuestionSettings,
};

/// Namespace key under which every test's blob is stored, keyed by test id.
pub const SAVE_STATE_KEY: &str = "tests";

/// One scored assessment bound to a subtree of content.
pub struct TestSet {
    config: TestConfig,
    passmark: Passmark,
    reset_policy: ResetPolicy,
    marking: Marking,
    attempts: Attempts,
    attempt: Attempt,
    content: Arc<dyn ContentSubtree>,
    host: HostContext,
    /// True between a completed reset and the next arrival decision.
    has_reset_since_entry: bool,
    was_complete: bool,
    was_passed: bool,
}

impl TestSet {
    pub fn new(config: TestConfig, content: Arc<dyn ContentSubtree>, host: HostContext) -> Self {
        let passmark = Passmark::new(&config.passmark);
        let reset_policy = ResetPolicy::new(&config.reset);
        let marking = Marking::new(config.questions.can_show_marking, config.suppress_marking);
        let attempts = Attempts::new(&config.attempts);
        let set = Self {
            config,
            passmark,
            reset_policy,
            marking,
            attempts,
            attempt: Attempt::new(),
            content,
            host,
            has_reset_since_entry: false,
            was_complete: false,
            was_passed: false,
        };
        set.apply_question_settings();
        set.emit_legacy(LifecyclePoint::Registered);
        set
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled
    }

    pub fn is_score_included(&self) -> bool {
        self.config.is_score_included
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn passmark(&self) -> &Passmark {
        &self.passmark
    }

    pub fn reset_policy(&self) -> &ResetPolicy {
        &self.reset_policy
    }

    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    pub fn attempts(&self) -> &Attempts {
        &self.attempts
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn content(&self) -> &Arc<dyn ContentSubtree> {
        &self.content
    }

    /// Every available component beneath the subtree.
    pub fn components(&self) -> Vec<Arc<dyn ComponentModel>> {
        self.content
            .components()
            .into_iter()
            .filter(|model| model.is_available())
            .collect()
    }

    /// The available question components.
    pub fn questions(&self) -> Vec<Arc<dyn ComponentModel>> {
        self.components()
            .into_iter()
            .filter(|model| model.is_question())
            .collect()
    }

    /// The available presentational components.
    pub fn non_questions(&self) -> Vec<Arc<dyn ComponentModel>> {
        self.components()
            .into_iter()
            .filter(|model| !model.is_question())
            .collect()
    }

    fn live_metrics(&self) -> ScoreMetrics {
        let mut metrics = ScoreMetrics::default();
        for question in self.questions() {
            metrics.min_score += question.min_score();
            metrics.max_score += question.max_score();
            metrics.score += question.score();
            if question.is_correct() {
                metrics.correctness += 1.0;
            }
        }
        metrics
    }

    /// Whether reads come from the settled history rather than live content.
    ///
    /// Live while an attempt is in session or the test has never completed,
    /// so play shows real-time values; settled once an attempt has ended and
    /// focus moved away, so revisiting never perturbs the recorded score.
    fn is_settled(&self) -> bool {
        self.is_complete() && !self.attempt.is_in_session()
    }

    pub fn min_score(&self) -> f64 {
        if self.is_settled() {
            self.attempts.min_score()
        } else {
            self.live_metrics().min_score
        }
    }

    pub fn max_score(&self) -> f64 {
        if self.is_settled() {
            self.attempts.max_score()
        } else {
            self.live_metrics().max_score
        }
    }

    pub fn score(&self) -> f64 {
        if self.is_settled() {
            self.attempts.score()
        } else {
            self.live_metrics().score
        }
    }

    /// The number of correctly answered questions.
    pub fn correctness(&self) -> f64 {
        if self.is_settled() {
            self.attempts.correctness()
        } else {
            self.live_metrics().correctness
        }
    }

    /// The score rescaled to 0–100.
    pub fn scaled_score(&self) -> f64 {
        scaled_from_min_max(self.score(), self.min_score(), self.max_score())
    }

    /// The percentage of correctly answered questions.
    ///
    /// Assumes each attempt uses the same number of questions.
    pub fn scaled_correctness(&self) -> f64 {
        scaled_from_min_max(self.correctness(), 0.0, self.questions().len() as f64)
    }

    /// Whether every component in the subtree has completed its interaction.
    pub fn is_attempt_complete(&self) -> bool {
        if !self.content.is_fully_populated() {
            return false;
        }
        self.components()
            .iter()
            .all(|model| model.is_interaction_complete())
    }

    /// Whether the test is complete.
    ///
    /// While an attempt is in session this tracks the live subtree;
    /// otherwise it reflects the recorded history.
    pub fn is_complete(&self) -> bool {
        if !self.content.is_fully_populated() {
            return false;
        }
        if self.attempt.is_in_session() {
            self.is_attempt_complete()
        } else {
            self.attempts.was_complete()
        }
    }

    /// Whether the configured passmark has been achieved.
    pub fn is_passed(&self) -> bool {
        if !self.is_complete() {
            return false;
        }
        if !self.passmark.is_enabled() {
            return true;
        }
        if !self.attempt.is_in_session() {
            return self.attempts.was_passed();
        }
        let (score, correctness) = if self.passmark.is_scaled() {
            (self.scaled_score(), self.scaled_correctness())
        } else {
            (self.score(), self.correctness())
        };
        score >= self.passmark.score() && correctness >= self.passmark.correctness()
    }

    /// Whether the test can currently be reset.
    pub fn can_reset(&self) -> bool {
        let rule = if self.is_passed() {
            self.reset_policy.passed()
        } else {
            self.reset_policy.failed()
        };
        self.is_complete()
            && self.attempts.has_remaining()
            && rule.can_reset
            && !self.has_reset_since_entry
    }

    /// Whether the learner may retry: not passed, with attempts remaining.
    pub fn can_retry(&self) -> bool {
        !self.is_passed() && self.attempts.has_remaining()
    }

    /// Whether arriving back at the test should trigger a reset.
    pub fn should_reset_on_revisit(&self) -> bool {
        let rule = if self.is_passed() {
            self.reset_policy.passed()
        } else {
            self.reset_policy.failed()
        };
        self.can_reset() && rule.reset_on_revisit
    }

    /// Whether a reset may reload the page: only when configured and the
    /// test's page is the one being displayed.
    pub fn can_reload(&self) -> bool {
        if !self.reset_policy.reload_page() {
            return false;
        }
        self.host.router.current_location_id().as_deref() == Some(self.content.page_id())
    }

    /// Reset the test: every component, then the attempt itself.
    ///
    /// Suspends once, on the completion settle barrier, before deciding
    /// whether to reload or scroll back to the test.
    pub async fn reset(&mut self) {
        self.emit_legacy(LifecyclePoint::PreReset);
        self.host.observer.on_test_pre_reset(&self.snapshot());
        let scoring = self.reset_policy.scoring();
        let non_scoring = self.reset_policy.non_scoring();
        for question in self.questions() {
            question.reset(scoring, true);
        }
        for component in self.non_questions() {
            component.reset(non_scoring, true);
        }
        self.attempt = Attempt::new();
        self.has_reset_since_entry = true;
        self.was_complete = false;
        self.was_passed = false;
        self.host.barrier.until_completion_settled().await;
        self.emit_legacy(LifecyclePoint::Reset);
        self.host.observer.on_test_reset(&self.snapshot());
        if self.can_reload() {
            let target = if self.reset_policy.scroll_to() {
                self.content.id().to_string()
            } else {
                self.host
                    .router
                    .current_location_id()
                    .unwrap_or_else(|| self.content.page_id().to_string())
            };
            self.host.router.reload(&target);
        } else if self.reset_policy.scroll_to() {
            self.attempt.start();
            self.host.router.navigate_to(self.content.id());
        }
        self.emit_legacy(LifecyclePoint::PostReset);
        self.host.observer.on_test_post_reset(&self.snapshot());
    }

    /// Handle a navigation event.
    ///
    /// Always clears the in-session flag; on arrival at this test's page,
    /// applies the revisit reset rule and starts the attempt if it has not
    /// yet completed.
    pub async fn on_router_location(&mut self, location: &Location) {
        self.attempt.leave_session();
        if location.kind != ContentKind::Page {
            return;
        }
        let arrived = location.model_id == self.content.page_id()
            || self.content.contains(&location.model_id);
        if !arrived {
            return;
        }
        if self.should_reset_on_revisit() {
            self.reset().await;
        }
        self.has_reset_since_entry = false;
        if !self.is_attempt_complete() {
            self.attempt.start();
            self.attempt.set_question_refs(self.question_refs());
            self.save_state();
        }
    }

    /// Fold the latest content state into the attempt and fire lifecycle
    /// edges.
    pub fn update(&mut self) {
        self.attempt.capture(self.live_metrics());
        tracing::debug!(
            id = %self.config.id,
            score = self.score(),
            scaled_score = self.scaled_score(),
            is_attempt_complete = self.is_attempt_complete(),
            is_complete = self.is_complete(),
            is_passed = self.is_passed(),
            "test updated"
        );
        let is_complete = self.is_complete();
        if is_complete && !self.was_complete {
            self.on_completed();
        }
        self.was_complete = is_complete;
        let is_passed = self.is_passed();
        if is_passed && !self.was_passed {
            self.on_passed();
        }
        self.was_passed = is_passed;
        self.save_state();
    }

    /// The subtree has reported overall completion.
    fn on_completed(&mut self) {
        if self.attempt.is_in_progress() {
            let passed = self.is_passed();
            self.attempt.end(passed);
            self.attempts.spend();
            self.attempts.record(self.attempt.clone());
            self.save_state();
        }
        if self.marking.is_enabled()
            && self.marking.is_suppressed()
            && !self.attempts.has_remaining()
        {
            self.apply_question_settings();
            for question in self.questions() {
                question.refresh();
            }
        }
        self.emit_legacy(LifecyclePoint::Completed);
        self.host.observer.on_test_completed(&self.snapshot());
        tracing::debug!(id = %self.config.id, "test completed");
    }

    fn on_passed(&self) {
        self.host.observer.on_test_passed(&self.snapshot());
        tracing::debug!(id = %self.config.id, "test passed");
    }

    /// Rehydrate counter, history and the current attempt from the store.
    ///
    /// A malformed blob rejects the whole restore; nothing is committed.
    pub fn restore(&mut self) -> Result<(), StateError> {
        if let Some(namespace) = self.host.store.get(SAVE_STATE_KEY) {
            if let Some(blob) = namespace.get(&self.config.id).and_then(Value::as_str) {
                let data: Value = serde_json::from_str(blob)?;
                let parts = data.as_array().ok_or(StateError::TypeMismatch {
                    expected: "test state array",
                })?;
                if parts.len() != 2 {
                    return Err(StateError::WrongArity {
                        expected: "2",
                        found: parts.len(),
                    });
                }
                let mut attempts = self.attempts.clone();
                attempts.restore(&parts[0])?;
                let mut attempt = Attempt::new();
                attempt.restore(&parts[1])?;
                self.attempts = attempts;
                self.attempt = attempt;
            }
        }
        self.was_complete = self.is_complete();
        self.was_passed = self.is_passed();
        self.emit_legacy(LifecyclePoint::Restored);
        self.host.observer.on_test_restored(&self.snapshot());
        Ok(())
    }

    fn save_state(&self) {
        let state = json!([self.attempts.save_state(), self.attempt.save_state()]);
        let blob = match serde_json::to_string(&state) {
            Ok(blob) => blob,
            Err(error) => {
                tracing::warn!(id = %self.config.id, %error, "failed to serialize test state");
                return;
            }
        };
        let mut namespace = match self.host.store.get(SAVE_STATE_KEY) {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        namespace.insert(self.config.id.clone(), Value::String(blob));
        self.host.store.set(SAVE_STATE_KEY, Value::Object(namespace));
    }

    /// Push the configured display settings into every question.
    ///
    /// Marking visibility depends on remaining attempts, so this is
    /// re-applied when suppressed marking is finally revealed.
    fn apply_question_settings(&self) {
        let marking_visible = self.marking.is_visible(self.attempts.has_remaining());
        let settings = QuestionSettings {
            can_show_feedback: self.config.questions.can_show_feedback,
            can_show_marking: marking_visible,
            can_show_model_answer: marking_visible && self.config.questions.can_show_model_answer,
            test_id: self.config.id.clone(),
        };
        for question in self.questions() {
            question.apply_question_settings(&settings);
        }
    }

    fn question_refs(&self) -> Option<Vec<String>> {
        let refs: Vec<String> = self
            .questions()
            .iter()
            .filter_map(|question| question.tracking_ref())
            .collect();
        if refs.is_empty() {
            None
        } else {
            Some(refs)
        }
    }

    /// The current aggregate view of this test.
    pub fn snapshot(&self) -> TestSnapshot {
        TestSnapshot {
            id: self.config.id.clone(),
            title: self.config.title.clone(),
            min_score: self.min_score(),
            max_score: self.max_score(),
            score: self.score(),
            scaled_score: self.scaled_score(),
            correctness: self.correctness(),
            scaled_correctness: self.scaled_correctness(),
            is_complete: self.is_complete(),
            is_passed: self.is_passed(),
            attempts_used: self.attempts.used(),
            attempts_remaining: if self.attempts.is_infinite() {
                None
            } else {
                Some(self.attempts.remaining())
            },
            can_retry: self.can_retry(),
            can_reset: self.can_reset(),
        }
    }

    fn legacy_state(&self) -> LegacyState {
        LegacyState {
            id: self.config.id.clone(),
            page_id: self.content.page_id().to_string(),
            is_enabled: self.config.is_enabled,
            is_complete: self.is_complete(),
            is_percentage_based: self.passmark.is_scaled(),
            score_to_pass: self.passmark.score(),
            score: self.score(),
            score_as_percent: self.scaled_score(),
            min_score: self.min_score(),
            max_score: self.max_score(),
            correct_count: self.correctness(),
            correct_as_percent: self.scaled_correctness(),
            correct_to_pass: self.passmark.correctness(),
            question_count: self.questions().len(),
            is_pass: self.is_passed(),
            include_in_total_score: self.config.is_score_included,
            attempts: if self.attempts.is_infinite() {
                -1
            } else {
                self.attempts.limit()
            },
            attempts_spent: self.attempts.used(),
            attempts_left: if self.attempts.is_infinite() {
                -1
            } else {
                self.attempts.remaining()
            },
            attempt_in_progress: self.attempt.is_in_progress(),
            reset_type: self.reset_policy.scoring(),
            allow_reset_if_passed: self.reset_policy.passed().reset_on_revisit,
        }
    }

    fn emit_legacy(&self, point: LifecyclePoint) {
        if !self.config.emit_legacy_state {
            return;
        }
        self.host
            .observer
            .on_legacy_test_state(point, &self.legacy_state());
    }
}
