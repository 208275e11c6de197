//! The course-level test directory and aggregate.
//!
//! Owns every registered test, answers "does this content belong to a
//! test" queries for navigation, and derives the course-wide score,
//! completion and pass state as pure functions of the collection.

use std::sync::Arc;

use crate::config::{CourseConfig, TestConfig};
use crate::events::CourseSnapshot;
use crate::passmark::Passmark;
use crate::scaling::scaled_from_min_max;
use crate::test_set::TestSet;
use crate::traits::{ContentSubtree, HostContext, Location};

/// Every test in the course, plus the course-level passmark.
pub struct TestsSet {
    passmark: Passmark,
    tests: Vec<TestSet>,
    host: HostContext,
    was_complete: bool,
    was_passed: bool,
}

impl TestsSet {
    pub fn new(config: &CourseConfig, host: HostContext) -> Self {
        Self {
            passmark: Passmark::new(&config.passmark),
            tests: Vec::new(),
            host,
            was_complete: false,
            was_passed: false,
        }
    }

    /// Register a test over the given content subtree.
    ///
    /// Disabled tests are skipped.
    pub fn register(&mut self, config: TestConfig, content: Arc<dyn ContentSubtree>) {
        if !config.is_enabled {
            tracing::warn!(id = %config.id, "test disabled, skipping registration");
            return;
        }
        self.tests
            .push(TestSet::new(config, content, self.host.clone()));
    }

    /// The course-level passmark.
    pub fn passmark(&self) -> &Passmark {
        &self.passmark
    }

    /// Every registered test, in registration order.
    pub fn tests(&self) -> &[TestSet] {
        &self.tests
    }

    /// The test with the given id.
    pub fn get_by_id(&self, id: &str) -> Option<&TestSet> {
        self.tests.iter().find(|test| test.id() == id)
    }

    /// Every test whose subtree contains the given model.
    pub fn get_by_model_id(&self, model_id: &str) -> Vec<&TestSet> {
        self.tests
            .iter()
            .filter(|test| {
                test.content().id() == model_id
                    || test.content().page_id() == model_id
                    || test.content().contains(model_id)
            })
            .collect()
    }

    /// Whether a content reference's ancestry intersects any test.
    pub fn get_model_has_test(&self, model_id: &str) -> bool {
        !self.get_by_model_id(model_id).is_empty()
    }

    pub fn min_score(&self) -> f64 {
        self.tests.iter().map(TestSet::min_score).sum()
    }

    pub fn max_score(&self) -> f64 {
        self.tests.iter().map(TestSet::max_score).sum()
    }

    pub fn score(&self) -> f64 {
        self.tests.iter().map(TestSet::score).sum()
    }

    /// The number of correctly answered questions across every test.
    pub fn correctness(&self) -> f64 {
        self.tests.iter().map(TestSet::correctness).sum()
    }

    pub fn question_count(&self) -> usize {
        self.tests.iter().map(|test| test.questions().len()).sum()
    }

    /// The course score rescaled to 0–100.
    pub fn scaled_score(&self) -> f64 {
        scaled_from_min_max(self.score(), self.min_score(), self.max_score())
    }

    /// The percentage of correctly answered questions across every test.
    pub fn scaled_correctness(&self) -> f64 {
        scaled_from_min_max(self.correctness(), 0.0, self.question_count() as f64)
    }

    /// Whether every test is complete; with `requires_passed_subsets` each
    /// must also be passed.
    pub fn is_complete(&self) -> bool {
        self.tests.iter().all(|test| {
            test.is_complete() && (!self.passmark.requires_passed_subsets() || test.is_passed())
        })
    }

    /// Whether every test is passed.
    pub fn is_passed(&self) -> bool {
        self.tests.iter().all(TestSet::is_passed)
    }

    /// Whether any test can be reset.
    pub fn can_reset(&self) -> bool {
        self.tests.iter().any(TestSet::can_reset)
    }

    /// Whether any test can be retried.
    pub fn can_retry(&self) -> bool {
        self.tests.iter().any(TestSet::can_retry)
    }

    /// Restore every test from the store, then announce the course state.
    pub fn restore(&mut self) -> Result<(), crate::error::StateError> {
        for test in &mut self.tests {
            test.restore()?;
        }
        self.was_complete = self.is_complete();
        self.was_passed = self.is_passed();
        self.host.observer.on_course_restored(&self.snapshot());
        Ok(())
    }

    /// Forward a navigation event to every test.
    pub async fn on_router_location(&mut self, location: &Location) {
        for test in &mut self.tests {
            test.on_router_location(location).await;
        }
    }

    /// Fold the latest content state through every test and fire
    /// course-level lifecycle edges.
    pub fn update(&mut self) {
        for test in &mut self.tests {
            test.update();
        }
        tracing::debug!(
            score = self.score(),
            scaled_score = self.scaled_score(),
            is_complete = self.is_complete(),
            is_passed = self.is_passed(),
            "course updated"
        );
        let is_complete = self.is_complete();
        if is_complete && !self.was_complete {
            self.host.observer.on_course_completed(&self.snapshot());
        }
        self.was_complete = is_complete;
        let is_passed = self.is_passed();
        if is_passed && !self.was_passed {
            self.host.observer.on_course_passed(&self.snapshot());
            tracing::debug!("course passed");
        }
        self.was_passed = is_passed;
    }

    /// Reset every test.
    pub async fn reset_all(&mut self) {
        for test in &mut self.tests {
            test.reset().await;
        }
        self.host.observer.on_course_reset(&self.snapshot());
    }

    /// The current aggregate view of the course.
    pub fn snapshot(&self) -> CourseSnapshot {
        CourseSnapshot {
            min_score: self.min_score(),
            max_score: self.max_score(),
            score: self.score(),
            scaled_score: self.scaled_score(),
            correctness: self.correctness(),
            scaled_correctness: self.scaled_correctness(),
            question_count: self.question_count(),
            is_complete: self.is_complete(),
            is_passed: self.is_passed(),
            tests_complete: self.tests.iter().filter(|test| test.is_complete()).count(),
            test_count: self.tests.len(),
            can_retry: self.can_retry(),
            can_reset: self.can_reset(),
        }
    }
}
