//! Lifecycle notifications.
//!
//! Observers receive point-in-time snapshots rather than references into
//! the engine, so they can be forwarded to a host bus or logged as-is.

use serde::Serialize;

use crate::reset::ResetStrength;

/// Aggregate view of a single test at the moment of an event.
#[derive(Debug, Clone, Serialize)]
pub struct TestSnapshot {
    pub id: String,
    pub title: String,
    pub min_score: f64,
    pub max_score: f64,
    pub score: f64,
    pub scaled_score: f64,
    pub correctness: f64,
    pub scaled_correctness: f64,
    pub is_complete: bool,
    pub is_passed: bool,
    pub attempts_used: u32,
    /// `None` when attempts are unlimited.
    pub attempts_remaining: Option<i64>,
    pub can_retry: bool,
    pub can_reset: bool,
}

/// Aggregate view of the whole course at the moment of an event.
#[derive(Debug, Clone, Serialize)]
pub struct CourseSnapshot {
    pub min_score: f64,
    pub max_score: f64,
    pub score: f64,
    pub scaled_score: f64,
    pub correctness: f64,
    pub scaled_correctness: f64,
    pub question_count: usize,
    pub is_complete: bool,
    pub is_passed: bool,
    pub tests_complete: usize,
    pub test_count: usize,
    pub can_retry: bool,
    pub can_reset: bool,
}

/// Where in a test's lifecycle a legacy payload was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePoint {
    Registered,
    Restored,
    PreReset,
    Reset,
    PostReset,
    Completed,
}

/// Flat single-test state in the shape older host integrations consume.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyState {
    pub id: String,
    pub page_id: String,
    pub is_enabled: bool,
    pub is_complete: bool,
    pub is_percentage_based: bool,
    pub score_to_pass: f64,
    pub score: f64,
    pub score_as_percent: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub correct_count: f64,
    pub correct_as_percent: f64,
    pub correct_to_pass: f64,
    pub question_count: usize,
    pub is_pass: bool,
    pub include_in_total_score: bool,
    /// `-1` when unlimited.
    pub attempts: i64,
    pub attempts_spent: u32,
    /// `-1` when unlimited.
    pub attempts_left: i64,
    pub attempt_in_progress: bool,
    pub reset_type: ResetStrength,
    pub allow_reset_if_passed: bool,
}

/// Lifecycle hooks announced to the host.
///
/// Every hook has a no-op default so observers implement only what they
/// care about.
pub trait TestObserver: Send + Sync {
    fn on_test_restored(&self, _test: &TestSnapshot) {}
    fn on_test_pre_reset(&self, _test: &TestSnapshot) {}
    fn on_test_reset(&self, _test: &TestSnapshot) {}
    fn on_test_post_reset(&self, _test: &TestSnapshot) {}
    fn on_test_completed(&self, _test: &TestSnapshot) {}
    fn on_test_passed(&self, _test: &TestSnapshot) {}

    fn on_course_restored(&self, _course: &CourseSnapshot) {}
    fn on_course_reset(&self, _course: &CourseSnapshot) {}
    fn on_course_completed(&self, _course: &CourseSnapshot) {}
    fn on_course_passed(&self, _course: &CourseSnapshot) {}

    /// Legacy flat payloads, emitted only when configured.
    fn on_legacy_test_state(&self, _point: LifecyclePoint, _state: &LegacyState) {}
}

/// An observer that ignores every notification.
pub struct NoopObserver;

impl TestObserver for NoopObserver {}
