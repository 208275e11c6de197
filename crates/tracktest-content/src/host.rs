//! Host doubles: router, settle barrier and a recording observer.

use std::sync::Mutex;

use async_trait::async_trait;

use tracktest_core::events::{
    CourseSnapshot, LegacyState, LifecyclePoint, TestObserver, TestSnapshot,
};
use tracktest_core::traits::{Router, SettleBarrier};

/// A router whose current location is set by the caller.
///
/// Reloads and navigations are recorded rather than performed.
#[derive(Default)]
pub struct StaticRouter {
    current: Mutex<Option<String>>,
    reloads: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
}

impl StaticRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current(&self, model_id: impl Into<String>) {
        *self.current.lock().unwrap() = Some(model_id.into());
    }

    pub fn reloads(&self) -> Vec<String> {
        self.reloads.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

impl Router for StaticRouter {
    fn current_location_id(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    fn reload(&self, model_id: &str) {
        self.reloads.lock().unwrap().push(model_id.to_string());
    }

    fn navigate_to(&self, model_id: &str) {
        self.navigations.lock().unwrap().push(model_id.to_string());
    }
}

/// A settle barrier that resolves immediately.
///
/// The stub components settle their completion flags synchronously, so
/// there is nothing to wait for.
pub struct ImmediateBarrier;

#[async_trait]
impl SettleBarrier for ImmediateBarrier {
    async fn until_completion_settled(&self) {}
}

/// An observer that appends one line per notification.
#[derive(Default)]
pub struct RecordingObserver {
    log: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification received so far, oldest first.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, line: String) {
        self.log.lock().unwrap().push(line);
    }
}

impl TestObserver for RecordingObserver {
    fn on_test_restored(&self, test: &TestSnapshot) {
        self.record(format!("test restored: {}", test.id));
    }

    fn on_test_pre_reset(&self, test: &TestSnapshot) {
        self.record(format!("test pre-reset: {}", test.id));
    }

    fn on_test_reset(&self, test: &TestSnapshot) {
        self.record(format!("test reset: {}", test.id));
    }

    fn on_test_post_reset(&self, test: &TestSnapshot) {
        self.record(format!("test post-reset: {}", test.id));
    }

    fn on_test_completed(&self, test: &TestSnapshot) {
        self.record(format!(
            "test complete: {} score {:.1}% correct {:.1}%",
            test.id, test.scaled_score, test.scaled_correctness
        ));
    }

    fn on_test_passed(&self, test: &TestSnapshot) {
        self.record(format!("test pass: {}", test.id));
    }

    fn on_course_restored(&self, _course: &CourseSnapshot) {
        self.record("course restored".to_string());
    }

    fn on_course_reset(&self, _course: &CourseSnapshot) {
        self.record("course reset".to_string());
    }

    fn on_course_completed(&self, course: &CourseSnapshot) {
        self.record(format!(
            "course complete: {}/{} tests",
            course.tests_complete, course.test_count
        ));
    }

    fn on_course_passed(&self, _course: &CourseSnapshot) {
        self.record("course pass".to_string());
    }

    fn on_legacy_test_state(&self, point: LifecyclePoint, state: &LegacyState) {
        self.record(format!("legacy {point:?}: {}", state.id));
    }
}
