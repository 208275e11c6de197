//! End-to-end engine scenarios: attempt lifecycle, aggregation mode
//! switching, revisit resets, persistence and course rollup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use tracktest_core::config::{CourseConfig, TestConfig};
use tracktest_core::events::{LegacyState, LifecyclePoint, TestObserver, TestSnapshot};
use tracktest_core::reset::ResetStrength;
use tracktest_core::tests_set::TestsSet;
use tracktest_core::traits::{
    ComponentModel, ContentSubtree, HostContext, Location, QuestionSettings, Router,
    SettleBarrier, StateStore,
};

// ---------------------------------------------------------------------------
// Host fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct QuestionState {
    score: f64,
    is_correct: bool,
    is_complete: bool,
    resets: Vec<ResetStrength>,
    settings: Option<QuestionSettings>,
    refreshes: u32,
}

struct FakeQuestion {
    id: String,
    max_score: f64,
    is_available: bool,
    tracking_ref: Option<String>,
    state: Mutex<QuestionState>,
}

impl FakeQuestion {
    fn new(id: &str, max_score: f64) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            max_score,
            is_available: true,
            tracking_ref: None,
            state: Mutex::new(QuestionState::default()),
        })
    }

    fn tracked(id: &str, max_score: f64, tracking_ref: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            max_score,
            is_available: true,
            tracking_ref: Some(tracking_ref.to_string()),
            state: Mutex::new(QuestionState::default()),
        })
    }

    fn unavailable(id: &str, max_score: f64) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            max_score,
            is_available: false,
            tracking_ref: None,
            state: Mutex::new(QuestionState::default()),
        })
    }

    fn answer(&self, score: f64, is_correct: bool) {
        let mut state = self.state.lock().unwrap();
        state.score = score;
        state.is_correct = is_correct;
        state.is_complete = true;
    }

    fn reset_count(&self) -> usize {
        self.state.lock().unwrap().resets.len()
    }

    fn settings(&self) -> Option<QuestionSettings> {
        self.state.lock().unwrap().settings.clone()
    }

    fn refreshes(&self) -> u32 {
        self.state.lock().unwrap().refreshes
    }
}

impl ComponentModel for FakeQuestion {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_available(&self) -> bool {
        self.is_available
    }

    fn is_question(&self) -> bool {
        true
    }

    fn is_interaction_complete(&self) -> bool {
        self.state.lock().unwrap().is_complete
    }

    fn max_score(&self) -> f64 {
        self.max_score
    }

    fn score(&self) -> f64 {
        self.state.lock().unwrap().score
    }

    fn is_correct(&self) -> bool {
        self.state.lock().unwrap().is_correct
    }

    fn tracking_ref(&self) -> Option<String> {
        self.tracking_ref.clone()
    }

    fn reset(&self, strength: ResetStrength, _force: bool) {
        let mut state = self.state.lock().unwrap();
        state.resets.push(strength);
        state.is_complete = false;
        if strength == ResetStrength::Hard {
            state.score = 0.0;
            state.is_correct = false;
        }
    }

    fn refresh(&self) {
        self.state.lock().unwrap().refreshes += 1;
    }

    fn apply_question_settings(&self, settings: &QuestionSettings) {
        self.state.lock().unwrap().settings = Some(settings.clone());
    }
}

struct FakePresentation {
    id: String,
    is_complete: AtomicBool,
    resets: Mutex<Vec<ResetStrength>>,
}

impl FakePresentation {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            is_complete: AtomicBool::new(true),
            resets: Mutex::new(Vec::new()),
        })
    }

    fn last_reset(&self) -> Option<ResetStrength> {
        self.resets.lock().unwrap().last().copied()
    }
}

impl ComponentModel for FakePresentation {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_question(&self) -> bool {
        false
    }

    fn is_interaction_complete(&self) -> bool {
        self.is_complete.load(Ordering::Relaxed)
    }

    fn reset(&self, strength: ResetStrength, _force: bool) {
        self.resets.lock().unwrap().push(strength);
        self.is_complete.store(false, Ordering::Relaxed);
    }
}

struct FakePage {
    id: String,
    page_id: String,
    is_populated: AtomicBool,
    components: Vec<Arc<dyn ComponentModel>>,
}

impl FakePage {
    fn new(id: &str, page_id: &str, components: Vec<Arc<dyn ComponentModel>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            page_id: page_id.to_string(),
            is_populated: AtomicBool::new(true),
            components,
        })
    }
}

impl ContentSubtree for FakePage {
    fn id(&self) -> &str {
        &self.id
    }

    fn page_id(&self) -> &str {
        &self.page_id
    }

    fn components(&self) -> Vec<Arc<dyn ComponentModel>> {
        self.components.clone()
    }

    fn is_fully_populated(&self) -> bool {
        self.is_populated.load(Ordering::Relaxed)
    }

    fn contains(&self, model_id: &str) -> bool {
        self.id == model_id || self.components.iter().any(|c| c.id() == model_id)
    }
}

#[derive(Default)]
struct MemStore {
    values: Mutex<std::collections::HashMap<String, Value>>,
}

impl StateStore for MemStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.lock().unwrap().insert(key.to_string(), value);
    }
}

#[derive(Default)]
struct FakeRouter {
    current: Mutex<Option<String>>,
    reloads: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
}

impl FakeRouter {
    fn set_current(&self, id: &str) {
        *self.current.lock().unwrap() = Some(id.to_string());
    }
}

impl Router for FakeRouter {
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

struct Settled;

#[async_trait]
impl SettleBarrier for Settled {
    async fn until_completion_settled(&self) {}
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl TestObserver for Recorder {
    fn on_test_restored(&self, test: &TestSnapshot) {
        self.push(format!("test:restored {}", test.id));
    }

    fn on_test_pre_reset(&self, test: &TestSnapshot) {
        self.push(format!("test:pre_reset {}", test.id));
    }

    fn on_test_reset(&self, test: &TestSnapshot) {
        self.push(format!("test:reset {}", test.id));
    }

    fn on_test_post_reset(&self, test: &TestSnapshot) {
        self.push(format!("test:post_reset {}", test.id));
    }

    fn on_test_completed(&self, test: &TestSnapshot) {
        self.push(format!("test:complete {}", test.id));
    }

    fn on_test_passed(&self, test: &TestSnapshot) {
        self.push(format!("test:pass {}", test.id));
    }

    fn on_course_restored(&self, _course: &tracktest_core::events::CourseSnapshot) {
        self.push("course:restored".to_string());
    }

    fn on_course_completed(&self, _course: &tracktest_core::events::CourseSnapshot) {
        self.push("course:complete".to_string());
    }

    fn on_course_passed(&self, _course: &tracktest_core::events::CourseSnapshot) {
        self.push("course:pass".to_string());
    }

    fn on_legacy_test_state(&self, point: LifecyclePoint, state: &LegacyState) {
        self.push(format!("legacy:{point:?} {}", state.id));
    }
}

struct Harness {
    store: Arc<MemStore>,
    router: Arc<FakeRouter>,
    observer: Arc<Recorder>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(MemStore::default()),
            router: Arc::new(FakeRouter::default()),
            observer: Arc::new(Recorder::default()),
        }
    }

    fn host(&self) -> HostContext {
        HostContext {
            store: self.store.clone(),
            router: self.router.clone(),
            barrier: Arc::new(Settled),
            observer: self.observer.clone(),
        }
    }
}

fn config(toml_str: &str) -> TestConfig {
    toml::from_str(toml_str).unwrap()
}

/// Four questions worth 10 each, on one page.
fn four_question_page() -> (Arc<FakePage>, Vec<Arc<FakeQuestion>>) {
    let questions: Vec<Arc<FakeQuestion>> = (1..=4)
        .map(|n| FakeQuestion::new(&format!("q-{n}"), 10.0))
        .collect();
    let components: Vec<Arc<dyn ComponentModel>> = questions
        .iter()
        .map(|q| q.clone() as Arc<dyn ComponentModel>)
        .collect();
    let page = FakePage::new("a-test", "page-1", components);
    (page, questions)
}

const BOUNDARY_CONFIG: &str = r#"
id = "t-1"
title = "Checkpoint"

[passmark]
score = 75
correctness = 50
is_scaled = true

[attempts]
limit = 2

[reset]
reload_page = false
"#;

async fn complete_attempt(course: &mut TestsSet, questions: &[Arc<FakeQuestion>], scores: &[f64], correct: &[bool]) {
    course.on_router_location(&Location::page("page-1")).await;
    for ((question, score), correct) in questions.iter().zip(scores).zip(correct) {
        question.answer(*score, *correct);
        course.update();
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scaled_boundary_equality_passes() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page);

    // Raw 30/40 with 2 of 4 correct: exactly 75% / 50%.
    complete_attempt(
        &mut course,
        &questions,
        &[10.0, 10.0, 5.0, 5.0],
        &[true, true, false, false],
    )
    .await;

    let test = course.get_by_id("t-1").unwrap();
    assert_eq!(test.scaled_score(), 75.0);
    assert_eq!(test.scaled_correctness(), 50.0);
    assert!(test.is_complete());
    assert!(test.is_passed());
    assert_eq!(test.attempts().used(), 1);
    assert!(test.attempts().last().unwrap().is_passed());
    let events = harness.observer.events();
    assert!(events.contains(&"test:complete t-1".to_string()));
    assert!(events.contains(&"test:pass t-1".to_string()));
}

#[tokio::test]
async fn below_the_boundary_fails() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page);

    // Raw 29/40: 72.5%.
    complete_attempt(
        &mut course,
        &questions,
        &[10.0, 10.0, 5.0, 4.0],
        &[true, true, false, false],
    )
    .await;

    let test = course.get_by_id("t-1").unwrap();
    assert_eq!(test.scaled_score(), 72.5);
    assert!(test.is_complete());
    assert!(!test.is_passed());
    assert!(test.can_retry());
    let events = harness.observer.events();
    assert!(events.contains(&"test:complete t-1".to_string()));
    assert!(!events.contains(&"test:pass t-1".to_string()));
}

#[tokio::test]
async fn disabled_passmark_passes_once_complete() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(
        config(
            r#"
id = "t-1"
[passmark]
is_enabled = false
"#,
        ),
        page,
    );

    complete_attempt(&mut course, &questions, &[0.0; 4], &[false; 4]).await;

    let test = course.get_by_id("t-1").unwrap();
    assert!(test.is_passed());
    assert!(!test.can_retry());
}

#[tokio::test]
async fn settled_values_survive_navigating_away() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page);

    complete_attempt(
        &mut course,
        &questions,
        &[10.0, 10.0, 5.0, 5.0],
        &[true, true, false, false],
    )
    .await;
    course.on_router_location(&Location::menu("menu-1")).await;

    // Live content drifting after the attempt ended must not show through.
    questions[3].answer(10.0, true);
    let test = course.get_by_id("t-1").unwrap();
    assert_eq!(test.score(), 30.0);
    assert_eq!(test.correctness(), 2.0);
    assert!(test.is_complete());
    assert!(test.is_passed());
}

#[tokio::test]
async fn awaiting_children_blocks_completion() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    page.is_populated.store(false, Ordering::Relaxed);
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page.clone());

    complete_attempt(&mut course, &questions, &[10.0; 4], &[true; 4]).await;
    let test = course.get_by_id("t-1").unwrap();
    assert!(!test.is_attempt_complete());
    assert!(!test.is_complete());

    page.is_populated.store(true, Ordering::Relaxed);
    course.update();
    assert!(course.get_by_id("t-1").unwrap().is_complete());
}

#[tokio::test]
async fn revisit_resets_exactly_once_before_restarting() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page);

    // Fail the first attempt.
    complete_attempt(&mut course, &questions, &[0.0; 4], &[false; 4]).await;
    assert!(!course.get_by_id("t-1").unwrap().is_passed());

    course.on_router_location(&Location::menu("menu-1")).await;
    course.on_router_location(&Location::page("page-1")).await;

    for question in &questions {
        assert_eq!(question.reset_count(), 1);
    }
    let test = course.get_by_id("t-1").unwrap();
    assert!(test.attempt().is_in_progress());
    assert!(!test.attempt().is_complete());
    assert_eq!(test.attempts().used(), 1);

    let events = harness.observer.events();
    let position = |needle: &str| events.iter().position(|e| e == needle).unwrap();
    assert!(position("test:pre_reset t-1") < position("test:reset t-1"));
    assert!(position("test:reset t-1") < position("test:post_reset t-1"));
}

#[tokio::test]
async fn reset_reloads_when_the_test_page_is_displayed() {
    let harness = Harness::new();
    harness.router.set_current("page-1");
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(
        config(
            r#"
id = "t-1"
[attempts]
limit = 2
[reset]
reload_page = true
scroll_to = true
"#,
        ),
        page,
    );

    complete_attempt(&mut course, &questions, &[0.0; 4], &[false; 4]).await;
    course.on_router_location(&Location::menu("menu-1")).await;
    course.on_router_location(&Location::page("page-1")).await;

    // Reload targets the test anchor when scroll_to is set.
    assert_eq!(harness.router.reloads.lock().unwrap().as_slice(), ["a-test"]);
}

#[tokio::test]
async fn reset_strengths_follow_component_kind() {
    let harness = Harness::new();
    let (_, questions) = four_question_page();
    let presentation = FakePresentation::new("text-1");
    let mut components: Vec<Arc<dyn ComponentModel>> = questions
        .iter()
        .map(|q| q.clone() as Arc<dyn ComponentModel>)
        .collect();
    components.push(presentation.clone());
    let page = FakePage::new("a-test", "page-1", components);

    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page);

    complete_attempt(&mut course, &questions, &[0.0; 4], &[false; 4]).await;
    course.on_router_location(&Location::menu("menu-1")).await;
    course.on_router_location(&Location::page("page-1")).await;

    for question in &questions {
        assert_eq!(question.state.lock().unwrap().resets, [ResetStrength::Hard]);
    }
    assert_eq!(presentation.last_reset(), Some(ResetStrength::Soft));
}

#[tokio::test]
async fn state_roundtrips_through_the_store() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    {
        let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
        course.register(config(BOUNDARY_CONFIG), page.clone());
        complete_attempt(
            &mut course,
            &questions,
            &[10.0, 10.0, 5.0, 5.0],
            &[true, true, false, false],
        )
        .await;
        course.on_router_location(&Location::menu("menu-1")).await;
    }

    // A fresh course over the same store sees the settled outcome.
    let mut reborn = TestsSet::new(&CourseConfig::default(), harness.host());
    reborn.register(config(BOUNDARY_CONFIG), page);
    reborn.restore().unwrap();

    let test = reborn.get_by_id("t-1").unwrap();
    assert_eq!(test.attempts().used(), 1);
    assert!(test.is_complete());
    assert!(test.is_passed());
    assert_eq!(test.score(), 30.0);
    assert_eq!(test.correctness(), 2.0);
    assert!(harness
        .observer
        .events()
        .contains(&"test:restored t-1".to_string()));
}

#[tokio::test]
async fn question_refs_roundtrip_when_tracked() {
    let harness = Harness::new();
    let questions: Vec<Arc<FakeQuestion>> = (1..=2)
        .map(|n| FakeQuestion::tracked(&format!("q-{n}"), 10.0, &format!("track-{n}")))
        .collect();
    let components: Vec<Arc<dyn ComponentModel>> = questions
        .iter()
        .map(|q| q.clone() as Arc<dyn ComponentModel>)
        .collect();
    let page = FakePage::new("a-test", "page-1", components);

    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page.clone());
    course.on_router_location(&Location::page("page-1")).await;

    let mut reborn = TestsSet::new(&CourseConfig::default(), harness.host());
    reborn.register(config(BOUNDARY_CONFIG), page);
    reborn.restore().unwrap();
    let restored = reborn.get_by_id("t-1").unwrap();
    assert_eq!(
        restored.attempt().question_refs().unwrap(),
        ["track-1", "track-2"]
    );
    assert!(restored.attempt().is_in_progress());
}

#[tokio::test]
async fn unavailable_questions_do_not_score() {
    let harness = Harness::new();
    let available = FakeQuestion::new("q-1", 10.0);
    let unavailable = FakeQuestion::unavailable("q-2", 10.0);
    let page = FakePage::new(
        "a-test",
        "page-1",
        vec![
            available.clone() as Arc<dyn ComponentModel>,
            unavailable.clone() as Arc<dyn ComponentModel>,
        ],
    );
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page);
    course.on_router_location(&Location::page("page-1")).await;

    let test = course.get_by_id("t-1").unwrap();
    assert_eq!(test.max_score(), 10.0);
    assert_eq!(test.questions().len(), 1);
}

#[tokio::test]
async fn suppressed_marking_is_revealed_after_the_final_attempt() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(
        config(
            r#"
id = "t-1"
suppress_marking = true
[attempts]
limit = 1
[questions]
can_show_marking = true
can_show_model_answer = true
"#,
        ),
        page,
    );

    // Marking held back while an attempt remains.
    let before = questions[0].settings().unwrap();
    assert!(!before.can_show_marking);
    assert!(!before.can_show_model_answer);

    complete_attempt(&mut course, &questions, &[10.0; 4], &[true; 4]).await;

    let after = questions[0].settings().unwrap();
    assert!(after.can_show_marking);
    assert!(after.can_show_model_answer);
    assert_eq!(after.test_id, "t-1");
    assert!(questions[0].refreshes() >= 1);
}

#[tokio::test]
async fn course_rollup_requires_passed_subsets() {
    let harness = Harness::new();
    let (page_a, questions_a) = four_question_page();
    let questions_b: Vec<Arc<FakeQuestion>> = (1..=2)
        .map(|n| FakeQuestion::new(&format!("b-q-{n}"), 10.0))
        .collect();
    let page_b = FakePage::new(
        "b-test",
        "page-2",
        questions_b
            .iter()
            .map(|q| q.clone() as Arc<dyn ComponentModel>)
            .collect(),
    );

    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page_a);
    course.register(
        config(
            r#"
id = "t-2"
[passmark]
score = 75
correctness = 50
[attempts]
limit = 2
[reset]
reload_page = false
"#,
        ),
        page_b,
    );

    // Pass the first test, fail the second.
    complete_attempt(
        &mut course,
        &questions_a,
        &[10.0, 10.0, 5.0, 5.0],
        &[true, true, false, false],
    )
    .await;
    course.on_router_location(&Location::page("page-2")).await;
    for question in &questions_b {
        question.answer(0.0, false);
        course.update();
    }
    course.on_router_location(&Location::menu("menu-1")).await;

    assert_eq!(course.score(), 30.0);
    assert_eq!(course.max_score(), 60.0);
    assert_eq!(course.scaled_score(), 50.0);
    assert_eq!(course.question_count(), 6);
    assert!(!course.is_passed());
    // Course completion requires every test passed under the default passmark.
    assert!(!course.is_complete());
    assert!(course.can_retry());
    assert!(course.get_model_has_test("b-q-1"));
    assert!(course.get_model_has_test("page-2"));
    assert!(!course.get_model_has_test("page-9"));
    assert_eq!(course.get_by_model_id("page-1").len(), 1);
}

#[tokio::test]
async fn course_completes_and_passes_when_every_test_passes() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page);

    complete_attempt(&mut course, &questions, &[10.0; 4], &[true; 4]).await;

    assert!(course.is_complete());
    assert!(course.is_passed());
    let events = harness.observer.events();
    assert!(events.contains(&"course:complete".to_string()));
    assert!(events.contains(&"course:pass".to_string()));
}

#[tokio::test]
async fn legacy_payloads_are_gated_by_config() {
    let harness = Harness::new();
    let (page, questions) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(
        config(
            r#"
id = "t-1"
emit_legacy_state = false
"#,
        ),
        page.clone(),
    );
    complete_attempt(&mut course, &questions, &[10.0; 4], &[true; 4]).await;
    assert!(!harness
        .observer
        .events()
        .iter()
        .any(|e| e.starts_with("legacy:")));

    let harness = Harness::new();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(config(BOUNDARY_CONFIG), page);
    course.restore().unwrap();
    let events = harness.observer.events();
    assert!(events.contains(&"legacy:Registered t-1".to_string()));
    assert!(events.contains(&"legacy:Restored t-1".to_string()));
}

#[tokio::test]
async fn disabled_tests_are_not_registered() {
    let harness = Harness::new();
    let (page, _) = four_question_page();
    let mut course = TestsSet::new(&CourseConfig::default(), harness.host());
    course.register(
        config(
            r#"
id = "t-1"
is_enabled = false
"#,
        ),
        page,
    );
    assert!(course.tests().is_empty());
    assert!(!course.get_model_has_test("page-1"));
}
