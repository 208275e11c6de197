//! The `tracktest simulate` command.
//!
//! Plays a scripted learner through a course definition and reports the
//! resulting scores, pass states and lifecycle events.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::Table;
use serde::Serialize;
use uuid::Uuid;

use tracktest_content::component::ScriptedQuestion;
use tracktest_content::host::{ImmediateBarrier, RecordingObserver, StaticRouter};
use tracktest_content::subtree::StaticSubtree;
use tracktest_core::events::{CourseSnapshot, TestSnapshot};
use tracktest_core::tests_set::TestsSet;
use tracktest_core::traits::{HostContext, Location, StateStore};
use tracktest_store::file::JsonFileStore;
use tracktest_store::memory::MemoryStore;

use crate::course::{self, CourseFile, Script};

/// The outcome of one simulation run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub course_title: String,
    pub course: CourseSnapshot,
    pub tests: Vec<TestSnapshot>,
    pub events: Vec<String>,
}

impl SimulationReport {
    fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }
}

pub async fn execute(
    course_path: PathBuf,
    script_path: PathBuf,
    state: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let course_file = course::parse_course(&course_path)?;
    let script = course::parse_script(&script_path)?;

    let store: Arc<dyn StateStore> = match &state {
        Some(path) => Arc::new(JsonFileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let router = Arc::new(StaticRouter::new());
    let observer = Arc::new(RecordingObserver::new());
    let host = HostContext {
        store,
        router: router.clone(),
        barrier: Arc::new(ImmediateBarrier),
        observer: observer.clone(),
    };

    let (mut tests, questions) = build_course(&course_file, host);
    tests.restore()?;

    run_script(&mut tests, &script, &router, &questions).await?;

    print_summary(&course_file, &tests);

    if let Some(path) = output {
        let report = SimulationReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            course_title: course_file.title.clone(),
            course: tests.snapshot(),
            tests: tests.tests().iter().map(|test| test.snapshot()).collect(),
            events: observer.log(),
        };
        report.save_json(&path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

type QuestionHandles = HashMap<(String, String), Arc<ScriptedQuestion>>;

/// Build the course and its scriptable content, keeping question handles
/// addressable by (test id, question id).
fn build_course(course_file: &CourseFile, host: HostContext) -> (TestsSet, QuestionHandles) {
    let mut handles = QuestionHandles::new();
    let mut tests = TestsSet::new(&course_file.config, host);
    for test in &course_file.tests {
        let mut subtree = StaticSubtree::new(test.config.id.clone(), test.page_id.clone());
        for spec in &test.questions {
            let mut question =
                ScriptedQuestion::new(spec.id.clone(), spec.max_score).with_min_score(spec.min_score);
            if let Some(tracking_ref) = &spec.tracking_ref {
                question = question.with_tracking_ref(tracking_ref.clone());
            }
            let question = Arc::new(question);
            handles.insert(
                (test.config.id.clone(), spec.id.clone()),
                question.clone(),
            );
            subtree = subtree.with_component(question);
        }
        tests.register(test.config.clone(), Arc::new(subtree));
    }
    (tests, handles)
}

/// Play each scripted attempt: arrive at the test's page, answer, leave.
async fn run_script(
    tests: &mut TestsSet,
    script: &Script,
    router: &StaticRouter,
    questions: &QuestionHandles,
) -> Result<()> {
    for attempt in &script.attempts {
        let page_id = tests
            .get_by_id(&attempt.test)
            .with_context(|| format!("unknown test in script: {}", attempt.test))?
            .content()
            .page_id()
            .to_string();
        router.set_current(page_id.as_str());
        tests.on_router_location(&Location::page(page_id)).await;

        for answer in &attempt.answers {
            let question = questions
                .get(&(attempt.test.clone(), answer.question.clone()))
                .with_context(|| {
                    format!(
                        "unknown question in script: {}/{}",
                        attempt.test, answer.question
                    )
                })?;
            question.answer(answer.score, answer.correct);
            tests.update();
        }

        tests.on_router_location(&Location::menu("menu")).await;
    }
    Ok(())
}

fn print_summary(course_file: &CourseFile, tests: &TestsSet) {
    let mut table = Table::new();
    table.set_header(vec![
        "Test", "Score", "Scaled", "Correct", "Complete", "Passed", "Attempts",
    ]);
    for test in tests.tests() {
        let snapshot = test.snapshot();
        let remaining = snapshot
            .attempts_remaining
            .map(|n| n.to_string())
            .unwrap_or_else(|| "∞".to_string());
        table.add_row(vec![
            snapshot.id.clone(),
            format!("{}/{}", snapshot.score, snapshot.max_score),
            format!("{:.1}%", snapshot.scaled_score),
            format!("{:.1}%", snapshot.scaled_correctness),
            snapshot.is_complete.to_string(),
            snapshot.is_passed.to_string(),
            format!("{} used, {remaining} left", snapshot.attempts_used),
        ]);
    }
    println!("{table}");

    let course = tests.snapshot();
    let title = if course_file.title.is_empty() {
        "course"
    } else {
        course_file.title.as_str()
    };
    println!(
        "{title}: score {:.1}%, {} of {} tests complete, passed: {}",
        course.scaled_score, course.tests_complete, course.test_count, course.is_passed
    );
}
