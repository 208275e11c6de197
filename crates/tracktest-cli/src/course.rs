//! Course definition and simulation script parsing.
//!
//! Both are TOML files, loaded through intermediate structs and converted
//! into the engine's configuration types plus scriptable content.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use tracktest_core::config::{
    AttemptsConfig, CourseConfig, PassmarkConfig, QuestionVisibilityConfig, ResetConfig,
    TestConfig,
};

/// Intermediate TOML structure for a course definition file.
#[derive(Debug, Deserialize)]
struct TomlCourseFile {
    #[serde(default)]
    course: TomlCourseHeader,
    #[serde(default)]
    tests: Vec<TomlTest>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlCourseHeader {
    #[serde(default)]
    title: String,
    #[serde(default)]
    passmark: Option<PassmarkConfig>,
}

#[derive(Debug, Deserialize)]
struct TomlTest {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default = "default_true")]
    is_enabled: bool,
    #[serde(default = "default_true")]
    is_score_included: bool,
    #[serde(default)]
    attempts: AttemptsConfig,
    #[serde(default)]
    passmark: PassmarkConfig,
    #[serde(default)]
    reset: ResetConfig,
    #[serde(default)]
    question_settings: QuestionVisibilityConfig,
    #[serde(default)]
    suppress_marking: bool,
    #[serde(default = "default_true")]
    emit_legacy_state: bool,
    /// The page the test lives on.
    page_id: String,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    max_score: f64,
    #[serde(default)]
    min_score: f64,
    #[serde(default)]
    tracking_ref: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A parsed course definition.
#[derive(Debug, Clone)]
pub struct CourseFile {
    pub title: String,
    pub config: CourseConfig,
    pub tests: Vec<CourseTest>,
}

/// One test definition: engine configuration plus its content.
#[derive(Debug, Clone)]
pub struct CourseTest {
    pub config: TestConfig,
    pub page_id: String,
    pub questions: Vec<QuestionSpec>,
}

/// One question to build content for.
#[derive(Debug, Clone)]
pub struct QuestionSpec {
    pub id: String,
    pub min_score: f64,
    pub max_score: f64,
    pub tracking_ref: Option<String>,
}

/// A validation finding; the course still loads.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub test_id: Option<String>,
    pub message: String,
}

/// Parse a course definition from a TOML file.
pub fn parse_course(path: &Path) -> Result<CourseFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read course definition: {}", path.display()))?;
    parse_course_str(&content)
        .with_context(|| format!("failed to parse course definition: {}", path.display()))
}

/// Parse a course definition from TOML text.
pub fn parse_course_str(content: &str) -> Result<CourseFile> {
    let file: TomlCourseFile = toml::from_str(content).context("invalid course TOML")?;

    let mut config = CourseConfig::default();
    if let Some(passmark) = file.course.passmark {
        config.passmark = passmark;
    }

    let tests = file
        .tests
        .into_iter()
        .map(|test| CourseTest {
            config: TestConfig {
                id: test.id,
                title: test.title,
                is_enabled: test.is_enabled,
                is_score_included: test.is_score_included,
                attempts: test.attempts,
                passmark: test.passmark,
                reset: test.reset,
                questions: test.question_settings,
                suppress_marking: test.suppress_marking,
                emit_legacy_state: test.emit_legacy_state,
            },
            page_id: test.page_id,
            questions: test
                .questions
                .into_iter()
                .map(|q| QuestionSpec {
                    id: q.id,
                    min_score: q.min_score,
                    max_score: q.max_score,
                    tracking_ref: q.tracking_ref,
                })
                .collect(),
        })
        .collect();

    Ok(CourseFile {
        title: file.course.title,
        config,
        tests,
    })
}

/// Check a parsed course for configurations that cannot behave sensibly.
pub fn validate_course(course: &CourseFile) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (index, test) in course.tests.iter().enumerate() {
        let id = Some(test.config.id.clone());
        if course.tests[..index]
            .iter()
            .any(|other| other.config.id == test.config.id)
        {
            warnings.push(ValidationWarning {
                test_id: id.clone(),
                message: "duplicate test id".to_string(),
            });
        }
        if test.questions.is_empty() {
            warnings.push(ValidationWarning {
                test_id: id.clone(),
                message: "test has no questions".to_string(),
            });
        }
        for (q_index, question) in test.questions.iter().enumerate() {
            if test.questions[..q_index].iter().any(|o| o.id == question.id) {
                warnings.push(ValidationWarning {
                    test_id: id.clone(),
                    message: format!("duplicate question id: {}", question.id),
                });
            }
            if question.max_score <= question.min_score {
                warnings.push(ValidationWarning {
                    test_id: id.clone(),
                    message: format!("question {} has an empty score range", question.id),
                });
            }
        }
        let passmark = &test.config.passmark;
        if passmark.is_enabled && !passmark.is_scaled {
            let max_score: f64 = test.questions.iter().map(|q| q.max_score).sum();
            if passmark.score > max_score {
                warnings.push(ValidationWarning {
                    test_id: id.clone(),
                    message: format!(
                        "raw passmark score {} exceeds the maximum achievable {max_score}",
                        passmark.score
                    ),
                });
            }
            if passmark.correctness > test.questions.len() as f64 {
                warnings.push(ValidationWarning {
                    test_id: id.clone(),
                    message: format!(
                        "raw passmark correctness {} exceeds the question count {}",
                        passmark.correctness,
                        test.questions.len()
                    ),
                });
            }
        }
        if !test.config.is_enabled {
            warnings.push(ValidationWarning {
                test_id: id,
                message: "test is disabled and will not be registered".to_string(),
            });
        }
    }

    warnings
}

/// Intermediate TOML structure for a simulation script.
#[derive(Debug, Deserialize)]
struct TomlScript {
    #[serde(default)]
    attempts: Vec<TomlScriptedAttempt>,
}

#[derive(Debug, Deserialize)]
struct TomlScriptedAttempt {
    test: String,
    #[serde(default)]
    answers: Vec<TomlScriptedAnswer>,
}

#[derive(Debug, Deserialize)]
struct TomlScriptedAnswer {
    question: String,
    score: f64,
    #[serde(default)]
    correct: bool,
}

/// A parsed simulation script: attempts played in order.
#[derive(Debug, Clone)]
pub struct Script {
    pub attempts: Vec<ScriptedAttempt>,
}

#[derive(Debug, Clone)]
pub struct ScriptedAttempt {
    pub test: String,
    pub answers: Vec<ScriptedAnswer>,
}

#[derive(Debug, Clone)]
pub struct ScriptedAnswer {
    pub question: String,
    pub score: f64,
    pub correct: bool,
}

/// Parse a simulation script from a TOML file.
pub fn parse_script(path: &Path) -> Result<Script> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script: {}", path.display()))?;
    let script: TomlScript = toml::from_str(&content)
        .with_context(|| format!("failed to parse script: {}", path.display()))?;
    Ok(Script {
        attempts: script
            .attempts
            .into_iter()
            .map(|attempt| ScriptedAttempt {
                test: attempt.test,
                answers: attempt
                    .answers
                    .into_iter()
                    .map(|answer| ScriptedAnswer {
                        question: answer.question,
                        score: answer.score,
                        correct: answer.correct,
                    })
                    .collect(),
            })
            .collect(),
    })
}
