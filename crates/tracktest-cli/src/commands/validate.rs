//! The `tracktest validate` command.

use std::path::PathBuf;

use anyhow::Result;

use crate::course;

pub fn execute(course_path: PathBuf) -> Result<()> {
    let parsed = course::parse_course(&course_path)?;

    let title = if parsed.title.is_empty() {
        "(untitled)"
    } else {
        parsed.title.as_str()
    };
    println!("Course: {title} ({} tests)", parsed.tests.len());
    for test in &parsed.tests {
        println!(
            "  {} — {} questions, {} attempt(s)",
            test.config.id,
            test.questions.len(),
            if test.config.attempts.limit <= 0 {
                "infinite".to_string()
            } else {
                test.config.attempts.limit.to_string()
            }
        );
    }

    let warnings = course::validate_course(&parsed);
    for warning in &warnings {
        let prefix = warning
            .test_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", warning.message);
    }

    if warnings.is_empty() {
        println!("Course definition valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
