//! The `tracktest inspect` command.
//!
//! Decodes a saved state file and prints the attempt history it holds.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;
use serde_json::Value;

use tracktest_core::attempt::Attempt;
use tracktest_core::attempts::Attempts;
use tracktest_core::config::AttemptsConfig;
use tracktest_core::test_set::SAVE_STATE_KEY;

pub fn execute(state_path: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&state_path)
        .with_context(|| format!("failed to read state from {}", state_path.display()))?;
    let values: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse state in {}", state_path.display()))?;

    let Some(namespace) = values.get(SAVE_STATE_KEY).and_then(Value::as_object) else {
        println!("No saved test state.");
        return Ok(());
    };

    let mut table = Table::new();
    table.set_header(vec![
        "Test", "Used", "Attempt", "Score", "Correct", "Complete", "Passed", "In progress",
    ]);

    let mut ids: Vec<&String> = namespace.keys().collect();
    ids.sort();

    for id in ids {
        let blob = namespace[id]
            .as_str()
            .with_context(|| format!("state blob for {id} is not a string"))?;
        let data: Value = serde_json::from_str(blob)
            .with_context(|| format!("state blob for {id} is not valid JSON"))?;
        let parts = data
            .as_array()
            .filter(|parts| parts.len() == 2)
            .with_context(|| format!("state for {id} has the wrong shape"))?;

        // Retention flags do not matter for display; the raw history is shown.
        let mut attempts = Attempts::new(&AttemptsConfig {
            store_all_attempts: true,
            ..AttemptsConfig::default()
        });
        attempts
            .restore(&parts[0])
            .with_context(|| format!("failed to restore attempt history for {id}"))?;
        let mut current = Attempt::new();
        current
            .restore(&parts[1])
            .with_context(|| format!("failed to restore current attempt for {id}"))?;

        for (index, attempt) in attempts.history().iter().enumerate() {
            table.add_row(vec![
                id.clone(),
                attempts.used().to_string(),
                format!("#{}", index + 1),
                format!("{}/{}", attempt.score(), attempt.max_score()),
                attempt.correctness().to_string(),
                attempt.is_complete().to_string(),
                attempt.is_passed().to_string(),
                attempt.is_in_progress().to_string(),
            ]);
        }
        table.add_row(vec![
            id.clone(),
            attempts.used().to_string(),
            "current".to_string(),
            format!("{}/{}", current.score(), current.max_score()),
            current.correctness().to_string(),
            current.is_complete().to_string(),
            current.is_passed().to_string(),
            current.is_in_progress().to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}
