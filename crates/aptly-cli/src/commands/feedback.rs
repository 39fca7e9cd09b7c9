//! The `aptly feedback` command.

use std::path::Path;

use anyhow::Result;
use uuid::Uuid;

use super::open_engine;

pub fn execute(
    attempt: Uuid,
    text: String,
    suggestions: String,
    config_path: Option<&Path>,
) -> Result<()> {
    let (_, engine) = open_engine(config_path)?;
    let feedback = engine.feedback().submit_feedback(attempt, &text, &suggestions)?;
    println!(
        "Feedback saved for attempt {} at {}",
        feedback.attempt_ref,
        feedback.submitted_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}
