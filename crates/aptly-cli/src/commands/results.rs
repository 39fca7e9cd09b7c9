//! The `aptly results` command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use comfy_table::Table;

use aptly_core::report::ResultsReport;

use super::{open_engine, resolve_user};

pub fn execute(
    user: Option<String>,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let (_, engine) = open_engine(config_path)?;
    let user_key = match &user {
        Some(u) => Some(resolve_user(&engine, u)?.user_key),
        None => None,
    };
    let report = engine.results(user_key.as_deref())?;

    if let Some(path) = &output {
        report.save_json(path)?;
        tracing::info!(path = %path.display(), "report saved");
    }

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &ResultsReport) {
    if report.attempts.is_empty() {
        println!("No completed attempts.");
        return;
    }

    let mut summary = Table::new();
    summary.set_header(vec!["Student", "Completed", "Average score"]);
    for s in &report.summaries {
        summary.add_row(vec![
            s.user_key.clone(),
            s.completed_tests.to_string(),
            format!("{:.0}", s.avg_score),
        ]);
    }
    println!("{summary}");

    for entry in &report.attempts {
        let a = &entry.attempt;
        println!(
            "\n{} | {} | score {:.1} | {}",
            a.test_type,
            a.user_key,
            a.score,
            a.completed_at.format("%Y-%m-%d %H:%M")
        );
        println!("  attempt {}", a.id);
        for c in &entry.analysis.categories {
            println!("  {:<28} {:>5.2}  {:>3.0}%", c.label, c.avg_score, c.percentage);
        }
        if let Some(f) = &entry.feedback {
            println!("  Feedback:    {}", f.feedback_text);
            println!("  Suggestions: {}", f.suggestions_text);
        }
    }

    if !report.recommendations.is_empty() {
        println!("\nRecommended careers:");
        for r in &report.recommendations {
            println!("  {} ({}%)", r.title, r.match_percent);
        }
    }
}
