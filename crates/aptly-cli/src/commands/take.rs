//! The `aptly take` command.
//!
//! Reads one command per line from stdin while the countdown runs:
//! a number answers the current question and moves on, `b` goes back,
//! `s` submits and `q` cancels. When stdin closes the session keeps running
//! until it is submitted by the countdown.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use comfy_table::Table;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use aptly_core::analysis::analyze;
use aptly_core::countdown::{Countdown, CountdownEnd, SharedSession};
use aptly_core::engine::AssessmentEngine;
use aptly_core::identity::UserContext;
use aptly_core::model::{Attempt, ExamSchedule, ExamType};
use aptly_core::session::TimedSession;
use aptly_core::traits::Clock;

use super::{open_engine, resolve_user};

pub async fn execute(
    exam: ExamType,
    user: String,
    schedule_id: Option<Uuid>,
    config_path: Option<&Path>,
) -> Result<()> {
    let (config, engine) = open_engine(config_path)?;
    let user = resolve_user(&engine, &user)?;

    let schedule = launch(&engine, &user, exam, schedule_id)?;
    let mut session = engine.session(user, exam);
    session.begin()?;

    println!("{} ({} questions, {} min)", exam, session.questions().len(), schedule.duration_minutes);
    if let Some(instructions) = &schedule.instructions {
        println!("{instructions}");
    }
    println!("Answer with 1-5, b = back, s = submit, q = quit\n");

    let shared: SharedSession = Arc::new(Mutex::new(session));
    let period = Duration::from_millis(config.tick_interval_ms.max(1));
    let mut countdown = Countdown::with_period(&shared, period);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current = 0usize;
    let mut input_open = true;
    prompt(&shared, current);

    let attempt = loop {
        if !input_open {
            match countdown.finished().await {
                CountdownEnd::AutoSubmitted(attempt) => {
                    println!("\nTime is up. Your answers were submitted.");
                    break attempt;
                }
                CountdownEnd::Failed(err) => return Err(err.into()),
                CountdownEnd::Stopped => anyhow::bail!("session ended without a submission"),
            }
        }

        tokio::select! {
            end = countdown.finished() => match end {
                CountdownEnd::AutoSubmitted(attempt) => {
                    println!("\nTime is up. Your answers were submitted.");
                    break attempt;
                }
                CountdownEnd::Failed(err) => return Err(err.into()),
                CountdownEnd::Stopped => anyhow::bail!("session ended without a submission"),
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed, waiting for the countdown");
                    input_open = false;
                    continue;
                };
                match handle_line(&shared, &mut current, line.trim())? {
                    Step::Continue => prompt(&shared, current),
                    Step::Submitted(attempt) => {
                        countdown.stop();
                        break attempt;
                    }
                    Step::Cancelled => {
                        countdown.stop();
                        engine.clear_active_schedule()?;
                        println!("Exam cancelled. Nothing was recorded.");
                        return Ok(());
                    }
                }
            }
        }
    };

    print_result(&attempt);
    Ok(())
}

/// Pick the schedule to launch and make it the active reference.
fn launch(
    engine: &AssessmentEngine,
    user: &UserContext,
    exam: ExamType,
    schedule_id: Option<Uuid>,
) -> Result<ExamSchedule> {
    if let Some(id) = schedule_id {
        return Ok(engine.select_schedule(user, id)?);
    }

    let now = engine.clock().now();
    let active: Vec<ExamSchedule> = engine
        .schedules()
        .active_schedules(now)?
        .into_iter()
        .filter(|s| s.exam_type == exam)
        .collect();

    match active.as_slice() {
        [] => anyhow::bail!("no active schedule for {exam}"),
        [only] => Ok(engine.select_schedule(user, only.id)?),
        many => {
            let ids = many
                .iter()
                .map(|s| s.id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            anyhow::bail!("several active schedules for {exam}, pass --schedule (one of: {ids})")
        }
    }
}

enum Step {
    Continue,
    Submitted(Attempt),
    Cancelled,
}

fn handle_line(shared: &SharedSession, current: &mut usize, line: &str) -> Result<Step> {
    let mut session = lock(shared);
    let total = session.questions().len();

    match line {
        "" => {}
        "b" | "back" => *current = current.saturating_sub(1),
        "s" | "submit" => match session.submit() {
            Ok(attempt) => return Ok(Step::Submitted(attempt)),
            Err(err) if !err.is_fatal() => println!("{err}"),
            Err(err) => return Err(err.into()),
        },
        "q" | "quit" => {
            session.cancel();
            return Ok(Step::Cancelled);
        }
        other => match other.parse::<u32>() {
            Ok(value) => {
                let shown = session
                    .questions()
                    .get(*current)
                    .map_or(0, |q| q.options.len());
                if value == 0 || value as usize > shown {
                    println!("choose an option between 1 and {shown}");
                } else {
                    match session.answer(*current, value) {
                        Ok(()) => *current = (*current + 1).min(total.saturating_sub(1)),
                        Err(err) => println!("{err}"),
                    }
                }
            }
            Err(_) => println!("unknown input '{other}'"),
        },
    }
    Ok(Step::Continue)
}

fn prompt(shared: &SharedSession, current: usize) {
    let session = lock(shared);
    let Some(question) = session.questions().get(current) else {
        return;
    };
    let total = session.questions().len();
    let answered = session.answers().get(current).copied().flatten();

    println!(
        "[{}s left] Question {}/{}: {}",
        session.remaining_secs(),
        current + 1,
        total,
        question.text
    );
    for (i, option) in question.options.iter().enumerate() {
        let marker = if answered == Some(i as u32 + 1) { "*" } else { " " };
        println!(" {marker}{}) {}", i + 1, option.text);
    }
    if session.unanswered() == 0 {
        println!("All questions answered. Enter s to submit.");
    }
}

fn lock(shared: &SharedSession) -> std::sync::MutexGuard<'_, TimedSession> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

fn print_result(attempt: &Attempt) {
    println!("\nAttempt {} recorded", attempt.id);
    println!("Score: {:.1}", attempt.score);

    let analysis = analyze(attempt);
    if analysis.categories.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Category", "Average", "Percent"]);
    for c in &analysis.categories {
        table.add_row(vec![
            c.label.clone(),
            format!("{:.2}", c.avg_score),
            format!("{:.0}%", c.percentage),
        ]);
    }
    println!("{table}");
}
