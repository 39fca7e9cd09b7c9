//! The `aptly schedule` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::Table;

use aptly_core::model::{ExamSchedule, ScheduleStatus};
use aptly_core::schedule::{describe_window, ScheduleInput};
use aptly_core::traits::Clock;

use super::open_engine;
use crate::{ScheduleAction, WindowArgs};

pub fn execute(action: ScheduleAction, config_path: Option<&Path>) -> Result<()> {
    let (config, engine) = open_engine(config_path)?;
    let registry = engine.schedules();
    let now = engine.clock().now();

    match action {
        ScheduleAction::Create(window) => {
            let input = ScheduleInput {
                exam_type: window.exam,
                start_date: window.start_date,
                start_time: window.start_time,
                end_date: window.end_date,
                end_time: window.end_time,
                duration_minutes: window.duration.unwrap_or(config.default_duration_minutes),
                instructions: window.instructions,
            };
            let schedule = registry.create_schedule(&input, &config.admin_name)?;
            println!("Created schedule {}", schedule.id);
            print_schedule(&schedule);
        }
        ScheduleAction::Update { id, window } => {
            let Some(existing) = registry.get_schedule(id)? else {
                anyhow::bail!("unknown schedule: {id}");
            };
            if existing.status(now) == ScheduleStatus::Expired {
                anyhow::bail!("schedule {id} has expired and can no longer be edited");
            }
            let input = merge_window(&existing, window);
            let schedule = registry.update_schedule(id, &input)?;
            println!("Updated schedule {}", schedule.id);
            print_schedule(&schedule);
        }
        ScheduleAction::List => {
            let schedules = registry.list_schedules()?;
            if schedules.is_empty() {
                println!("No schedules.");
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(vec![
                "ID",
                "Exam",
                "Start",
                "End",
                "Duration",
                "Status",
                "Window",
                "Participants",
            ]);
            for s in &schedules {
                let participants = engine.ledger().participant_count(s.id)?;
                table.add_row(vec![
                    s.id.to_string(),
                    s.exam_type.to_string(),
                    s.start_at.format("%Y-%m-%d %H:%M").to_string(),
                    s.end_at.format("%Y-%m-%d %H:%M").to_string(),
                    format!("{} min", s.duration_minutes),
                    s.status(now).to_string(),
                    describe_window(s, now),
                    participants.to_string(),
                ]);
            }
            println!("{table}");
        }
        ScheduleAction::Delete { id } => {
            if registry.get_schedule(id)?.is_none() {
                println!("No schedule {id}");
            } else {
                registry.delete_schedule(id)?;
                println!("Deleted schedule {id}");
            }
        }
    }

    Ok(())
}

/// Fields left out on the command line keep their current value.
fn merge_window(existing: &ExamSchedule, window: WindowArgs) -> ScheduleInput {
    ScheduleInput {
        exam_type: window.exam.or(Some(existing.exam_type)),
        start_date: window.start_date.or(Some(existing.start_at.date_naive())),
        start_time: window.start_time.or(Some(existing.start_at.time())),
        end_date: window.end_date.or(Some(existing.end_at.date_naive())),
        end_time: window.end_time.or(Some(existing.end_at.time())),
        duration_minutes: window.duration.unwrap_or(existing.duration_minutes),
        instructions: window.instructions.or_else(|| existing.instructions.clone()),
    }
}

fn print_schedule(schedule: &ExamSchedule) {
    println!("  Exam:     {}", schedule.exam_type);
    println!(
        "  Window:   {} to {} (UTC)",
        schedule.start_at.format("%Y-%m-%d %H:%M"),
        schedule.end_at.format("%Y-%m-%d %H:%M")
    );
    println!("  Duration: {} min", schedule.duration_minutes);
    if let Some(instructions) = &schedule.instructions {
        println!("  Notes:    {instructions}");
    }
}
