//! The `aptly questions` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::Table;

use aptly_core::question_bank::{format_score_map, OptionDraft, QuestionDraft};

use super::open_engine;
use crate::QuestionsAction;

pub fn execute(action: QuestionsAction, config_path: Option<&Path>) -> Result<()> {
    let (_, engine) = open_engine(config_path)?;
    let bank = engine.questions();

    match action {
        QuestionsAction::List { exam } => {
            let questions = bank.list_questions(exam)?;
            if questions.is_empty() {
                println!("No questions published for {exam}.");
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(vec!["#", "Question", "Options"]);
            for (i, q) in questions.iter().enumerate() {
                let options = q
                    .options
                    .iter()
                    .map(|o| {
                        if o.score_map.is_empty() {
                            o.text.clone()
                        } else {
                            format!("{} ({})", o.text, format_score_map(&o.score_map))
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                table.add_row(vec![(i + 1).to_string(), q.text.clone(), options]);
            }
            println!("{exam}: {} question(s)", questions.len());
            println!("{table}");
        }
        QuestionsAction::Add {
            exam,
            text,
            options,
            index,
        } => {
            let draft = QuestionDraft {
                text,
                options: options.iter().map(|o| parse_option(o)).collect(),
            };
            let position = match index {
                Some(0) => anyhow::bail!("question positions start at 1"),
                Some(i) => Some(i - 1),
                None => None,
            };
            bank.upsert_question(exam, position, draft)?;
            let count = bank.question_count(exam)?;
            match index {
                Some(i) => println!("Replaced question {i} of {exam}"),
                None => println!("Added question {count} to {exam}"),
            }
        }
        QuestionsAction::Delete { exam, index } => {
            if index == 0 {
                anyhow::bail!("question positions start at 1");
            }
            let before = bank.question_count(exam)?;
            bank.delete_question(exam, index - 1)?;
            if index > before {
                println!("No question {index} in {exam} ({before} published)");
            } else {
                println!("Deleted question {index} of {exam}");
            }
        }
    }

    Ok(())
}

/// `"Agree"` or `"Agree=tech:2,creative:1"`.
fn parse_option(raw: &str) -> OptionDraft {
    match raw.split_once('=') {
        Some((text, score)) => OptionDraft::new(text.trim(), score.trim()),
        None => OptionDraft::new(raw.trim(), ""),
    }
}
