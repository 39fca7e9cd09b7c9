//! The `aptly import` command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use aptly_core::model::{ExamType, Question};
use aptly_core::parser::{load_bank_directory, parse_bank};

use super::open_engine;

pub fn execute(bank_path: PathBuf, config_path: Option<&Path>) -> Result<()> {
    let banks = if bank_path.is_dir() {
        load_bank_directory(&bank_path)?
    } else {
        vec![parse_bank(&bank_path)?]
    };
    if banks.is_empty() {
        anyhow::bail!("no question banks found in {}", bank_path.display());
    }

    // Several files for one exam type are concatenated in file order.
    let mut by_type: BTreeMap<ExamType, Vec<Question>> = BTreeMap::new();
    for bank in banks {
        let name = bank.name.clone();
        let exam_type = bank.exam_type;
        let questions = bank
            .into_questions()
            .with_context(|| format!("invalid question in bank '{name}'"))?;
        by_type.entry(exam_type).or_default().extend(questions);
    }

    let (_, engine) = open_engine(config_path)?;
    for (exam_type, questions) in by_type {
        let count = questions.len();
        engine.questions().replace_questions(exam_type, questions)?;
        println!("Published {count} question(s) for {exam_type}");
    }

    Ok(())
}
