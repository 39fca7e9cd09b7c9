//! TOML question bank parser.
//!
//! Loads question banks from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::analysis::CategoryTemplate;
use crate::model::{ExamType, Question};
use crate::question_bank::{OptionDraft, QuestionDraft};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    exam_type: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    text: String,
    #[serde(default)]
    options: Vec<TomlOption>,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    text: String,
    #[serde(default)]
    score: String,
}

/// A question bank read from disk, not yet validated.
#[derive(Debug, Clone)]
pub struct BankFile {
    pub exam_type: ExamType,
    pub name: String,
    pub questions: Vec<QuestionDraft>,
}

impl BankFile {
    /// Validate every draft into a storable question.
    pub fn into_questions(self) -> crate::error::Result<Vec<Question>> {
        self.questions
            .into_iter()
            .map(QuestionDraft::into_question)
            .collect()
    }
}

/// Parse a single TOML file into a `BankFile`.
pub fn parse_bank(path: &Path) -> Result<BankFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `BankFile`.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<BankFile> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let exam_type: ExamType = parsed
        .bank
        .exam_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}: {}", source_path.display(), e))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| QuestionDraft {
            text: q.text,
            options: q
                .options
                .into_iter()
                .map(|o| OptionDraft::new(o.text, o.score))
                .collect(),
        })
        .collect();

    let name = if parsed.bank.name.trim().is_empty() {
        exam_type.to_string()
    } else {
        parsed.bank.name
    };

    Ok(BankFile {
        exam_type,
        name,
        questions,
    })
}

/// Recursively load all `.toml` bank files from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<BankFile>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Position of the offending question, if the warning is about one.
    pub question: Option<usize>,
    pub message: String,
}

/// Check a bank for issues that would fail the import or skew the analysis.
pub fn validate_bank(bank: &BankFile) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for (i, q) in bank.questions.iter().enumerate() {
        let text = q.text.trim();
        if text.is_empty() {
            warnings.push(ValidationWarning {
                question: Some(i),
                message: "question text is empty".into(),
            });
        } else if !seen.insert(text.to_lowercase()) {
            warnings.push(ValidationWarning {
                question: Some(i),
                message: format!("duplicate question: {text}"),
            });
        }

        let options = q.options.iter().filter(|o| !o.text.trim().is_empty()).count();
        if options < 2 {
            warnings.push(ValidationWarning {
                question: Some(i),
                message: format!("needs at least 2 answer options, has {options}"),
            });
        }
    }

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question: None,
            message: "bank has no questions".into(),
        });
    }

    let slots = CategoryTemplate::for_exam(bank.exam_type).slots.len();
    if bank.exam_type == ExamType::Career && bank.questions.len() > slots {
        warnings.push(ValidationWarning {
            question: None,
            message: format!(
                "questions past position {slots} do not feed any career category"
            ),
        });
    }

    warnings
}
