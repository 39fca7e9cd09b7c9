//! Per exam-type ordered question lists.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{AssessError, Result};
use crate::model::{AnswerOption, ExamType, Question};
use crate::store::{load_collection, save_collection};
use crate::traits::KeyValueStore;

/// A question as an administrator enters it, before validation.
#[derive(Debug, Clone, Default)]
pub struct QuestionDraft {
    pub text: String,
    pub options: Vec<OptionDraft>,
}

/// One option row: display text plus a `"key:value,..."` score mapping.
#[derive(Debug, Clone, Default)]
pub struct OptionDraft {
    pub text: String,
    pub score: String,
}

impl OptionDraft {
    pub fn new(text: impl Into<String>, score: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: score.into(),
        }
    }
}

/// Parse a score mapping such as `"tech:2, creative:1"`.
///
/// Segments without a key are skipped, a missing value counts as 1, and a
/// value that is not a number drops the segment.
pub fn parse_score_map(input: &str) -> BTreeMap<String, f64> {
    let mut map = BTreeMap::new();
    for segment in input.split(',') {
        let mut parts = segment.split(':').map(str::trim);
        let key = parts.next().unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        let value = match parts.next().filter(|v| !v.is_empty()) {
            None => 1.0,
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => continue,
            },
        };
        map.insert(key.to_string(), value);
    }
    map
}

/// Render a score map back into its `"key:value"` form for editing.
pub fn format_score_map(map: &BTreeMap<String, f64>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(",")
}

impl QuestionDraft {
    /// Validate the draft into a storable question.
    pub fn into_question(self) -> Result<Question> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(AssessError::validation("question text is empty"));
        }
        let options: Vec<AnswerOption> = self
            .options
            .iter()
            .filter(|o| !o.text.trim().is_empty())
            .map(|o| AnswerOption {
                text: o.text.trim().to_string(),
                score_map: parse_score_map(&o.score),
            })
            .collect();
        if options.len() < 2 {
            return Err(AssessError::validation(format!(
                "a question needs at least 2 answer options, got {}",
                options.len()
            )));
        }
        Ok(Question {
            text: text.to_string(),
            options,
        })
    }
}

impl From<&Question> for QuestionDraft {
    fn from(q: &Question) -> Self {
        Self {
            text: q.text.clone(),
            options: q
                .options
                .iter()
                .map(|o| OptionDraft::new(o.text.clone(), format_score_map(&o.score_map)))
                .collect(),
        }
    }
}

/// Administrator-owned question lists, one document per exam type.
#[derive(Clone)]
pub struct QuestionBank {
    store: Arc<dyn KeyValueStore>,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Published questions for `exam_type`, in order.
    pub fn list_questions(&self, exam_type: ExamType) -> Result<Vec<Question>> {
        load_collection(self.store.as_ref(), exam_type.questions_key())
    }

    pub fn question_count(&self, exam_type: ExamType) -> Result<usize> {
        Ok(self.list_questions(exam_type)?.len())
    }

    /// Replace the question at `index`, or append when `index` is `None`.
    pub fn upsert_question(
        &self,
        exam_type: ExamType,
        index: Option<usize>,
        draft: QuestionDraft,
    ) -> Result<Question> {
        let question = draft.into_question()?;
        let mut questions = self.list_questions(exam_type)?;
        match index {
            Some(i) => {
                let published = questions.len();
                let slot = questions.get_mut(i).ok_or_else(|| {
                    AssessError::validation(format!(
                        "no question at index {i} ({published} published)"
                    ))
                })?;
                *slot = question.clone();
            }
            None => questions.push(question.clone()),
        }
        self.save(exam_type, &questions)?;
        tracing::info!(%exam_type, count = questions.len(), "question saved");
        Ok(question)
    }

    /// Remove the question at `index`. Out-of-range indices change nothing.
    pub fn delete_question(&self, exam_type: ExamType, index: usize) -> Result<()> {
        let mut questions = self.list_questions(exam_type)?;
        if index >= questions.len() {
            return Ok(());
        }
        questions.remove(index);
        self.save(exam_type, &questions)?;
        tracing::info!(%exam_type, index, "question deleted");
        Ok(())
    }

    /// Replace the whole list for `exam_type`, e.g. from an imported file.
    pub fn replace_questions(&self, exam_type: ExamType, questions: Vec<Question>) -> Result<()> {
        let validated = questions
            .into_iter()
            .map(|q| QuestionDraft::from(&q).into_question())
            .collect::<Result<Vec<_>>>()?;
        self.save(exam_type, &validated)?;
        tracing::info!(%exam_type, count = validated.len(), "question bank replaced");
        Ok(())
    }

    fn save(&self, exam_type: ExamType, questions: &[Question]) -> Result<()> {
        save_collection(self.store.as_ref(), exam_type.questions_key(), questions)
    }
}
