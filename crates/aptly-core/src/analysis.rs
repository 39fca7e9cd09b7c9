//! Trait analysis: turning an attempt's raw answers into category scores.
//!
//! Which category a question feeds is purely positional. Each exam type has a
//! [`CategoryTemplate`]: an ordered list of category-key sets, one per
//! question slot. Personality and Skills templates wrap, so question 11
//! feeds the same category as question 1; the Career table does not.

use serde::{Deserialize, Serialize};

use crate::model::{Attempt, ExamType};

/// Highest value an answer can take.
pub const MAX_ANSWER: u32 = 5;

/// A named trait, skill or interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
}

/// Maps question positions to categories for one exam type.
#[derive(Debug, Clone, Copy)]
pub struct CategoryTemplate {
    /// Categories in display order.
    pub categories: &'static [Category],
    /// Category keys fed by the question at each position.
    pub slots: &'static [&'static [&'static str]],
    /// Whether positions past the last slot start again at slot 0.
    pub wraps: bool,
}

impl CategoryTemplate {
    /// The fixed template for `exam_type`.
    pub fn for_exam(exam_type: ExamType) -> &'static CategoryTemplate {
        match exam_type {
            ExamType::Career => &CAREER_TEMPLATE,
            ExamType::Personality => &PERSONALITY_TEMPLATE,
            ExamType::Skills => &SKILLS_TEMPLATE,
        }
    }

    /// Category keys fed by question `index`.
    pub fn categories_for(&self, index: usize) -> &'static [&'static str] {
        if self.slots.is_empty() {
            return &[];
        }
        let slot = if self.wraps {
            Some(index % self.slots.len())
        } else {
            (index < self.slots.len()).then_some(index)
        };
        slot.map(|i| self.slots[i]).unwrap_or(&[])
    }
}

const fn cat(key: &'static str, label: &'static str) -> Category {
    Category { key, label }
}

const PERSONALITY_CATEGORIES: [Category; 10] = [
    cat("teamwork", "Teamwork & Collaboration"),
    cat("creativity", "Creative Thinking"),
    cat("communication", "Communication Skills"),
    cat("social", "Social Engagement"),
    cat("emotional", "Emotional Stability"),
    cat("empathy", "Empathy & Understanding"),
    cat("adaptability", "Adaptability"),
    cat("openness", "Openness to Experience"),
    cat("organization", "Organization & Structure"),
    cat("curiosity", "Curiosity & Learning"),
];

const SKILLS_CATEGORIES: [Category; 10] = [
    cat("technical", "Technical Problem-Solving"),
    cat("planning", "Planning & Organization"),
    cat("communication", "Communication"),
    cat("time-management", "Time Management"),
    cat("pressure", "Work Under Pressure"),
    cat("learning", "Quick Learning"),
    cat("collaboration", "Team Collaboration"),
    cat("presentation", "Presentation Skills"),
    cat("problem-solving", "Creative Problem-Solving"),
    cat("analytical", "Analytical Thinking"),
];

const CAREER_CATEGORIES: [Category; 4] = [
    cat("technology", "Technology & Computing"),
    cat("analytical", "Analytical & Logical Work"),
    cat("detail", "Detail-Oriented Tasks"),
    cat("independent", "Independent Work"),
];

pub static PERSONALITY_TEMPLATE: CategoryTemplate = CategoryTemplate {
    categories: &PERSONALITY_CATEGORIES,
    slots: &[
        &["teamwork"],
        &["creativity"],
        &["communication"],
        &["social"],
        &["emotional"],
        &["empathy"],
        &["adaptability"],
        &["openness"],
        &["organization"],
        &["curiosity"],
    ],
    wraps: true,
};

pub static SKILLS_TEMPLATE: CategoryTemplate = CategoryTemplate {
    categories: &SKILLS_CATEGORIES,
    slots: &[
        &["technical"],
        &["planning"],
        &["communication"],
        &["time-management"],
        &["pressure"],
        &["learning"],
        &["collaboration"],
        &["presentation"],
        &["problem-solving"],
        &["analytical"],
    ],
    wraps: true,
};

pub static CAREER_TEMPLATE: CategoryTemplate = CategoryTemplate {
    categories: &CAREER_CATEGORIES,
    slots: &[
        &["technology", "analytical"],
        &["technology"],
        &["analytical"],
        &["technology"],
        &[],
        &["detail"],
        &["detail"],
        &["independent"],
        &["analytical"],
        &["independent"],
    ],
    wraps: false,
};

/// Score of one category within an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub key: String,
    pub label: String,
    /// Mean answer value, 0..=5.
    pub avg_score: f64,
    /// `avg_score / 5 * 100`.
    pub percentage: f64,
    /// Number of answers that fed this category.
    pub samples: usize,
}

/// Category scores of one attempt, in template order. Categories that no
/// answer fed are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitAnalysis {
    pub test_type: ExamType,
    pub categories: Vec<CategoryScore>,
}

impl TraitAnalysis {
    pub fn get(&self, key: &str) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Average score of `key`, if any answer fed it.
    pub fn average(&self, key: &str) -> Option<f64> {
        self.get(key).map(|c| c.avg_score)
    }
}

/// Analyze an attempt against the template of its test type.
pub fn analyze(attempt: &Attempt) -> TraitAnalysis {
    analyze_answers(attempt.test_type, &attempt.answers)
}

/// Analyze raw answers against the template of `exam_type`.
pub fn analyze_answers(exam_type: ExamType, answers: &[u32]) -> TraitAnalysis {
    let template = CategoryTemplate::for_exam(exam_type);
    let mut sums = vec![(0.0f64, 0usize); template.categories.len()];

    for (index, &answer) in answers.iter().enumerate() {
        for key in template.categories_for(index) {
            if let Some(pos) = template.categories.iter().position(|c| c.key == *key) {
                sums[pos].0 += f64::from(answer);
                sums[pos].1 += 1;
            }
        }
    }

    let categories = template
        .categories
        .iter()
        .zip(sums)
        .filter(|(_, (_, n))| *n > 0)
        .map(|(category, (sum, n))| {
            let avg_score = sum / n as f64;
            CategoryScore {
                key: category.key.to_string(),
                label: category.label.to_string(),
                avg_score,
                percentage: avg_score / f64::from(MAX_ANSWER) * 100.0,
                samples: n,
            }
        })
        .collect();

    TraitAnalysis {
        test_type: exam_type,
        categories,
    }
}
