//! Career recommendations from a student's attempts.
//!
//! Recommendations come from an ordered list of threshold rules. Rule order is
//! the tie-break: qualifying entries are appended in declaration order,
//! deduplicated by title and truncated to [`MAX_RECOMMENDATIONS`].

use serde::{Deserialize, Serialize};

use crate::analysis::{analyze, TraitAnalysis};
use crate::model::{Attempt, ExamType};

pub const MAX_RECOMMENDATIONS: usize = 5;

/// A suggested career.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub match_percent: u8,
    pub reason: String,
    pub path: String,
}

/// A recommendation template as written in the rule table.
#[derive(Debug, Clone, Copy)]
pub struct Suggestion {
    pub title: &'static str,
    pub match_percent: u8,
    pub reason: &'static str,
    pub path: &'static str,
}

impl Suggestion {
    fn to_recommendation(self) -> Recommendation {
        Recommendation {
            title: self.title.to_string(),
            match_percent: self.match_percent,
            reason: self.reason.to_string(),
            path: self.path.to_string(),
        }
    }
}

/// What the rules look at: the first attempt of each test type.
pub struct Evidence<'a> {
    pub career: Option<&'a Attempt>,
    pub personality: Option<TraitAnalysis>,
    pub skills: Option<TraitAnalysis>,
}

impl<'a> Evidence<'a> {
    pub fn from_attempts(attempts: &'a [Attempt]) -> Self {
        let first = |t: ExamType| attempts.iter().find(|a| a.test_type == t);
        Self {
            career: first(ExamType::Career),
            personality: first(ExamType::Personality).map(analyze),
            skills: first(ExamType::Skills).map(analyze),
        }
    }

    /// Personality and Skills analyses, when both tests were taken.
    fn both(&self) -> Option<(&TraitAnalysis, &TraitAnalysis)> {
        self.personality.as_ref().zip(self.skills.as_ref())
    }
}

/// One entry of the rule table.
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&Evidence<'_>) -> bool,
    pub yields: &'static [Suggestion],
}

fn at_least(analysis: &TraitAnalysis, key: &str, threshold: f64) -> bool {
    analysis.average(key).is_some_and(|avg| avg >= threshold)
}

/// The rule table, in evaluation order.
pub static RULES: &[Rule] = &[
    Rule {
        name: "career-score",
        applies: |e| e.career.is_some_and(|a| a.score >= 70.0),
        yields: &[
            Suggestion {
                title: "Software Engineer",
                match_percent: 95,
                reason: "Strong technical aptitude and logical thinking skills",
                path: "Bachelor's in Computer Science → Junior Developer → Senior Engineer",
            },
            Suggestion {
                title: "Data Scientist",
                match_percent: 90,
                reason: "Excellent analytical and problem-solving abilities",
                path: "Bachelor's in Data Science/Statistics → Data Analyst → Data Scientist",
            },
        ],
    },
    Rule {
        name: "creativity",
        applies: |e| e.both().is_some_and(|(p, _)| at_least(p, "creativity", 4.0)),
        yields: &[Suggestion {
            title: "UX/UI Designer",
            match_percent: 88,
            reason: "High creativity combined with technical understanding",
            path: "Design Degree → Junior Designer → UX Lead",
        }],
    },
    Rule {
        name: "communication-teamwork",
        applies: |e| {
            e.both().is_some_and(|(p, s)| {
                at_least(s, "communication", 4.0) && at_least(p, "teamwork", 4.0)
            })
        },
        yields: &[Suggestion {
            title: "Project Manager",
            match_percent: 85,
            reason: "Strong communication and team collaboration skills",
            path: "Business/IT Degree → Team Lead → Project Manager → Senior PM",
        }],
    },
    Rule {
        name: "technical-skills",
        applies: |e| e.both().is_some_and(|(_, s)| at_least(s, "technical", 4.0)),
        yields: &[Suggestion {
            title: "DevOps Engineer",
            match_percent: 87,
            reason: "Technical expertise with systematic problem-solving",
            path: "Computer Science Degree → System Admin → DevOps Engineer",
        }],
    },
];

/// Emitted when no rule applies.
pub static FALLBACK: &[Suggestion] = &[
    Suggestion {
        title: "Business Analyst",
        match_percent: 78,
        reason: "Versatile skills applicable to business and technology",
        path: "Business Degree → Junior Analyst → Business Analyst → Senior Analyst",
    },
    Suggestion {
        title: "IT Consultant",
        match_percent: 75,
        reason: "Balanced technical and communication abilities",
        path: "IT Degree → Junior Consultant → IT Consultant → Senior Consultant",
    },
];

/// Recommend careers from all of one student's attempts.
pub fn recommend(attempts: &[Attempt]) -> Vec<Recommendation> {
    recommend_with(RULES, FALLBACK, attempts)
}

/// Evaluate an arbitrary rule table.
pub fn recommend_with(rules: &[Rule], fallback: &[Suggestion], attempts: &[Attempt]) -> Vec<Recommendation> {
    let evidence = Evidence::from_attempts(attempts);
    let mut out: Vec<Recommendation> = Vec::new();

    for rule in rules {
        if !(rule.applies)(&evidence) {
            continue;
        }
        tracing::debug!(rule = rule.name, "recommendation rule applied");
        for suggestion in rule.yields {
            if out.iter().all(|r| r.title != suggestion.title) {
                out.push(suggestion.to_recommendation());
            }
        }
    }

    if out.is_empty() {
        out.extend(fallback.iter().map(|s| s.to_recommendation()));
    }
    out.truncate(MAX_RECOMMENDATIONS);
    out
}
