use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification of a page update, derived from keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Result,
    AdmitCard,
    JobUpdate,
    General,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Result => "Result",
            Category::AdmitCard => "Admit Card",
            Category::JobUpdate => "Job Update",
            Category::General => "General Update",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Category::Result => "📢",
            Category::AdmitCard => "🎫",
            Category::JobUpdate => "💼",
            Category::General => "📰",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const ADMIT_CARD_KEYWORDS: &[&str] = &["admit card", "hall ticket"];
const JOB_KEYWORDS: &[&str] = &["recruitment", "vacancy", "job"];

/// Classifies text by keyword. Rules are checked in order and the first match
/// wins: result, then admit card, then job update.
pub fn categorize(text: &str) -> Category {
    let lowered = text.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    if lowered.contains("result") {
        Category::Result
    } else if contains_any(ADMIT_CARD_KEYWORDS) {
        Category::AdmitCard
    } else if contains_any(JOB_KEYWORDS) {
        Category::JobUpdate
    } else {
        Category::General
    }
}
