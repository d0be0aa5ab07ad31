//! Question extraction from plain study text.
//!
//! Source material arrives as numbered multiple-choice blocks:
//!
//! ```text
//! 1. Question text, possibly spanning lines
//! A) first option
//! B) second option
//! C) third option
//! D) fourth option
//! Answer: C
//! ```

use std::sync::OnceLock;

use regex::Regex;

use exam_core::model::{OptionLabel, Question};

fn mcq_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?ms)(\d+)\.\s*(.+?)\nA\)\s*(.+?)\nB\)\s*(.+?)\nC\)\s*(.+?)\nD\)\s*(.+?)\nAnswer:\s*([ABCD])",
        )
        .expect("question pattern should be a valid regex")
    })
}

/// Extract multiple-choice questions from raw text.
///
/// Blocks that do not fully match the expected shape are skipped, as are
/// matches whose text or options fail validation. An empty result means the
/// text held no usable questions, not an error.
#[must_use]
pub fn extract_mcqs(text: &str) -> Vec<Question> {
    let mut questions = Vec::new();
    for caps in mcq_pattern().captures_iter(text) {
        let Ok(correct) = caps[7].parse::<OptionLabel>() else {
            continue;
        };
        let options = [
            caps[3].trim().to_string(),
            caps[4].trim().to_string(),
            caps[5].trim().to_string(),
            caps[6].trim().to_string(),
        ];
        if let Ok(question) = Question::new(caps[2].trim(), options, correct) {
            questions.push(question);
        }
    }
    questions
}
