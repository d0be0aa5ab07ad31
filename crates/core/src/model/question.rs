use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors raised when validating extracted question data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,
    #[error("option {0} cannot be empty")]
    EmptyOption(OptionLabel),
    #[error("invalid option label: {0}")]
    InvalidLabel(String),
}

//
// ─── OPTION LABEL ─────────────────────────────────────────────────────────────
//

/// One of the four answer choices of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    /// All labels in presentation order.
    pub const ALL: [OptionLabel; 4] = [Self::A, Self::B, Self::C, Self::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    /// Position of this label in the option array.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLabel {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(QuestionError::InvalidLabel(other.to_string())),
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question, immutable once extracted.
///
/// Validation happens here, at the extractor boundary; sessions and storage
/// rely on the type and never re-check the shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    text: String,
    options: [String; 4],
    correct_option: OptionLabel,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the question text is blank, or
    /// `QuestionError::EmptyOption` naming the first blank option.
    pub fn new(
        text: impl Into<String>,
        options: [String; 4],
        correct_option: OptionLabel,
    ) -> Result<Self, QuestionError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let mut trimmed: [String; 4] = Default::default();
        for label in OptionLabel::ALL {
            let value = options[label.index()].trim();
            if value.is_empty() {
                return Err(QuestionError::EmptyOption(label));
            }
            trimmed[label.index()] = value.to_string();
        }

        Ok(Self {
            text,
            options: trimmed,
            correct_option,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Option text for the given label.
    #[must_use]
    pub fn option(&self, label: OptionLabel) -> &str {
        &self.options[label.index()]
    }

    /// Options paired with their labels, in presentation order.
    pub fn options(&self) -> impl Iterator<Item = (OptionLabel, &str)> {
        OptionLabel::ALL
            .into_iter()
            .map(|label| (label, self.option(label)))
    }

    #[must_use]
    pub fn correct_option(&self) -> OptionLabel {
        self.correct_option
    }

    /// Whether the chosen label is the correct answer.
    #[must_use]
    pub fn is_correct(&self, chosen: OptionLabel) -> bool {
        chosen == self.correct_option
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//
