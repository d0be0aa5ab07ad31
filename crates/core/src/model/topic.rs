use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback topic for resources whose filename does not follow the module
/// naming convention.
const UNKNOWN_TOPIC: &str = "Unknown Topic";

/// Validated topic name (trimmed, non-empty).
///
/// Topics group test attempts for numbering and progress tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// Create a validated topic name.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the name is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TopicError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TopicError::EmptyName);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The sentinel topic used when a filename cannot be parsed.
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_TOPIC.to_string())
    }

    /// Returns true if this is the unknown-topic sentinel.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_TOPIC
    }

    /// Derive a topic from a practice-resource filename.
    ///
    /// Filenames follow `M-01_SomeTopicName_practicequestions.pdf`: a module
    /// marker, a numeric module index, the topic segments, and a trailing
    /// `practicequestions` tag, separated by hyphens or underscores. Topic
    /// segments are joined with spaces and title-cased. Anything that does
    /// not match yields [`Topic::unknown`].
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let stem = filename
            .strip_suffix(".pdf")
            .or_else(|| filename.strip_suffix(".PDF"))
            .unwrap_or(filename);
        let normalized = stem.replace('-', "_");
        let parts: Vec<&str> = normalized.split('_').collect();

        if parts.len() < 4 {
            return Self::unknown();
        }

        let is_module = parts[0].eq_ignore_ascii_case("m");
        let has_index = parts[1].chars().all(|c| c.is_ascii_digit()) && !parts[1].is_empty();
        let is_tagged = parts[parts.len() - 1].eq_ignore_ascii_case("practicequestions");
        if !(is_module && has_index && is_tagged) {
            return Self::unknown();
        }

        let name = parts[2..parts.len() - 1].join(" ");
        let titled = title_case(&name);
        Self::new(titled).unwrap_or_else(|_| Self::unknown())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic name cannot be empty")]
    EmptyName,
}
