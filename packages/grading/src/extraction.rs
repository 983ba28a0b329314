//! Boundary to the student-name extraction collaborator.
//!
//! Extraction never fails from the caller's point of view: every failure mode
//! collapses to the `"Unknown"` sentinel with no extracted text.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use crate::models::UNKNOWN_STUDENT;

/// Longest extracted text kept on a deliverable, in characters.
pub const MAX_EXTRACTED_TEXT_CHARS: usize = 5000;
const MAX_NAME_CHARS: usize = 100;

const NAME_PREFIXES: [&str; 6] = [
    "Name:",
    "Student:",
    "Author:",
    "Submitted by:",
    "By:",
    "Student Name:",
];
const PLACEHOLDERS: [&str; 4] = ["unknown", "not found", "n/a", "none"];

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)(?:Name|Student|Author|Submitted by|By|Student Name)[\s:]*([A-Z][a-zA-Z]+(?:[ \t]+[A-Z][a-zA-Z]+){1,3})",
        r"(?m)^([A-Z][a-zA-Z]+(?:[ \t]+[A-Z][a-zA-Z]+){1,3})$",
        r"(?m)^([A-Z][a-zA-Z]+(?:[ \t]+[A-Z][a-zA-Z]+){1,3})[ \t]*\n",
        r"(?m)(?:Prepared by|Written by|Created by)[\s:]*([A-Z][a-zA-Z]+(?:[ \t]+[A-Z][a-zA-Z]+){1,3})",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});
static DISALLOWED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s\-'.]").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameExtraction {
    pub student_name: String,
    pub extracted_text: Option<String>,
}

impl NameExtraction {
    pub fn unknown() -> Self {
        Self {
            student_name: UNKNOWN_STUDENT.to_owned(),
            extracted_text: None,
        }
    }
}

/// Guesses a student's name from a submitted document.
///
/// Implementations must not fail: report [`NameExtraction::unknown`] instead.
#[async_trait]
pub trait NameExtractor: Send + Sync {
    async fn extract_student_name(&self, document: &[u8]) -> NameExtraction;
}

/// Extractor used when no extraction service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownNameExtractor;

#[async_trait]
impl NameExtractor for UnknownNameExtractor {
    async fn extract_student_name(&self, _document: &[u8]) -> NameExtraction {
        NameExtraction::unknown()
    }
}

/// Whether a file extension names a document the extractor understands.
pub fn is_extractable(extension: &str) -> bool {
    extension.trim_start_matches('.').eq_ignore_ascii_case("pdf")
}

/// Run the extractor with a deadline, then sanitize its answer.
pub async fn extract_bounded(
    extractor: &dyn NameExtractor,
    document: &[u8],
    timeout: Duration,
) -> NameExtraction {
    let raw = match tokio::time::timeout(timeout, extractor.extract_student_name(document)).await
    {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "Name extraction timed out");
            return NameExtraction::unknown();
        }
    };

    let extraction = NameExtraction {
        student_name: clean_student_name(&raw.student_name),
        extracted_text: raw
            .extracted_text
            .filter(|text| !text.is_empty())
            .map(|text| text.chars().take(MAX_EXTRACTED_TEXT_CHARS).collect()),
    };
    info!(student_name = %extraction.student_name, "Extracted student name");
    extraction
}

/// Normalize a candidate name, or return `"Unknown"` if nothing usable is left.
pub fn clean_student_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str()) {
        return UNKNOWN_STUDENT.to_owned();
    }

    let mut name = trimmed.to_owned();
    for prefix in NAME_PREFIXES {
        let matches_prefix = name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches_prefix {
            name = name[prefix.len()..].trim().to_owned();
        }
    }

    let replaced = match DISALLOWED.as_ref() {
        Some(disallowed) => disallowed.replace_all(&name, " ").into_owned(),
        None => name,
    };
    let name = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    if !name.chars().any(|c| c.is_ascii_alphabetic()) {
        return UNKNOWN_STUDENT.to_owned();
    }
    if name.chars().count() < 2 || name.chars().filter(|c| *c != ' ').all(|c| c.is_ascii_digit())
    {
        return UNKNOWN_STUDENT.to_owned();
    }

    name.chars().take(MAX_NAME_CHARS).collect()
}

/// Find a student name in already-extracted document text.
///
/// Nothing in this crate converts documents to text; this is for
/// [`NameExtractor`] implementations that do.
pub fn extract_name_from_text(text: &str) -> String {
    if text.is_empty() {
        return UNKNOWN_STUDENT.to_owned();
    }

    for pattern in NAME_PATTERNS.iter() {
        if let Some(candidate) = pattern.captures(text).and_then(|caps| caps.get(1)) {
            let cleaned = clean_student_name(candidate.as_str());
            if cleaned != UNKNOWN_STUDENT {
                return cleaned;
            }
        }
    }

    UNKNOWN_STUDENT.to_owned()
}
