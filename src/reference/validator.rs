use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::parser::split_reference_strings;

/// Strict shape of a usable segment: `Book Chapter:Verse[-Verse]`, where the
/// book name holds at least one letter.
static VALID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<book>[1-3]?\s*[A-Za-z]+(?:\s+[A-Za-z]+)*)\s+(?P<chapter>\d+):(?P<start>\d+)(?:-(?P<end>\d+))?$",
    )
    .expect("segment validation pattern is valid")
});

/// Why a reference was rejected. The rendered messages are stable and are
/// fed back verbatim to whatever produced the reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReference {
    #[error("reference '{reference}' resulted in an empty split, likely invalid input")]
    EmptySplit { reference: String },

    #[error("reference part '{segment}' is incomplete (missing chapter/verse)")]
    MissingChapterVerse { segment: String },

    #[error("reference part '{segment}' is incomplete (missing verse number)")]
    MissingVerseNumber { segment: String },

    #[error("reference part '{segment}' has start verse ({start}) greater than end verse ({end})")]
    InvertedRange { segment: String, start: u32, end: u32 },

    #[error("reference part '{segment}' has a zero chapter or verse number")]
    ZeroNumber { segment: String },

    #[error("reference part '{segment}' does not match expected format 'Book Chapter:Verse' or 'Book Chapter:StartVerse-EndVerse'")]
    Malformed { segment: String },
}

impl InvalidReference {
    /// The offending segment (or the whole reference for an empty split).
    pub fn segment(&self) -> &str {
        match self {
            InvalidReference::EmptySplit { reference } => reference,
            InvalidReference::MissingChapterVerse { segment }
            | InvalidReference::MissingVerseNumber { segment }
            | InvalidReference::InvertedRange { segment, .. }
            | InvalidReference::ZeroNumber { segment }
            | InvalidReference::Malformed { segment } => segment,
        }
    }
}

/// Checks that `reference` splits into well-formed single-chapter segments.
///
/// Returns the first problem found, in segment order.
pub fn validate_reference(reference: &str) -> Result<(), InvalidReference> {
    let segments = split_reference_strings(reference);
    if segments.is_empty() {
        return Err(InvalidReference::EmptySplit {
            reference: reference.to_string(),
        });
    }

    segments.iter().try_for_each(|s| validate_segment(s.trim()))
}

/// `(true, None)` for a usable reference, otherwise `(false, Some(reason))`.
pub fn is_valid_reference(reference: &str) -> (bool, Option<String>) {
    match validate_reference(reference) {
        Ok(()) => (true, None),
        Err(invalid) => (false, Some(invalid.to_string())),
    }
}

fn validate_segment(segment: &str) -> Result<(), InvalidReference> {
    let Some(caps) = VALID_SEGMENT.captures(segment) else {
        return Err(diagnose_shape(segment));
    };

    let parse = |name: &str| caps.name(name).map(|m| m.as_str().parse::<u32>());
    let (Some(Ok(chapter)), Some(Ok(start))) = (parse("chapter"), parse("start")) else {
        return Err(InvalidReference::Malformed {
            segment: segment.to_string(),
        });
    };
    let end = match parse("end") {
        None => start,
        Some(Ok(end)) => end,
        Some(Err(_)) => {
            return Err(InvalidReference::Malformed {
                segment: segment.to_string(),
            })
        }
    };

    if chapter == 0 || start == 0 || end == 0 {
        return Err(InvalidReference::ZeroNumber {
            segment: segment.to_string(),
        });
    }
    if start > end {
        return Err(InvalidReference::InvertedRange {
            segment: segment.to_string(),
            start,
            end,
        });
    }
    Ok(())
}

/// Picks the most specific reason for a segment that failed the shape check.
fn diagnose_shape(segment: &str) -> InvalidReference {
    let segment_owned = segment.to_string();
    // A leading number is a book ordinal ("1 John"), not a chapter.
    let has_chapter = segment
        .split_whitespace()
        .skip(1)
        .any(|token| token.parse::<u32>().is_ok());
    if !segment.contains(':') && !has_chapter {
        return InvalidReference::MissingChapterVerse {
            segment: segment_owned,
        };
    }
    if segment.ends_with(':') || segment.ends_with('-') {
        return InvalidReference::MissingVerseNumber {
            segment: segment_owned,
        };
    }
    InvalidReference::Malformed {
        segment: segment_owned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnose_prefers_missing_chapter_for_bare_words() {
        assert!(matches!(
            diagnose_shape("Jude"),
            InvalidReference::MissingChapterVerse { .. }
        ));
        assert!(matches!(
            diagnose_shape("Jude 1:"),
            InvalidReference::MissingVerseNumber { .. }
        ));
        assert!(matches!(
            diagnose_shape("Jude one"),
            InvalidReference::MissingChapterVerse { .. }
        ));
        assert!(matches!(
            diagnose_shape("1 John"),
            InvalidReference::MissingChapterVerse { .. }
        ));
        assert!(matches!(
            diagnose_shape("John chapter 3 verse 16"),
            InvalidReference::Malformed { .. }
        ));
    }
}
