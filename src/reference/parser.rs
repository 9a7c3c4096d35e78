use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::types::CanonicalSegment;

/// Book name: optional leading 1-3, then one or more alphabetic words.
const BOOK: &str = r"[1-3]?\s*[A-Za-z]+(?:\s+[A-Za-z]+)*";

/// Range dash; en and em dashes are accepted alongside the hyphen.
const DASH: &str = r"\s*[-\x{2013}\x{2014}]\s*";

/// Widest chapter span a single cross-chapter citation may expand into.
/// Psalms, the longest book, has 150 chapters.
pub const MAX_CHAPTER_SPAN: u32 = 150;

static WHOLE_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<book>{BOOK})\s+(?P<chapter>\d+)$"))
        .expect("whole-chapter pattern is valid")
});

static CROSS_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<book>{BOOK})\s+(?P<c1>\d+):(?P<v1>\d+){DASH}(?P<c2>\d+):(?P<v2>\d+)$"
    ))
    .expect("cross-chapter pattern is valid")
});

static SAME_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<book>{BOOK})\s+(?P<chapter>\d+):(?P<v1>\d+){DASH}(?P<v2>\d+)$"
    ))
    .expect("same-chapter pattern is valid")
});

static CROSS_BOOK: LazyLock<Regex> = LazyLock::new(|| {
    let side = format!(r"{BOOK}\s+\d+:\d+(?:{DASH}\d+)?");
    Regex::new(&format!(r"^(?P<first>{side}){DASH}(?P<second>{side})$"))
        .expect("cross-book pattern is valid")
});

static SINGLE_VERSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<book>{BOOK})\s+(?P<chapter>\d+):(?P<verse>\d+)$"
    ))
    .expect("single-verse pattern is valid")
});

/// Grammar rules in the order they are tried.
///
/// The order matters: a cross-chapter span must be recognised before the
/// same-chapter range, and the cross-book span before the single verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarRule {
    WholeChapter,
    CrossChapter,
    SameChapterRange,
    CrossBook,
    SingleVerse,
}

impl GrammarRule {
    pub const ORDER: [GrammarRule; 5] = [
        GrammarRule::WholeChapter,
        GrammarRule::CrossChapter,
        GrammarRule::SameChapterRange,
        GrammarRule::CrossBook,
        GrammarRule::SingleVerse,
    ];

    fn pattern(self) -> &'static Regex {
        match self {
            GrammarRule::WholeChapter => &WHOLE_CHAPTER,
            GrammarRule::CrossChapter => &CROSS_CHAPTER,
            GrammarRule::SameChapterRange => &SAME_CHAPTER,
            GrammarRule::CrossBook => &CROSS_BOOK,
            GrammarRule::SingleVerse => &SINGLE_VERSE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrammarRule::WholeChapter => "whole_chapter",
            GrammarRule::CrossChapter => "cross_chapter",
            GrammarRule::SameChapterRange => "same_chapter_range",
            GrammarRule::CrossBook => "cross_book",
            GrammarRule::SingleVerse => "single_verse",
        }
    }
}

/// One output item of the splitter.
///
/// Input that no grammar rule recognises is passed through trimmed but
/// otherwise untouched; validation decides whether it is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Canonical(CanonicalSegment),
    Unrecognized(String),
}

impl Segment {
    pub fn as_canonical(&self) -> Option<&CanonicalSegment> {
        match self {
            Segment::Canonical(seg) => Some(seg),
            Segment::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Canonical(seg) => seg.fmt(f),
            Segment::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Returns the first grammar rule that matches `piece`, if any.
pub fn classify(piece: &str) -> Option<GrammarRule> {
    let piece = piece.trim();
    GrammarRule::ORDER
        .into_iter()
        .find(|rule| rule.pattern().is_match(piece))
}

/// Splits a citation into single-chapter segments.
///
/// Comma-separated pieces are processed independently and their results are
/// concatenated in order; empty pieces between commas are dropped.
pub fn split_references(input: &str) -> Vec<Segment> {
    if !input.contains(',') {
        return split_reference(input);
    }

    input
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .flat_map(split_reference)
        .collect()
}

/// Like [`split_references`] but renders every segment to its textual form.
pub fn split_reference_strings(input: &str) -> Vec<String> {
    split_references(input)
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Canonical textual form of a citation: its segments joined by `", "`.
///
/// Applying this twice yields the same string as applying it once.
pub fn normalize_reference(input: &str) -> String {
    split_reference_strings(input).join(", ")
}

/// Splits one comma-free piece by trying each grammar rule in order.
pub fn split_reference(piece: &str) -> Vec<Segment> {
    let piece = piece.trim();

    for rule in GrammarRule::ORDER {
        let Some(caps) = rule.pattern().captures(piece) else {
            continue;
        };
        if let Some(segments) = expand(rule, &caps) {
            debug!(reference = piece, rule = rule.as_str(), count = segments.len(), "split reference");
            return segments;
        }
        // Numbers overflowed or the span was unusable; stop here rather than
        // letting a lower-priority rule reinterpret the same text.
        break;
    }

    vec![Segment::Unrecognized(piece.to_string())]
}

/// Parses a string already in canonical single-chapter form
/// (`Book C:V` or `Book C:V1-V2`).
pub fn parse_canonical(segment: &str) -> Option<CanonicalSegment> {
    let segment = segment.trim();
    if let Some(caps) = SINGLE_VERSE.captures(segment) {
        let book = normalize_book(&caps["book"]);
        let verse = number(&caps, "verse")?;
        return Some(CanonicalSegment::verse(&book, number(&caps, "chapter")?, verse));
    }
    let caps = SAME_CHAPTER.captures(segment)?;
    let book = normalize_book(&caps["book"]);
    Some(CanonicalSegment::range(
        &book,
        number(&caps, "chapter")?,
        number(&caps, "v1")?,
        number(&caps, "v2")?,
    ))
}

fn expand(rule: GrammarRule, caps: &Captures<'_>) -> Option<Vec<Segment>> {
    match rule {
        GrammarRule::WholeChapter => {
            let book = normalize_book(&caps["book"]);
            let chapter = number(caps, "chapter")?;
            Some(vec![Segment::Canonical(CanonicalSegment::whole_chapter(
                &book, chapter,
            ))])
        }
        GrammarRule::CrossChapter => {
            let book = normalize_book(&caps["book"]);
            expand_cross_chapter(
                &book,
                number(caps, "c1")?,
                number(caps, "v1")?,
                number(caps, "c2")?,
                number(caps, "v2")?,
            )
        }
        GrammarRule::SameChapterRange => {
            let book = normalize_book(&caps["book"]);
            Some(vec![Segment::Canonical(CanonicalSegment::range(
                &book,
                number(caps, "chapter")?,
                number(caps, "v1")?,
                number(caps, "v2")?,
            ))])
        }
        GrammarRule::CrossBook => {
            let first = caps["first"].trim();
            let second = caps["second"].trim();
            debug!(first, second, "splitting cross-book reference");

            let mut segments = match SINGLE_VERSE.captures(first) {
                Some(c) => vec![Segment::Canonical(CanonicalSegment::rest_of_chapter(
                    &normalize_book(&c["book"]),
                    number(&c, "chapter")?,
                    number(&c, "verse")?,
                ))],
                None => split_reference(first),
            };
            match SINGLE_VERSE.captures(second) {
                Some(c) => segments.push(Segment::Canonical(CanonicalSegment::range(
                    &normalize_book(&c["book"]),
                    number(&c, "chapter")?,
                    1,
                    number(&c, "verse")?,
                ))),
                None => segments.extend(split_reference(second)),
            }
            Some(segments)
        }
        GrammarRule::SingleVerse => {
            let book = normalize_book(&caps["book"]);
            Some(vec![Segment::Canonical(CanonicalSegment::verse(
                &book,
                number(caps, "chapter")?,
                number(caps, "verse")?,
            ))])
        }
    }
}

/// Expands `Book C1:V1-C2:V2` into one segment per chapter.
///
/// Returns `None` for a backwards span or one wider than [`MAX_CHAPTER_SPAN`].
fn expand_cross_chapter(
    book: &str,
    start_chapter: u32,
    start_verse: u32,
    end_chapter: u32,
    end_verse: u32,
) -> Option<Vec<Segment>> {
    if start_chapter == end_chapter {
        return Some(vec![Segment::Canonical(CanonicalSegment::range(
            book,
            start_chapter,
            start_verse,
            end_verse,
        ))]);
    }
    if end_chapter < start_chapter || end_chapter - start_chapter > MAX_CHAPTER_SPAN {
        return None;
    }

    let mut segments = Vec::with_capacity((end_chapter - start_chapter + 1) as usize);
    segments.push(CanonicalSegment::rest_of_chapter(book, start_chapter, start_verse));
    for chapter in start_chapter + 1..end_chapter {
        segments.push(CanonicalSegment::whole_chapter(book, chapter));
    }
    segments.push(CanonicalSegment::range(book, end_chapter, 1, end_verse));

    Some(segments.into_iter().map(Segment::Canonical).collect())
}

/// Collapses runs of whitespace inside a book name ("1  John" -> "1 John").
fn normalize_book(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn number(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name)?.as_str().parse().ok()
}
