/// Citation parsing, canonicalisation, and validation.
///
/// The parser is permissive: text it cannot interpret passes through
/// unchanged, and the validator decides what is acceptable.
mod parser;
mod validator;

pub use parser::{
    classify, normalize_reference, parse_canonical, split_reference, split_reference_strings,
    split_references, GrammarRule, Segment, MAX_CHAPTER_SPAN,
};
pub use validator::{is_valid_reference, validate_reference, InvalidReference};
