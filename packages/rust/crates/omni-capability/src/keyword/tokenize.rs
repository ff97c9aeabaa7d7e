//! Lexical tokenizer shared by index construction and querying.

/// Lower-case `text` and split it into maximal runs of `[a-z_]`.
///
/// Digits, punctuation, whitespace and non-ASCII letters all act as
/// separators and are dropped.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_lowercase() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
