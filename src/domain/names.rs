//! Helpers for turning player names and artifact ids into file stems.
//!
//! Names arrive straight from request paths and command arguments, so
//! anything outside `[A-Za-z0-9_-]` is dropped before a name is joined onto a
//! directory. The result can never contain a path separator or `..`.

use super::error::DomainError;

/// Strip every character that is not an ASCII letter, digit, `_` or `-`.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect()
}

/// Sanitize `input` and reject names that end up empty.
pub fn file_stem(input: &str) -> Result<String, DomainError> {
    let stem = sanitize(input);
    if stem.is_empty() {
        return Err(DomainError::validation(format!(
            "`{input}` contains no usable file name characters"
        )));
    }
    Ok(stem)
}

/// True when `input` is already a valid stem, i.e. sanitizing is a no-op.
pub fn is_clean(input: &str) -> bool {
    !input.is_empty() && sanitize(input) == input
}
