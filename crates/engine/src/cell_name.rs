//! Cell-name lexical rule.
//!
//! A cell name is a letter or underscore followed by zero or more letters,
//! digits, or underscores. Formula variables follow the same rule, so the
//! check lives here and both sides share it.

/// Returns true if `name` is a lexically valid cell name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
