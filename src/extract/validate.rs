//! Credential value validation

/// Field-label words that are never real credential values
pub const PLACEHOLDERS: &[&str] = &[
    "pass", "password", "senha", "user", "login", "username", "usuario",
];

const MIN_VALUE_CHARS: usize = 3;

/// Values containing "pass" at either end are only trusted above this length
const PASS_AFFIX_MAX_CHARS: usize = 10;

/// Returns true if `value` is the literal text of a field label
pub fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    PLACEHOLDERS.contains(&lower.as_str())
}

/// Checks a candidate username
///
/// # Rules
///
/// - at least 3 characters
/// - not a placeholder word (any case)
/// - does not start or end with "pass" unless longer than 10 characters
pub fn is_valid_username(value: &str) -> bool {
    let len = value.chars().count();
    if len < MIN_VALUE_CHARS || is_placeholder(value) {
        return false;
    }

    let lower = value.to_lowercase();
    if (lower.starts_with("pass") || lower.ends_with("pass")) && len <= PASS_AFFIX_MAX_CHARS {
        return false;
    }

    true
}

/// Checks a candidate password
///
/// Same rules as a username, and the value must not contain "user" or
/// "login": those are label text that leaked into the capture.
pub fn is_valid_password(value: &str) -> bool {
    if !is_valid_username(value) {
        return false;
    }

    let lower = value.to_lowercase();
    !lower.contains("user") && !lower.contains("login")
}
