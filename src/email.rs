//! Email address shape validation and free-text parsing.

use regex::Regex;
use std::sync::OnceLock;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// Check whether a string looks like a deliverable email address.
///
/// This is a shape check, not an MX lookup — the signup forms themselves
/// are the final arbiter.
pub fn is_valid_email(email: &str) -> bool {
    let trimmed = email.trim();
    !trimmed.is_empty() && email_pattern().is_match(trimmed)
}

/// Extract valid email addresses from comma- or newline-separated text.
///
/// Invalid entries are dropped silently; order is preserved.
pub fn parse_emails(text: &str) -> Vec<String> {
    text.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|e| is_valid_email(e))
        .map(str::to_string)
        .collect()
}
