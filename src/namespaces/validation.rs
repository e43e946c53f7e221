//! Namespace name rules (RFC 1123 subdomain, without dots).

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Longest name the cluster accepts.
pub const MAX_NAME_LEN: usize = 253;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Namespace name must not be empty")]
    Empty,

    #[error("Namespace name must be at most 253 characters, got {0}")]
    TooLong(usize),

    #[error("Namespace name '{0}' must comply with RFC 1123: lowercase alphanumerics and '-', starting and ending with an alphanumeric")]
    InvalidFormat(String),
}

/// Checks `name` against the namespace naming rule.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong(name.len()));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(NameError::InvalidFormat(name.to_string()));
    }
    Ok(())
}
