//! Ref name validation.
//!
//! Refs are stored as files below `refs/`, so a valid name must be a safe
//! relative path:
//! - Must be non-empty
//! - Must not contain whitespace, control characters, `\`, `~`, `^`, `:`,
//!   `?`, `*` or `[`
//! - Must not start or end with `/`
//! - Components between slashes must be non-empty and must not start with `.`
//! - Must not end with `.lock`

use crate::error::{StoreError, StoreResult};

const FORBIDDEN_CHARS: &[char] = &['\\', '~', '^', ':', '?', '*', '['];

/// Validate a ref name, returning `Ok(())` if it may be stored.
pub fn validate_ref_name(name: &str) -> StoreResult<()> {
    let invalid = |reason: String| StoreError::InvalidRef {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("ref name must not be empty".into()));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid("must not start or end with '/'".into()));
    }
    if name.ends_with(".lock") {
        return Err(invalid("must not end with '.lock'".into()));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid("path components must not be empty".into()));
        }
        if component.starts_with('.') {
            return Err(invalid(format!("component must not start with '.': {component:?}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_ref_name("app/org.example.Tool/x86_64/stable").is_ok());
        assert!(validate_ref_name("runtime/org.example.Platform/aarch64/23.08").is_ok());
        assert!(validate_ref_name("appstream2/x86_64").is_ok());
        assert!(validate_ref_name("main").is_ok());
    }

    #[test]
    fn reject_empty_and_slashes() {
        assert!(validate_ref_name("").is_err());
        assert!(validate_ref_name("/app/x").is_err());
        assert!(validate_ref_name("app/x/").is_err());
        assert!(validate_ref_name("app//x").is_err());
    }

    #[test]
    fn reject_traversal() {
        assert!(validate_ref_name("app/../../etc").is_err());
        assert!(validate_ref_name("app/.hidden").is_err());
        assert!(validate_ref_name(".").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        assert!(validate_ref_name("has space").is_err());
        assert!(validate_ref_name("a\tb").is_err());
        assert!(validate_ref_name("a*b").is_err());
        assert!(validate_ref_name("a\\b").is_err());
        assert!(validate_ref_name("main.lock").is_err());
    }
}
