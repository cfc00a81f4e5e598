//! Client-side Validation
//!
//! Pre-network checks mirroring the form rules of the task service. A draft
//! that fails here never reaches the transport.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Anything that can be checked before submission
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field errors in form order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError { field, message: message.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Message for a single field, if it was rejected
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

// ========================
// Rule Helpers
// ========================

pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Required, trimmed, with a minimum length
pub(crate) fn check_min(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
) {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{} is required", label));
    } else if char_len(value) < min {
        errors.add(field, format!("{} must be at least {} characters", label, min));
    }
}

/// Optional, but when given it must satisfy the minimum length
pub(crate) fn check_optional_min(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: Option<&str>,
    min: usize,
) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        if char_len(value) < min {
            errors.add(field, format!("{} must be at least {} characters", label, min));
        }
    }
}

pub(crate) fn check_required(errors: &mut ValidationErrors, field: &'static str, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{} is required", label));
    }
}

pub(crate) fn check_email(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.add(field, "Email is required");
    } else if !EMAIL_RE.is_match(value) {
        errors.add(field, "Please enter a valid email address");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_length_counts_trimmed_chars() {
        let mut errors = ValidationErrors::new();
        check_min(&mut errors, "name", "Name", "  ab  ", 3);
        assert_eq!(errors.get("name"), Some("Name must be at least 3 characters"));

        let mut errors = ValidationErrors::new();
        check_min(&mut errors, "name", "Name", "   ", 3);
        assert_eq!(errors.get("name"), Some("Name is required"));

        let mut errors = ValidationErrors::new();
        check_min(&mut errors, "name", "Name", "été", 3);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_optional_min_ignores_blank() {
        let mut errors = ValidationErrors::new();
        check_optional_min(&mut errors, "description", "Description", Some("  "), 3);
        check_optional_min(&mut errors, "description", "Description", None, 3);
        assert!(errors.is_empty());

        check_optional_min(&mut errors, "description", "Description", Some("hi"), 3);
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn test_email_pattern() {
        for ok in ["a@b.co", "first.last@example.com"] {
            let mut errors = ValidationErrors::new();
            check_email(&mut errors, "email", ok);
            assert!(errors.is_empty(), "{ok} should pass");
        }
        for bad in ["", "no-at.example.com", "a@b", "a b@c.d"] {
            let mut errors = ValidationErrors::new();
            check_email(&mut errors, "email", bad);
            assert!(!errors.is_empty(), "{bad} should fail");
        }
    }

    #[test]
    fn test_display_joins_in_order() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Name is required");
        errors.add("author", "Author is required");
        assert_eq!(errors.to_string(), "Name is required; Author is required");
        assert!(errors.into_result().is_err());
    }
}
