//! Field validation helpers shared by every form.
//!
//! Struct-level rules live on the field sets themselves (via
//! `validator` derives); this module holds the pieces those derives cannot
//! express and the conversion of `validator` reports into readable text.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Optional leading `+`, then 7 to 15 digits with optional spaces or dashes.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$").expect("valid regex"));

/// Validate a contact phone number.
pub fn validate_phone(phone: &str) -> Result<(), CoreError> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if PHONE_RE.is_match(phone.trim()) && (7..=15).contains(&digits) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid phone number '{phone}'"
        )))
    }
}

/// Validate that a required text field is not blank.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Validate that a password meets minimum strength requirements.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), CoreError> {
    if password.chars().count() < min_length {
        return Err(CoreError::Validation(format!(
            "Password must be at least {min_length} characters long"
        )));
    }
    Ok(())
}

/// Render a `validator` report as `field: message; field: message`.
///
/// Fields are sorted by name so the text is stable across runs.
pub fn describe_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{field}: {detail}")
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    // -- validate_phone ------------------------------------------------------

    #[test]
    fn accepts_common_phone_formats() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("+91 98765 43210").is_ok());
        assert!(validate_phone("011-2345-6789").is_ok());
    }

    #[test]
    fn rejects_short_or_lettered_phones() {
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("").is_err());
    }

    // -- require_non_blank ---------------------------------------------------

    #[test]
    fn blank_is_rejected_with_field_name() {
        let msg = require_non_blank("Address", "   ").unwrap_err().to_string();
        assert!(msg.contains("Address is required"));
        assert!(require_non_blank("Address", "Main St").is_ok());
    }

    // -- validate_password_strength ------------------------------------------

    #[test]
    fn password_too_short() {
        let msg = validate_password_strength("abc", MIN_PASSWORD_LENGTH)
            .unwrap_err()
            .to_string();
        assert!(msg.contains("at least 6 characters"));
    }

    #[test]
    fn password_long_enough() {
        assert!(validate_password_strength("abcdef", MIN_PASSWORD_LENGTH).is_ok());
    }

    // -- describe_errors -----------------------------------------------------

    #[test]
    fn describe_lists_fields_in_order() {
        let sample = Sample {
            name: String::new(),
            email: "not-an-email".into(),
        };
        let errors = sample.validate().unwrap_err();
        let text = describe_errors(&errors);
        assert!(text.starts_with("email: "));
        assert!(text.contains("name: Name is required"));
    }

    #[test]
    fn core_error_from_report_is_validation() {
        let sample = Sample {
            name: String::new(),
            email: "a@b.co".into(),
        };
        let err: CoreError = sample.validate().unwrap_err().into();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
