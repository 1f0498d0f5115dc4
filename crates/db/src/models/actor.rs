//! Authenticated actor and the auth forms.

use serde::{Deserialize, Serialize};
use validator::Validate;
use rrr_core::error::CoreError;
use rrr_core::roles::ActorRole;
use rrr_core::types::ActorId;
use rrr_core::validation::{require_non_blank, validate_password_strength, MIN_PASSWORD_LENGTH};

/// The signed-in user as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub email: String,
    pub role: ActorRole,
}

/// Sign-in form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUp {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(must_match(other = "confirm_password", message = "Passwords do not match"))]
    pub password: String,
    #[serde(skip_serializing, default)]
    pub confirm_password: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    pub role: ActorRole,
    #[serde(default)]
    pub phone: String,
    /// Required for partner roles.
    #[serde(default)]
    pub organization_name: String,
}

impl SignUp {
    /// Client-side checks run before contacting the auth service.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        validate_password_strength(&self.password, MIN_PASSWORD_LENGTH)?;
        if self.role.is_partner() {
            require_non_blank("Organization name", &self.organization_name)?;
        }
        Ok(())
    }
}

impl Credentials {
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SignUp {
        SignUp {
            email: "asha@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            full_name: "Asha".into(),
            role: ActorRole::General,
            phone: String::new(),
            organization_name: String::new(),
        }
    }

    #[test]
    fn matching_passwords_pass() {
        assert!(form().check().is_ok());
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let signup = SignUp {
            confirm_password: "secret2".into(),
            ..form()
        };
        let msg = signup.check().unwrap_err().to_string();
        assert!(msg.contains("Passwords do not match"));
    }

    #[test]
    fn short_password_is_rejected() {
        let signup = SignUp {
            password: "abc".into(),
            confirm_password: "abc".into(),
            ..form()
        };
        assert!(signup.check().is_err());
    }

    #[test]
    fn recycler_needs_organization() {
        let signup = SignUp {
            role: ActorRole::RecyclerPartner,
            ..form()
        };
        assert!(signup.check().is_err());
    }

    #[test]
    fn confirmation_is_not_sent_over_the_wire() {
        let json = serde_json::to_value(form()).unwrap();
        assert!(json.get("confirm_password").is_none());
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let creds = Credentials {
            email: "asha@example.com".into(),
            password: String::new(),
        };
        assert!(creds.check().is_err());
    }
}
