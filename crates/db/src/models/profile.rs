//! User profile model. One row per actor, keyed by the actor id.

use serde::{Deserialize, Serialize};
use validator::Validate;
use rrr_core::error::CoreError;
use rrr_core::roles::ActorRole;
use rrr_core::validation::{require_non_blank, validate_phone};

use super::{Entity, EntityFields, EntityKind, RecordHeader};

/// A row from the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(flatten)]
    pub fields: ProfileFields,
}

/// Editable profile fields.
///
/// `role` is carried so forms can show role-specific inputs, but the
/// service keeps the role chosen at registration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileFields {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    pub phone: String,
    pub address: String,
    pub role: ActorRole,
    /// Partners only.
    pub organization_name: String,
    #[validate(length(max = 500))]
    pub bio: String,
    /// Inline `data:` URL.
    pub avatar: Option<String>,
}

impl EntityFields for ProfileFields {
    fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        if !self.phone.trim().is_empty() {
            validate_phone(&self.phone)?;
        }
        if self.role.is_partner() {
            require_non_blank("Organization name", &self.organization_name)?;
        }
        Ok(())
    }

    fn scoped_to_role(mut self, role: ActorRole) -> Self {
        if !role.is_partner() {
            self.organization_name.clear();
        }
        self
    }
}

impl Entity for Profile {
    type Fields = ProfileFields;

    const KIND: EntityKind = EntityKind::Profile;

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn fields(&self) -> &ProfileFields {
        &self.fields
    }

    fn from_parts(header: RecordHeader, fields: ProfileFields) -> Self {
        Self { header, fields }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.fields.full_name, &self.fields.address]
    }
}
