//! Care home directory model (FoodShare recipients).

use serde::{Deserialize, Serialize};
use validator::Validate;
use rrr_core::catalog;
use rrr_core::error::CoreError;
use rrr_core::roles::ActorRole;
use rrr_core::validation::validate_phone;

use super::profile::Profile;
use super::{fill_blank, Entity, EntityFields, EntityKind, Facet, RecordHeader};

/// A row from the `care_homes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareHome {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(flatten)]
    pub fields: CareHomeFields,
}

/// Editable fields of a care home entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CareHomeFields {
    #[validate(length(min = 1, message = "Organization name is required"))]
    pub organization_name: String,
    pub facility_type: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Contact person is required"))]
    pub contact_person: String,
    pub phone: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,
    /// What the home currently needs (meals, dry rations, ...).
    pub needs: String,
    /// Inline `data:` URL.
    pub image: Option<String>,
    /// NGO partners only.
    #[validate(range(min = 1, message = "Residents must be at least 1"))]
    pub residents: Option<u32>,
    /// NGO partners only.
    pub mission: Option<String>,
}

impl EntityFields for CareHomeFields {
    fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        catalog::validate_facility_type(&self.facility_type)?;
        validate_phone(&self.phone)
    }

    fn scoped_to_role(mut self, role: ActorRole) -> Self {
        if role != ActorRole::NgoPartner {
            self.residents = None;
            self.mission = None;
        }
        self
    }

    fn autofill_from(&mut self, profile: &Profile) {
        let p = &profile.fields;
        fill_blank(&mut self.organization_name, Some(&p.organization_name));
        fill_blank(&mut self.address, Some(&p.address));
        fill_blank(&mut self.contact_person, Some(&p.full_name));
        fill_blank(&mut self.phone, Some(&p.phone));
        if self.email.as_deref().map_or(true, |e| e.trim().is_empty()) && !p.email.is_empty() {
            self.email = Some(p.email.clone());
        }
    }
}

impl Entity for CareHome {
    type Fields = CareHomeFields;

    const KIND: EntityKind = EntityKind::CareHome;

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn fields(&self) -> &CareHomeFields {
        &self.fields
    }

    fn from_parts(header: RecordHeader, fields: CareHomeFields) -> Self {
        Self { header, fields }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.fields.organization_name, &self.fields.address]
    }

    fn facet(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Category => Some(&self.fields.facility_type),
            _ => None,
        }
    }
}
