//! Reuse marketplace listing model.

use serde::{Deserialize, Serialize};
use validator::Validate;
use rrr_core::catalog;
use rrr_core::error::CoreError;
use rrr_core::roles::ActorRole;
use rrr_core::validation::validate_phone;

use super::profile::Profile;
use super::{fill_blank, Entity, EntityFields, EntityKind, Facet, RecordHeader};

/// A row from the `listings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReuseListing {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(flatten)]
    pub fields: ListingFields,
}

/// Editable fields of a listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ListingFields {
    #[validate(length(min = 1, max = 120, message = "Item name is required"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: String,
    pub category: String,
    pub condition: String,
    pub is_free: bool,
    /// Asking price; required when the item is not free.
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i64>,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub contact_phone: String,
    /// Inline `data:` URL.
    pub image: Option<String>,
    /// Recycler partners only.
    pub accepted_materials: Vec<String>,
}

impl EntityFields for ListingFields {
    fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        catalog::validate_listing_category(&self.category)?;
        catalog::validate_listing_condition(&self.condition)?;
        if !self.is_free && self.price.is_none() {
            return Err(CoreError::Validation(
                "price: Price is required unless the item is free".to_string(),
            ));
        }
        if !self.contact_phone.trim().is_empty() {
            validate_phone(&self.contact_phone)?;
        }
        for material in &self.accepted_materials {
            catalog::validate_material(material)?;
        }
        Ok(())
    }

    fn scoped_to_role(mut self, role: ActorRole) -> Self {
        if role != ActorRole::RecyclerPartner {
            self.accepted_materials.clear();
        }
        if self.is_free {
            self.price = None;
        }
        self
    }

    fn autofill_from(&mut self, profile: &Profile) {
        fill_blank(&mut self.location, Some(&profile.fields.address));
        fill_blank(&mut self.contact_phone, Some(&profile.fields.phone));
    }
}

impl Entity for ReuseListing {
    type Fields = ListingFields;

    const KIND: EntityKind = EntityKind::Listing;

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn fields(&self) -> &ListingFields {
        &self.fields
    }

    fn from_parts(header: RecordHeader, fields: ListingFields) -> Self {
        Self { header, fields }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.fields.name, &self.fields.location]
    }

    fn facet(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Category => Some(&self.fields.category),
            Facet::Condition => Some(&self.fields.condition),
            _ => None,
        }
    }

    fn is_free(&self) -> bool {
        self.fields.is_free
    }
}
