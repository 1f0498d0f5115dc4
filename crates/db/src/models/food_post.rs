//! Surplus food post model.

use serde::{Deserialize, Serialize};
use validator::Validate;
use rrr_core::catalog;
use rrr_core::error::CoreError;
use rrr_core::types::Timestamp;
use rrr_core::validation::validate_phone;

use super::profile::Profile;
use super::{fill_blank, Entity, EntityFields, EntityKind, Facet, RecordHeader};

/// A row from the `food_posts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPost {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(flatten)]
    pub fields: FoodPostFields,
}

impl FoodPost {
    /// Whether the food is past its expiry at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.fields.expires_at.is_some_and(|at| at <= now)
    }
}

/// Editable fields of a food post.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FoodPostFields {
    #[validate(length(min = 1, message = "Event name is required"))]
    pub event_name: String,
    pub food_type: String,
    /// Free text, e.g. "40 plates".
    #[validate(length(min = 1, message = "Quantity is required"))]
    pub quantity: String,
    pub expires_at: Option<Timestamp>,
    #[validate(length(min = 1, message = "Pickup address is required"))]
    pub pickup_address: String,
    pub contact_phone: String,
    #[validate(length(max = 1000))]
    pub description: String,
    /// Inline `data:` URL.
    pub image: Option<String>,
}

impl EntityFields for FoodPostFields {
    fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        catalog::validate_food_type(&self.food_type)?;
        if self.expires_at.is_none() {
            return Err(CoreError::Validation(
                "expires_at: Expiry time is required".to_string(),
            ));
        }
        validate_phone(&self.contact_phone)
    }

    fn autofill_from(&mut self, profile: &Profile) {
        fill_blank(&mut self.pickup_address, Some(&profile.fields.address));
        fill_blank(&mut self.contact_phone, Some(&profile.fields.phone));
    }
}

impl Entity for FoodPost {
    type Fields = FoodPostFields;

    const KIND: EntityKind = EntityKind::FoodPost;

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn fields(&self) -> &FoodPostFields {
        &self.fields
    }

    fn from_parts(header: RecordHeader, fields: FoodPostFields) -> Self {
        Self { header, fields }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.fields.event_name, &self.fields.pickup_address]
    }

    fn facet(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::FoodType => Some(&self.fields.food_type),
            _ => None,
        }
    }

    fn expires_at(&self) -> Option<Timestamp> {
        self.fields.expires_at
    }
}
