//! Catalog values for the categorical fields of each entity type.
//!
//! The values double as filter options in the query view, so they are
//! stored verbatim (no display casing) and compared exactly.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Reuse listings
// ---------------------------------------------------------------------------

pub const LISTING_CATEGORIES: &[&str] = &[
    "Furniture",
    "Electronics",
    "Clothing",
    "Books",
    "Appliances",
    "Toys",
    "Kitchen",
    "Other",
];

pub const LISTING_CONDITIONS: &[&str] = &["New", "Like New", "Good", "Fair", "Poor"];

/// Materials a recycler partner may declare on a listing.
pub const RECYCLABLE_MATERIALS: &[&str] = &[
    "Paper", "Plastic", "Glass", "Metal", "E-Waste", "Textile", "Organic",
];

// ---------------------------------------------------------------------------
// Care homes
// ---------------------------------------------------------------------------

pub const FACILITY_TYPES: &[&str] = &["Old Age Home", "Orphanage", "Shelter", "Other"];

// ---------------------------------------------------------------------------
// Food posts
// ---------------------------------------------------------------------------

pub const FOOD_TYPES: &[&str] = &["Veg", "Non-Veg", "Mixed"];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_listing_category(category: &str) -> Result<(), CoreError> {
    require_member("category", category, LISTING_CATEGORIES)
}

pub fn validate_listing_condition(condition: &str) -> Result<(), CoreError> {
    require_member("condition", condition, LISTING_CONDITIONS)
}

pub fn validate_material(material: &str) -> Result<(), CoreError> {
    require_member("material", material, RECYCLABLE_MATERIALS)
}

pub fn validate_facility_type(facility_type: &str) -> Result<(), CoreError> {
    require_member("facility type", facility_type, FACILITY_TYPES)
}

pub fn validate_food_type(food_type: &str) -> Result<(), CoreError> {
    require_member("food type", food_type, FOOD_TYPES)
}

fn require_member(field: &str, value: &str, allowed: &[&str]) -> Result<(), CoreError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid {field} '{value}'. Must be one of: {}",
            allowed.join(", ")
        )))
    }
}
