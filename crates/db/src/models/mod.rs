//! Typed models for every table of the hosted service.
//!
//! Each persisted type is a [`RecordHeader`] (service-assigned identity and
//! timestamps) plus a typed field set. The field set is what forms edit and
//! what create/update submit; the header is never written by the client.

pub mod actor;
pub mod care_home;
pub mod food_post;
pub mod listing;
pub mod profile;

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use rrr_core::error::CoreError;
use rrr_core::roles::ActorRole;
use rrr_core::types::{ActorId, EntityId, Timestamp};

use self::care_home::CareHome;
use self::food_post::FoodPost;
use self::listing::ReuseListing;
use self::profile::Profile;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Identity and bookkeeping columns written only by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub id: EntityId,
    pub owner_id: ActorId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Column names that belong to the header rather than the field set.
pub const HEADER_COLUMNS: &[&str] = &["id", "owner_id", "created_at", "updated_at"];

// ---------------------------------------------------------------------------
// Kinds and facets
// ---------------------------------------------------------------------------

/// The persisted entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Listing,
    CareHome,
    FoodPost,
    Profile,
}

impl EntityKind {
    /// Table name on the hosted service.
    pub fn table(self) -> &'static str {
        match self {
            Self::Listing => "listings",
            Self::CareHome => "care_homes",
            Self::FoodPost => "food_posts",
            Self::Profile => "profiles",
        }
    }

    /// Prefix used for change event names, e.g. `listing.created`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::CareHome => "care_home",
            Self::FoodPost => "food_post",
            Self::Profile => "profile",
        }
    }

    /// Human-readable noun used in notices ("Could not save listing").
    pub fn label(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::CareHome => "care home",
            Self::FoodPost => "food post",
            Self::Profile => "profile",
        }
    }

    pub fn from_table(table: &str) -> Option<Self> {
        match table {
            "listings" => Some(Self::Listing),
            "care_homes" => Some(Self::CareHome),
            "food_posts" => Some(Self::FoodPost),
            "profiles" => Some(Self::Profile),
            _ => None,
        }
    }
}

/// Categorical filter dimensions understood by the query view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Category,
    Condition,
    /// Computed from the entity's free flag rather than stored.
    PriceType,
    FoodType,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The editable part of an entity: what forms hold and what is submitted.
pub trait EntityFields:
    Debug + Clone + PartialEq + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Client-side validation run before any network call.
    fn check(&self) -> Result<(), CoreError>;

    /// Blank fields that are not relevant to `role`.
    fn scoped_to_role(self, _role: ActorRole) -> Self {
        self
    }

    /// Fill blank contact/address fields from the actor's profile.
    ///
    /// Fields the user already typed are never overwritten.
    fn autofill_from(&mut self, _profile: &Profile) {}
}

/// A stored record: a header plus a typed field set.
pub trait Entity:
    Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Fields: EntityFields;

    const KIND: EntityKind;

    fn header(&self) -> &RecordHeader;

    fn fields(&self) -> &Self::Fields;

    fn from_parts(header: RecordHeader, fields: Self::Fields) -> Self;

    /// Fields searched by free text (name/title and address/location).
    fn search_fields(&self) -> Vec<&str>;

    /// Stored value of a categorical facet, if this type has it.
    fn facet(&self, _facet: Facet) -> Option<&str> {
        None
    }

    /// Free flag used by the computed price-type facet.
    fn is_free(&self) -> bool {
        false
    }

    /// Expiry used to hide stale records from the query view.
    fn expires_at(&self) -> Option<Timestamp> {
        None
    }

    fn id(&self) -> &EntityId {
        &self.header().id
    }

    fn owner_id(&self) -> &ActorId {
        &self.header().owner_id
    }
}

// ---------------------------------------------------------------------------
// Tagged variant
// ---------------------------------------------------------------------------

/// Any of the shared entity types, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRecord {
    Listing(ReuseListing),
    CareHome(CareHome),
    FoodPost(FoodPost),
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Listing(_) => EntityKind::Listing,
            Self::CareHome(_) => EntityKind::CareHome,
            Self::FoodPost(_) => EntityKind::FoodPost,
        }
    }

    pub fn header(&self) -> &RecordHeader {
        match self {
            Self::Listing(e) => e.header(),
            Self::CareHome(e) => e.header(),
            Self::FoodPost(e) => e.header(),
        }
    }

    /// Display title of the record.
    pub fn title(&self) -> &str {
        match self {
            Self::Listing(e) => &e.fields.name,
            Self::CareHome(e) => &e.fields.organization_name,
            Self::FoodPost(e) => &e.fields.event_name,
        }
    }
}

impl From<ReuseListing> for EntityRecord {
    fn from(e: ReuseListing) -> Self {
        Self::Listing(e)
    }
}

impl From<CareHome> for EntityRecord {
    fn from(e: CareHome) -> Self {
        Self::CareHome(e)
    }
}

impl From<FoodPost> for EntityRecord {
    fn from(e: FoodPost) -> Self {
        Self::FoodPost(e)
    }
}

/// Fill `slot` from `source` when `slot` is blank and `source` is not.
pub(crate) fn fill_blank(slot: &mut String, source: Option<&str>) {
    if slot.trim().is_empty() {
        if let Some(value) = source.filter(|v| !v.trim().is_empty()) {
            *slot = value.to_string();
        }
    }
}
