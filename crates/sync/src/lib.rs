//! Client-side synchronisation of the platform's shared collections.
//!
//! For each entity type a [`Feature`] ties together:
//!
//! - [`CollectionStore`]: the in-memory copy of the remote table
//!   ([`RemoteCollection`]) and its `load()`.
//! - [`OwnershipPartition`]: the actor's own items, always derived.
//! - [`Query`]: search and filters, rendered as a [`ViewState`].
//! - [`MutationGateway`]: confirmed create/update/delete.
//! - [`EditSession`]: the entity currently being edited.
//!
//! [`Account`] covers registration and sign-in.

pub mod account;
pub mod collection;
pub mod error;
pub mod feature;
pub mod gateway;
pub mod partition;
pub mod query;
pub mod session;
pub mod store;

pub use account::Account;
pub use collection::{LoadTicket, RemoteCollection};
pub use error::SyncError;
pub use feature::{
    my_contributions, CareHomeFeature, DeleteOutcome, Feature, FoodPostFeature, ListingFeature,
    ProfileFeature,
};
pub use gateway::{Confirm, MutationGateway, MutationState, Submission};
pub use partition::OwnershipPartition;
pub use query::{FilterValue, Query, ViewState};
pub use session::EditSession;
pub use store::{CollectionStore, LoadOutcome};
