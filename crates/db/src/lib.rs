//! Data models and collaborator backends for the hosted database/auth
//! service.
//!
//! - [`models`]: typed rows for `listings`, `care_homes`, `food_posts` and
//!   `profiles`, plus the [`Entity`](models::Entity) traits.
//! - [`repositories`]: the [`Persistence`](repositories::Persistence) and
//!   [`AuthProvider`](repositories::AuthProvider) contracts with in-process
//!   and REST implementations.

pub mod models;
pub mod password;
pub mod repositories;
