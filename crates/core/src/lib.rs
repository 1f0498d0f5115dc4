//! Domain primitives shared by every RRR Platform crate.
//!
//! Nothing in here talks to the network or holds state: identifiers,
//! timestamps, roles, catalog constants, search normalisation, field
//! validation helpers, and image-file encoding.

pub mod catalog;
pub mod error;
pub mod images;
pub mod roles;
pub mod search;
pub mod types;
pub mod validation;
