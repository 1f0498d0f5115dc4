//! Collaborator contracts for the hosted service and their backends.
//!
//! [`Persistence`] is the per-table CRUD contract and [`AuthProvider`] the
//! auth/session contract. Both carry the signed-in actor implicitly through
//! a shared [`Session`], the way a hosted client attaches its access token
//! to every request.

pub mod memory;
pub mod rest;

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use rrr_core::types::{ActorId, EntityId};

use crate::models::actor::{Actor, Credentials, SignUp};
use crate::models::Entity;

pub use memory::{InMemoryAuth, InMemoryBackend, InMemoryService};
pub use rest::{RestAuth, RestBackend, RestClient, RestConfig};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the persistence and auth collaborators.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The service could not be reached at all.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status not covered below.
    #[error("Service error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("{kind} with id {id} not found")]
    NotFound { kind: &'static str, id: EntityId },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The service rejected the submitted values.
    #[error("Rejected by service: {0}")]
    Validation(String),

    /// The response body did not have the expected shape.
    #[error("Could not decode response: {0}")]
    Decode(String),
}

impl PersistenceError {
    /// `true` for failures where the request never got a service answer.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Request(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The access token and actor of the current sign-in, shared between the
/// auth provider and every table backend.
#[derive(Debug, Default)]
pub struct Session {
    inner: RwLock<Option<(String, Actor)>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|(token, _)| token.clone())
    }

    pub fn actor(&self) -> Option<Actor> {
        self.read().as_ref().map(|(_, actor)| actor.clone())
    }

    pub fn set(&self, token: String, actor: Actor) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some((token, actor));
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<(String, Actor)>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Restricts a `list` call. The default lists every visible row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub owner_id: Option<ActorId>,
}

impl ListFilter {
    pub fn owned_by(owner_id: ActorId) -> Self {
        Self {
            owner_id: Some(owner_id),
        }
    }
}

/// Request/response CRUD against one table of the hosted service.
///
/// Every call may fail with a transport or service error. Identity for
/// ownership checks travels implicitly with the backend's session.
#[async_trait]
pub trait Persistence<E: Entity>: Send + Sync {
    /// Rows newest first.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<E>, PersistenceError>;

    /// Store a new row. The service assigns `id`, `owner_id` and timestamps
    /// and returns the canonical stored values.
    async fn create(&self, fields: &E::Fields) -> Result<E, PersistenceError>;

    /// Replace the field set of an existing row owned by the actor.
    async fn update(&self, id: &EntityId, fields: &E::Fields) -> Result<E, PersistenceError>;

    async fn delete(&self, id: &EntityId) -> Result<(), PersistenceError>;
}

/// Sign-up/sign-in/sign-out and the current actor.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, form: &SignUp) -> Result<Actor, PersistenceError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Actor, PersistenceError>;

    async fn sign_out(&self) -> Result<(), PersistenceError>;

    fn current_actor(&self) -> Option<Actor>;
}
