use rrr_core::error::CoreError;
use rrr_core::images::ImageError;
use rrr_core::types::EntityId;
use rrr_db::repositories::PersistenceError;
use rrr_events::{EventBus, FailureClass, Notice};

/// Every way a store, gateway, session or account operation can fail.
///
/// Each variant maps to exactly one [`FailureClass`] via
/// [`SyncError::class`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The notice names the collection, so only the cause is displayed.
    #[error("{source}")]
    Load {
        kind: &'static str,
        #[source]
        source: PersistenceError,
    },

    #[error("{source}")]
    Mutation {
        action: String,
        #[source]
        source: PersistenceError,
    },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Validation(#[from] CoreError),

    /// Another create/update/delete for this id is still submitting.
    #[error("A change to {0} is already in progress")]
    MutationInFlight(EntityId),

    #[error("No entity is being edited")]
    NoEditSession,

    #[error("The open edit session is for {open}, not {requested}")]
    SessionMismatch { open: EntityId, requested: EntityId },

    #[error("You must be signed in")]
    NotSignedIn,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Load { .. } => FailureClass::LoadFailure,
            // A write that never reached the service is reported like a
            // failed fetch; only an answered rejection is a mutation failure.
            Self::Mutation { source, .. } if source.is_transport() => FailureClass::LoadFailure,
            Self::Mutation { .. } | Self::MutationInFlight(_) | Self::Internal(_) => {
                FailureClass::MutationFailure
            }
            Self::Image(ImageError::Oversize { .. }) => FailureClass::OversizeFile,
            Self::Image(_)
            | Self::Validation(_)
            | Self::NoEditSession
            | Self::SessionMismatch { .. }
            | Self::NotSignedIn => FailureClass::ValidationFailure,
        }
    }
}

/// Publish the notice for a failed `action` and hand the error back.
pub(crate) fn raise(bus: &EventBus, action: &str, err: SyncError) -> SyncError {
    bus.publish(Notice::new(err.class(), action, err.to_string()));
    err
}
