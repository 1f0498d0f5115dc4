//! Registration, sign-in and sign-out.
//!
//! Forms are checked locally first; a form that fails its checks raises a
//! validation notice and never reaches the auth service.

use std::sync::Arc;

use rrr_db::models::actor::{Actor, Credentials, SignUp};
use rrr_db::repositories::AuthProvider;
use rrr_events::EventBus;

use crate::error::{raise, SyncError};

pub struct Account {
    auth: Arc<dyn AuthProvider>,
    bus: Arc<EventBus>,
}

impl Account {
    pub fn new(auth: Arc<dyn AuthProvider>, bus: Arc<EventBus>) -> Self {
        Self { auth, bus }
    }

    pub fn current_actor(&self) -> Option<Actor> {
        self.auth.current_actor()
    }

    pub async fn register(&self, form: &SignUp) -> Result<Actor, SyncError> {
        const ACTION: &str = "Sign up";
        form.check()
            .map_err(|e| raise(&self.bus, ACTION, e.into()))?;
        let actor = self.auth.sign_up(form).await.map_err(|source| {
            tracing::warn!(error = %source, "Sign-up failed");
            raise(
                &self.bus,
                ACTION,
                SyncError::Mutation {
                    action: ACTION.to_string(),
                    source,
                },
            )
        })?;
        tracing::info!(actor_id = %actor.id, role = actor.role.name(), "Signed up");
        Ok(actor)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Actor, SyncError> {
        const ACTION: &str = "Sign in";
        credentials
            .check()
            .map_err(|e| raise(&self.bus, ACTION, e.into()))?;
        let actor = self.auth.sign_in(credentials).await.map_err(|source| {
            tracing::warn!(error = %source, "Sign-in failed");
            raise(
                &self.bus,
                ACTION,
                SyncError::Mutation {
                    action: ACTION.to_string(),
                    source,
                },
            )
        })?;
        tracing::info!(actor_id = %actor.id, "Signed in");
        Ok(actor)
    }

    /// End the session. The local actor is cleared even if the service
    /// could not be told.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        const ACTION: &str = "Sign out";
        self.auth.sign_out().await.map_err(|source| {
            tracing::warn!(error = %source, "Sign-out failed");
            raise(
                &self.bus,
                ACTION,
                SyncError::Mutation {
                    action: ACTION.to_string(),
                    source,
                },
            )
        })
    }
}
