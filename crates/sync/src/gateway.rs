//! Create, update and delete against the persistence collaborator.
//!
//! Each accepted request becomes a [`Submission`]: the round trip runs on
//! its own task, moving `Submitting -> Succeeded | Failed`, and applies the
//! confirmed result to the store. Dropping the submission does not cancel
//! the request; if the store itself is gone by the time it completes, the
//! result is discarded.
//!
//! Local state only changes after the service confirms. Deletes are
//! confirm-then-apply: nothing is removed before the service says so.
//! At most one update or delete per id is in flight at a time.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use rrr_core::error::CoreError;
use rrr_core::types::{ActorId, EntityId};
use rrr_db::models::actor::Actor;
use rrr_db::models::{Entity, EntityFields, EntityKind};
use rrr_db::repositories::{AuthProvider, Persistence, PersistenceError};
use rrr_events::{ChangeEvent, EventBus};

use crate::error::{raise, SyncError};
use crate::session::EditSession;
use crate::store::CollectionStore;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// A mutation that has been handed to the service.
pub struct Submission<T> {
    state: watch::Receiver<MutationState>,
    handle: JoinHandle<Result<T, SyncError>>,
}

impl<T: Send + 'static> Submission<T> {
    fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        let (tx, state) = watch::channel(MutationState::Submitting);
        let handle = tokio::spawn(async move {
            let result = work.await;
            tx.send_replace(if result.is_ok() {
                MutationState::Succeeded
            } else {
                MutationState::Failed
            });
            result
        });
        Self { state, handle }
    }

    pub fn state(&self) -> MutationState {
        *self.state.borrow()
    }

    /// Wait for the service's answer.
    pub async fn outcome(self) -> Result<T, SyncError> {
        self.handle
            .await
            .map_err(|e| SyncError::Internal(format!("mutation task failed: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// Blocking yes/no prompt shown before a delete.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

// ---------------------------------------------------------------------------
// In-flight tracking
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct InFlight {
    ids: Mutex<HashSet<EntityId>>,
}

/// Releases the id when the mutation task finishes.
struct InFlightGuard {
    owner: Arc<InFlight>,
    id: EntityId,
}

impl InFlight {
    fn claim(self: &Arc<Self>, id: &EntityId) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            owner: Arc::clone(self),
            id: id.clone(),
        })
    }

    fn contains(&self, id: &EntityId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct MutationGateway<E: Entity> {
    persistence: Arc<dyn Persistence<E>>,
    store: Weak<CollectionStore<E>>,
    auth: Arc<dyn AuthProvider>,
    bus: Arc<EventBus>,
    in_flight: Arc<InFlight>,
}

impl<E: Entity> MutationGateway<E> {
    pub fn new(
        persistence: Arc<dyn Persistence<E>>,
        store: &Arc<CollectionStore<E>>,
        auth: Arc<dyn AuthProvider>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            persistence,
            store: Arc::downgrade(store),
            auth,
            bus,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// `true` while an update or delete of `id` is submitting.
    pub fn is_in_flight(&self, id: &EntityId) -> bool {
        self.in_flight.contains(id)
    }

    /// Store a new entity. Nothing is inserted locally until the service
    /// returns it with its assigned id.
    pub fn create(&self, fields: &E::Fields) -> Result<Submission<E>, SyncError> {
        let action = format!("Create {}", E::KIND.label());
        let (actor, fields) = self.prepare(&action, fields)?;
        let persistence = Arc::clone(&self.persistence);
        let settle = self.settle(action, actor.id);

        Ok(Submission::spawn(async move {
            match persistence.create(&fields).await {
                Ok(entity) => {
                    if let Some(store) = settle.store() {
                        store.apply_created(entity.clone());
                        settle.changed("created", entity.id());
                    }
                    Ok(entity)
                }
                Err(source) => Err(settle.fail(source)),
            }
        }))
    }

    /// Replace the fields of the entity the open `session` targets.
    pub fn update(
        &self,
        session: &EditSession<E::Fields>,
        id: &EntityId,
        fields: &E::Fields,
    ) -> Result<Submission<E>, SyncError> {
        let action = format!("Update {}", E::KIND.label());
        match session.target_id() {
            None => return Err(raise(&self.bus, &action, SyncError::NoEditSession)),
            Some(open) if open != id => {
                let err = SyncError::SessionMismatch {
                    open: open.clone(),
                    requested: id.clone(),
                };
                return Err(raise(&self.bus, &action, err));
            }
            Some(_) => {}
        }
        let (actor, fields) = self.prepare(&action, fields)?;
        let guard = self.claim(&action, id)?;
        let persistence = Arc::clone(&self.persistence);
        let settle = self.settle(action, actor.id);
        let id = id.clone();

        Ok(Submission::spawn(async move {
            let _guard = guard;
            match persistence.update(&id, &fields).await {
                Ok(entity) => {
                    if let Some(store) = settle.store() {
                        if store.apply_updated(entity.clone()) {
                            settle.changed("updated", entity.id());
                        } else {
                            tracing::debug!(
                                entity_kind = E::KIND.name(),
                                entity_id = %entity.id(),
                                "Updated entity no longer in view"
                            );
                        }
                    }
                    Ok(entity)
                }
                Err(source) => Err(settle.fail(source)),
            }
        }))
    }

    /// Ask `confirm`, then delete. `Ok(None)` means the user declined and
    /// nothing was sent.
    pub fn delete(
        &self,
        id: &EntityId,
        confirm: &dyn Confirm,
    ) -> Result<Option<Submission<EntityId>>, SyncError> {
        let label = E::KIND.label();
        if E::KIND == EntityKind::Profile {
            let err = CoreError::Forbidden("Profiles cannot be deleted".into());
            return Err(raise(&self.bus, &format!("Delete {label}"), err.into()));
        }
        if !confirm.confirm(&format!("Delete this {label}? This cannot be undone.")) {
            tracing::debug!(entity_kind = E::KIND.name(), entity_id = %id, "Delete cancelled");
            return Ok(None);
        }
        let action = format!("Delete {label}");
        let actor = self.signed_in(&action)?;
        let guard = self.claim(&action, id)?;
        let persistence = Arc::clone(&self.persistence);
        let settle = self.settle(action, actor.id);
        let id = id.clone();

        Ok(Some(Submission::spawn(async move {
            let _guard = guard;
            match persistence.delete(&id).await {
                Ok(()) => {
                    if let Some(store) = settle.store() {
                        store.apply_deleted(&id);
                        settle.changed("deleted", &id);
                    }
                    Ok(id)
                }
                Err(source) => Err(settle.fail(source)),
            }
        })))
    }

    // ---- private helpers ----

    fn signed_in(&self, action: &str) -> Result<Actor, SyncError> {
        self.auth
            .current_actor()
            .ok_or_else(|| raise(&self.bus, action, SyncError::NotSignedIn))
    }

    /// Scope the fields to the actor's role and validate them.
    fn prepare(&self, action: &str, fields: &E::Fields) -> Result<(Actor, E::Fields), SyncError> {
        let actor = self.signed_in(action)?;
        let fields = fields.clone().scoped_to_role(actor.role);
        if let Err(e) = fields.check() {
            tracing::debug!(entity_kind = E::KIND.name(), error = %e, "Rejected before submit");
            return Err(raise(&self.bus, action, e.into()));
        }
        Ok((actor, fields))
    }

    fn claim(&self, action: &str, id: &EntityId) -> Result<InFlightGuard, SyncError> {
        self.in_flight.claim(id).ok_or_else(|| {
            tracing::warn!(entity_kind = E::KIND.name(), entity_id = %id, "Mutation already in flight");
            raise(&self.bus, action, SyncError::MutationInFlight(id.clone()))
        })
    }

    fn settle(&self, action: String, actor_id: ActorId) -> Settle<E> {
        Settle {
            store: self.store.clone(),
            bus: Arc::clone(&self.bus),
            action,
            actor_id,
        }
    }
}

/// Everything a mutation task needs once the service has answered.
struct Settle<E: Entity> {
    store: Weak<CollectionStore<E>>,
    bus: Arc<EventBus>,
    action: String,
    actor_id: ActorId,
}

impl<E: Entity> Settle<E> {
    fn store(&self) -> Option<Arc<CollectionStore<E>>> {
        let store = self.store.upgrade();
        if store.is_none() {
            tracing::debug!(action = %self.action, "View gone, discarding mutation result");
        }
        store
    }

    fn changed(&self, verb: &str, id: &EntityId) {
        tracing::info!(
            entity_kind = E::KIND.name(),
            entity_id = %id,
            actor_id = %self.actor_id,
            "Confirmed {} {verb}",
            E::KIND.label()
        );
        self.bus.publish(
            ChangeEvent::new(format!("{}.{verb}", E::KIND.name()))
                .with_source(E::KIND.name(), id.clone())
                .with_actor(self.actor_id.clone()),
        );
    }

    fn fail(&self, source: PersistenceError) -> SyncError {
        tracing::warn!(
            entity_kind = E::KIND.name(),
            action = %self.action,
            error = %source,
            "Mutation failed"
        );
        let err = SyncError::Mutation {
            action: self.action.clone(),
            source,
        };
        if self.store.strong_count() == 0 {
            tracing::debug!(action = %self.action, "View gone, discarding mutation failure");
            return err;
        }
        raise(&self.bus, &self.action, err)
    }
}
