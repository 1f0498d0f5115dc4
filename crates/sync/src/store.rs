//! Shared, injectable holder of a [`RemoteCollection`].
//!
//! Views read through [`CollectionStore::read`]; only `load()` and the
//! `apply_*` reducers write. Locks are never held across an await.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rrr_core::types::EntityId;
use rrr_db::models::Entity;
use rrr_db::repositories::{ListFilter, Persistence};
use rrr_events::{ChangeEvent, EventBus};

use crate::collection::RemoteCollection;
use crate::error::{raise, SyncError};

/// What became of a completed `load()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { count: usize },
    /// A load issued later finished first; this snapshot was dropped.
    Superseded,
}

pub struct CollectionStore<E: Entity> {
    collection: RwLock<RemoteCollection<E>>,
    persistence: Arc<dyn Persistence<E>>,
    bus: Arc<EventBus>,
}

impl<E: Entity> CollectionStore<E> {
    pub fn new(persistence: Arc<dyn Persistence<E>>, bus: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            collection: RwLock::new(RemoteCollection::new()),
            persistence,
            bus,
        })
    }

    pub fn read(&self) -> RwLockReadGuard<'_, RemoteCollection<E>> {
        self.collection.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RemoteCollection<E>> {
        self.collection.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, id: &EntityId) -> Option<E> {
        self.read().get(id).cloned()
    }

    /// Owned copy of every entity, newest first.
    pub fn snapshot(&self) -> Vec<E> {
        self.read().iter().cloned().collect()
    }

    /// Fetch the whole table and replace the collection with it.
    ///
    /// On failure the previous entries stay untouched and a non-blocking
    /// notice is raised.
    pub async fn load(&self) -> Result<LoadOutcome, SyncError> {
        let kind = E::KIND;
        let ticket = self.write().begin_load();

        let rows = match self.persistence.list(&ListFilter::default()).await {
            Ok(rows) => rows,
            Err(source) => {
                self.write().abandon_load(ticket);
                tracing::warn!(entity_kind = kind.name(), error = %source, "Load failed");
                let action = format!("Load {}s", kind.label());
                return Err(raise(
                    &self.bus,
                    &action,
                    SyncError::Load {
                        kind: kind.label(),
                        source,
                    },
                ));
            }
        };

        let count = rows.len();
        let applied = self.write().apply_snapshot(ticket, rows);
        if !applied {
            tracing::debug!(entity_kind = kind.name(), "Discarded superseded load");
            return Ok(LoadOutcome::Superseded);
        }

        tracing::info!(entity_kind = kind.name(), count, "Loaded collection");
        self.bus.publish(
            ChangeEvent::new(format!("{}.loaded", kind.name()))
                .with_payload(serde_json::json!({ "count": count })),
        );
        Ok(LoadOutcome::Applied { count })
    }

    pub fn apply_created(&self, entity: E) {
        self.write().apply_created(entity);
    }

    pub fn apply_updated(&self, entity: E) -> bool {
        self.write().apply_updated(entity)
    }

    pub fn apply_deleted(&self, id: &EntityId) -> bool {
        self.write().apply_deleted(id)
    }
}
