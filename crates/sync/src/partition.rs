//! The current actor's subset of a collection.
//!
//! Never stored: every [`OwnershipPartition`] is a borrow of the collection
//! plus an actor id, so it cannot drift from its source.

use rrr_core::types::{ActorId, EntityId};
use rrr_db::models::{Entity, EntityRecord};

use crate::collection::RemoteCollection;

pub struct OwnershipPartition<'a, E> {
    collection: &'a RemoteCollection<E>,
    owner: Option<&'a ActorId>,
}

impl<'a, E: Entity> OwnershipPartition<'a, E> {
    /// With no actor (signed out) the partition is empty.
    pub fn new(collection: &'a RemoteCollection<E>, owner: Option<&'a ActorId>) -> Self {
        Self { collection, owner }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a E> + 'a {
        let owner = self.owner;
        self.collection
            .iter()
            .filter(move |e| owner.is_some_and(|o| e.owner_id() == o))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.collection
            .get(id)
            .is_some_and(|e| self.owner.is_some_and(|o| e.owner_id() == o))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<E> {
        self.iter().cloned().collect()
    }
}

/// Merge per-type item lists into one newest-first list.
pub fn contributions(records: impl IntoIterator<Item = EntityRecord>) -> Vec<EntityRecord> {
    let mut all: Vec<EntityRecord> = records.into_iter().collect();
    all.sort_by(|a, b| b.header().created_at.cmp(&a.header().created_at));
    all
}
