//! The in-memory copy of one remote table.
//!
//! [`RemoteCollection`] is a plain value: it never touches the network.
//! Confirmed mutations reach it through the `apply_*` reducers, and loads
//! through [`RemoteCollection::begin_load`] / [`RemoteCollection::apply_snapshot`].
//!
//! Every reducer that changes something bumps a local revision and records
//! the id it touched. A snapshot whose load began before such a change
//! keeps the local value for that id, so a slow `load()` never regresses a
//! mutation that was confirmed while it was in flight.
//!
//! Changes are only remembered while some load is outstanding. Once every
//! issued ticket has been applied, discarded or abandoned the record is
//! empty again.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use rrr_core::types::EntityId;
use rrr_db::models::Entity;

/// Issued when a load starts; hand it back with the fetched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalChange {
    Present,
    Deleted,
}

/// All entities of one type, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCollection<E> {
    entries: IndexMap<EntityId, E>,
    revision: u64,
    /// Most recent local change per id, with the revision it was made at.
    changes: HashMap<EntityId, (u64, LocalChange)>,
    /// Outstanding tickets: load seq to the revision it started at.
    pending_loads: BTreeMap<u64, u64>,
    loads_issued: u64,
    last_load_applied: u64,
}

impl<E> Default for RemoteCollection<E> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            revision: 0,
            changes: HashMap::new(),
            pending_loads: BTreeMap::new(),
            loads_issued: 0,
            last_load_applied: 0,
        }
    }
}

impl<E: Entity> RemoteCollection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &EntityId) -> Option<&E> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> + '_ {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Local revision; increases with every change applied by a reducer.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // -----------------------------------------------------------------------
    // Reducers
    // -----------------------------------------------------------------------

    /// Insert a newly stored entity at the front. Replaying the same entity
    /// is a no-op.
    pub fn apply_created(&mut self, entity: E) {
        let id = entity.id().clone();
        match self.entries.get_mut(&id) {
            Some(existing) if *existing == entity => return,
            Some(existing) => *existing = entity,
            None => {
                self.entries.shift_insert(0, id.clone(), entity);
            }
        }
        self.touch(id, LocalChange::Present);
    }

    /// Replace an entity in place, keeping its position.
    ///
    /// Returns `false` if the id is not in the collection, in which case
    /// nothing changes.
    pub fn apply_updated(&mut self, entity: E) -> bool {
        let id = entity.id().clone();
        let Some(existing) = self.entries.get_mut(&id) else {
            return false;
        };
        if *existing != entity {
            *existing = entity;
            self.touch(id, LocalChange::Present);
        }
        true
    }

    /// Remove an entity. Deleting an unknown id is a no-op for the visible
    /// entries; while a load is outstanding the deletion is still
    /// remembered so its snapshot cannot bring the entity back.
    pub fn apply_deleted(&mut self, id: &EntityId) -> bool {
        if self.entries.shift_remove(id).is_some() {
            self.touch(id.clone(), LocalChange::Deleted);
            return true;
        }
        if !self.pending_loads.is_empty()
            && !matches!(self.changes.get(id), Some((_, LocalChange::Deleted)))
        {
            self.touch(id.clone(), LocalChange::Deleted);
        }
        false
    }

    // -----------------------------------------------------------------------
    // Loads
    // -----------------------------------------------------------------------

    pub fn begin_load(&mut self) -> LoadTicket {
        self.loads_issued += 1;
        self.pending_loads.insert(self.loads_issued, self.revision);
        LoadTicket {
            seq: self.loads_issued,
            revision: self.revision,
        }
    }

    /// Give back a ticket whose fetch failed.
    pub fn abandon_load(&mut self, ticket: LoadTicket) {
        self.pending_loads.remove(&ticket.seq);
        self.prune_changes();
    }

    /// Number of loads begun but not yet applied, discarded or abandoned.
    pub fn loads_in_flight(&self) -> usize {
        self.pending_loads.len()
    }

    /// Replace the collection with a fetched snapshot.
    ///
    /// Ids changed locally after `ticket` was issued keep their local state.
    /// Returns `false` (and changes nothing) when a load issued later has
    /// already been applied.
    pub fn apply_snapshot(&mut self, ticket: LoadTicket, rows: Vec<E>) -> bool {
        if ticket.seq <= self.last_load_applied {
            self.pending_loads.remove(&ticket.seq);
            self.prune_changes();
            return false;
        }

        let mut entries: IndexMap<EntityId, E> =
            rows.into_iter().map(|e| (e.id().clone(), e)).collect();

        for (id, (revision, change)) in &self.changes {
            if *revision <= ticket.revision {
                continue;
            }
            match change {
                LocalChange::Deleted => {
                    entries.shift_remove(id);
                }
                LocalChange::Present => {
                    let Some(local) = self.entries.get(id) else {
                        continue;
                    };
                    match entries.get_mut(id) {
                        Some(slot) => *slot = local.clone(),
                        None => {
                            entries.shift_insert(0, id.clone(), local.clone());
                        }
                    }
                }
            }
        }

        self.entries = entries;
        self.last_load_applied = ticket.seq;
        // Older tickets can no longer be applied.
        self.pending_loads.retain(|seq, _| *seq > ticket.seq);
        self.prune_changes();
        true
    }

    /// Drop changes no outstanding load could still overwrite.
    fn prune_changes(&mut self) {
        match self.pending_loads.values().min() {
            Some(&oldest) => self.changes.retain(|_, (revision, _)| *revision > oldest),
            None => self.changes.clear(),
        }
    }

    fn touch(&mut self, id: EntityId, change: LocalChange) {
        self.revision += 1;
        if !self.pending_loads.is_empty() {
            self.changes.insert(id, (self.revision, change));
        }
    }
}
