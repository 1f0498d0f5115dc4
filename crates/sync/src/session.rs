//! "Currently editing entity X".

use rrr_core::types::EntityId;
use rrr_db::models::Entity;

/// At most one open edit: the target id and a snapshot of its fields taken
/// when the edit began. Later changes to the stored entity do not reach the
/// snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession<F> {
    open: Option<(EntityId, F)>,
}

impl<F> Default for EditSession<F> {
    fn default() -> Self {
        Self { open: None }
    }
}

impl<F: Clone> EditSession<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an edit on `entity`, replacing any edit already open, and return
    /// the seed fields.
    pub fn begin<E: Entity<Fields = F>>(&mut self, entity: &E) -> &F {
        let (_, seed) = self
            .open
            .insert((entity.id().clone(), entity.fields().clone()));
        seed
    }

    pub fn end(&mut self) {
        self.open = None;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn target_id(&self) -> Option<&EntityId> {
        self.open.as_ref().map(|(id, _)| id)
    }

    pub fn seed(&self) -> Option<&F> {
        self.open.as_ref().map(|(_, seed)| seed)
    }

    pub fn targets(&self, id: &EntityId) -> bool {
        self.target_id() == Some(id)
    }
}
