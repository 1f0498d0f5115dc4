//! One feature area (marketplace, care-home directory, food posts, profile)
//! wired together: store, gateway, query, edit session and form.

use std::path::Path;
use std::sync::Arc;

use rrr_core::images::{read_image_file, MAX_IMAGE_BYTES};
use rrr_core::types::{EntityId, Timestamp};
use rrr_db::models::actor::Actor;
use rrr_db::models::care_home::CareHome;
use rrr_db::models::food_post::FoodPost;
use rrr_db::models::listing::ReuseListing;
use rrr_db::models::profile::Profile;
use rrr_db::models::{Entity, EntityFields, EntityRecord, Facet};
use rrr_db::repositories::{AuthProvider, Persistence};
use rrr_events::EventBus;

use crate::error::{raise, SyncError};
use crate::gateway::{Confirm, MutationGateway, MutationState};
use crate::partition::{contributions, OwnershipPartition};
use crate::query::{Query, ViewState};
use crate::session::EditSession;
use crate::store::{CollectionStore, LoadOutcome};

pub type ListingFeature = Feature<ReuseListing>;
pub type CareHomeFeature = Feature<CareHome>;
pub type FoodPostFeature = Feature<FoodPost>;
pub type ProfileFeature = Feature<Profile>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user declined the confirmation prompt.
    Cancelled,
}

pub struct Feature<E: Entity> {
    store: Arc<CollectionStore<E>>,
    gateway: MutationGateway<E>,
    auth: Arc<dyn AuthProvider>,
    bus: Arc<EventBus>,
    query: Query,
    session: EditSession<E::Fields>,
    form: E::Fields,
    state: MutationState,
    image_limit: u64,
}

impl<E: Entity> Feature<E> {
    pub fn new(
        persistence: Arc<dyn Persistence<E>>,
        auth: Arc<dyn AuthProvider>,
        bus: Arc<EventBus>,
    ) -> Self {
        let store = CollectionStore::new(Arc::clone(&persistence), Arc::clone(&bus));
        let gateway = MutationGateway::new(persistence, &store, Arc::clone(&auth), Arc::clone(&bus));
        Self {
            store,
            gateway,
            auth,
            bus,
            query: Query::new(),
            session: EditSession::new(),
            form: E::Fields::default(),
            state: MutationState::Idle,
            image_limit: MAX_IMAGE_BYTES,
        }
    }

    pub fn with_image_limit(mut self, limit: u64) -> Self {
        self.image_limit = limit;
        self
    }

    pub fn store(&self) -> &Arc<CollectionStore<E>> {
        &self.store
    }

    pub fn gateway(&self) -> &MutationGateway<E> {
        &self.gateway
    }

    pub fn actor(&self) -> Option<Actor> {
        self.auth.current_actor()
    }

    pub async fn load(&self) -> Result<LoadOutcome, SyncError> {
        self.store.load().await
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    pub fn set_search(&mut self, text: &str) {
        self.query.set_search(text);
    }

    pub fn set_filter(&mut self, facet: Facet, raw: &str) {
        self.query.set_filter(facet, raw);
    }

    pub fn hide_expired(&mut self, now: Option<Timestamp>) {
        self.query.set_hide_expired(now);
    }

    /// The whole collection through the current query.
    pub fn visible(&self) -> ViewState<E> {
        let collection = self.store.read();
        self.query.apply(collection.iter()).cloned().collect()
    }

    /// The actor's items through the current query.
    pub fn visible_mine(&self) -> ViewState<E> {
        let actor = self.actor();
        let collection = self.store.read();
        let mine = OwnershipPartition::new(&collection, actor.as_ref().map(|a| &a.id));
        self.query.apply(mine.iter()).cloned().collect()
    }

    /// The ownership partition, recomputed from the collection.
    pub fn my_items(&self) -> Vec<E> {
        let actor = self.actor();
        let collection = self.store.read();
        OwnershipPartition::new(&collection, actor.as_ref().map(|a| &a.id)).to_vec()
    }

    // -----------------------------------------------------------------------
    // Form and edit session
    // -----------------------------------------------------------------------

    pub fn form(&self) -> &E::Fields {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut E::Fields {
        &mut self.form
    }

    /// Start editing `entity`; the form is seeded from a snapshot of it.
    pub fn begin_edit(&mut self, entity: &E) {
        self.form = self.session.begin(entity).clone();
    }

    /// Drop the open edit and clear the form.
    pub fn cancel_edit(&mut self) {
        self.session.end();
        self.form = E::Fields::default();
    }

    pub fn editing(&self) -> Option<&EntityId> {
        self.session.target_id()
    }

    pub fn session(&self) -> &EditSession<E::Fields> {
        &self.session
    }

    /// Fill blank contact/address fields of the form from `profile`.
    pub fn autofill(&mut self, profile: &Profile) {
        self.form.autofill_from(profile);
    }

    /// State of the most recent submit or delete.
    pub fn state(&self) -> MutationState {
        self.state
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create from the form, or update the entity being edited.
    ///
    /// On success the form is cleared and any edit ends. On failure the
    /// form and the edit stay as they were so the user can retry.
    pub async fn submit(&mut self) -> Result<E, SyncError> {
        let editing = self.session.target_id().cloned();
        let submission = match &editing {
            Some(id) => self.gateway.update(&self.session, id, &self.form)?,
            None => self.gateway.create(&self.form)?,
        };
        self.state = MutationState::Submitting;

        match submission.outcome().await {
            Ok(entity) => {
                self.state = MutationState::Succeeded;
                if editing.is_some() {
                    self.session.end();
                }
                self.form = E::Fields::default();
                Ok(entity)
            }
            Err(e) => {
                self.state = MutationState::Failed;
                Err(e)
            }
        }
    }

    pub async fn delete(
        &mut self,
        id: &EntityId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, SyncError> {
        let Some(submission) = self.gateway.delete(id, confirm)? else {
            return Ok(DeleteOutcome::Cancelled);
        };
        self.state = MutationState::Submitting;

        match submission.outcome().await {
            Ok(_) => {
                self.state = MutationState::Succeeded;
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                self.state = MutationState::Failed;
                Err(e)
            }
        }
    }

    /// Read a selected image file into a `data:` URL for an image field.
    pub async fn read_image(&self, path: &Path) -> Result<String, SyncError> {
        read_image_file(path, self.image_limit).await.map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Image rejected");
            raise(&self.bus, "Attach image", e.into())
        })
    }
}

impl Feature<Profile> {
    /// The signed-in actor's own profile, if loaded.
    pub fn current_profile(&self) -> Option<Profile> {
        let actor = self.actor()?;
        self.store.get(&EntityId::from(&actor.id))
    }
}

/// The actor's items across the three shared entity types, newest first.
pub fn my_contributions(
    listings: &ListingFeature,
    care_homes: &CareHomeFeature,
    food_posts: &FoodPostFeature,
) -> Vec<EntityRecord> {
    contributions(
        listings
            .my_items()
            .into_iter()
            .map(EntityRecord::from)
            .chain(care_homes.my_items().into_iter().map(EntityRecord::from))
            .chain(food_posts.my_items().into_iter().map(EntityRecord::from)),
    )
}
