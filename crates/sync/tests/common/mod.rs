//! Shared wiring for the sync integration tests: a signed-in client over
//! the in-process service, plus a backend whose `list` can be held open.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{Notify, Semaphore};
use rrr_core::roles::ActorRole;
use rrr_core::types::{ActorId, EntityId};
use rrr_db::models::actor::{Actor, SignUp};
use rrr_db::models::listing::{ListingFields, ReuseListing};
use rrr_db::models::{Entity, RecordHeader};
use rrr_db::repositories::{
    AuthProvider, InMemoryAuth, InMemoryBackend, InMemoryService, ListFilter, Persistence,
    PersistenceError, Session,
};
use rrr_events::EventBus;
use rrr_sync::{Account, Feature, ListingFeature};

/// One signed-in user's view of the platform.
pub struct Client {
    pub actor: Actor,
    pub session: Arc<Session>,
    pub auth: Arc<dyn AuthProvider>,
    pub bus: Arc<EventBus>,
    pub account: Account,
}

impl Client {
    pub async fn sign_up(service: &Arc<InMemoryService>, email: &str) -> Self {
        let session = Arc::new(Session::new());
        let auth: Arc<dyn AuthProvider> =
            Arc::new(InMemoryAuth::new(Arc::clone(service), Arc::clone(&session)));
        let bus = Arc::new(EventBus::default());
        let account = Account::new(Arc::clone(&auth), Arc::clone(&bus));
        let actor = account.register(&sign_up_form(email)).await.unwrap();
        Self {
            actor,
            session,
            auth,
            bus,
            account,
        }
    }

    pub fn backend<E: Entity>(&self, service: &Arc<InMemoryService>) -> Arc<dyn Persistence<E>> {
        Arc::new(InMemoryBackend::new(
            Arc::clone(service),
            Arc::clone(&self.session),
        ))
    }

    pub fn feature<E: Entity>(&self, service: &Arc<InMemoryService>) -> Feature<E> {
        Feature::new(
            self.backend(service),
            Arc::clone(&self.auth),
            Arc::clone(&self.bus),
        )
    }

    pub fn listings(&self, service: &Arc<InMemoryService>) -> ListingFeature {
        self.feature(service)
    }
}

pub fn sign_up_form(email: &str) -> SignUp {
    SignUp {
        email: email.into(),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
        full_name: "Test User".into(),
        role: ActorRole::General,
        phone: String::new(),
        organization_name: String::new(),
    }
}

pub fn header(id: &str, owner: &ActorId) -> RecordHeader {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
    RecordHeader {
        id: EntityId::from(id),
        owner_id: owner.clone(),
        created_at: at,
        updated_at: at,
    }
}

pub fn item(name: &str, category: &str, price: Option<i64>) -> ListingFields {
    ListingFields {
        name: name.into(),
        category: category.into(),
        condition: "Good".into(),
        is_free: price.is_none(),
        price,
        location: "Sector 5".into(),
        ..Default::default()
    }
}

pub fn listing(id: &str, owner: &ActorId, fields: ListingFields) -> ReuseListing {
    ReuseListing {
        header: header(id, owner),
        fields,
    }
}

pub fn yes(_: &str) -> bool {
    true
}

/// Passes everything through, except that `list` fetches its rows and then
/// waits for [`GatedList::release`] before answering.
pub struct GatedList<E> {
    inner: Arc<dyn Persistence<E>>,
    gate: Semaphore,
    fetched: Notify,
}

impl<E: Entity> GatedList<E> {
    pub fn new(inner: Arc<dyn Persistence<E>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: Semaphore::new(0),
            fetched: Notify::new(),
        })
    }

    /// Wait until a `list` call has its rows and is parked at the gate.
    pub async fn fetched(&self) {
        self.fetched.notified().await;
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl<E: Entity> Persistence<E> for GatedList<E> {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<E>, PersistenceError> {
        let rows = self.inner.list(filter).await?;
        self.fetched.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        permit.forget();
        Ok(rows)
    }

    async fn create(&self, fields: &E::Fields) -> Result<E, PersistenceError> {
        self.inner.create(fields).await
    }

    async fn update(&self, id: &EntityId, fields: &E::Fields) -> Result<E, PersistenceError> {
        self.inner.update(id, fields).await
    }

    async fn delete(&self, id: &EntityId) -> Result<(), PersistenceError> {
        self.inner.delete(id).await
    }
}
