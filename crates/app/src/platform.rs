//! Backend selection and the four feature areas wired onto one bus.

use std::sync::Arc;

use rrr_db::models::{Entity, EntityRecord};
use rrr_db::repositories::{
    AuthProvider, InMemoryAuth, InMemoryBackend, InMemoryService, Persistence, PersistenceError,
    RestAuth, RestBackend, RestClient, Session,
};
use rrr_events::{EventBus, Notice, NoticeCenter, SyncEvent};
use rrr_sync::{
    my_contributions, Account, CareHomeFeature, Feature, FoodPostFeature, ListingFeature,
    ProfileFeature, SyncError,
};
use tokio::sync::broadcast;

use crate::config::AppConfig;

/// Where table and auth calls go.
pub enum Backend {
    InProcess {
        service: Arc<InMemoryService>,
        session: Arc<Session>,
    },
    Hosted {
        client: Arc<RestClient>,
    },
}

impl Backend {
    pub fn connect(config: &AppConfig) -> Result<Self, PersistenceError> {
        let session = Arc::new(Session::new());
        match &config.service {
            Some(rest) => {
                let client = RestClient::new(rest, session)?;
                tracing::info!(base_url = %rest.base_url, "Using hosted service");
                Ok(Self::Hosted {
                    client: Arc::new(client),
                })
            }
            None => {
                tracing::info!("Using in-process demo service");
                Ok(Self::InProcess {
                    service: InMemoryService::new(),
                    session,
                })
            }
        }
    }

    pub fn table<E: Entity>(&self) -> Arc<dyn Persistence<E>> {
        match self {
            Self::InProcess { service, session } => Arc::new(InMemoryBackend::new(
                Arc::clone(service),
                Arc::clone(session),
            )),
            Self::Hosted { client } => Arc::new(RestBackend::new(Arc::clone(client))),
        }
    }

    pub fn auth(&self) -> Arc<dyn AuthProvider> {
        match self {
            Self::InProcess { service, session } => Arc::new(InMemoryAuth::new(
                Arc::clone(service),
                Arc::clone(session),
            )),
            Self::Hosted { client } => Arc::new(RestAuth::new(Arc::clone(client))),
        }
    }

    pub fn in_process(&self) -> Option<&Arc<InMemoryService>> {
        match self {
            Self::InProcess { service, .. } => Some(service),
            Self::Hosted { .. } => None,
        }
    }
}

pub struct Platform {
    pub bus: Arc<EventBus>,
    pub notices: Arc<NoticeCenter>,
    events: broadcast::Receiver<SyncEvent>,
    pub account: Account,
    pub listings: ListingFeature,
    pub care_homes: CareHomeFeature,
    pub food_posts: FoodPostFeature,
    pub profiles: ProfileFeature,
}

impl Platform {
    /// Wire every feature to `backend` over a fresh event bus.
    pub fn new(backend: &Backend, max_image_bytes: u64) -> Self {
        let bus = Arc::new(EventBus::default());
        let events = bus.subscribe();
        let auth = backend.auth();

        fn feature<E: Entity>(
            backend: &Backend,
            auth: &Arc<dyn AuthProvider>,
            bus: &Arc<EventBus>,
            max_image_bytes: u64,
        ) -> Feature<E> {
            Feature::new(backend.table(), Arc::clone(auth), Arc::clone(bus))
                .with_image_limit(max_image_bytes)
        }

        Self {
            account: Account::new(Arc::clone(&auth), Arc::clone(&bus)),
            listings: feature(backend, &auth, &bus, max_image_bytes),
            care_homes: feature(backend, &auth, &bus, max_image_bytes),
            food_posts: feature(backend, &auth, &bus, max_image_bytes),
            profiles: feature(backend, &auth, &bus, max_image_bytes),
            notices: NoticeCenter::new(),
            events,
            bus,
        }
    }

    /// Load every collection. A failed load leaves its collection as it
    /// was; the failure is already on the bus as a notice.
    pub async fn load_all(&self) -> Vec<SyncError> {
        let (listings, care_homes, food_posts, profiles) = tokio::join!(
            self.listings.load(),
            self.care_homes.load(),
            self.food_posts.load(),
            self.profiles.load(),
        );
        [
            listings.err(),
            care_homes.err(),
            food_posts.err(),
            profiles.err(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Notices raised since the last call, oldest first. Taking them
    /// acknowledges them.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(&mut self.events);
        let pending = self.notices.pending();
        self.notices.dismiss_all();
        pending
    }

    pub fn contributions(&self) -> Vec<EntityRecord> {
        my_contributions(&self.listings, &self.care_homes, &self.food_posts)
    }
}
