//! Consistency properties of the collection, partition, query and gateway.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use rrr_core::types::{ActorId, EntityId};
use rrr_db::models::listing::ReuseListing;
use rrr_db::models::{Entity, Facet};
use rrr_db::repositories::{InMemoryService, Persistence};
use rrr_events::FailureClass;
use rrr_sync::{Feature, ListingFeature, LoadOutcome, MutationState, Query};

use common::{item, listing, yes, Client, GatedList};

/// Deterministic pseudo-random sequence for driving operation mixes.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn assert_partition_consistent(feature: &ListingFeature, actor: &ActorId) {
    let collection = feature.store().snapshot();
    let expected: Vec<ReuseListing> = collection
        .iter()
        .filter(|e| e.owner_id() == actor)
        .cloned()
        .collect();
    let mine = feature.my_items();
    assert_eq!(mine, expected);
    for e in &mine {
        assert_eq!(collection.iter().find(|c| c.id() == e.id()), Some(e));
    }
}

// -- partition consistency ---------------------------------------------------

#[tokio::test]
async fn partition_matches_collection_after_every_operation() {
    let service = InMemoryService::new();
    let asha = Client::sign_up(&service, "asha@example.com").await;
    let ravi = Client::sign_up(&service, "ravi@example.com").await;
    let mut mine = asha.listings(&service);
    let mut theirs = ravi.listings(&service);
    let mut rng = Lcg(7);

    for step in 0..60 {
        match rng.next(6) {
            0 => {
                *mine.form_mut() = item(&format!("Mine {step}"), "Furniture", None);
                mine.submit().await.unwrap();
            }
            1 => {
                *theirs.form_mut() = item(&format!("Theirs {step}"), "Books", Some(100));
                theirs.submit().await.unwrap();
            }
            2 => {
                mine.load().await.unwrap();
            }
            3 => {
                let owned = mine.my_items();
                if !owned.is_empty() {
                    let target = &owned[rng.next(owned.len())];
                    mine.begin_edit(target);
                    mine.form_mut().description = format!("edited at {step}");
                    mine.submit().await.unwrap();
                }
            }
            4 => {
                let owned = mine.my_items();
                if !owned.is_empty() {
                    let target = owned[rng.next(owned.len())].id().clone();
                    mine.delete(&target, &yes).await.unwrap();
                }
            }
            _ => {
                // Deleting someone else's item is refused and changes nothing.
                let foreign: Vec<ReuseListing> = mine
                    .store()
                    .snapshot()
                    .into_iter()
                    .filter(|e| e.owner_id() != &asha.actor.id)
                    .collect();
                if let Some(target) = foreign.first() {
                    let before = mine.store().snapshot();
                    let err = mine.delete(target.id(), &yes).await.unwrap_err();
                    assert_eq!(err.class(), FailureClass::MutationFailure);
                    assert_eq!(mine.store().snapshot(), before);
                }
            }
        }
        assert_partition_consistent(&mine, &asha.actor.id);
    }
}

// -- query conjunction -------------------------------------------------------

#[tokio::test]
async fn visible_is_exactly_the_conjunction_of_search_and_filters() {
    let service = InMemoryService::new();
    let asha = Client::sign_up(&service, "asha@example.com").await;
    let owner = asha.actor.id.clone();
    for (id, name, category, price) in [
        ("1", "Chair", "Furniture", None),
        ("2", "Phone", "Electronics", Some(5000)),
        ("3", "Charger", "Electronics", None),
        ("4", "Bookshelf", "Furniture", Some(1200)),
    ] {
        service.seed(&listing(id, &owner, item(name, category, price))).await.unwrap();
    }
    let mut feature = asha.listings(&service);
    feature.load().await.unwrap();

    for search in ["", "ch", "PHONE", "zzz"] {
        for category in ["all", "Furniture", "Electronics"] {
            for price in ["all", "free", "paid"] {
                feature.set_search(search);
                feature.set_filter(Facet::Category, category);
                feature.set_filter(Facet::PriceType, price);

                let search_only = Query::new().search(search);
                let category_only = Query::new().filter(Facet::Category, category);
                let price_only = Query::new().filter(Facet::PriceType, price);
                let expected: Vec<ReuseListing> = feature
                    .store()
                    .snapshot()
                    .into_iter()
                    .filter(|e| {
                        search_only.matches(e) && category_only.matches(e) && price_only.matches(e)
                    })
                    .collect();
                assert_eq!(feature.visible().items(), expected.as_slice());
            }
        }
    }
}

// -- idempotent apply --------------------------------------------------------

#[tokio::test]
async fn replayed_reducers_change_nothing() {
    let service = InMemoryService::new();
    let asha = Client::sign_up(&service, "asha@example.com").await;
    let mut feature = asha.listings(&service);
    *feature.form_mut() = item("Chair", "Furniture", None);
    let chair = feature.submit().await.unwrap();
    *feature.form_mut() = item("Lamp", "Furniture", None);
    let lamp = feature.submit().await.unwrap();

    let store = feature.store();
    let mut renamed = chair.clone();
    renamed.fields.name = "Stool".into();
    store.apply_updated(renamed.clone());
    let once = store.snapshot();
    store.apply_updated(renamed);
    assert_eq!(store.snapshot(), once);

    store.apply_deleted(lamp.id());
    let once = store.snapshot();
    store.apply_deleted(lamp.id());
    assert_eq!(store.snapshot(), once);
    assert_eq!(once.len(), 1);
}

// -- no premature insert -----------------------------------------------------

#[tokio::test]
async fn created_entity_appears_only_after_the_service_confirms() {
    let service = InMemoryService::new();
    let asha = Client::sign_up(&service, "asha@example.com").await;
    let feature = asha.listings(&service);

    let hold = service.hold().await;
    let submission = feature.gateway().create(&item("Lamp", "Furniture", None)).unwrap();
    tokio::task::yield_now().await;
    assert_eq!(submission.state(), MutationState::Submitting);
    assert!(feature.store().read().is_empty());

    drop(hold);
    let created = submission.outcome().await.unwrap();
    assert!(!created.id().as_str().is_empty());
    assert_eq!(feature.store().snapshot(), vec![created]);
}

// -- session snapshot isolation ----------------------------------------------

#[tokio::test]
async fn unrelated_mutation_does_not_disturb_open_edit() {
    let service = InMemoryService::new();
    let asha = Client::sign_up(&service, "asha@example.com").await;
    let mut feature = asha.listings(&service);
    *feature.form_mut() = item("Chair", "Furniture", None);
    let chair = feature.submit().await.unwrap();
    *feature.form_mut() = item("Phone", "Electronics", Some(5000));
    let phone = feature.submit().await.unwrap();

    feature.begin_edit(&chair);
    feature.form_mut().condition = "Fair".into();

    // A different entity changes while the edit is open.
    feature.delete(phone.id(), &yes).await.unwrap();
    feature
        .gateway()
        .create(&item("Lamp", "Furniture", None))
        .unwrap()
        .outcome()
        .await
        .unwrap();
    assert_eq!(feature.editing(), Some(chair.id()));

    let updated = feature.submit().await.unwrap();
    let mut expected = chair.fields.clone();
    expected.condition = "Fair".into();
    assert_eq!(updated.id(), chair.id());
    assert_eq!(updated.fields, expected);
    assert_eq!(feature.store().get(chair.id()), Some(updated));
    assert!(feature.store().get(phone.id()).is_none());
}

// -- load racing mutations ---------------------------------------------------

#[tokio::test]
async fn slow_load_does_not_regress_confirmed_mutations() {
    let service = InMemoryService::new();
    let asha = Client::sign_up(&service, "asha@example.com").await;
    let owner = asha.actor.id.clone();
    service
        .seed(&listing("old", &owner, item("Old desk", "Furniture", None)))
        .await
        .unwrap();

    let gated = GatedList::<ReuseListing>::new(asha.backend(&service));
    let backend: Arc<dyn Persistence<ReuseListing>> = gated.clone();
    let mut feature = Feature::new(backend, Arc::clone(&asha.auth), Arc::clone(&asha.bus));
    feature.store().apply_created(listing("old", &owner, item("Old desk", "Furniture", None)));

    let store = Arc::clone(feature.store());
    let load = tokio::spawn(async move { store.load().await });
    gated.fetched().await;

    // Both confirmed after the load fetched its rows.
    *feature.form_mut() = item("Lamp", "Furniture", None);
    let lamp = feature.submit().await.unwrap();
    feature.delete(&EntityId::from("old"), &yes).await.unwrap();

    gated.release();
    let outcome = load.await.unwrap().unwrap();
    assert_eq!(outcome, LoadOutcome::Applied { count: 1 });
    assert_eq!(feature.store().snapshot(), vec![lamp]);

    // A fresh load agrees with the local state.
    let store = Arc::clone(feature.store());
    let load = tokio::spawn(async move { store.load().await });
    gated.fetched().await;
    gated.release();
    assert_matches!(load.await.unwrap(), Ok(LoadOutcome::Applied { count: 1 }));
}

// -- navigation away ---------------------------------------------------------

#[tokio::test]
async fn dropping_the_view_does_not_cancel_the_request() {
    let service = InMemoryService::new();
    let asha = Client::sign_up(&service, "asha@example.com").await;
    let feature = asha.listings(&service);

    let hold = service.hold().await;
    let submission = feature.gateway().create(&item("Lamp", "Furniture", None)).unwrap();
    drop(feature);
    drop(hold);

    let created = submission.outcome().await.unwrap();
    let fresh = asha.listings(&service);
    fresh.load().await.unwrap();
    assert_eq!(fresh.store().snapshot(), vec![created]);
}
