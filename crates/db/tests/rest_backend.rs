//! The REST backend and auth provider against a fake hosted service.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use rrr_core::types::EntityId;
use rrr_db::models::actor::Credentials;
use rrr_db::models::listing::{ListingFields, ReuseListing};
use rrr_db::models::profile::Profile;
use rrr_db::models::Entity;
use rrr_db::repositories::{
    AuthProvider, InMemoryService, ListFilter, Persistence, PersistenceError, RestAuth,
    RestBackend,
};

use common::{rest_client, signup_form, spawn_service};

fn chair() -> ListingFields {
    ListingFields {
        name: "  Chair ".into(),
        category: "Furniture".into(),
        condition: "Good".into(),
        is_free: true,
        location: "Sector 5".into(),
        ..Default::default()
    }
}

// -- crud -------------------------------------------------------------------

#[tokio::test]
async fn create_list_update_delete_round_trip() {
    let base = spawn_service(InMemoryService::new()).await;
    let client = rest_client(&base);
    let auth = RestAuth::new(Arc::clone(&client));
    let actor = auth.sign_up(&signup_form("asha@example.com")).await.unwrap();
    let listings = RestBackend::<ReuseListing>::new(Arc::clone(&client));

    let created = listings.create(&chair()).await.unwrap();
    assert_eq!(created.fields.name, "Chair");
    assert_eq!(created.owner_id(), &actor.id);

    let rows = listings.list(&ListFilter::default()).await.unwrap();
    assert_eq!(rows, vec![created.clone()]);

    let mut fields = created.fields.clone();
    fields.location = "Sector 9".into();
    let updated = listings.update(created.id(), &fields).await.unwrap();
    assert_eq!(updated.id(), created.id());
    assert_eq!(updated.fields.location, "Sector 9");
    assert_eq!(updated.header.created_at, created.header.created_at);

    listings.delete(created.id()).await.unwrap();
    assert!(listings.list(&ListFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn owner_filter_limits_rows() {
    let service = InMemoryService::new();
    let base = spawn_service(Arc::clone(&service)).await;

    let first = rest_client(&base);
    let asha = RestAuth::new(Arc::clone(&first))
        .sign_up(&signup_form("asha@example.com"))
        .await
        .unwrap();
    RestBackend::<ReuseListing>::new(Arc::clone(&first))
        .create(&chair())
        .await
        .unwrap();

    let second = rest_client(&base);
    RestAuth::new(Arc::clone(&second))
        .sign_up(&signup_form("ravi@example.com"))
        .await
        .unwrap();
    let theirs = RestBackend::<ReuseListing>::new(Arc::clone(&second));
    theirs.create(&chair()).await.unwrap();

    assert_eq!(theirs.list(&ListFilter::default()).await.unwrap().len(), 2);
    let mine = theirs.list(&ListFilter::owned_by(asha.id.clone())).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].owner_id(), &asha.id);
}

#[tokio::test]
async fn writes_by_non_owner_are_forbidden() {
    let base = spawn_service(InMemoryService::new()).await;

    let owner = rest_client(&base);
    RestAuth::new(Arc::clone(&owner))
        .sign_up(&signup_form("asha@example.com"))
        .await
        .unwrap();
    let created = RestBackend::<ReuseListing>::new(Arc::clone(&owner))
        .create(&chair())
        .await
        .unwrap();

    let other = rest_client(&base);
    RestAuth::new(Arc::clone(&other))
        .sign_up(&signup_form("ravi@example.com"))
        .await
        .unwrap();
    let listings = RestBackend::<ReuseListing>::new(other);

    let err = listings.update(created.id(), &chair()).await.unwrap_err();
    assert_matches!(err, PersistenceError::Forbidden(_));
    let err = listings.delete(created.id()).await.unwrap_err();
    assert_matches!(err, PersistenceError::Forbidden(_));
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let base = spawn_service(InMemoryService::new()).await;
    let client = rest_client(&base);
    RestAuth::new(Arc::clone(&client))
        .sign_up(&signup_form("asha@example.com"))
        .await
        .unwrap();
    let listings = RestBackend::<ReuseListing>::new(client);

    let missing = EntityId::from("no-such-row");
    let err = listings.update(&missing, &chair()).await.unwrap_err();
    assert_matches!(err, PersistenceError::NotFound { id, .. } if id == missing);
    let err = listings.delete(&missing).await.unwrap_err();
    assert_matches!(err, PersistenceError::NotFound { .. });
}

#[tokio::test]
async fn anonymous_create_is_unauthorized() {
    let base = spawn_service(InMemoryService::new()).await;
    let listings = RestBackend::<ReuseListing>::new(rest_client(&base));

    let err = listings.create(&chair()).await.unwrap_err();
    assert_matches!(err, PersistenceError::Unauthorized(_));
    // Reads stay open to everyone.
    assert!(listings.list(&ListFilter::default()).await.is_ok());
}

// -- failures ---------------------------------------------------------------

#[tokio::test]
async fn offline_service_answers_with_an_api_error() {
    let service = InMemoryService::new();
    let base = spawn_service(Arc::clone(&service)).await;
    service.set_available(false);

    let listings = RestBackend::<ReuseListing>::new(rest_client(&base));
    let err = listings.list(&ListFilter::default()).await.unwrap_err();
    assert_matches!(err, PersistenceError::Api { status: 503, .. });
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let listings = RestBackend::<ReuseListing>::new(rest_client(&base));
    let err = listings.list(&ListFilter::default()).await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {err:?}");
}

// -- auth -------------------------------------------------------------------

#[tokio::test]
async fn sign_up_creates_profile_row() {
    let base = spawn_service(InMemoryService::new()).await;
    let client = rest_client(&base);
    let actor = RestAuth::new(Arc::clone(&client))
        .sign_up(&signup_form("Asha@Example.com"))
        .await
        .unwrap();
    assert_eq!(actor.email, "asha@example.com");

    let profiles = RestBackend::<Profile>::new(client);
    let rows = profiles.list(&ListFilter::owned_by(actor.id.clone())).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields.full_name, "Test User");
}

#[tokio::test]
async fn sign_in_and_out() {
    let base = spawn_service(InMemoryService::new()).await;
    let client = rest_client(&base);
    let auth = RestAuth::new(Arc::clone(&client));
    auth.sign_up(&signup_form("asha@example.com")).await.unwrap();
    auth.sign_out().await.unwrap();
    assert!(auth.current_actor().is_none());

    let wrong = Credentials {
        email: "asha@example.com".into(),
        password: "wrong-password".into(),
    };
    assert_matches!(
        auth.sign_in(&wrong).await,
        Err(PersistenceError::Unauthorized(_))
    );

    let right = Credentials {
        password: "secret1".into(),
        ..wrong
    };
    let actor = auth.sign_in(&right).await.unwrap();
    assert_eq!(auth.current_actor(), Some(actor));
}

#[tokio::test]
async fn duplicate_sign_up_conflicts() {
    let base = spawn_service(InMemoryService::new()).await;
    let auth = RestAuth::new(rest_client(&base));
    auth.sign_up(&signup_form("asha@example.com")).await.unwrap();

    let err = auth
        .sign_up(&signup_form("asha@example.com"))
        .await
        .unwrap_err();
    assert_matches!(err, PersistenceError::Conflict(_));
}
