//! Fake hosted service for driving the REST backend in tests.
//!
//! Serves the PostgREST/GoTrue subset the client uses over an
//! [`InMemoryService`], on an ephemeral localhost port.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use rrr_core::roles::ActorRole;
use rrr_core::types::{ActorId, EntityId};
use rrr_db::models::actor::{Actor, Credentials, SignUp};
use rrr_db::models::EntityKind;
use rrr_db::repositories::{
    InMemoryService, ListFilter, PersistenceError, RestClient, RestConfig, Session,
};

type Shared = Arc<InMemoryService>;
type Params = HashMap<String, String>;

/// Start the fake service and return its base URL.
pub async fn spawn_service(service: Shared) -> String {
    let app = Router::new()
        .route(
            "/rest/v1/{table}",
            get(list_rows)
                .post(insert_row)
                .patch(update_row)
                .delete(delete_row),
        )
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .with_state(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// A REST client with its own session, pointed at `base_url`.
pub fn rest_client(base_url: &str) -> Arc<RestClient> {
    let config = RestConfig {
        base_url: base_url.to_string(),
        api_key: "anon-key".to_string(),
        request_timeout: Duration::from_secs(5),
    };
    Arc::new(RestClient::new(&config, Arc::new(Session::new())).unwrap())
}

pub fn signup_form(email: &str) -> SignUp {
    SignUp {
        email: email.to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
        full_name: "Test User".to_string(),
        role: ActorRole::General,
        phone: String::new(),
        organization_name: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn error_response(err: PersistenceError) -> Response {
    let status = match &err {
        PersistenceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PersistenceError::NotFound { .. } => StatusCode::NOT_FOUND,
        PersistenceError::Forbidden(_) => StatusCode::FORBIDDEN,
        PersistenceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        PersistenceError::Conflict(_) => StatusCode::CONFLICT,
        PersistenceError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "message": err.to_string() }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn caller(service: &InMemoryService, headers: &HeaderMap) -> Result<ActorId, PersistenceError> {
    let token = bearer(headers)
        .ok_or_else(|| PersistenceError::Unauthorized("missing bearer token".into()))?;
    service.actor_for_token(&token).await
}

fn eq_param(params: &Params, column: &str) -> Option<String> {
    params
        .get(column)
        .and_then(|v| v.strip_prefix("eq."))
        .map(str::to_string)
}

fn table_kind(table: &str) -> Result<EntityKind, Response> {
    EntityKind::from_table(table).ok_or_else(|| StatusCode::NOT_FOUND.into_response())
}

/// PostgREST answers a write that matched nothing with an empty array.
fn rows_or_empty(result: Result<Value, PersistenceError>) -> Response {
    match result {
        Ok(row) => Json(vec![row]).into_response(),
        Err(PersistenceError::NotFound { .. }) => Json(Vec::<Value>::new()).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_rows(
    State(service): State<Shared>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
) -> Response {
    let kind = match table_kind(&table) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let filter = ListFilter {
        owner_id: eq_param(&params, "owner_id").map(ActorId::from),
    };
    match service.list_rows(kind, &filter).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => error_response(e),
    }
}

async fn insert_row(
    State(service): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let kind = match table_kind(&table) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let actor = match caller(&service, &headers).await {
        Ok(actor) => actor,
        Err(e) => return error_response(e),
    };
    match service.insert_row(kind, &actor, body).await {
        Ok(row) => (StatusCode::CREATED, Json(vec![row])).into_response(),
        Err(e) => error_response(e),
    }
}

async fn update_row(
    State(service): State<Shared>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let kind = match table_kind(&table) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let actor = match caller(&service, &headers).await {
        Ok(actor) => actor,
        Err(e) => return error_response(e),
    };
    let Some(id) = eq_param(&params, "id") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    rows_or_empty(
        service
            .update_row(kind, &actor, &EntityId::from(id), body)
            .await,
    )
}

async fn delete_row(
    State(service): State<Shared>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Response {
    let kind = match table_kind(&table) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let actor = match caller(&service, &headers).await {
        Ok(actor) => actor,
        Err(e) => return error_response(e),
    };
    let Some(id) = eq_param(&params, "id") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let id = EntityId::from(id);
    rows_or_empty(
        service
            .delete_row(kind, &actor, &id)
            .await
            .map(|()| json!({ "id": id })),
    )
}

fn grant(token: String, actor: Actor) -> Response {
    Json(json!({
        "access_token": token,
        "user": {
            "id": actor.id,
            "email": actor.email,
            "user_metadata": { "role": actor.role },
        },
    }))
    .into_response()
}

async fn signup(State(service): State<Shared>, Json(body): Json<Value>) -> Response {
    let data = &body["data"];
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let form = SignUp {
        email: body["email"].as_str().unwrap_or_default().to_string(),
        confirm_password: password.clone(),
        password,
        full_name: data["full_name"].as_str().unwrap_or_default().to_string(),
        role: serde_json::from_value(data["role"].clone()).unwrap_or_default(),
        phone: data["phone"].as_str().unwrap_or_default().to_string(),
        organization_name: data["organization_name"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    };
    match service.register(&form).await {
        Ok((token, actor)) => grant(token, actor),
        Err(e) => error_response(e),
    }
}

async fn token(
    State(service): State<Shared>,
    Query(params): Query<Params>,
    Json(credentials): Json<Credentials>,
) -> Response {
    if params.get("grant_type").map(String::as_str) != Some("password") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    match service.authenticate(&credentials).await {
        Ok((token, actor)) => grant(token, actor),
        Err(e) => error_response(e),
    }
}

async fn logout(State(service): State<Shared>, headers: HeaderMap) -> Response {
    let Some(token) = bearer(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match service.revoke(&token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}
