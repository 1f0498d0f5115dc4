//! REST client for the hosted database/auth service.
//!
//! Speaks the PostgREST dialect for tables (`/rest/v1/{table}` with
//! `column=eq.value` filters and `Prefer: return=representation`) and the
//! GoTrue dialect for auth (`/auth/v1/signup`, `/auth/v1/token`,
//! `/auth/v1/logout`). Request timeouts are the HTTP client's.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use rrr_core::roles::ActorRole;
use rrr_core::types::{ActorId, EntityId};

use super::{AuthProvider, ListFilter, Persistence, PersistenceError, Session};
use crate::models::actor::{Actor, Credentials, SignUp};
use crate::models::{Entity, EntityKind};

/// Connection settings for the hosted service.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project base URL, e.g. `https://xyz.example.co`.
    pub base_url: String,
    /// Public (anon) API key sent as the `apikey` header.
    pub api_key: String,
    pub request_timeout: Duration,
}

/// HTTP plumbing shared by every table backend and the auth provider.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: Arc<Session>,
}

impl RestClient {
    pub fn new(config: &RestConfig, session: Arc<Session>) -> Result<Self, PersistenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/rest/v1/{}", self.base_url, kind.table())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Build a request carrying the API key and, when signed in, the
    /// session's access token.
    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self.session.token().unwrap_or_else(|| self.api_key.clone());
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    // ---- private helpers ----

    /// Map a non-success status to the matching [`PersistenceError`].
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PersistenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(match status {
            StatusCode::UNAUTHORIZED => PersistenceError::Unauthorized(body),
            StatusCode::FORBIDDEN => PersistenceError::Forbidden(body),
            StatusCode::CONFLICT => PersistenceError::Conflict(body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                PersistenceError::Validation(body)
            }
            _ => PersistenceError::Api {
                status: status.as_u16(),
                body,
            },
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PersistenceError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), PersistenceError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Table backend over the REST API.
pub struct RestBackend<E> {
    client: Arc<RestClient>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> RestBackend<E> {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }
}

/// Take the single row a `return=representation` write answers with.
fn single_row<E: Entity>(rows: Vec<E>, id: Option<&EntityId>) -> Result<E, PersistenceError> {
    match (rows.into_iter().next(), id) {
        (Some(row), _) => Ok(row),
        (None, Some(id)) => Err(PersistenceError::NotFound {
            kind: E::KIND.label(),
            id: id.clone(),
        }),
        (None, None) => Err(PersistenceError::Decode(
            "service returned no row for insert".to_string(),
        )),
    }
}

#[async_trait]
impl<E: Entity> Persistence<E> for RestBackend<E> {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<E>, PersistenceError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(owner) = &filter.owner_id {
            query.push(("owner_id", eq(owner.as_str())));
        }
        let response = self
            .client
            .request(Method::GET, self.client.table_url(E::KIND))
            .query(&query)
            .send()
            .await?;
        let rows: Vec<E> = RestClient::parse_response(response).await?;
        tracing::debug!(table = E::KIND.table(), count = rows.len(), "Fetched rows");
        Ok(rows)
    }

    async fn create(&self, fields: &E::Fields) -> Result<E, PersistenceError> {
        let response = self
            .client
            .request(Method::POST, self.client.table_url(E::KIND))
            .header("Prefer", "return=representation")
            .json(fields)
            .send()
            .await?;
        let rows: Vec<E> = RestClient::parse_response(response).await?;
        single_row(rows, None)
    }

    async fn update(&self, id: &EntityId, fields: &E::Fields) -> Result<E, PersistenceError> {
        let response = self
            .client
            .request(Method::PATCH, self.client.table_url(E::KIND))
            .query(&[("id", eq(id.as_str()))])
            .header("Prefer", "return=representation")
            .json(fields)
            .send()
            .await?;
        let rows: Vec<E> = RestClient::parse_response(response).await?;
        single_row(rows, Some(id))
    }

    async fn delete(&self, id: &EntityId) -> Result<(), PersistenceError> {
        let response = self
            .client
            .request(Method::DELETE, self.client.table_url(E::KIND))
            .query(&[("id", eq(id.as_str()))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = RestClient::parse_response(response).await?;
        if rows.is_empty() {
            return Err(PersistenceError::NotFound {
                kind: E::KIND.label(),
                id: id.clone(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Token grant answered by sign-up and sign-in.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: ActorId,
    email: String,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    role: ActorRole,
}

impl TokenResponse {
    fn into_session(self, session: &Session) -> Actor {
        let actor = Actor {
            id: self.user.id,
            email: self.user.email,
            role: self.user.user_metadata.role,
        };
        session.set(self.access_token, actor.clone());
        actor
    }
}

/// Auth provider over the REST API.
pub struct RestAuth {
    client: Arc<RestClient>,
}

impl RestAuth {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthProvider for RestAuth {
    async fn sign_up(&self, form: &SignUp) -> Result<Actor, PersistenceError> {
        let body = serde_json::json!({
            "email": form.email,
            "password": form.password,
            "data": {
                "full_name": form.full_name,
                "role": form.role,
                "phone": form.phone,
                "organization_name": form.organization_name,
            },
        });
        let response = self
            .client
            .request(Method::POST, self.client.auth_url("signup"))
            .json(&body)
            .send()
            .await?;
        let grant: TokenResponse = RestClient::parse_response(response).await?;
        Ok(grant.into_session(&self.client.session))
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Actor, PersistenceError> {
        let response = self
            .client
            .request(Method::POST, self.client.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(credentials)
            .send()
            .await?;
        let grant: TokenResponse = RestClient::parse_response(response).await?;
        Ok(grant.into_session(&self.client.session))
    }

    async fn sign_out(&self) -> Result<(), PersistenceError> {
        if self.client.session.token().is_none() {
            return Ok(());
        }
        let request = self
            .client
            .request(Method::POST, self.client.auth_url("logout"));
        // The local session ends even if the service cannot be told.
        self.client.session.clear();
        let response = request.send().await?;
        RestClient::check_status(response).await
    }

    fn current_actor(&self) -> Option<Actor> {
        self.client.session.actor()
    }
}
