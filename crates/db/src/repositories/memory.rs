//! In-process implementation of the hosted service.
//!
//! [`InMemoryService`] keeps every table as ordered JSON rows and enforces
//! the same rules the hosted service does: ids and timestamps are assigned
//! on insert, string values are trimmed, only the owner may update or
//! delete a row, and a profile keeps the role chosen at registration.
//!
//! It backs the demo mode of the app and the test suites, and exposes two
//! controls for exercising failure paths: [`InMemoryService::set_available`]
//! and [`InMemoryService::hold`].

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use rrr_core::types::{ActorId, EntityId};

use super::{AuthProvider, ListFilter, Persistence, PersistenceError, Session};
use crate::models::actor::{Actor, Credentials, SignUp};
use crate::models::profile::{Profile, ProfileFields};
use crate::models::{Entity, EntityKind, RecordHeader, HEADER_COLUMNS};
use crate::password::{hash_password, verify_password};

type Table = IndexMap<EntityId, Value>;

struct UserRecord {
    actor: Actor,
    password_hash: String,
}

/// Shared in-process service state. Clone the `Arc` to hand it to clients.
pub struct InMemoryService {
    tables: RwLock<HashMap<EntityKind, Table>>,
    /// Keyed by lowercased email.
    users: RwLock<HashMap<String, UserRecord>>,
    /// Access token -> actor id.
    tokens: RwLock<HashMap<String, ActorId>>,
    available: AtomicBool,
    gate: Arc<RwLock<()>>,
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            gate: Arc::new(RwLock::new(())),
        }
    }
}

impl InMemoryService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Simulate the service becoming unreachable (`false`) or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Hold every request at the door until the returned guard is dropped.
    pub async fn hold(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.gate).write_owned().await
    }

    async fn admit(&self) -> Result<(), PersistenceError> {
        drop(self.gate.read().await);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PersistenceError::Unavailable(
                "in-memory service is offline".to_string(),
            ))
        }
    }

    // -----------------------------------------------------------------------
    // Rows
    // -----------------------------------------------------------------------

    /// List rows of a table, newest first.
    pub async fn list_rows(
        &self,
        kind: EntityKind,
        filter: &ListFilter,
    ) -> Result<Vec<Value>, PersistenceError> {
        self.admit().await?;
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&kind) else {
            return Ok(Vec::new());
        };
        Ok(table
            .values()
            .rev()
            .filter(|row| match &filter.owner_id {
                Some(owner) => row["owner_id"].as_str() == Some(owner.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    /// Insert a row on behalf of `actor`, returning the stored row.
    pub async fn insert_row(
        &self,
        kind: EntityKind,
        actor: &ActorId,
        fields: Value,
    ) -> Result<Value, PersistenceError> {
        self.admit().await?;
        let fields = canonical_fields(fields)?;
        let id = match kind {
            EntityKind::Profile => EntityId::from(actor),
            _ => EntityId::generate(),
        };

        let mut tables = self.tables.write().await;
        let table = tables.entry(kind).or_default();
        if table.contains_key(&id) {
            return Err(PersistenceError::Conflict(format!(
                "{} {id} already exists",
                kind.label()
            )));
        }

        let now = serde_json::to_value(Utc::now())?;
        let mut row = fields;
        row.insert("id".into(), Value::String(id.to_string()));
        row.insert("owner_id".into(), Value::String(actor.to_string()));
        row.insert("created_at".into(), now.clone());
        row.insert("updated_at".into(), now);

        let row = Value::Object(row);
        table.insert(id, row.clone());
        Ok(row)
    }

    /// Replace the field set of a row owned by `actor`.
    pub async fn update_row(
        &self,
        kind: EntityKind,
        actor: &ActorId,
        id: &EntityId,
        fields: Value,
    ) -> Result<Value, PersistenceError> {
        self.admit().await?;
        let mut incoming = canonical_fields(fields)?;
        if kind == EntityKind::Profile {
            incoming.remove("role");
        }

        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&kind)
            .and_then(|t| t.get_mut(id))
            .ok_or_else(|| not_found(kind, id))?;
        ensure_owner(kind, row, actor)?;

        let Some(stored) = row.as_object_mut() else {
            return Err(PersistenceError::Decode(format!("{} row is not an object", kind.label())));
        };
        stored.extend(incoming);
        stored.insert("updated_at".into(), serde_json::to_value(Utc::now())?);
        Ok(row.clone())
    }

    /// Delete a row owned by `actor`.
    pub async fn delete_row(
        &self,
        kind: EntityKind,
        actor: &ActorId,
        id: &EntityId,
    ) -> Result<(), PersistenceError> {
        self.admit().await?;
        if kind == EntityKind::Profile {
            return Err(PersistenceError::Forbidden(
                "Profiles cannot be deleted".into(),
            ));
        }
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(&kind).ok_or_else(|| not_found(kind, id))?;
        let row = table.get(id).ok_or_else(|| not_found(kind, id))?;
        ensure_owner(kind, row, actor)?;
        table.shift_remove(id);
        Ok(())
    }

    /// Store a complete record as-is, bypassing ownership and id assignment.
    ///
    /// Used to seed demo data and test fixtures with known ids.
    pub async fn seed<E: Entity>(&self, entity: &E) -> Result<(), PersistenceError> {
        let row = serde_json::to_value(entity)?;
        let mut tables = self.tables.write().await;
        tables
            .entry(E::KIND)
            .or_default()
            .insert(entity.id().clone(), row);
        Ok(())
    }

    /// Overwrite some fields of a row directly, as another client would.
    pub async fn patch_row(
        &self,
        kind: EntityKind,
        id: &EntityId,
        patch: Value,
    ) -> Result<(), PersistenceError> {
        let patch = canonical_fields(patch)?;
        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&kind)
            .and_then(|t| t.get_mut(id))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| not_found(kind, id))?;
        row.extend(patch);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    /// Register a user, create their profile row and open a session.
    pub async fn register(&self, form: &SignUp) -> Result<(String, Actor), PersistenceError> {
        self.admit().await?;
        let email = form.email.trim().to_lowercase();
        let password_hash = hash_password(&form.password)
            .map_err(|e| PersistenceError::Validation(format!("Could not hash password: {e}")))?;

        let actor = {
            let mut users = self.users.write().await;
            if users.contains_key(&email) {
                return Err(PersistenceError::Conflict(format!(
                    "An account for {email} already exists"
                )));
            }
            let actor = Actor {
                id: ActorId::generate(),
                email: email.clone(),
                role: form.role,
            };
            users.insert(
                email.clone(),
                UserRecord {
                    actor: actor.clone(),
                    password_hash,
                },
            );
            actor
        };

        let now = Utc::now();
        let profile = Profile::from_parts(
            RecordHeader {
                id: EntityId::from(&actor.id),
                owner_id: actor.id.clone(),
                created_at: now,
                updated_at: now,
            },
            ProfileFields {
                full_name: form.full_name.trim().to_string(),
                email: email.clone(),
                phone: form.phone.trim().to_string(),
                role: form.role,
                organization_name: form.organization_name.trim().to_string(),
                ..Default::default()
            },
        );
        self.seed(&profile).await?;

        tracing::info!(actor_id = %actor.id, role = actor.role.name(), "Registered user");
        let token = self.issue_token(&actor.id).await;
        Ok((token, actor))
    }

    /// Check credentials and open a session.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<(String, Actor), PersistenceError> {
        self.admit().await?;
        let email = credentials.email.trim().to_lowercase();
        let actor = {
            let users = self.users.read().await;
            let user = users.get(&email).ok_or_else(invalid_credentials)?;
            let ok = verify_password(&credentials.password, &user.password_hash)
                .map_err(|_| invalid_credentials())?;
            if !ok {
                return Err(invalid_credentials());
            }
            user.actor.clone()
        };
        let token = self.issue_token(&actor.id).await;
        Ok((token, actor))
    }

    /// Close a session. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> Result<(), PersistenceError> {
        self.admit().await?;
        self.tokens.write().await.remove(token);
        Ok(())
    }

    /// Resolve an access token to its actor id.
    pub async fn actor_for_token(&self, token: &str) -> Result<ActorId, PersistenceError> {
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| PersistenceError::Unauthorized("Invalid or expired session".into()))
    }

    /// Look up a registered actor by id.
    pub async fn actor(&self, id: &ActorId) -> Option<Actor> {
        self.users
            .read()
            .await
            .values()
            .find(|u| &u.actor.id == id)
            .map(|u| u.actor.clone())
    }

    async fn issue_token(&self, actor: &ActorId) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.tokens.write().await.insert(token.clone(), actor.clone());
        token
    }
}

fn invalid_credentials() -> PersistenceError {
    PersistenceError::Unauthorized("Invalid email or password".into())
}

fn not_found(kind: EntityKind, id: &EntityId) -> PersistenceError {
    PersistenceError::NotFound {
        kind: kind.label(),
        id: id.clone(),
    }
}

fn ensure_owner(kind: EntityKind, row: &Value, actor: &ActorId) -> Result<(), PersistenceError> {
    if row["owner_id"].as_str() == Some(actor.as_str()) {
        Ok(())
    } else {
        Err(PersistenceError::Forbidden(format!(
            "Only the owner may change this {}",
            kind.label()
        )))
    }
}

/// Strip header columns and trim string values, as the service stores them.
fn canonical_fields(fields: Value) -> Result<Map<String, Value>, PersistenceError> {
    let Value::Object(mut map) = fields else {
        return Err(PersistenceError::Validation(
            "Row fields must be a JSON object".into(),
        ));
    };
    map.retain(|key, _| !HEADER_COLUMNS.contains(&key.as_str()));
    for value in map.values_mut() {
        if let Value::String(s) = value {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Client-side handles
// ---------------------------------------------------------------------------

/// Table backend talking to an [`InMemoryService`] as the session's actor.
pub struct InMemoryBackend<E> {
    service: Arc<InMemoryService>,
    session: Arc<Session>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> InMemoryBackend<E> {
    pub fn new(service: Arc<InMemoryService>, session: Arc<Session>) -> Self {
        Self {
            service,
            session,
            _entity: PhantomData,
        }
    }

    async fn caller(&self) -> Result<ActorId, PersistenceError> {
        let token = self
            .session
            .token()
            .ok_or_else(|| PersistenceError::Unauthorized("Not signed in".into()))?;
        self.service.actor_for_token(&token).await
    }
}

#[async_trait]
impl<E: Entity> Persistence<E> for InMemoryBackend<E> {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<E>, PersistenceError> {
        let rows = self.service.list_rows(E::KIND, filter).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(PersistenceError::from))
            .collect()
    }

    async fn create(&self, fields: &E::Fields) -> Result<E, PersistenceError> {
        let actor = self.caller().await?;
        let row = self
            .service
            .insert_row(E::KIND, &actor, serde_json::to_value(fields)?)
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    async fn update(&self, id: &EntityId, fields: &E::Fields) -> Result<E, PersistenceError> {
        let actor = self.caller().await?;
        let row = self
            .service
            .update_row(E::KIND, &actor, id, serde_json::to_value(fields)?)
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    async fn delete(&self, id: &EntityId) -> Result<(), PersistenceError> {
        let actor = self.caller().await?;
        self.service.delete_row(E::KIND, &actor, id).await
    }
}

/// Auth provider backed by an [`InMemoryService`].
pub struct InMemoryAuth {
    service: Arc<InMemoryService>,
    session: Arc<Session>,
}

impl InMemoryAuth {
    pub fn new(service: Arc<InMemoryService>, session: Arc<Session>) -> Self {
        Self { service, session }
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn sign_up(&self, form: &SignUp) -> Result<Actor, PersistenceError> {
        let (token, actor) = self.service.register(form).await?;
        self.session.set(token, actor.clone());
        Ok(actor)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Actor, PersistenceError> {
        let (token, actor) = self.service.authenticate(credentials).await?;
        self.session.set(token, actor.clone());
        Ok(actor)
    }

    async fn sign_out(&self) -> Result<(), PersistenceError> {
        let token = self.session.token();
        self.session.clear();
        match token {
            Some(token) => self.service.revoke(&token).await,
            None => Ok(()),
        }
    }

    fn current_actor(&self) -> Option<Actor> {
        self.session.actor()
    }
}
