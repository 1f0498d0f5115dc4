//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`SyncEvent`]s: change
//! events telling views to recompute, and user-visible [`Notice`]s. It is
//! shared via `Arc<EventBus>` between the feature stores and the front-end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use rrr_core::types::{ActorId, EntityId};

use crate::notice::Notice;

// ---------------------------------------------------------------------------
// ChangeEvent
// ---------------------------------------------------------------------------

/// Something changed in a local collection.
///
/// Constructed via [`ChangeEvent::new`] and enriched with the builder
/// methods [`with_source`](ChangeEvent::with_source),
/// [`with_actor`](ChangeEvent::with_actor), and
/// [`with_payload`](ChangeEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Dot-separated event name, e.g. `"listing.created"`.
    pub event_type: String,

    /// Source entity kind (e.g. `"listing"`, `"care_home"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<EntityId>,

    /// The actor whose action caused the change.
    pub actor_id: Option<ActorId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach a source entity to the event.
    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: EntityId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, actor_id: ActorId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// SyncEvent
// ---------------------------------------------------------------------------

/// Everything carried on the bus.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Changed(ChangeEvent),
    Notice(Notice),
}

impl From<ChangeEvent> for SyncEvent {
    fn from(event: ChangeEvent) -> Self {
        Self::Changed(event)
    }
}

impl From<Notice> for SyncEvent {
    fn from(notice: Notice) -> Self {
        Self::Notice(notice)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use rrr_events::bus::{ChangeEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ChangeEvent::new("listing.created"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody is
    /// listening.
    pub fn publish(&self, event: impl Into<SyncEvent>) {
        let _ = self.sender.send(event.into());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
