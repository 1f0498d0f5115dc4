//! User-visible failure notices.
//!
//! Every failed operation raises exactly one [`Notice`] naming the action in
//! plain terms. [`NoticeCenter`] collects them off the bus and keeps the
//! undismissed ones, oldest first, until the user acknowledges them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::bus::{EventBus, SyncEvent};

/// The four ways an operation can fail, as the user sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The collection could not be fetched; the previous snapshot stays.
    LoadFailure,
    /// Create, update or delete was rejected or never reached the service.
    MutationFailure,
    /// A selected file exceeds the size limit.
    OversizeFile,
    /// Client-side checks failed; nothing was sent.
    ValidationFailure,
}

impl FailureClass {
    /// Load failures leave usable (if stale) data on screen, so they do
    /// not interrupt the user.
    pub fn severity(self) -> Severity {
        match self {
            Self::LoadFailure => Severity::NonBlocking,
            _ => Severity::Blocking,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must be acknowledged before continuing with the same form.
    Blocking,
    NonBlocking,
}

static NEXT_NOTICE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub severity: Severity,
    pub class: FailureClass,
    /// What the user was doing, e.g. `"Delete listing"`.
    pub action: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(class: FailureClass, action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: NEXT_NOTICE_ID.fetch_add(1, Ordering::Relaxed),
            severity: class.severity(),
            class,
            action: action.into(),
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }

    /// One-line rendering for a status bar or dialog.
    pub fn text(&self) -> String {
        format!("{} failed: {}", self.action, self.message)
    }
}

// ---------------------------------------------------------------------------
// NoticeCenter
// ---------------------------------------------------------------------------

/// Undismissed notices in arrival order.
#[derive(Debug, Default)]
pub struct NoticeCenter {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeCenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe to `bus` and collect notices on a background task.
    pub fn spawn(bus: &EventBus) -> Arc<Self> {
        let center = Self::new();
        tokio::spawn(Arc::clone(&center).run(bus.subscribe()));
        center
    }

    /// Run the collection loop until the bus is dropped.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<SyncEvent>) {
        loop {
            match receiver.recv().await {
                Ok(SyncEvent::Notice(notice)) => self.push(notice),
                Ok(SyncEvent::Changed(_)) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notice center lagged, some notices were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, notice center shutting down");
                    break;
                }
            }
        }
    }

    /// Collect whatever notices are already queued on `receiver` without
    /// waiting. Returns how many were added.
    pub fn drain(&self, receiver: &mut broadcast::Receiver<SyncEvent>) -> usize {
        let mut added = 0;
        loop {
            match receiver.try_recv() {
                Ok(SyncEvent::Notice(notice)) => {
                    self.push(notice);
                    added += 1;
                }
                Ok(SyncEvent::Changed(_)) => {}
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notice center lagged, some notices were dropped");
                }
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                    break added;
                }
            }
        }
    }

    pub fn push(&self, notice: Notice) {
        self.lock().push(notice);
    }

    pub fn pending(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    /// The oldest blocking notice, which gates further input on its form.
    pub fn blocking(&self) -> Option<Notice> {
        self.lock().iter().find(|n| n.is_blocking()).cloned()
    }

    /// Acknowledge a notice. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut notices = self.lock();
        let before = notices.len();
        notices.retain(|n| n.id != id);
        notices.len() != before
    }

    pub fn dismiss_all(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bus::ChangeEvent;

    // -- severity -----------------------------------------------------------

    #[test]
    fn only_load_failures_are_non_blocking() {
        assert_eq!(FailureClass::LoadFailure.severity(), Severity::NonBlocking);
        for class in [
            FailureClass::MutationFailure,
            FailureClass::OversizeFile,
            FailureClass::ValidationFailure,
        ] {
            assert_eq!(class.severity(), Severity::Blocking);
        }
    }

    #[test]
    fn notice_text_names_the_action() {
        let notice = Notice::new(FailureClass::MutationFailure, "Delete listing", "forbidden");
        assert_eq!(notice.text(), "Delete listing failed: forbidden");
        assert!(notice.is_blocking());
    }

    #[test]
    fn notice_ids_are_unique() {
        let a = Notice::new(FailureClass::LoadFailure, "a", "x");
        let b = Notice::new(FailureClass::LoadFailure, "b", "x");
        assert_ne!(a.id, b.id);
    }

    // -- center -------------------------------------------------------------

    #[test]
    fn dismiss_removes_only_that_notice() {
        let center = NoticeCenter::new();
        let load = Notice::new(FailureClass::LoadFailure, "Load listings", "offline");
        let save = Notice::new(FailureClass::MutationFailure, "Create listing", "offline");
        center.push(load.clone());
        center.push(save.clone());

        assert_eq!(center.blocking().map(|n| n.id), Some(save.id));
        assert!(center.dismiss(save.id));
        assert!(!center.dismiss(save.id));
        assert_eq!(center.pending(), vec![load]);
        assert!(center.blocking().is_none());
    }

    #[test]
    fn drain_takes_only_what_is_queued() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let center = NoticeCenter::new();
        assert_eq!(center.drain(&mut rx), 0);

        bus.publish(ChangeEvent::new("listing.created"));
        bus.publish(Notice::new(FailureClass::LoadFailure, "Load listings", "offline"));
        assert_eq!(center.drain(&mut rx), 1);
        assert_eq!(center.pending()[0].action, "Load listings");
    }

    #[tokio::test]
    async fn run_collects_notices_and_ignores_changes() {
        let bus = EventBus::default();
        let center = NoticeCenter::new();
        let task = tokio::spawn(Arc::clone(&center).run(bus.subscribe()));

        bus.publish(ChangeEvent::new("listing.loaded"));
        bus.publish(Notice::new(FailureClass::ValidationFailure, "Sign up", "Passwords do not match"));
        drop(bus);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        let pending = center.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].class, FailureClass::ValidationFailure);
    }
}
