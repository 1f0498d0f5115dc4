//! RRR Platform event bus and user notices.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ChangeEvent`]: "collection changed" envelope views recompute on.
//! - [`Notice`] and [`NoticeCenter`]: dismissible failure notices.

pub mod bus;
pub mod notice;

pub use bus::{ChangeEvent, EventBus, SyncEvent};
pub use notice::{FailureClass, Notice, NoticeCenter, Severity};
