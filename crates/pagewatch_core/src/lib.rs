//! Pagewatch core: pure change-detection logic and owned state.
//!
//! Nothing in this crate performs IO. The engine crate feeds it fetched text
//! and persists what it produces.
mod category;
mod diff;
mod fingerprint;
mod notification;
mod resource;
mod snapshot;
mod subscription;

pub use category::{categorize, Category};
pub use diff::{
    diff_lines, render_diff, render_diff_with, truncate_chars, DiffLimits, LineChange,
    ADDED_PREFIX, REMOVED_PREFIX,
};
pub use fingerprint::{fingerprint, Fingerprint};
pub use notification::Notification;
pub use resource::{ResourceStateStore, TrackedResource};
pub use snapshot::PersistedSnapshot;
pub use subscription::{
    SharedSubscriptions, SubscriberId, SubscriptionBook, SubscriptionError, SubscriptionStore,
    WatchTarget,
};
