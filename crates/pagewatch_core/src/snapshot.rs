use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::resource::{ResourceStateStore, TrackedResource};
use crate::subscription::{SubscriberId, SubscriptionBook};

/// Everything that survives a restart, written as one unit.
///
/// Every field defaults to empty so a partial document still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSnapshot {
    pub subscribers: BTreeMap<SubscriberId, Vec<String>>,
    pub paused: BTreeSet<SubscriberId>,
    pub resources: BTreeMap<String, TrackedResource>,
}

impl PersistedSnapshot {
    pub fn capture(book: &SubscriptionBook, resources: &ResourceStateStore) -> Self {
        let mut snapshot = Self {
            subscribers: book.subscribers().clone(),
            paused: book.paused().clone(),
            resources: BTreeMap::new(),
        };
        resources.save_to(&mut snapshot);
        snapshot
    }

    pub fn into_parts(self) -> (SubscriptionBook, ResourceStateStore) {
        let mut resources = ResourceStateStore::new();
        resources.load_from(&self);
        let book = SubscriptionBook::from_parts(self.subscribers, self.paused);
        (book, resources)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty() && self.paused.is_empty() && self.resources.is_empty()
    }
}
