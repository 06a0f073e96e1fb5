use std::collections::BTreeMap;

use engine_logging::engine_warn;
use serde::{Deserialize, Serialize};

use crate::fingerprint::{fingerprint, Fingerprint};
use crate::snapshot::PersistedSnapshot;

/// Last observed state of a monitored URL.
///
/// `fingerprint` is always the fingerprint of `content`; the two are only ever
/// replaced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ResourceRecord")]
pub struct TrackedResource {
    pub fingerprint: Fingerprint,
    pub content: String,
}

impl TrackedResource {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            fingerprint: fingerprint(&content),
            content,
        }
    }
}

/// On-disk forms accepted for a resource entry. Older snapshots stored only
/// the text.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResourceRecord {
    Full {
        fingerprint: Option<Fingerprint>,
        content: String,
    },
    ContentOnly(String),
}

impl From<ResourceRecord> for TrackedResource {
    fn from(record: ResourceRecord) -> Self {
        match record {
            ResourceRecord::Full {
                fingerprint: Some(fingerprint),
                content,
            } => Self {
                fingerprint,
                content,
            },
            ResourceRecord::Full {
                fingerprint: None,
                content,
            }
            | ResourceRecord::ContentOnly(content) => Self::new(content),
        }
    }
}

/// URL → last observed fingerprint and text. Owned by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStateStore {
    entries: BTreeMap<String, TrackedResource>,
}

impl ResourceStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&TrackedResource> {
        self.entries.get(url)
    }

    /// Whether `candidate` matches what was last stored for `url`.
    /// An unseen URL is never unchanged.
    pub fn is_unchanged(&self, url: &str, candidate: &Fingerprint) -> bool {
        self.entries
            .get(url)
            .is_some_and(|resource| &resource.fingerprint == candidate)
    }

    /// The only mutator. `fingerprint` must be the fingerprint of `content`.
    pub fn update(&mut self, url: impl Into<String>, fingerprint: Fingerprint, content: String) {
        debug_assert_eq!(fingerprint, crate::fingerprint(&content));
        self.entries.insert(
            url.into(),
            TrackedResource {
                fingerprint,
                content,
            },
        );
    }

    /// Stores `content` for `url` and returns whether it differs from what
    /// was stored before. Unseen URLs count as changed.
    pub fn observe(&mut self, url: impl Into<String>, content: String) -> bool {
        let url = url.into();
        let fingerprint = crate::fingerprint(&content);
        let changed = !self.is_unchanged(&url, &fingerprint);
        self.update(url, fingerprint, content);
        changed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrackedResource)> {
        self.entries.iter().map(|(url, res)| (url.as_str(), res))
    }

    /// Replaces the current entries with the ones in `snapshot`.
    ///
    /// Entries whose stored fingerprint does not match their text get a fresh
    /// fingerprint, so a hand-edited snapshot cannot suppress a notification.
    pub fn load_from(&mut self, snapshot: &PersistedSnapshot) {
        self.entries = snapshot
            .resources
            .iter()
            .map(|(url, resource)| {
                let expected = fingerprint(&resource.content);
                if expected != resource.fingerprint {
                    engine_warn!("Stored fingerprint for {} is stale, recomputing", url);
                    (url.clone(), TrackedResource::new(resource.content.clone()))
                } else {
                    (url.clone(), resource.clone())
                }
            })
            .collect();
    }

    pub fn save_to(&self, snapshot: &mut PersistedSnapshot) {
        snapshot.resources = self.entries.clone();
    }
}
