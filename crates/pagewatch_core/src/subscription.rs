use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use url::Url;

pub type SubscriberId = String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{subscriber} already tracks {url}")]
    AlreadyTracked { subscriber: SubscriberId, url: String },
    #[error("{subscriber} does not track {url}")]
    NotTracked { subscriber: SubscriberId, url: String },
    #[error("unknown subscriber {0}")]
    UnknownSubscriber(SubscriberId),
}

/// A distinct URL to poll during a tick, with every unpaused subscriber that
/// tracks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub url: String,
    pub subscribers: Vec<SubscriberId>,
}

/// Subscriber → tracked URLs, plus the set of paused subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionBook {
    subscribers: BTreeMap<SubscriberId, Vec<String>>,
    paused: BTreeSet<SubscriberId>,
}

impl SubscriptionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a book from persisted parts. Duplicate URLs per subscriber are
    /// dropped, keeping the first occurrence.
    pub fn from_parts(
        subscribers: BTreeMap<SubscriberId, Vec<String>>,
        paused: BTreeSet<SubscriberId>,
    ) -> Self {
        let subscribers = subscribers
            .into_iter()
            .map(|(id, urls)| {
                let mut seen = BTreeSet::new();
                let urls = urls.into_iter().filter(|u| seen.insert(u.clone())).collect();
                (id, urls)
            })
            .collect();
        Self { subscribers, paused }
    }

    pub fn subscribers(&self) -> &BTreeMap<SubscriberId, Vec<String>> {
        &self.subscribers
    }

    pub fn paused(&self) -> &BTreeSet<SubscriberId> {
        &self.paused
    }

    pub fn list_subscribers(&self) -> Vec<SubscriberId> {
        self.subscribers.keys().cloned().collect()
    }

    pub fn urls_for(&self, subscriber: &str) -> Vec<String> {
        self.subscribers.get(subscriber).cloned().unwrap_or_default()
    }

    pub fn is_paused(&self, subscriber: &str) -> bool {
        self.paused.contains(subscriber)
    }

    /// Adds `url` to the subscriber's list, creating the subscriber if needed.
    pub fn subscribe(&mut self, subscriber: &str, url: &str) -> Result<(), SubscriptionError> {
        let url = validate_url(url)?;
        let urls = self.subscribers.entry(subscriber.to_string()).or_default();
        if urls.contains(&url) {
            return Err(SubscriptionError::AlreadyTracked {
                subscriber: subscriber.to_string(),
                url,
            });
        }
        urls.push(url);
        Ok(())
    }

    pub fn unsubscribe(&mut self, subscriber: &str, url: &str) -> Result<(), SubscriptionError> {
        let url = url.trim();
        let urls = self
            .subscribers
            .get_mut(subscriber)
            .ok_or_else(|| SubscriptionError::UnknownSubscriber(subscriber.to_string()))?;
        let before = urls.len();
        urls.retain(|u| u != url);
        if urls.len() == before {
            return Err(SubscriptionError::NotTracked {
                subscriber: subscriber.to_string(),
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Returns false if the subscriber was already paused.
    pub fn pause(&mut self, subscriber: &str) -> Result<bool, SubscriptionError> {
        self.require_known(subscriber)?;
        Ok(self.paused.insert(subscriber.to_string()))
    }

    /// Returns false if the subscriber was not paused.
    pub fn resume(&mut self, subscriber: &str) -> Result<bool, SubscriptionError> {
        self.require_known(subscriber)?;
        Ok(self.paused.remove(subscriber))
    }

    pub fn remove_subscriber(&mut self, subscriber: &str) -> Result<(), SubscriptionError> {
        self.subscribers
            .remove(subscriber)
            .ok_or_else(|| SubscriptionError::UnknownSubscriber(subscriber.to_string()))?;
        self.paused.remove(subscriber);
        Ok(())
    }

    /// Distinct URLs of unpaused subscribers, in first-seen order, each with
    /// its fan-out list.
    pub fn active_targets(&self) -> Vec<WatchTarget> {
        let mut targets: Vec<WatchTarget> = Vec::new();
        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for (subscriber, urls) in &self.subscribers {
            if self.paused.contains(subscriber) {
                continue;
            }
            for url in urls {
                match index.get(url.as_str()) {
                    Some(&pos) => targets[pos].subscribers.push(subscriber.clone()),
                    None => {
                        index.insert(url, targets.len());
                        targets.push(WatchTarget {
                            url: url.clone(),
                            subscribers: vec![subscriber.clone()],
                        });
                    }
                }
            }
        }
        targets
    }

    fn require_known(&self, subscriber: &str) -> Result<(), SubscriptionError> {
        if self.subscribers.contains_key(subscriber) {
            Ok(())
        } else {
            Err(SubscriptionError::UnknownSubscriber(subscriber.to_string()))
        }
    }
}

fn validate_url(raw: &str) -> Result<String, SubscriptionError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|err| SubscriptionError::InvalidUrl {
        url: trimmed.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(SubscriptionError::InvalidUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

/// Subscription data as consumed by the scheduler.
pub trait SubscriptionStore: Send + Sync {
    fn list_subscribers(&self) -> Vec<SubscriberId>;
    fn urls_for(&self, subscriber: &str) -> Vec<String>;
    fn is_paused(&self, subscriber: &str) -> bool;
    /// A consistent copy of the whole book, taken under a single lock.
    fn snapshot(&self) -> SubscriptionBook;
    /// Swaps in a book edited elsewhere, e.g. reloaded from disk.
    fn replace(&self, book: SubscriptionBook);
}

/// Lock-guarded book shared between the scheduler and command handlers.
#[derive(Debug, Clone, Default)]
pub struct SharedSubscriptions {
    inner: Arc<RwLock<SubscriptionBook>>,
}

impl SharedSubscriptions {
    pub fn new(book: SubscriptionBook) -> Self {
        Self {
            inner: Arc::new(RwLock::new(book)),
        }
    }

    /// Applies a mutation under the write lock.
    pub fn update<R>(&self, apply: impl FnOnce(&mut SubscriptionBook) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard)
    }

    fn read<R>(&self, view: impl FnOnce(&SubscriptionBook) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        view(&guard)
    }
}

impl SubscriptionStore for SharedSubscriptions {
    fn list_subscribers(&self) -> Vec<SubscriberId> {
        self.read(SubscriptionBook::list_subscribers)
    }

    fn urls_for(&self, subscriber: &str) -> Vec<String> {
        self.read(|book| book.urls_for(subscriber))
    }

    fn is_paused(&self, subscriber: &str) -> bool {
        self.read(|book| book.is_paused(subscriber))
    }

    fn snapshot(&self) -> SubscriptionBook {
        self.read(SubscriptionBook::clone)
    }

    fn replace(&self, book: SubscriptionBook) {
        self.update(|current| *current = book);
    }
}
