//! The poll loop: fetch → extract → fingerprint → diff → notify → persist.
//!
//! One [`Poller`] owns the resource state. Ticks never overlap because the
//! loop awaits each tick before sleeping, and [`Poller::run_tick`] takes
//! `&mut self`. Within a tick every distinct URL is fetched once, with a
//! bounded number of requests in flight; results are then handled strictly
//! in order, so state updates and notifications for a URL are serialized.
//!
//! With a snapshot file attached, the file is where other processes (the
//! CLI) edit subscriptions. Each tick starts by adopting such edits, and
//! every save re-reads the file first so they are never written over.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn, set_poll_tick};
use futures_util::{stream, StreamExt};
use pagewatch_core::{
    fingerprint, DiffLimits, Notification, PersistedSnapshot, ResourceStateStore,
    SubscriptionBook, SubscriptionStore, WatchTarget,
};
use tokio_util::sync::CancellationToken;

use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::persist::{PersistError, SnapshotFile};
use crate::sink::NotificationSink;
use crate::{FetchError, FetchOutput};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_concurrent_fetches: usize,
    pub diff_limits: DiffLimits,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_concurrent_fetches: 8,
            diff_limits: DiffLimits::default(),
        }
    }
}

/// Counters for one pass over all subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub urls_checked: usize,
    pub fetch_failures: usize,
    pub absent: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub notifications_sent: usize,
    pub delivery_failures: usize,
    pub persist_failures: usize,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {}: {} urls, {} changed, {} unchanged, {} absent, {} fetch failures, \
             {} sent, {} delivery failures, {} persist failures",
            self.tick,
            self.urls_checked,
            self.changed,
            self.unchanged,
            self.absent,
            self.fetch_failures,
            self.notifications_sent,
            self.delivery_failures,
            self.persist_failures
        )
    }
}

pub struct Poller {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn NotificationSink>,
    subscriptions: Arc<dyn SubscriptionStore>,
    resources: ResourceStateStore,
    snapshot_file: Option<Arc<SnapshotFile>>,
    /// Subscriptions as last read from or written to `snapshot_file`.
    synced: Option<SubscriptionBook>,
    settings: PollSettings,
    tick: u64,
}

impl Poller {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn NotificationSink>,
        subscriptions: Arc<dyn SubscriptionStore>,
        resources: ResourceStateStore,
        settings: PollSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            sink,
            subscriptions,
            resources,
            snapshot_file: None,
            synced: None,
            settings,
            tick: 0,
        }
    }

    /// Persist the full snapshot to `file` after every detected change, and
    /// pick up subscription edits other processes make to it.
    pub fn with_snapshot_file(mut self, file: SnapshotFile) -> Self {
        self.snapshot_file = Some(Arc::new(file));
        self
    }

    pub fn resources(&self) -> &ResourceStateStore {
        &self.resources
    }

    pub fn ticks_completed(&self) -> u64 {
        self.tick
    }

    /// Runs ticks until `cancel` fires. Cancellation is honoured mid-tick as
    /// well; at most the URL being processed at that moment is re-evaluated
    /// on the next start.
    pub async fn run(mut self, cancel: CancellationToken) -> Self {
        engine_info!(
            "Poller started: interval {:?}, up to {} concurrent fetches",
            self.settings.interval,
            self.settings.max_concurrent_fetches
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                report = self.run_tick() => engine_info!("{}", report),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        engine_info!("Poller stopped after {} ticks", self.tick);
        self
    }

    /// One full pass over a snapshot of the current subscriptions.
    pub async fn run_tick(&mut self) -> TickReport {
        self.tick += 1;
        set_poll_tick(self.tick);

        self.pull_subscriptions().await;
        let targets = self.subscriptions.snapshot().active_targets();
        let mut report = TickReport {
            tick: self.tick,
            urls_checked: targets.len(),
            ..TickReport::default()
        };
        engine_debug!("Checking {} urls", targets.len());

        let fetcher = Arc::clone(&self.fetcher);
        let mut fetched = stream::iter(targets)
            .map(move |target| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    let result = fetcher.fetch(&target.url).await;
                    (target, result)
                }
            })
            .buffered(self.settings.max_concurrent_fetches.max(1));

        while let Some((target, result)) = fetched.next().await {
            self.process(target, result, &mut report).await;
        }

        report
    }

    async fn process(
        &mut self,
        target: WatchTarget,
        result: Result<FetchOutput, FetchError>,
        report: &mut TickReport,
    ) {
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                engine_warn!("Skipping this tick: {}", err);
                report.fetch_failures += 1;
                return;
            }
        };

        let Some(current) = self.extractor.extract(&output.text()) else {
            engine_debug!("No monitored block on {}", target.url);
            report.absent += 1;
            return;
        };

        let current_fp = fingerprint(&current);
        if self.resources.is_unchanged(&target.url, &current_fp) {
            report.unchanged += 1;
            return;
        }

        let previous = self.resources.get(&target.url).map(|r| r.content.as_str());
        let notification = Notification::for_change(
            &target.url,
            previous,
            &current,
            &self.settings.diff_limits,
        );
        engine_info!(
            "Change on {} ({}), notifying {} subscriber(s)",
            target.url,
            notification.category,
            target.subscribers.len()
        );

        self.resources.update(target.url.clone(), current_fp, current);
        report.changed += 1;
        if !self.persist().await {
            report.persist_failures += 1;
        }

        for subscriber in &target.subscribers {
            match self.sink.send(subscriber, &notification).await {
                Ok(()) => report.notifications_sent += 1,
                Err(err) => {
                    engine_error!(
                        "Delivery to {} for {} failed: {}",
                        subscriber,
                        target.url,
                        err
                    );
                    report.delivery_failures += 1;
                }
            }
        }
    }

    /// Adopts the subscriptions stored in the snapshot file if they changed
    /// since this poller last read or wrote them. A missing file changes
    /// nothing, and an unreadable one keeps the in-memory book.
    async fn pull_subscriptions(&mut self) {
        let Some(file) = self.snapshot_file.clone() else {
            return;
        };
        let on_disk = match on_blocking_pool(move || file.load_existing()).await {
            Ok(Some(snapshot)) => {
                SubscriptionBook::from_parts(snapshot.subscribers, snapshot.paused)
            }
            Ok(None) => return,
            Err(err) => {
                engine_warn!("Keeping in-memory subscriptions: {}", err);
                return;
            }
        };
        if self.synced.as_ref() == Some(&on_disk) {
            return;
        }
        if self.synced.is_some() {
            engine_info!(
                "Subscriptions changed on disk, now {} subscriber(s)",
                on_disk.subscribers().len()
            );
        }
        self.subscriptions.replace(on_disk.clone());
        self.synced = Some(on_disk);
    }

    /// Returns false if a configured snapshot file could not be written.
    async fn persist(&mut self) -> bool {
        let Some(file) = self.snapshot_file.clone() else {
            return true;
        };
        // Edits made to the file since the tick started win over the copy
        // held here.
        self.pull_subscriptions().await;
        let book = self.subscriptions.snapshot();
        let snapshot = PersistedSnapshot::capture(&book, &self.resources);

        let path = file.path().to_path_buf();
        match on_blocking_pool(move || file.save(&snapshot)).await {
            Ok(()) => {
                self.synced = Some(book);
                true
            }
            Err(err) => {
                engine_error!("Failed to persist snapshot to {:?}: {}", path, err);
                false
            }
        }
    }
}

/// Snapshot reads and writes copy, write and fsync files; keep them off the
/// async workers.
async fn on_blocking_pool<T: Send + 'static>(
    work: impl FnOnce() -> Result<T, PersistError> + Send + 'static,
) -> Result<T, PersistError> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| PersistError::Io(std::io::Error::other(err)))?
}
