use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use pagewatch_core::{
    PersistedSnapshot, ResourceStateStore, SharedSubscriptions, SubscriptionBook,
    SubscriptionError,
};
use pagewatch_engine::{
    BlockExtractor, LogSink, NotificationSink, PersistError, Poller, ReqwestFetcher,
    SnapshotFile, WebhookSink,
};
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, SinkKind};

/// Loads the snapshot, falling back to the backup and then to empty state
/// when the main file is corrupt. Other IO errors are returned.
pub fn load_state(file: &SnapshotFile) -> Result<PersistedSnapshot> {
    match file.load() {
        Ok(snapshot) => Ok(snapshot),
        Err(PersistError::Corrupt { path, message }) => {
            engine_warn!(
                "Snapshot {:?} is corrupt ({}), trying backup {:?}",
                path,
                message,
                file.backup_path()
            );
            match file.load_backup() {
                Ok(backup) if !backup.is_empty() => {
                    engine_warn!("Recovered state from backup {:?}", file.backup_path());
                    Ok(backup)
                }
                Ok(_) => {
                    engine_warn!("No usable backup, starting with empty state");
                    Ok(PersistedSnapshot::default())
                }
                Err(err) => {
                    engine_warn!("Backup unusable ({}), starting with empty state", err);
                    Ok(PersistedSnapshot::default())
                }
            }
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to read snapshot {:?}", file.path()))
        }
    }
}

/// Applies one subscription change to the snapshot on disk.
pub fn edit_subscriptions<R>(
    file: &SnapshotFile,
    edit: impl FnOnce(&mut SubscriptionBook) -> Result<R, SubscriptionError>,
) -> Result<R> {
    let (mut book, resources) = load_state(file)?.into_parts();
    let outcome = edit(&mut book)?;
    file.save(&PersistedSnapshot::capture(&book, &resources))
        .with_context(|| format!("failed to save snapshot {:?}", file.path()))?;
    Ok(outcome)
}

pub fn render_listing(book: &SubscriptionBook, resources: &ResourceStateStore) -> String {
    if book.subscribers().is_empty() {
        return "No subscriptions.\n".to_string();
    }

    let mut out = String::new();
    for (subscriber, urls) in book.subscribers() {
        let state = if book.is_paused(subscriber) { " (paused)" } else { "" };
        let _ = writeln!(out, "{subscriber}{state}");
        for url in urls {
            let seen = match resources.get(url) {
                Some(resource) => {
                    let fp = resource.fingerprint.as_str();
                    format!("seen {}", fp.get(..12).unwrap_or(fp))
                }
                None => "not yet seen".to_string(),
            };
            let _ = writeln!(out, "  {url}  [{seen}]");
        }
    }
    out
}

fn build_sink(config: &AppConfig) -> Result<Arc<dyn NotificationSink>> {
    Ok(match config.sink.kind {
        SinkKind::Log => Arc::new(LogSink),
        SinkKind::Webhook => {
            let url = config
                .sink
                .url
                .clone()
                .context("webhook sink requires sink.url")?;
            let timeout = Duration::from_secs(config.sink.timeout_secs);
            Arc::new(WebhookSink::new(url, timeout).context("failed to build webhook client")?)
        }
    })
}

fn build_poller(config: &AppConfig, file: SnapshotFile) -> Result<Poller> {
    let (book, resources) = load_state(&file)?.into_parts();
    engine_info!(
        "Loaded {} subscribers and {} tracked resources",
        book.subscribers().len(),
        resources.len()
    );

    let fetcher =
        ReqwestFetcher::new(config.fetch_settings()).context("failed to build HTTP client")?;
    let extractor = BlockExtractor::new(&config.extract.selector)?;
    let subscriptions = SharedSubscriptions::new(book);

    Ok(Poller::new(
        Arc::new(fetcher),
        Arc::new(extractor),
        build_sink(config)?,
        Arc::new(subscriptions),
        resources,
        config.poll_settings(),
    )
    .with_snapshot_file(file))
}

/// Polls until Ctrl-C.
pub async fn run(config: &AppConfig, file: SnapshotFile) -> Result<()> {
    let poller = build_poller(config, file)?;
    let cancel = CancellationToken::new();
    let task = tokio::spawn(poller.run(cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    engine_info!("Shutdown requested");
    cancel.cancel();

    let poller = task.await.context("poller task failed")?;
    engine_info!("Exited after {} ticks", poller.ticks_completed());
    Ok(())
}

/// Runs exactly one tick and reports what happened.
pub async fn once(config: &AppConfig, file: SnapshotFile) -> Result<()> {
    let mut poller = build_poller(config, file)?;
    let report = poller.run_tick().await;
    println!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pagewatch_core::fingerprint;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn seeded(temp: &TempDir) -> SnapshotFile {
        let file = SnapshotFile::new(temp.path().join("state.json"));
        edit_subscriptions(&file, |book| book.subscribe("1", "http://a")).unwrap();
        file
    }

    #[test]
    fn edits_keep_resource_state() {
        let temp = TempDir::new().unwrap();
        let file = seeded(&temp);

        let (book, mut resources) = file.load().unwrap().into_parts();
        resources.update("http://a", fingerprint("hello"), "hello".into());
        file.save(&PersistedSnapshot::capture(&book, &resources)).unwrap();

        edit_subscriptions(&file, |book| book.pause("1")).unwrap();

        let snapshot = file.load().unwrap();
        assert!(snapshot.paused.contains("1"));
        assert_eq!(snapshot.resources["http://a"].content, "hello");
    }

    #[test]
    fn rejected_edit_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let file = seeded(&temp);
        let before = fs::read_to_string(file.path()).unwrap();

        let err = edit_subscriptions(&file, |book| book.subscribe("1", "http://a"));
        assert!(err.is_err());
        assert_eq!(fs::read_to_string(file.path()).unwrap(), before);
    }

    #[test]
    fn corrupt_snapshot_recovers_from_backup() {
        let temp = TempDir::new().unwrap();
        let file = seeded(&temp);
        // Second save rotates the first into the backup.
        edit_subscriptions(&file, |book| book.subscribe("2", "http://b")).unwrap();
        fs::write(file.path(), "{ truncated").unwrap();

        let snapshot = load_state(&file).unwrap();
        assert_eq!(snapshot.subscribers.len(), 1);
        assert!(snapshot.subscribers.contains_key("1"));
    }

    #[test]
    fn corrupt_snapshot_without_backup_starts_empty() {
        let temp = TempDir::new().unwrap();
        let file = SnapshotFile::new(temp.path().join("state.json"));
        fs::write(file.path(), "garbage").unwrap();

        assert!(load_state(&file).unwrap().is_empty());
    }

    #[test]
    fn listing_shows_pause_and_seen_state() {
        let mut book = SubscriptionBook::new();
        book.subscribe("42", "http://site/x").unwrap();
        book.subscribe("42", "http://site/y").unwrap();
        book.pause("42").unwrap();
        let mut resources = ResourceStateStore::new();
        resources.update("http://site/x", fingerprint("hello"), "hello".into());

        let listing = render_listing(&book, &resources);
        assert_eq!(
            listing,
            "42 (paused)\n  http://site/x  [seen 2cf24dba5fb0]\n  http://site/y  [not yet seen]\n"
        );
        assert_eq!(
            render_listing(&SubscriptionBook::new(), &ResourceStateStore::new()),
            "No subscriptions.\n"
        );
    }
}
