use pagewatch_core::{
    SharedSubscriptions, SubscriptionBook, SubscriptionError, SubscriptionStore, WatchTarget,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    engine_logging::initialize_for_tests();
}

#[test]
fn subscribe_rejects_duplicates_per_subscriber() {
    init_logging();
    let mut book = SubscriptionBook::new();
    book.subscribe("42", "http://site/x").unwrap();
    let err = book.subscribe("42", " http://site/x ").unwrap_err();
    assert_eq!(
        err,
        SubscriptionError::AlreadyTracked {
            subscriber: "42".into(),
            url: "http://site/x".into()
        }
    );
    // A different subscriber may track the same URL.
    book.subscribe("7", "http://site/x").unwrap();
    assert_eq!(book.urls_for("42"), vec!["http://site/x".to_string()]);
    assert_eq!(book.urls_for("7"), vec!["http://site/x".to_string()]);
}

#[test]
fn subscribe_rejects_non_http_urls() {
    let mut book = SubscriptionBook::new();
    assert!(matches!(
        book.subscribe("1", "not a url"),
        Err(SubscriptionError::InvalidUrl { .. })
    ));
    assert!(matches!(
        book.subscribe("1", "ftp://example.com/file"),
        Err(SubscriptionError::InvalidUrl { .. })
    ));
    assert!(book.list_subscribers().is_empty());
}

#[test]
fn pause_and_resume_require_known_subscriber() {
    let mut book = SubscriptionBook::new();
    assert_eq!(
        book.pause("ghost"),
        Err(SubscriptionError::UnknownSubscriber("ghost".into()))
    );

    book.subscribe("1", "https://a.example.com").unwrap();
    assert_eq!(book.pause("1"), Ok(true));
    assert_eq!(book.pause("1"), Ok(false));
    assert!(book.is_paused("1"));
    assert_eq!(book.resume("1"), Ok(true));
    assert!(!book.is_paused("1"));
}

#[test]
fn removing_subscriber_clears_pause_flag() {
    let mut book = SubscriptionBook::new();
    book.subscribe("1", "https://a.example.com").unwrap();
    book.pause("1").unwrap();
    book.remove_subscriber("1").unwrap();
    assert!(!book.is_paused("1"));
    assert!(book.list_subscribers().is_empty());
}

#[test]
fn unsubscribe_reports_missing_url() {
    let mut book = SubscriptionBook::new();
    book.subscribe("1", "https://a.example.com").unwrap();
    assert!(matches!(
        book.unsubscribe("1", "https://b.example.com"),
        Err(SubscriptionError::NotTracked { .. })
    ));
    book.unsubscribe("1", "https://a.example.com").unwrap();
    assert!(book.urls_for("1").is_empty());
}

#[test]
fn active_targets_skip_paused_and_fan_out_shared_urls() {
    let mut book = SubscriptionBook::new();
    book.subscribe("1", "http://shared").unwrap();
    book.subscribe("1", "http://only-one").unwrap();
    book.subscribe("2", "http://shared").unwrap();
    book.subscribe("3", "http://paused-only").unwrap();
    book.pause("3").unwrap();

    assert_eq!(
        book.active_targets(),
        vec![
            WatchTarget {
                url: "http://shared".into(),
                subscribers: vec!["1".into(), "2".into()],
            },
            WatchTarget {
                url: "http://only-one".into(),
                subscribers: vec!["1".into()],
            },
        ]
    );
}

#[test]
fn from_parts_drops_duplicate_urls() {
    let subscribers = [("1".to_string(), vec!["http://a".into(), "http://a".into()])]
        .into_iter()
        .collect();
    let book = SubscriptionBook::from_parts(subscribers, Default::default());
    assert_eq!(book.urls_for("1"), vec!["http://a".to_string()]);
}

#[test]
fn shared_store_snapshot_is_detached_from_later_mutation() {
    let shared = SharedSubscriptions::default();
    shared.update(|book| book.subscribe("1", "http://a")).unwrap();

    let snapshot = shared.snapshot();
    shared.update(|book| book.subscribe("2", "http://b")).unwrap();

    assert_eq!(snapshot.list_subscribers(), vec!["1".to_string()]);
    assert_eq!(shared.list_subscribers(), vec!["1".to_string(), "2".to_string()]);
    assert_eq!(shared.urls_for("2"), vec!["http://b".to_string()]);
    assert!(!shared.is_paused("2"));
}

#[test]
fn replace_swaps_the_whole_book_for_every_clone() {
    let shared = SharedSubscriptions::default();
    let handle = shared.clone();
    shared.update(|book| book.subscribe("1", "http://a")).unwrap();

    let mut reloaded = SubscriptionBook::new();
    reloaded.subscribe("7", "http://new").unwrap();
    reloaded.pause("7").unwrap();
    shared.replace(reloaded.clone());

    assert_eq!(handle.snapshot(), reloaded);
    assert!(handle.is_paused("7"));
    assert!(handle.urls_for("1").is_empty());
}

#[test]
fn shared_store_tolerates_concurrent_writers() {
    let shared = SharedSubscriptions::default();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for j in 0..25 {
                    let _ = shared.update(|book| book.subscribe(&i.to_string(), &format!("http://h/{j}")));
                    let _ = shared.snapshot().active_targets();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(shared.list_subscribers().len(), 8);
    assert!(shared.list_subscribers().iter().all(|id| shared.urls_for(id).len() == 25));
}
