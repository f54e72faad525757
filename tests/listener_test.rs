//! Listener tests
//!
//! Tests for key subscriptions, delivery and cleanup.

mod common;

use common::{recorder, HomeConfig, MainConfig, TestFixture};
use pocketconf::{ConfigListener, Delivery, DispatchQueue, Error};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

// =============================================================================
// Delivery
// =============================================================================

#[test]
fn test_listener_hears_only_tracked_keys() {
    let fixture = TestFixture::new();
    let home = fixture.store.open::<HomeConfig>().unwrap();
    let (received, listener) = recorder();
    home.subscribe(["showClock", "clockFormat"], listener).unwrap();

    home.set_value("showClock", false).unwrap();
    home.set_value("clockFormat", "12h").unwrap();
    home.set_value("iconScale", 2.0).unwrap();

    assert_eq!(*received.lock(), vec!["showClock", "clockFormat"]);
}

#[test]
fn test_unchanged_value_does_not_notify() {
    let fixture = TestFixture::new();
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    main.subscribe(["theme"], listener).unwrap();

    assert!(main.set_value("theme", "light").unwrap());
    assert!(!main.set_value("theme", "light").unwrap());

    assert_eq!(received.lock().len(), 1);
}

#[test]
fn test_listener_sees_changes_from_other_handles() {
    let fixture = TestFixture::new();
    let watcher = fixture.store.open::<MainConfig>().unwrap();
    let writer = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    watcher.subscribe(["maxRows"], listener).unwrap();

    writer.set_value("maxRows", 4).unwrap();

    assert_eq!(*received.lock(), vec!["maxRows"]);
}

#[test]
fn test_listener_reads_committed_value() {
    let fixture = TestFixture::new();
    let main = fixture.store.open::<MainConfig>().unwrap();
    let seen = Arc::new(parking_lot::Mutex::new(String::new()));

    let reader = main.clone();
    let sink = Arc::clone(&seen);
    main.subscribe(["theme"], move |key: &str| {
        *sink.lock() = reader.value::<String>(key);
    })
    .unwrap();

    main.set_value("theme", "light").unwrap();
    assert_eq!(*seen.lock(), "light");
}

#[test]
fn test_unknown_key_subscription_rejected() {
    let fixture = TestFixture::new();
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (_, listener) = recorder();

    let result = main.subscribe(["theme", "wallpaper"], listener);

    assert!(matches!(result, Err(Error::UnknownKey { ref key, .. }) if key == "wallpaper"));
    assert_eq!(main.listener_count("theme"), 0);
}

// =============================================================================
// Subscription management
// =============================================================================

#[test]
fn test_dropping_handle_unsubscribes_its_listeners() {
    let fixture = TestFixture::new();
    let subscriber = fixture.store.open::<MainConfig>().unwrap();
    let writer = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    subscriber.subscribe(["theme"], listener).unwrap();
    assert_eq!(writer.listener_count("theme"), 1);

    drop(subscriber);
    writer.set_value("theme", "light").unwrap();

    assert!(received.lock().is_empty());
    assert_eq!(writer.listener_count("theme"), 0);
}

#[test]
fn test_unsubscribe_twice_is_harmless() {
    let fixture = TestFixture::new();
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    let id = main.subscribe(["theme"], listener).unwrap();

    assert!(main.unsubscribe(id));
    assert!(!main.unsubscribe(id));
    main.set_value("theme", "light").unwrap();
    assert!(received.lock().is_empty());
}

#[test]
fn test_shared_listener_merges_keys() {
    let fixture = TestFixture::new();
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    let listener: Arc<dyn ConfigListener> = Arc::new(listener);

    let first = main.subscribe_shared(["theme"], Arc::clone(&listener)).unwrap();
    let second = main
        .subscribe_shared(["theme", "maxRows"], Arc::clone(&listener))
        .unwrap();
    assert_eq!(first, second);

    main.set_value("theme", "light").unwrap();
    main.set_value("maxRows", 1).unwrap();
    assert_eq!(*received.lock(), vec!["theme", "maxRows"]);
}

#[test]
fn test_listener_shared_by_two_handles_survives_one_drop() {
    let fixture = TestFixture::new();
    let first = fixture.store.open::<MainConfig>().unwrap();
    let second = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    let listener: Arc<dyn ConfigListener> = Arc::new(listener);

    let first_id = first.subscribe_shared(["theme"], Arc::clone(&listener)).unwrap();
    let second_id = second
        .subscribe_shared(["maxRows"], Arc::clone(&listener))
        .unwrap();
    assert_ne!(first_id, second_id);

    drop(first);
    assert_eq!(second.subscribed_keys(second_id), vec!["maxRows"]);
    assert_eq!(second.listener_count("theme"), 0);

    second.set_value("theme", "light").unwrap();
    second.set_value("maxRows", 9).unwrap();
    assert_eq!(*received.lock(), vec!["maxRows"]);
}

#[test]
fn test_clone_keeps_its_own_subscriptions() {
    let fixture = TestFixture::new();
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    let listener: Arc<dyn ConfigListener> = Arc::new(listener);
    let id = main.subscribe_shared(["theme"], Arc::clone(&listener)).unwrap();

    let copy = main.clone();
    let copy_id = copy.subscribe_shared(["theme"], listener).unwrap();
    assert_ne!(id, copy_id);
    assert_eq!(main.listener_count("theme"), 2);

    drop(copy);
    assert_eq!(main.subscribed_keys(id), vec!["theme"]);
    main.set_value("theme", "light").unwrap();
    assert_eq!(*received.lock(), vec!["theme"]);
}

#[test]
fn test_track_and_untrack_keys() {
    let fixture = TestFixture::new();
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    let id = main.subscribe(["theme"], listener).unwrap();

    assert!(main.track_keys(id, ["maxRows"]).unwrap());
    assert!(main.track_keys(id, ["nothing"]).is_err());
    main.untrack_keys(id, ["theme"]);
    assert_eq!(main.subscribed_keys(id), vec!["maxRows"]);

    main.set_value("theme", "light").unwrap();
    main.set_value("maxRows", 9).unwrap();
    assert_eq!(*received.lock(), vec!["maxRows"]);
}

#[test]
fn test_load_all_delivers_every_tracked_key() {
    let fixture = TestFixture::new();
    let home = fixture.store.open::<HomeConfig>().unwrap();
    let (received, listener) = recorder();
    let id = home.subscribe(["showClock", "iconScale"], listener).unwrap();

    assert_eq!(home.load_all(id), 2);

    let mut keys = received.lock().clone();
    keys.sort();
    assert_eq!(keys, vec!["iconScale", "showClock"]);
}

#[test]
fn test_callback_may_write_through_store() {
    let fixture = TestFixture::new();
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    main.subscribe(["maxRows"], listener).unwrap();

    let store = fixture.store.clone();
    main.subscribe(["theme"], move |_: &str| {
        let handle = store.open::<MainConfig>().unwrap();
        handle.set_value("maxRows", 1).unwrap();
    })
    .unwrap();

    main.set_value("theme", "light").unwrap();

    assert_eq!(*received.lock(), vec!["maxRows"]);
    assert_eq!(main.get_value::<i64>("maxRows").unwrap(), 1);
}

// =============================================================================
// Queued delivery
// =============================================================================

#[test]
fn test_queued_delivery_waits_for_drain() {
    let queue = DispatchQueue::new(16);
    let fixture = TestFixture::with(|builder| builder.delivery(Delivery::Queued(queue.sender())));
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    main.subscribe(["theme"], listener).unwrap();

    let worker = main.clone();
    thread::spawn(move || {
        worker.set_value("theme", "light").unwrap();
    })
    .join()
    .unwrap();

    assert!(received.lock().is_empty());
    assert_eq!(queue.run_pending(), 1);
    assert_eq!(*received.lock(), vec!["theme"]);
}

#[test]
fn test_queued_delivery_runs_inline_on_owner_thread() {
    let queue = DispatchQueue::new(16);
    let fixture = TestFixture::with(|builder| builder.delivery(Delivery::Queued(queue.sender())));
    let main = fixture.store.open::<MainConfig>().unwrap();
    let (received, listener) = recorder();
    main.subscribe(["theme"], listener).unwrap();

    main.set_value("theme", "light").unwrap();

    assert_eq!(*received.lock(), vec!["theme"]);
    assert_eq!(queue.run_pending(), 0);
}

#[test]
fn test_queued_notification_skips_removed_listener() {
    let queue = DispatchQueue::new(16);
    let fixture = TestFixture::with(|builder| builder.delivery(Delivery::Queued(queue.sender())));
    let main = fixture.store.open::<MainConfig>().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = main
        .subscribe(["maxRows"], move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let worker = main.clone();
    thread::spawn(move || {
        worker.set_value("maxRows", 12).unwrap();
    })
    .join()
    .unwrap();

    main.unsubscribe(id);
    queue.run_pending();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
