//! # Capability Scenarios
//!
//! End-to-end behavior of restricted messengers over one root bus:
//! grant enforcement, delegation, fan-out ordering and error isolation.

use std::sync::Arc;
use std::time::Duration;

use messenger_bus::{
    event_handler, ActionHandler, CollectingErrorReporter, Delegation, Messenger, MessengerError,
    RestrictedMessengerConfig,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{json, Value};
use tokio::time::timeout;

fn restricted(root: &Messenger, namespace: &str, actions: &[&str], events: &[&str]) -> Messenger {
    Messenger::restricted(
        RestrictedMessengerConfig::new(namespace)
            .allowed_actions(actions.iter().copied())
            .allowed_events(events.iter().copied()),
        root,
    )
    .expect("restricted messenger")
}

/// `A:getX` returns 42 through a granted view and fails through an empty one.
#[tokio::test]
async fn test_granted_and_denied_calls() {
    let root = Messenger::root();
    let a = restricted(&root, "A", &[], &[]);
    a.register_action_handler("A:getX", ActionHandler::sync(|_| Ok(json!(42))))
        .unwrap();

    let b = restricted(&root, "B", &["A:getX"], &[]);
    let c = restricted(&root, "C", &[], &[]);

    assert_eq!(b.call("A:getX", Value::Null).await.unwrap(), json!(42));
    assert!(matches!(
        c.call("A:getX", Value::Null).await,
        Err(MessengerError::ActionNotAllowed { .. })
    ));
}

/// `A:changed` with `{v: 1}` reaches a granted subscriber exactly once.
#[test]
fn test_event_reaches_granted_subscriber_once() {
    let root = Messenger::root();
    let a = restricted(&root, "A", &[], &[]);
    let b = restricted(&root, "B", &[], &["A:changed"]);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    b.subscribe_fn("A:changed", move |payload| {
        sink.lock().push(payload.clone());
        Ok(())
    })
    .unwrap();

    a.publish("A:changed", json!({ "v": 1 })).unwrap();
    assert_eq!(*received.lock(), vec![json!({ "v": 1 })]);
}

/// Delegation turns a denied call into a granted one.
#[tokio::test]
async fn test_delegation_after_construction() {
    let root = Messenger::root();
    root.register_action_handler("A:getX", ActionHandler::sync(|_| Ok(json!(42))))
        .unwrap();
    let d = restricted(&root, "D", &[], &[]);

    assert!(d.call("A:getX", Value::Null).await.is_err());
    root.delegate(Delegation::to(&d).actions(["A:getX"])).unwrap();
    assert_eq!(d.call("A:getX", Value::Null).await.unwrap(), json!(42));
}

#[tokio::test]
async fn test_unregistered_and_handler_errors() {
    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("vault is locked")]
    struct VaultLocked;

    let root = Messenger::root();
    root.register_action_handler(
        "Keyring:unlock",
        ActionHandler::from_async(|_| async { Err::<Value, _>(anyhow::Error::new(VaultLocked)) }),
    )
    .unwrap();
    let caller = restricted(&root, "Caller", &["Keyring:unlock", "Keyring:missing"], &[]);

    let err = caller.call("Keyring:unlock", Value::Null).await.unwrap_err();
    let inner = err.into_handler_error().expect("handler error");
    assert_eq!(inner.downcast_ref::<VaultLocked>(), Some(&VaultLocked));

    assert!(matches!(
        caller.call("Keyring:missing", Value::Null).await,
        Err(MessengerError::UnregisteredAction { .. })
    ));
}

#[tokio::test]
async fn test_async_handler_can_call_back_into_bus() {
    let root = Messenger::root();
    root.register_action_handler("Prefs:getLocale", ActionHandler::sync(|_| Ok(json!("en-US"))))
        .unwrap();

    let service = restricted(&root, "Service", &["Prefs:getLocale"], &[]);
    let inner = service.clone();
    service
        .register_action_handler(
            "Service:greeting",
            ActionHandler::from_async(move |_| {
                let messenger = inner.clone();
                async move {
                    let locale = messenger.call("Prefs:getLocale", Value::Null).await?;
                    Ok::<_, anyhow::Error>(json!(format!(
                        "hello ({})",
                        locale.as_str().unwrap_or("?")
                    )))
                }
            }),
        )
        .unwrap();

    let ui = restricted(&root, "Ui", &["Service:greeting"], &[]);
    let greeting = timeout(Duration::from_millis(100), ui.call("Service:greeting", Value::Null))
        .await
        .expect("Should complete within timeout")
        .unwrap();
    assert_eq!(greeting, json!("hello (en-US)"));
}

#[test]
fn test_bad_listener_does_not_break_fan_out() {
    let reporter = Arc::new(CollectingErrorReporter::new());
    let root = Messenger::root_with_reporter(reporter.clone());
    let a = restricted(&root, "A", &[], &[]);
    let good = restricted(&root, "Good", &[], &["A:changed"]);
    let bad = restricted(&root, "Bad", &[], &["A:changed"]);

    let delivered = Arc::new(Mutex::new(0));
    bad.subscribe_fn("A:changed", |_| Err(anyhow::anyhow!("listener crashed")))
        .unwrap();
    let counter = Arc::clone(&delivered);
    good.subscribe_fn("A:changed", move |_| {
        *counter.lock() += 1;
        Ok(())
    })
    .unwrap();

    assert_eq!(a.publish("A:changed", Value::Null).unwrap(), 2);
    assert_eq!(*delivered.lock(), 1);
    assert_eq!(reporter.reported()[0].event, "A:changed");
}

#[test]
fn test_unsubscribe_removed_handler_is_noop() {
    let root = Messenger::root();
    let b = restricted(&root, "B", &[], &["A:changed"]);
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = {
        let log = Arc::clone(&log);
        event_handler(move |_| {
            log.lock().push("first");
            Ok(())
        })
    };
    let second = {
        let log = Arc::clone(&log);
        event_handler(move |_| {
            log.lock().push("second");
            Ok(())
        })
    };
    b.subscribe("A:changed", Arc::clone(&first)).unwrap();
    b.subscribe("A:changed", Arc::clone(&second)).unwrap();

    assert!(b.unsubscribe("A:changed", &first).unwrap());
    assert!(!b.unsubscribe("A:changed", &first).unwrap());

    root.publish("A:changed", Value::Null).unwrap();
    assert_eq!(*log.lock(), vec!["second"]);
}

#[test]
fn test_selector_seeded_from_initial_payload() {
    let root = Messenger::root();
    let network = restricted(&root, "Network", &[], &[]);
    let state = Arc::new(Mutex::new(json!({ "chainId": "0x1", "status": "available" })));

    let current = Arc::clone(&state);
    network
        .register_initial_event_payload("Network:stateChange", move || current.lock().clone())
        .unwrap();

    let watcher = restricted(&root, "Watcher", &[], &["Network:stateChange"]);
    let switches = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&switches);
    watcher
        .subscribe_with_selector(
            "Network:stateChange",
            |state| state["chainId"].clone(),
            move |chain, previous| {
                sink.lock().push((chain.clone(), previous.cloned()));
                Ok(())
            },
        )
        .unwrap();

    *state.lock() = json!({ "chainId": "0x1", "status": "degraded" });
    network.publish("Network:stateChange", state.lock().clone()).unwrap();
    *state.lock() = json!({ "chainId": "0x89", "status": "available" });
    network.publish("Network:stateChange", state.lock().clone()).unwrap();

    assert_eq!(*switches.lock(), vec![(json!("0x89"), Some(json!("0x1")))]);
}

proptest! {
    /// Every subscriber present at publish time is notified exactly once,
    /// in subscription order.
    #[test]
    fn prop_fan_out_preserves_subscription_order(count in 0usize..24, failing in proptest::collection::vec(any::<bool>(), 24)) {
        let root = Messenger::root_with_reporter(Arc::new(CollectingErrorReporter::new()));
        let listener = restricted(&root, "Listener", &[], &["A:changed"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        for index in 0..count {
            let log = Arc::clone(&log);
            let fails = failing[index];
            listener
                .subscribe_fn("A:changed", move |_| {
                    log.lock().push(index);
                    if fails {
                        anyhow::bail!("subscriber {index} failed");
                    }
                    Ok(())
                })
                .unwrap();
        }

        prop_assert_eq!(root.publish("A:changed", Value::Null).unwrap(), count);
        prop_assert_eq!(log.lock().clone(), (0..count).collect::<Vec<_>>());
    }
}
