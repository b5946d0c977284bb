mod common;

use apns_courier::error::AppError;
use apns_courier::protocol::{MAX_PAYLOAD_BYTES, PUSH_COMMAND};
use apns_courier::services::dispatch::PushDispatcher;
use common::{InMemoryRegistry, MockTransport, ScriptedStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const EXPIRY: Duration = Duration::from_secs(86400);

fn dispatcher(registry: &Arc<InMemoryRegistry>, transport: &Arc<MockTransport>) -> PushDispatcher {
    let registry = Arc::clone(registry);
    let transport = Arc::clone(transport);
    PushDispatcher::new(registry, transport, EXPIRY)
}

#[tokio::test]
async fn dispatch_reaches_every_active_device() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let notification = common::notification(service.id, "hello");

    for token in ["aa01", "bb02", "cc03"] {
        registry.insert_device(common::device(service.id, token, None));
    }

    let captured = Arc::new(Mutex::new(Vec::new()));
    let transport = Arc::new(MockTransport::new(vec![Ok(ScriptedStream::sink(&captured))]));

    let report = dispatcher(&registry, &transport)
        .push_notification(&notification, &service, "admin@example.com")
        .await
        .unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.aborted, 0);
    assert_eq!(report.requested_by, "admin@example.com");

    let frames = common::parse_frames(&captured.lock().unwrap());
    assert_eq!(frames.len(), 3);
    for frame in &frames {
        assert_eq!(frame.command, PUSH_COMMAND);
        let payload: serde_json::Value = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(payload["aps"]["alert"], "hello");
    }
    assert_eq!(frames[0].token, hex::decode("aa01").unwrap());

    // Identifiers increase sequentially within the dispatch.
    assert_eq!(frames[1].identifier, frames[0].identifier + 1);
    assert_eq!(frames[2].identifier, frames[1].identifier + 1);

    let sent_at = registry.last_sent(notification.id).expect("last_sent_at should be set");
    for device in ["aa01", "bb02", "cc03"].map(|t| registry.device_by_token(t).unwrap()) {
        assert_eq!(device.last_notified_at, Some(sent_at));
    }
}

#[tokio::test]
async fn lost_connection_aborts_remainder_of_batch() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let notification = common::notification(service.id, "hello");

    for token in ["aa01", "bb02", "cc03"] {
        registry.insert_device(common::device(service.id, token, None));
    }

    let captured = Arc::new(Mutex::new(Vec::new()));
    // First connection dies after one frame; the reconnect attempt fails.
    let transport = Arc::new(MockTransport::new(vec![
        Ok(ScriptedStream::failing_after(1, &captured)),
        Err(common::connect_error()),
    ]));

    let report = dispatcher(&registry, &transport)
        .push_notification(&notification, &service, "admin@example.com")
        .await
        .unwrap();

    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.aborted, 2);

    // One successful device is enough to stamp the notification.
    let sent_at = registry.last_sent(notification.id).expect("last_sent_at should be set");
    assert_eq!(registry.device_by_token("aa01").unwrap().last_notified_at, Some(sent_at));
    assert_eq!(registry.device_by_token("bb02").unwrap().last_notified_at, None);
}

#[tokio::test]
async fn send_failure_gets_one_retry_then_batch_continues() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let notification = common::notification(service.id, "hello");

    for token in ["aa01", "bb02", "cc03"] {
        registry.insert_device(common::device(service.id, token, None));
    }

    let captured = Arc::new(Mutex::new(Vec::new()));
    // Connection 1 carries one frame. Device 2's retry lands on connection 2,
    // which is already dead, so it is recorded as failed. Device 3 triggers
    // another reconnect and succeeds on connection 3.
    let transport = Arc::new(MockTransport::new(vec![
        Ok(ScriptedStream::failing_after(1, &captured)),
        Ok(ScriptedStream::failing_after(0, &captured)),
        Ok(ScriptedStream::sink(&captured)),
    ]));

    let report = dispatcher(&registry, &transport)
        .push_notification(&notification, &service, "admin@example.com")
        .await
        .unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.aborted, 0);

    assert!(registry.device_by_token("aa01").unwrap().last_notified_at.is_some());
    assert!(registry.device_by_token("bb02").unwrap().last_notified_at.is_none());
    assert!(registry.device_by_token("cc03").unwrap().last_notified_at.is_some());
}

#[tokio::test]
async fn last_sent_is_untouched_when_nothing_succeeds() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let notification = common::notification(service.id, "hello");
    registry.insert_device(common::device(service.id, "aa01", None));

    let captured = Arc::new(Mutex::new(Vec::new()));
    let transport = Arc::new(MockTransport::new(vec![
        Ok(ScriptedStream::failing_after(0, &captured)),
        Err(common::connect_error()),
    ]));

    let report = dispatcher(&registry, &transport)
        .push_notification(&notification, &service, "admin@example.com")
        .await
        .unwrap();

    assert_eq!(report.succeeded, 0);
    assert_eq!(report.aborted, 1);
    assert!(registry.last_sent(notification.id).is_none());
    assert!(registry.device_by_token("aa01").unwrap().last_notified_at.is_none());
}

#[tokio::test]
async fn empty_device_set_never_opens_a_connection() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let notification = common::notification(service.id, "hello");

    let transport = Arc::new(MockTransport::new(vec![]));
    let report = dispatcher(&registry, &transport)
        .push_notification(&notification, &service, "admin@example.com")
        .await
        .unwrap();

    assert_eq!(report.attempted, 0);
    assert_eq!(report.aborted, 0);
    assert_eq!(transport.open_count(), 0);
    assert!(registry.last_sent(notification.id).is_none());
}

#[tokio::test]
async fn oversized_payload_is_rejected_before_any_send() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let message = "x".repeat(MAX_PAYLOAD_BYTES + 1);
    let notification = common::notification(service.id, &message);
    registry.insert_device(common::device(service.id, "aa01", None));

    let transport = Arc::new(MockTransport::new(vec![]));
    let err = dispatcher(&registry, &transport)
        .push_notification(&notification, &service, "admin@example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Encoding(_)));
    assert_eq!(transport.open_count(), 0);
    assert!(registry.last_sent(notification.id).is_none());
}

#[tokio::test]
async fn bad_credentials_fail_the_dispatch_before_connecting() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let mut service = common::apn_service();
    service.private_key_pem = common::ENCRYPTED_KEY_PEM.to_string();
    let notification = common::notification(service.id, "hello");
    registry.insert_device(common::device(service.id, "aa01", None));

    let transport = Arc::new(MockTransport::new(vec![]));
    let err = dispatcher(&registry, &transport)
        .push_notification(&notification, &service, "admin@example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Gateway(apns_courier::gateway::GatewayError::InvalidCredential(_))));
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn concurrent_dispatches_to_one_service_take_turns() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    registry.insert_device(common::device(service.id, "aa01", None));

    let captured = Arc::new(Mutex::new(Vec::new()));
    let transport = Arc::new(MockTransport::new(vec![
        Ok(ScriptedStream::sink(&captured)),
        Ok(ScriptedStream::sink(&captured)),
    ]));

    let dispatcher = Arc::new(dispatcher(&registry, &transport));
    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        let notification = common::notification(service.id, "one");
        let service = service.clone();
        tokio::spawn(async move { dispatcher.push_notification(&notification, &service, "a").await })
    };
    let second = {
        let dispatcher = Arc::clone(&dispatcher);
        let notification = common::notification(service.id, "two");
        let service = service.clone();
        tokio::spawn(async move { dispatcher.push_notification(&notification, &service, "b").await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.succeeded, 1);
    assert_eq!(second.succeeded, 1);
    assert_eq!(transport.exclusivity_violations(), 0);
}
