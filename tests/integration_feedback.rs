mod common;

use apns_courier::error::AppError;
use apns_courier::gateway::GatewayError;
use apns_courier::services::feedback::FeedbackProcessor;
use common::{InMemoryRegistry, MockTransport, ScriptedStream};
use std::sync::Arc;

fn processor(registry: &Arc<InMemoryRegistry>, transport: &Arc<MockTransport>) -> FeedbackProcessor {
    let registry = Arc::clone(registry);
    let transport = Arc::clone(transport);
    FeedbackProcessor::new(registry, transport)
}

#[tokio::test]
async fn stale_reports_are_ignored_and_fresh_ones_deactivate() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let feedback_service = common::feedback_service(&service);

    // "abc" was last notified before the gateway recorded the failure;
    // "xyz" re-registered afterwards and must keep its registration.
    registry.insert_device(common::device(service.id, &hex::encode(b"abc"), Some(common::ts(50))));
    registry.insert_device(common::device(service.id, &hex::encode(b"xyz"), Some(common::ts(250))));

    let mut batch = common::feedback_record(100, b"abc");
    batch.extend_from_slice(&common::feedback_record(200, b"xyz"));
    let transport = Arc::new(MockTransport::new(vec![Ok(ScriptedStream::with_reads(vec![batch]))]));

    let deactivated = processor(&registry, &transport).run(&feedback_service, &service).await.unwrap();
    assert_eq!(deactivated, 1);

    let abc = registry.device_by_token(&hex::encode(b"abc")).unwrap();
    assert!(!abc.is_active);
    assert_eq!(abc.deactivated_at, Some(common::ts(100)));

    let xyz = registry.device_by_token(&hex::encode(b"xyz")).unwrap();
    assert!(xyz.is_active);
    assert_eq!(xyz.deactivated_at, None);
}

#[tokio::test]
async fn never_notified_device_is_deactivated() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let feedback_service = common::feedback_service(&service);
    registry.insert_device(common::device(service.id, &hex::encode(b"abc"), None));

    let batch = common::feedback_record(100, b"abc");
    let transport = Arc::new(MockTransport::new(vec![Ok(ScriptedStream::with_reads(vec![batch]))]));

    let deactivated = processor(&registry, &transport).run(&feedback_service, &service).await.unwrap();
    assert_eq!(deactivated, 1);
    assert!(!registry.device_by_token(&hex::encode(b"abc")).unwrap().is_active);
}

#[tokio::test]
async fn unknown_tokens_are_skipped() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let feedback_service = common::feedback_service(&service);
    registry.insert_device(common::device(service.id, &hex::encode(b"abc"), None));

    let batch = common::feedback_record(100, b"stranger");
    let transport = Arc::new(MockTransport::new(vec![Ok(ScriptedStream::with_reads(vec![batch]))]));

    let deactivated = processor(&registry, &transport).run(&feedback_service, &service).await.unwrap();
    assert_eq!(deactivated, 0);
    assert!(registry.device_by_token(&hex::encode(b"abc")).unwrap().is_active);
}

#[tokio::test]
async fn tuples_split_across_reads_are_reassembled() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let feedback_service = common::feedback_service(&service);
    registry.insert_device(common::device(service.id, &hex::encode(b"abc"), None));
    registry.insert_device(common::device(service.id, &hex::encode(b"defg"), None));

    let mut batch = common::feedback_record(100, b"abc");
    batch.extend_from_slice(&common::feedback_record(200, b"defg"));

    // Deliver the batch in awkward slices, splitting mid-header and mid-token.
    let chunks = vec![batch[..3].to_vec(), batch[3..7].to_vec(), batch[7..12].to_vec(), batch[12..].to_vec()];
    let transport = Arc::new(MockTransport::new(vec![Ok(ScriptedStream::with_reads(chunks))]));

    let deactivated = processor(&registry, &transport).run(&feedback_service, &service).await.unwrap();
    assert_eq!(deactivated, 2);
}

#[tokio::test]
async fn invalid_credentials_fail_before_any_deactivation() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let mut service = common::apn_service();
    service.private_key_pem = common::ENCRYPTED_KEY_PEM.to_string();
    let feedback_service = common::feedback_service(&service);
    registry.insert_device(common::device(service.id, &hex::encode(b"abc"), None));

    let transport = Arc::new(MockTransport::new(vec![]));
    let err = processor(&registry, &transport).run(&feedback_service, &service).await.unwrap_err();

    assert!(matches!(err, AppError::Gateway(GatewayError::InvalidCredential(_))));
    assert_eq!(transport.open_count(), 0);
    assert!(registry.device_by_token(&hex::encode(b"abc")).unwrap().is_active);
}

#[tokio::test]
async fn empty_feedback_batch_deactivates_nothing() {
    common::setup_tracing();
    let registry = Arc::new(InMemoryRegistry::default());
    let service = common::apn_service();
    let feedback_service = common::feedback_service(&service);
    registry.insert_device(common::device(service.id, &hex::encode(b"abc"), None));

    let transport = Arc::new(MockTransport::new(vec![Ok(ScriptedStream::with_reads(vec![]))]));

    let deactivated = processor(&registry, &transport).run(&feedback_service, &service).await.unwrap();
    assert_eq!(deactivated, 0);
}
