//! End-to-end call behavior over the loopback harness.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use uarpc::{CallError, CallOptions, DiagnosticsMask, OperationId, StatusCode};
use uarpc_testkit::fixtures::{self, ops};
use uarpc_testkit::{Loopback, init_tracing};

#[tokio::test]
async fn echo_call_returns_payload() {
    init_tracing();
    let loopback = Loopback::spawn(fixtures::service_router());

    let payload = loopback
        .proxy
        .call(ops::ECHO, Bytes::from_static(b"x"))
        .await
        .unwrap();
    assert_eq!(payload, Bytes::from_static(b"x"));

    loopback.shutdown().await.unwrap();
}

#[tokio::test]
async fn each_operation_routes_to_its_own_handler() {
    init_tracing();
    let loopback = Loopback::spawn(fixtures::service_router());

    let echoed = loopback
        .proxy
        .call(ops::ECHO, Bytes::from_static(b"abc"))
        .await
        .unwrap();
    let reversed = loopback
        .proxy
        .call(ops::REVERSE, Bytes::from_static(b"abc"))
        .await
        .unwrap();

    assert_eq!(echoed, Bytes::from_static(b"abc"));
    assert_eq!(reversed, Bytes::from_static(b"cba"));

    loopback.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_operation_faults_with_service_unsupported() {
    init_tracing();
    let loopback = Loopback::spawn(fixtures::service_router());

    let err = loopback
        .proxy
        .call(OperationId::new(9999), Bytes::new())
        .await
        .unwrap_err();
    let fault = err.fault().expect("expected a fault");
    assert_eq!(fault.status, StatusCode::BadServiceUnsupported);

    loopback.shutdown().await.unwrap();
}

#[tokio::test]
async fn handler_fault_surfaces_to_the_caller() {
    init_tracing();
    let loopback = Loopback::spawn(fixtures::service_router());

    let err = loopback
        .proxy
        .call(ops::BOOM, Bytes::new())
        .await
        .unwrap_err();
    match err {
        CallError::Fault(fault) => {
            assert_eq!(fault.status, StatusCode::BadInternalError);
            assert_eq!(fault.message, "kaboom");
        }
        CallError::AlreadyRetrieved => panic!("expected a fault"),
    }

    loopback.shutdown().await.unwrap();
}

#[tokio::test]
async fn sync_and_async_forms_agree() {
    init_tracing();
    let loopback = Loopback::spawn(fixtures::service_router());

    // Success path.
    let via_call = loopback
        .proxy
        .call(ops::ECHO, Bytes::from_static(b"same"))
        .await;
    let mut pending = loopback
        .proxy
        .begin_call(ops::ECHO, Bytes::from_static(b"same"))
        .await
        .unwrap();
    let via_begin_end = pending.wait().await;
    assert_eq!(via_call, via_begin_end);

    // Fault path.
    let via_call = loopback.proxy.call(ops::BOOM, Bytes::new()).await;
    let mut pending = loopback
        .proxy
        .begin_call(ops::BOOM, Bytes::new())
        .await
        .unwrap();
    let via_begin_end = pending.wait().await;
    assert_eq!(via_call, via_begin_end);

    loopback.shutdown().await.unwrap();
}

#[tokio::test]
async fn completion_callback_fires_exactly_once_with_the_response() {
    init_tracing();
    let loopback = Loopback::spawn(fixtures::service_router());

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_in_callback = Arc::clone(&fired);

    let mut pending = loopback
        .proxy
        .begin_call_with(
            ops::ECHO,
            Bytes::from_static(b"cb"),
            CallOptions::default(),
            move |response| {
                assert!(response.is_good());
                fired_in_callback.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await
        .unwrap();

    let payload = pending.wait().await.unwrap();
    assert_eq!(payload, Bytes::from_static(b"cb"));
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    loopback.shutdown().await.unwrap();
}

#[tokio::test]
async fn fault_diagnostic_is_gated_by_the_request_mask() {
    init_tracing();
    let loopback = Loopback::spawn(fixtures::service_router());

    // Default options: no diagnostics requested, attachment stripped.
    let err = loopback
        .proxy
        .call(ops::BOOM, Bytes::new())
        .await
        .unwrap_err();
    let fault = err.fault().unwrap();
    assert_eq!(fault.diagnostic, None);

    // Ask for the attachment and it comes back.
    let options = CallOptions {
        diagnostics: DiagnosticsMask::SERVICE_ADDITIONAL_INFO,
        ..CallOptions::default()
    };
    let mut pending = loopback
        .proxy
        .begin_call_with(ops::BOOM, Bytes::new(), options, |_| {})
        .await
        .unwrap();
    let err = pending.wait().await.unwrap_err();
    let fault = err.fault().unwrap();
    assert_eq!(fault.diagnostic.as_deref(), Some("boom handler fired"));

    loopback.shutdown().await.unwrap();
}

#[tokio::test]
async fn duplicate_and_post_seal_registration_fail() {
    init_tracing();

    use uarpc::{
        OperationDescriptor, RegisterError, RequestEnvelope, RequestHeader, handler_fn,
    };

    let mut router = fixtures::service_router();
    let result = router.register(fixtures::echo());
    assert_eq!(result, Err(RegisterError::DuplicateOperation(ops::ECHO)));

    // First dispatch seals the table.
    let request = RequestEnvelope::new(ops::ECHO, RequestHeader::new(1), Bytes::new());
    router.dispatch(request).await;

    let late = OperationDescriptor::new(
        OperationId::new(2000),
        "Late",
        handler_fn(|_| async { Ok(Bytes::new()) }),
    );
    assert_eq!(router.register(late), Err(RegisterError::Sealed));
}
