//! Policy tests: reseller prefixes, ignored projects, request extensions
//! and metadata header capture.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use meter_test_utils::{
    drain_body, recording_meter, storage_request, storage_request_with_headers, FakeApp,
};
use serde_json::Value;
use std::time::Duration;
use storage_meter::{BackendPath, EventEnvelope, InternalSource};
use tower::{Layer, ServiceExt};

const WAIT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(200);

fn payload(envelope: &EventEnvelope) -> Value {
    serde_json::to_value(&envelope.payload).unwrap()
}

#[tokio::test]
async fn test_default_reseller_prefix_stripped_from_account() -> Result<()> {
    let (meter, notifier) = recording_meter(&[]).await?;
    let svc = meter.layer().layer(FakeApp::new());

    let response = svc
        .oneshot(storage_request("GET", "/1.0/AUTH_account/container/obj")?)
        .await
        .unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    assert_eq!(payload(&events[0])["target"]["id"], "account");
    Ok(())
}

#[tokio::test]
async fn test_custom_reseller_prefix() -> Result<()> {
    let (meter, notifier) = recording_meter(&[("METER_RESELLER_PREFIX", "CUSTOM_")]).await?;
    let svc = meter.layer().layer(FakeApp::new());

    let response = svc
        .oneshot(storage_request("GET", "/1.0/CUSTOM_account/container/obj")?)
        .await
        .unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    assert_eq!(payload(&events[0])["target"]["id"], "account");
    Ok(())
}

#[tokio::test]
async fn test_reseller_prefix_underscore_is_appended() -> Result<()> {
    let (meter, notifier) = recording_meter(&[("METER_RESELLER_PREFIX", "CUSTOM")]).await?;
    let svc = meter.layer().layer(FakeApp::new());

    let response = svc
        .oneshot(storage_request("GET", "/1.0/CUSTOM_account/container/obj")?)
        .await
        .unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    assert_eq!(payload(&events[0])["target"]["id"], "account");
    Ok(())
}

#[tokio::test]
async fn test_unmatched_prefix_keeps_full_path_as_id() -> Result<()> {
    let (meter, notifier) = recording_meter(&[]).await?;
    let svc = meter.layer().layer(FakeApp::new());

    let response = svc
        .oneshot(storage_request("GET", "/1.0/admin/bucket/obj")?)
        .await
        .unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    assert_eq!(payload(&events[0])["target"]["id"], "1.0/admin/bucket/obj");
    Ok(())
}

#[tokio::test]
async fn test_account_equal_to_prefix_keeps_full_path_as_id() -> Result<()> {
    let (meter, notifier) = recording_meter(&[]).await?;
    let svc = meter.layer().layer(FakeApp::new());

    let response = svc
        .oneshot(storage_request("GET", "/1.0/AUTH_/container")?)
        .await
        .unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    assert_eq!(payload(&events[0])["target"]["id"], "1.0/AUTH_/container");
    Ok(())
}

#[tokio::test]
async fn test_ignored_project_skipped_for_every_header() -> Result<()> {
    let (meter, notifier) =
        recording_meter(&[("METER_IGNORE_PROJECTS", "skip_proj")]).await?;

    for header in ["x-service-project-id", "x-project-id", "x-tenant-id"] {
        let svc = meter.layer().layer(FakeApp::new());
        let response = svc
            .oneshot(storage_request_with_headers(
                "GET",
                "/1.0/account/container/obj",
                &[(header, "skip_proj")],
            )?)
            .await
            .unwrap();
        drain_body(response.into_body()).await;
    }
    assert!(notifier.settled_empty(SETTLE).await);

    let svc = meter.layer().layer(FakeApp::new());
    let response = svc
        .oneshot(storage_request_with_headers(
            "GET",
            "/1.0/account/container/obj",
            &[("x-project-id", "good_proj")],
        )?)
        .await
        .unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    assert_eq!(payload(&events[0])["initiator"]["project_id"], "good_proj");
    Ok(())
}

#[tokio::test]
async fn test_multiple_ignored_projects() -> Result<()> {
    let (meter, notifier) =
        recording_meter(&[("METER_IGNORE_PROJECTS", "proj_a, proj_b")]).await?;

    for project in ["proj_a", "proj_b"] {
        let svc = meter.layer().layer(FakeApp::new());
        let response = svc
            .oneshot(storage_request_with_headers(
                "GET",
                "/1.0/account/container/obj",
                &[("x-project-id", project)],
            )?)
            .await
            .unwrap();
        drain_body(response.into_body()).await;
    }

    assert!(notifier.settled_empty(SETTLE).await);
    Ok(())
}

#[tokio::test]
async fn test_internal_traffic_not_metered() -> Result<()> {
    let (meter, notifier) = recording_meter(&[]).await?;
    let svc = meter.layer().layer(FakeApp::new());

    let mut request = storage_request("PUT", "/1.0/account/container/obj")?;
    request.extensions_mut().insert(InternalSource::new("replicator"));

    let response = svc.oneshot(request).await.unwrap();
    drain_body(response.into_body()).await;

    assert!(notifier.settled_empty(SETTLE).await);
    Ok(())
}

#[tokio::test]
async fn test_backend_path_overrides_request_uri() -> Result<()> {
    let (meter, notifier) = recording_meter(&[]).await?;
    let svc = meter.layer().layer(FakeApp::new());

    // An S3 front-end serves /bucket/key but routes to a storage path.
    let mut request = storage_request("GET", "/bucket/obj")?;
    request
        .extensions_mut()
        .insert(BackendPath::new("/1.0/AUTH_account/bucket/obj"));

    let response = svc.oneshot(request).await.unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    let json = payload(&events[0]);
    assert_eq!(json["target"]["id"], "account");
    assert_eq!(json["target"]["metadata"]["container"], "bucket");
    assert_eq!(json["target"]["metadata"]["object"], "obj");
    Ok(())
}

#[tokio::test]
async fn test_metadata_headers_copied_into_event() -> Result<()> {
    let (meter, notifier) = recording_meter(&[(
        "METER_METADATA_HEADERS",
        "X_VAR1, x-var2, x-var3, token",
    )])
    .await?;
    let svc = meter.layer().layer(FakeApp::new());

    let mut request = storage_request_with_headers(
        "GET",
        "/1.0/account/container/obj",
        &[("x-var1", "value1"), ("token", "token"), ("x-unrelated", "nope")],
    )?;
    request.headers_mut().insert(
        "x-var2",
        http::HeaderValue::from_bytes("\u{ff65}\u{ff9e}".as_bytes())?,
    );

    let response = svc.oneshot(request).await.unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    let metadata = &payload(&events[0])["target"]["metadata"];
    assert_eq!(metadata["http_header_x_var1"], "value1");
    assert_eq!(metadata["http_header_x_var2"], "\u{ff65}\u{ff9e}");
    assert_eq!(metadata["http_header_token"], "token");
    assert!(metadata.get("http_header_x_var3").is_none());
    assert!(metadata.get("http_header_x_unrelated").is_none());
    Ok(())
}

#[tokio::test]
async fn test_metadata_headers_absent_when_not_configured() -> Result<()> {
    let (meter, notifier) = recording_meter(&[]).await?;
    let svc = meter.layer().layer(FakeApp::new());

    let response = svc
        .oneshot(storage_request_with_headers(
            "GET",
            "/1.0/account/container/obj",
            &[("x-var1", "value1")],
        )?)
        .await
        .unwrap();
    drain_body(response.into_body()).await;

    let events = notifier.wait_for(1, WAIT).await?;
    let metadata = payload(&events[0])["target"]["metadata"].clone();
    let header_keys: Vec<String> = metadata
        .as_object()
        .unwrap()
        .keys()
        .filter(|k| k.starts_with("http_header_"))
        .cloned()
        .collect();
    assert!(header_keys.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_bounded_queue_delivers_in_background() -> Result<()> {
    let (meter, notifier) = recording_meter(&[
        ("METER_NONBLOCKING_NOTIFY", "true"),
        ("METER_SEND_QUEUE_SIZE", "2"),
    ])
    .await?;

    for _ in 0..2 {
        let svc = meter.layer().layer(FakeApp::new());
        let response = svc
            .oneshot(storage_request("GET", "/1.0/account/container/obj")?)
            .await
            .unwrap();
        drain_body(response.into_body()).await;
    }

    let events = notifier.wait_for(2, WAIT).await?;
    assert_eq!(events.len(), 2);
    Ok(())
}
