//! 调用桥集成测试：单次调用、形状校验、指标

mod common;

use std::sync::Arc;

use common::MockSurface;
use janus_core::{
    error::{ErrorKind, InvocationError},
    infrastructure::{ExpectedShape, InvocationArgs, SecureInvocationBridge, SurfaceError},
    metrics,
};
use serde_json::json;

fn bridge(surface: &Arc<MockSurface>) -> SecureInvocationBridge {
    SecureInvocationBridge::new(surface.clone())
}

#[tokio::test]
async fn test_success_returns_payload_unchanged() {
    let surface = MockSurface::new();
    let payload = json!({"balance": "1.5", "note": {"nested": [1, 2, 3]}});
    surface.respond("bridge_passthrough", payload.clone());

    let out = bridge(&surface)
        .invoke(
            "bridge_passthrough",
            InvocationArgs::new().with("address", "abc"),
            ExpectedShape::Object(&["balance"]),
        )
        .await
        .unwrap();

    assert_eq!(out, payload);
    assert_eq!(surface.call_count(), 1);
    assert_eq!(surface.calls()[0].args["address"], json!("abc"));
}

#[tokio::test]
async fn test_each_invoke_calls_surface_exactly_once() {
    let surface = MockSurface::new();
    surface.fail("bridge_flaky", SurfaceError::Failed("boom".into()));
    let b = bridge(&surface);

    for _ in 0..3 {
        let err = b
            .invoke("bridge_flaky", InvocationArgs::new(), ExpectedShape::Number)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SurfaceFailure);
    }
    assert_eq!(surface.calls_for("bridge_flaky").len(), 3);
}

#[tokio::test]
async fn test_shape_failures() {
    let surface = MockSurface::new();
    surface
        .respond("bridge_null", json!(null))
        .respond("bridge_nan", json!("NaN"))
        .respond("bridge_array_for_object", json!([{"balance": 1}]))
        .respond("bridge_missing", json!({"balance": "1"}));
    let b = bridge(&surface);

    let err = b
        .invoke("bridge_null", InvocationArgs::new(), ExpectedShape::Array)
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::EmptyResponse { ref command } if command == "bridge_null"));

    let err = b
        .invoke("bridge_nan", InvocationArgs::new(), ExpectedShape::Number)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InvocationError::ShapeMismatch { ref expected, ref actual, .. } if expected == "number" && actual == "string"
    ));

    let err = b
        .invoke(
            "bridge_array_for_object",
            InvocationArgs::new(),
            ExpectedShape::Object(&["balance"]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

    let err = b
        .invoke(
            "bridge_missing",
            InvocationArgs::new(),
            ExpectedShape::Object(&["balance", "unlocked_balance"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::MissingField { ref field, .. } if field == "unlocked_balance"));
}

#[tokio::test]
async fn test_timeout_is_reported_as_timeout() {
    let surface = MockSurface::new();
    surface.fail("bridge_slow", SurfaceError::Timeout);

    let err = bridge(&surface)
        .invoke("bridge_slow", InvocationArgs::new(), ExpectedShape::Number)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "timeout");
    assert_eq!(err.command(), "bridge_slow");
}

#[tokio::test]
async fn test_secret_args_are_marked_for_the_surface() {
    let surface = MockSurface::new();
    surface.respond("bridge_secret", json!(1));

    bridge(&surface)
        .invoke(
            "bridge_secret",
            InvocationArgs::new()
                .with("symbol", "XMR")
                .with_secret("viewKey", &"ef".repeat(32)),
            ExpectedShape::Number,
        )
        .await
        .unwrap();

    let call = surface.calls_for("bridge_secret").pop().unwrap();
    assert_eq!(call.secret_args, ["viewKey"]);
}

#[tokio::test]
async fn test_metrics_count_outcomes_per_command() {
    let surface = MockSurface::new();
    surface
        .respond("bridge_metrics_ok", json!(7))
        .respond("bridge_metrics_bad", json!("seven"));
    let b = bridge(&surface);

    b.invoke("bridge_metrics_ok", InvocationArgs::new(), ExpectedShape::Number)
        .await
        .unwrap();
    b.invoke("bridge_metrics_ok", InvocationArgs::new(), ExpectedShape::Number)
        .await
        .unwrap();
    b.invoke("bridge_metrics_bad", InvocationArgs::new(), ExpectedShape::Number)
        .await
        .unwrap_err();

    let snapshot = metrics::snapshot();
    assert_eq!(snapshot.command_count("bridge_metrics_ok"), 2);
    assert_eq!(snapshot.command_errors("bridge_metrics_ok"), 0);
    assert_eq!(snapshot.command_count("bridge_metrics_bad"), 1);
    assert_eq!(snapshot.command_errors("bridge_metrics_bad"), 1);

    let text = metrics::render_prometheus();
    assert!(text.contains("bridge_metrics_ok"));
}
