//! Tests for routes module
//!
//! These drive the full router with `oneshot`, standing in for the peer
//! address with `MockConnectInfo`.

use super::*;
use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
};
use hook_relay_core::{
    allowlist::parse_networks, sign_payload, AllowlistProvider, GatewaySettings, StaticAllowlist,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use crate::GatewayContext;

const SECRET: &str = "route-secret";
const PEER: ([u8; 4], u16) = ([192, 30, 252, 10], 40000);

fn settings(hooks_path: &Path) -> GatewaySettings {
    GatewaySettings {
        hooks_path: hooks_path.to_path_buf(),
        github_ips_only: false,
        ..GatewaySettings::default()
    }
}

fn app_with(
    settings: GatewaySettings,
    allowlist: Arc<dyn AllowlistProvider>,
    trust_forwarded_for: bool,
) -> Router {
    let state = AppState::new(GatewayContext::new(settings, allowlist, trust_forwarded_for));
    create_router(state, Duration::from_secs(30)).layer(MockConnectInfo(SocketAddr::from(PEER)))
}

fn app(settings: GatewaySettings) -> Router {
    app_with(settings, Arc::new(StaticAllowlist::default()), false)
}

fn webhook(event: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method("POST").uri("/");
    match event {
        Some(event) => builder.header("X-GitHub-Event", event),
        None => builder,
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn push_body(deleted: bool) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "ref": "refs/heads/main",
        "deleted": deleted,
        "repository": { "name": "myrepo" }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_ping_without_event_header_or_body() {
    let temp_dir = TempDir::new().unwrap();
    let request = webhook(None).body(Body::empty()).unwrap();

    let (status, body) = send(app(settings(temp_dir.path())), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "msg": "pong" }));
}

#[tokio::test]
async fn test_get_on_webhook_route_is_not_implemented() {
    let temp_dir = TempDir::new().unwrap();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, body) = send(app(settings(temp_dir.path())), request).await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"]["code"], "MethodNotImplemented");
}

#[tokio::test]
async fn test_put_on_webhook_route_is_not_implemented() {
    let temp_dir = TempDir::new().unwrap();
    let request = Request::builder()
        .method("PUT")
        .uri("/")
        .body(Body::from("{}"))
        .unwrap();

    let (status, _) = send(app(settings(temp_dir.path())), request).await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_health_check() {
    let temp_dir = TempDir::new().unwrap();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app(settings(temp_dir.path())), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") })
    );
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let request = webhook(Some("push"))
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app(settings(temp_dir.path())), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "InvalidPayload");
}

#[tokio::test]
async fn test_address_outside_allowlist_is_forbidden() {
    let temp_dir = TempDir::new().unwrap();
    let app = app_with(
        GatewaySettings {
            github_ips_only: true,
            ..settings(temp_dir.path())
        },
        Arc::new(StaticAllowlist::new(parse_networks(&["140.82.112.0/20"]))),
        false,
    );
    let request = webhook(Some("push"))
        .body(Body::from(push_body(false)))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "AuthenticationError");
}

#[tokio::test]
async fn test_allowlisted_address_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let app = app_with(
        GatewaySettings {
            github_ips_only: true,
            ..settings(temp_dir.path())
        },
        Arc::new(StaticAllowlist::new(parse_networks(&["192.30.252.0/22"]))),
        false,
    );
    let request = webhook(Some("ping")).body(Body::from("{}")).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "msg": "pong" }));
}

#[tokio::test]
async fn test_trusted_forwarded_for_selects_source_address() {
    let temp_dir = TempDir::new().unwrap();
    let gateway_settings = || GatewaySettings {
        github_ips_only: true,
        ..settings(temp_dir.path())
    };
    let allowlist = || -> Arc<dyn AllowlistProvider> {
        Arc::new(StaticAllowlist::new(parse_networks(&["203.0.113.0/24"])))
    };
    let request = || {
        webhook(Some("ping"))
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .body(Body::from("{}"))
            .unwrap()
    };

    let (trusted, _) = send(app_with(gateway_settings(), allowlist(), true), request()).await;
    let (untrusted, _) = send(app_with(gateway_settings(), allowlist(), false), request()).await;

    assert_eq!(trusted, StatusCode::OK);
    assert_eq!(untrusted, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_signature_is_forbidden() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(GatewaySettings {
        enforce_secret: Some(SecretString::from(SECRET.to_string())),
        ..settings(temp_dir.path())
    });
    let request = webhook(Some("push"))
        .body(Body::from(push_body(false)))
        .unwrap();

    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tampered_body_is_forbidden() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(GatewaySettings {
        enforce_secret: Some(SecretString::from(SECRET.to_string())),
        ..settings(temp_dir.path())
    });
    let signature = sign_payload(SECRET.as_bytes(), &push_body(false));
    let request = webhook(Some("push"))
        .header("X-Hub-Signature", signature)
        .body(Body::from(push_body(true)))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body.to_string().contains(SECRET));
}

#[tokio::test]
async fn test_unsupported_signature_algorithm_is_not_implemented() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(GatewaySettings {
        enforce_secret: Some(SecretString::from(SECRET.to_string())),
        ..settings(temp_dir.path())
    });
    let request = webhook(Some("push"))
        .header("X-Hub-Signature", "sha256=abcdef")
        .body(Body::from(push_body(false)))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"]["code"], "UnsupportedSignatureAlgorithm");
}

#[tokio::test]
async fn test_signed_push_without_hooks_is_nop() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(GatewaySettings {
        enforce_secret: Some(SecretString::from(SECRET.to_string())),
        ..settings(temp_dir.path())
    });
    let body = push_body(false);
    let request = webhook(Some("push"))
        .header("X-Hub-Signature", sign_payload(SECRET.as_bytes(), &body))
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "nop" }));
}

#[cfg(unix)]
mod unix_tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn write_hook(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write hook");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to set hook permissions");
    }

    #[tokio::test]
    #[serial]
    async fn test_deleted_push_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join("ran");
        write_hook(temp_dir.path(), "push", &format!("touch '{}'", marker.display()));
        let request = webhook(Some("push"))
            .body(Body::from(push_body(true)))
            .unwrap();

        let (status, body) = send(app(settings(temp_dir.path())), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "skipped" }));
        assert!(!marker.exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_hooks_run_and_report_done() {
        let temp_dir = TempDir::new().unwrap();
        write_hook(temp_dir.path(), "push-myrepo-main", "echo deploy");
        let request = webhook(Some("push"))
            .body(Body::from(push_body(false)))
            .unwrap();

        let (status, body) = send(app(settings(temp_dir.path())), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "done" }));
    }

    #[tokio::test]
    #[serial]
    async fn test_hook_results_are_returned_when_enabled() {
        let temp_dir = TempDir::new().unwrap();
        write_hook(temp_dir.path(), "push", "echo failing >&2; exit 2");
        write_hook(temp_dir.path(), "all", "echo \"$2\"");
        let app = app(GatewaySettings {
            return_scripts_info: true,
            ..settings(temp_dir.path())
        });
        let request = webhook(Some("push"))
            .body(Body::from(push_body(false)))
            .unwrap();

        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "push": { "returncode": 2, "stdout": "", "stderr": "failing\n" },
                "all": { "returncode": 0, "stdout": "push\n", "stderr": "" }
            })
        );
    }
}
