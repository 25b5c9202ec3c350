//! HTTP API integration tests.
//!
//! Drives the full router in-process with memory-backed stores:
//! - `/login`, `/refresh`, `/logout` - session lifecycle and cookies
//! - `/photos`, `/photos/{id}` - listing and single records
//! - `/photos/{id}/metadata` - optimistic concurrency
//! - `/photos/{id}/image` - blob bytes
//! - `/rescan`, `/health`

#[path = "common.rs"]
mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, Utc};
use common::{PASSWORD, PNG, TestApp};
use photovault::http::{ACCESS_COOKIE, REFRESH_COOKIE};
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Health and Fallback
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();

    let resp = app.get("/health", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({ "status": "ok", "provider": "memory" }));
}

#[tokio::test]
async fn test_unknown_route_returns_detail() {
    let app = TestApp::new();

    let resp = app.get("/nope", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json(), json!({ "detail": "Not Found" }));
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_sets_http_only_cookies() {
    let app = TestApp::new();

    let resp = app
        .json(Method::POST, "/login", None, &json!({ "password": PASSWORD }))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({ "detail": "Login successful" }));

    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        let cookie = resp
            .set_cookie_header(name)
            .unwrap_or_else(|| panic!("missing {name} cookie"));
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("SameSite=Lax"), "{cookie}");
        assert!(!cookie.contains("Secure"), "{cookie}");
    }
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();

    let resp = app
        .json(Method::POST, "/login", None, &json!({ "password": "guess" }))
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json(), json!({ "detail": "Invalid credentials" }));
    assert!(resp.cookie(ACCESS_COOKIE).is_none());
    assert_eq!(
        resp.headers.get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn test_login_malformed_body_is_422() {
    let app = TestApp::new();

    let resp = app.raw(Method::POST, "/login", None, "{not json").await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.json()["detail"].is_string());

    let resp = app
        .json(Method::POST, "/login", None, &json!({ "pass": PASSWORD }))
        .await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Access Tokens
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new();
    let photo = app.seed("a.png", PNG).await;

    for path in [
        "/photos".to_string(),
        format!("/photos/{}", photo.id),
        format!("/photos/{}/image", photo.id),
    ] {
        let resp = app.get(&path, None).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(resp.json(), json!({ "detail": "Not authenticated" }));
    }

    let resp = app.json(Method::POST, "/rescan", None, &json!({})).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_access_token_rejected() {
    let app = TestApp::new();

    let resp = app.get("/photos", Some("not.a.jwt")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.json(),
        json!({ "detail": "Invalid or expired access token" })
    );
}

#[tokio::test]
async fn test_access_token_accepted_from_cookie() {
    let app = TestApp::new();
    let session = app.login().await;

    let request = Request::builder()
        .uri("/photos")
        .header(
            header::COOKIE,
            format!("theme=dark; {ACCESS_COOKIE}={}", session.access_token),
        )
        .body(Body::empty())
        .unwrap();
    let resp = app.send(request).await;
    assert_eq!(resp.status, StatusCode::OK);
}

// =============================================================================
// Photo Listing and Records
// =============================================================================

#[tokio::test]
async fn test_list_photos_paginates_in_registration_order() {
    let app = TestApp::new();
    let session = app.login().await;
    let mut ids = Vec::new();
    for key in ["one.png", "two.png", "three.png"] {
        ids.push(app.seed(key, PNG).await.id);
    }

    let resp = app
        .get("/photos?limit=2&offset=1", Some(&session.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let page = resp.json();
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["offset"], 1);
    let listed: Vec<Uuid> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().parse().unwrap())
        .collect();
    assert_eq!(listed, ids[1..]);
}

#[tokio::test]
async fn test_list_photos_defaults_and_bad_query() {
    let app = TestApp::new();
    let session = app.login().await;

    let resp = app.get("/photos", Some(&session.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let page = resp.json();
    assert_eq!(page["total"], 0);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["items"], json!([]));

    let resp = app
        .get("/photos?limit=lots", Some(&session.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.json()["detail"].is_string());
}

#[tokio::test]
async fn test_get_photo_and_not_found() {
    let app = TestApp::new();
    let session = app.login().await;
    let photo = app.seed("beach.png", PNG).await;

    let resp = app
        .get(&format!("/photos/{}", photo.id), Some(&session.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["object_key"], "beach.png");
    assert_eq!(body["metadata"], json!({ "description": "" }));

    for path in [format!("/photos/{}", Uuid::new_v4()), "/photos/not-a-uuid".to_string()] {
        let resp = app.get(&path, Some(&session.access_token)).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(resp.json(), json!({ "detail": "Photo not found" }));
    }
}

// =============================================================================
// Metadata Updates
// =============================================================================

#[tokio::test]
async fn test_update_metadata_merges_and_advances_timestamp() {
    let app = TestApp::new();
    let session = app.login().await;
    let photo = app.seed("beach.png", PNG).await;
    let path = format!("/photos/{}/metadata", photo.id);

    let resp = app
        .json(
            Method::PATCH,
            &path,
            Some(&session.access_token),
            &json!({
                "metadata": { "description": "Sunset", "camera": "X100" },
                "last_modified": photo.last_modified.to_rfc3339(),
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = resp.json();
    assert_eq!(
        body["metadata"],
        json!({ "description": "Sunset", "camera": "X100" })
    );
    let updated: DateTime<Utc> = body["last_modified"].as_str().unwrap().parse().unwrap();
    assert!(updated > photo.last_modified);

    // Second patch with the returned timestamp keeps earlier keys
    let resp = app
        .json(
            Method::PATCH,
            &path,
            Some(&session.access_token),
            &json!({
                "metadata": { "description": "Dusk" },
                "last_modified": body["last_modified"],
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.json()["metadata"],
        json!({ "description": "Dusk", "camera": "X100" })
    );
}

#[tokio::test]
async fn test_update_metadata_conflicts() {
    let app = TestApp::new();
    let session = app.login().await;
    let photo = app.seed("beach.png", PNG).await;
    let path = format!("/photos/{}/metadata", photo.id);
    let stale = photo.last_modified.to_rfc3339();

    let resp = app
        .json(
            Method::PATCH,
            &path,
            Some(&session.access_token),
            &json!({ "metadata": { "description": "first" }, "last_modified": stale }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let conflict = json!({ "detail": "Photo has been modified since last retrieval" });

    let resp = app
        .json(
            Method::PATCH,
            &path,
            Some(&session.access_token),
            &json!({ "metadata": { "description": "second" }, "last_modified": stale }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.json(), conflict);

    let resp = app
        .json(
            Method::PATCH,
            &path,
            Some(&session.access_token),
            &json!({ "metadata": { "description": "third" } }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.json(), conflict);

    let resp = app
        .get(&format!("/photos/{}", photo.id), Some(&session.access_token))
        .await;
    assert_eq!(resp.json()["metadata"]["description"], "first");
}

#[tokio::test]
async fn test_update_metadata_validation() {
    let app = TestApp::new();
    let session = app.login().await;
    let photo = app.seed("beach.png", PNG).await;
    let path = format!("/photos/{}/metadata", photo.id);
    let last_modified = photo.last_modified.to_rfc3339();

    for body in [
        json!({ "metadata": ["not", "an", "object"], "last_modified": last_modified }),
        json!({ "metadata": { "description": 42 }, "last_modified": last_modified }),
        json!({ "metadata": {}, "last_modified": "yesterday" }),
        json!({ "last_modified": last_modified }),
    ] {
        let resp = app
            .json(Method::PATCH, &path, Some(&session.access_token), &body)
            .await;
        assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert!(resp.json()["detail"].is_string());
    }
}

#[tokio::test]
async fn test_update_metadata_unknown_photo() {
    let app = TestApp::new();
    let session = app.login().await;

    let resp = app
        .json(
            Method::PATCH,
            &format!("/photos/{}/metadata", Uuid::new_v4()),
            Some(&session.access_token),
            &json!({ "metadata": {}, "last_modified": Utc::now().to_rfc3339() }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json(), json!({ "detail": "Photo not found" }));
}

// =============================================================================
// Image Bytes
// =============================================================================

#[tokio::test]
async fn test_get_image_returns_bytes() {
    let app = TestApp::new();
    let session = app.login().await;
    let photo = app.seed("beach.png", PNG).await;

    let resp = app
        .get(
            &format!("/photos/{}/image", photo.id),
            Some(&session.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(
        resp.headers.get(header::CACHE_CONTROL).unwrap(),
        "private, max-age=3600"
    );
    assert_eq!(
        resp.headers.get(header::CONTENT_LENGTH).unwrap(),
        PNG.len().to_string().as_str()
    );
    assert_eq!(&resp.body[..], PNG);
}

#[tokio::test]
async fn test_get_image_sniffs_extensionless_keys() {
    let app = TestApp::new();
    let session = app.login().await;
    let photo = app.seed("scans/0001", PNG).await;

    let resp = app
        .get(
            &format!("/photos/{}/image", photo.id),
            Some(&session.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(&resp.body[..], PNG);
}

#[tokio::test]
async fn test_get_image_missing_blob() {
    let app = TestApp::new();
    let session = app.login().await;
    let photo = app
        .state
        .library
        .register("ghost.jpg")
        .await
        .unwrap()
        .photo()
        .clone();

    let resp = app
        .get(
            &format!("/photos/{}/image", photo.id),
            Some(&session.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json(), json!({ "detail": "Image not found" }));
}

// =============================================================================
// Rescan
// =============================================================================

#[tokio::test]
async fn test_rescan_reports_imported_skipped_and_errors() {
    let app = TestApp::new();
    let session = app.login().await;
    let existing = app.seed("existing.png", PNG).await;

    let blobs = app.state.library.blobs();
    blobs
        .put("new.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0].into(), None)
        .await
        .unwrap();
    blobs
        .put("notes.txt", b"hello".to_vec().into(), None)
        .await
        .unwrap();

    let resp = app
        .raw(Method::POST, "/rescan", Some(&session.access_token), Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let report = resp.json();
    assert_eq!(report["imported"].as_array().unwrap().len(), 1);
    assert_eq!(report["skipped"], json!([existing.id.to_string()]));
    assert_eq!(report["errors"], json!(["notes.txt"]));

    let resp = app.get("/photos", Some(&session.access_token)).await;
    assert_eq!(resp.json()["total"], 2);
}

// =============================================================================
// Refresh and Logout
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = TestApp::new();
    let session = app.login().await;

    let resp = app
        .json(
            Method::POST,
            "/refresh",
            None,
            &json!({ "refresh_token": session.refresh_token }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = resp.json();
    let fields: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(fields.len(), 3, "{body}");
    assert_eq!(body["token_type"], "bearer");
    let access_token = body["access_token"].as_str().unwrap();
    let refresh_token = body["refresh_token"].as_str().unwrap();
    assert_ne!(refresh_token, session.refresh_token);
    assert_eq!(resp.cookie(REFRESH_COOKIE).as_deref(), Some(refresh_token));

    let resp = app.get("/photos", Some(access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);

    // The spent token is revoked by rotation
    let resp = app
        .json(
            Method::POST,
            "/refresh",
            None,
            &json!({ "refresh_token": session.refresh_token }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.json(),
        json!({ "detail": "Invalid or expired refresh token" })
    );
}

#[tokio::test]
async fn test_refresh_from_cookie() {
    let app = TestApp::new();
    let session = app.login().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/refresh")
        .header(
            header::COOKIE,
            format!("{REFRESH_COOKIE}={}", session.refresh_token),
        )
        .body(Body::empty())
        .unwrap();
    let resp = app.send(request).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["token_type"], "bearer");
}

#[tokio::test]
async fn test_refresh_without_token() {
    let app = TestApp::new();

    let resp = app.raw(Method::POST, "/refresh", None, Body::empty()).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.json(),
        json!({ "detail": "Invalid or expired refresh token" })
    );

    let resp = app
        .json(
            Method::POST,
            "/refresh",
            None,
            &json!({ "refresh_token": "never-issued" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = TestApp::new();
    let session = app.login().await;

    let resp = app
        .json(
            Method::POST,
            "/logout",
            None,
            &json!({ "refresh_token": session.refresh_token }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({ "detail": "Logged out" }));
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        let cookie = resp.set_cookie_header(name).unwrap();
        assert!(cookie.contains("Max-Age=0"), "{cookie}");
    }

    let resp = app
        .json(
            Method::POST,
            "/refresh",
            None,
            &json!({ "refresh_token": session.refresh_token }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    // Access tokens stay valid until they expire
    let resp = app.get("/photos", Some(&session.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = TestApp::new();
    let session = app.login().await;
    let body = json!({ "refresh_token": session.refresh_token });

    for _ in 0..2 {
        let resp = app.json(Method::POST, "/logout", None, &body).await;
        assert_eq!(resp.status, StatusCode::OK);
    }

    let resp = app.raw(Method::POST, "/logout", None, Body::empty()).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({ "detail": "Logged out" }));
}
