//! Shared helpers for driving the photovault router in-process.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use bytes::Bytes;
use http_body_util::BodyExt;
use photovault::auth::AuthService;
use photovault::config::{AuthConfig, Secret};
use photovault::http::{ACCESS_COOKIE, AppState, REFRESH_COOKIE, router};
use photovault::library::PhotoLibrary;
use photovault::photo::Photo;
use photovault::services::blob::BlobStore;
use photovault::services::metadata::MetadataStore;
use photovault::services::tokens::TokenStore;
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery staple";
const SIGNING_SECRET: &str = "integration-test-signing-secret-0123456789";

/// 1x1 PNG header bytes; enough for signature sniffing.
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Router over memory-backed stores.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// A response with its body collected.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    /// Value of the `Set-Cookie` header named `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| {
                let (pair, _) = value.split_once(';')?;
                let (key, value) = pair.split_once('=')?;
                (key == name).then(|| value.to_string())
            })
    }

    pub fn set_cookie_header(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with(&format!("{name}=")))
            .map(ToString::to_string)
    }
}

/// Tokens from a successful login.
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_blobs(BlobStore::memory())
    }

    pub fn with_blobs(blobs: BlobStore) -> Self {
        let config = AuthConfig {
            password: Secret::new(PASSWORD),
            token_secret: Secret::new(SIGNING_SECRET),
            ..AuthConfig::default()
        };
        let auth = AuthService::new(&config, TokenStore::memory());
        let library = PhotoLibrary::new(blobs, MetadataStore::memory());
        let state = AppState::new(library, auth, false);

        Self {
            router: router(state.clone()),
            state,
        }
    }

    /// Writes a blob and registers it directly.
    pub async fn seed(&self, key: &str, bytes: &[u8]) -> Photo {
        self.state
            .library
            .blobs()
            .put(key, Bytes::copy_from_slice(bytes), None)
            .await
            .expect("Failed to put blob");
        self.state
            .library
            .register(key)
            .await
            .expect("Failed to register photo")
            .photo()
            .clone()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, access_token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).expect("Invalid request"))
            .await
    }

    pub async fn json(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
        body: &Value,
    ) -> TestResponse {
        self.raw(method, path, access_token, body.to_string()).await
    }

    pub async fn raw(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
        body: impl Into<Body>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(body.into()).expect("Invalid request"))
            .await
    }

    pub async fn login(&self) -> Session {
        let resp = self
            .json(
                Method::POST,
                "/login",
                None,
                &serde_json::json!({ "password": PASSWORD }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {:?}", resp.body);

        Session {
            access_token: resp.cookie(ACCESS_COOKIE).expect("No access cookie"),
            refresh_token: resp.cookie(REFRESH_COOKIE).expect("No refresh cookie"),
        }
    }
}
