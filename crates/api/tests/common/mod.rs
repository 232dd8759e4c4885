#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use rinkmark_api::auth::jwt::{generate_access_token, JwtConfig};
use rinkmark_api::config::ServerConfig;
use rinkmark_api::router::build_app_router;
use rinkmark_api::state::AppState;
use rinkmark_core::assignment::InMemoryAssignments;
use rinkmark_core::ffmpeg::{FfmpegError, ProbeInfo, VideoProbe};
use rinkmark_core::roles::{ROLE_ADMIN, ROLE_ANNOTATOR};
use rinkmark_core::types::UserId;

/// Frame count every fake probe reports.
pub const FRAME_COUNT: u64 = 900;

pub const MEN_05: &str = "Olympic_Men_SP#05_TEST_Skater.mp4";
pub const WOMEN_02: &str = "Olympic_Women_SP#02_TEST_Skater.mp4";

/// Probe that never shells out. Reports a missing file like ffprobe would.
#[derive(Default)]
pub struct FakeProbe {
    pub calls: AtomicUsize,
}

#[async_trait]
impl VideoProbe for FakeProbe {
    async fn probe(&self, path: &Path) -> Result<ProbeInfo, FfmpegError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !path.exists() {
            return Err(FfmpegError::VideoNotFound(
                path.to_string_lossy().to_string(),
            ));
        }
        Ok(ProbeInfo {
            frame_count: FRAME_COUNT,
            fps: 30.0,
            width: 1920,
            height: 1080,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub probe: Arc<FakeProbe>,
    pub videos: TempDir,
    pub data: TempDir,
}

pub fn test_config(videos: &Path, data: &Path, rate_limit_per_minute: u32) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        videos_dir: videos.to_path_buf(),
        data_dir: data.to_path_buf(),
        probe_timeout_secs: 5,
        rate_limit_per_minute,
        database_url: None,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router over temp directories, a fake probe,
/// and in-memory assignments.
pub async fn build_test_app() -> TestApp {
    build_test_app_with_limit(0).await
}

pub async fn build_test_app_with_limit(rate_limit_per_minute: u32) -> TestApp {
    let videos = tempfile::tempdir().expect("videos dir");
    let data = tempfile::tempdir().expect("data dir");
    let config = test_config(videos.path(), data.path(), rate_limit_per_minute);

    let probe = Arc::new(FakeProbe::default());
    let state = AppState::build(
        config.clone(),
        probe.clone(),
        Arc::new(InMemoryAssignments::new()),
    )
    .await;
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        probe,
        videos,
        data,
    }
}

impl TestApp {
    /// Write a video asset whose byte `i` is `i % 251`.
    pub fn add_video(&self, name: &str, size: usize) {
        let bytes: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        std::fs::write(self.videos.path().join(name), bytes).expect("write video");
    }

    pub fn token(&self, user: UserId, role: &str) -> String {
        generate_access_token(user, role, &self.state.config.jwt).expect("token")
    }

    pub fn admin_token(&self) -> String {
        self.token(1, ROLE_ADMIN)
    }

    pub fn annotator_token(&self, user: UserId) -> String {
        self.token(user, ROLE_ANNOTATOR)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send(request(Method::PUT, uri, token, Some(body))).await
    }

    pub async fn patch_json(
        &self,
        uri: &str,
        token: &str,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }
}

pub fn request(
    method: Method,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Percent-encode a video id for use as a path segment.
pub fn encode_id(video: &str) -> String {
    video.replace('%', "%25").replace('#', "%23")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}
