//! Test utilities and common setup.

#![allow(dead_code)]

use std::io::{Cursor, Read};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response},
};
use serveme::{AppState, Config, app};
use tempfile::TempDir;
use tower::ServiceExt;
use zip::ZipArchive;

/// Create a served root containing `a.txt`, `sub/b.txt` and `empty/`.
pub fn fixture_root() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::write(root.join("a.txt"), "hello").unwrap();
    std::fs::create_dir(root.join("sub")).unwrap();
    std::fs::write(root.join("sub/b.txt"), "world").unwrap();
    std::fs::create_dir(root.join("empty")).unwrap();
    temp_dir
}

/// Create a test application serving `root` with the default config.
pub fn test_app(root: &TempDir) -> Router {
    app(AppState::new(root.path().to_path_buf()))
}

/// Create a test application serving `root` with `config`.
pub fn test_app_with_config(root: &TempDir, config: Config) -> Router {
    app(AppState::with_config(root.path().to_path_buf(), config))
}

/// Send a single request through the router.
pub async fn send(app: Router, method: Method, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .method(method)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Extract every entry of a ZIP as (name, content), in archive order.
pub fn unzip(data: Vec<u8>) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut files = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        files.push((file.name().to_string(), content));
    }
    files
}
