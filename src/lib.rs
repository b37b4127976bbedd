//! Serve a local folder over HTTP.
//!
//! Directories are answered with a generated listing page, files are
//! streamed, and any directory can be downloaded as a ZIP archive built in
//! memory by appending `?zip=1` to its URL.

pub mod archive;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lan;
pub mod listing;
pub mod paths;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::FileServerError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Root directory to serve files from
    pub root_dir: PathBuf,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState with the given root directory and default config.
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir,
            config: Arc::new(Config::default()),
        }
    }

    /// Create a new AppState with the given root directory and config.
    pub fn with_config(root_dir: PathBuf, config: Config) -> Self {
        Self {
            root_dir,
            config: Arc::new(config),
        }
    }
}

/// Build the complete application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::serve_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
