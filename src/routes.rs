use axum::{routing::get, Router};

use crate::handlers;
use crate::AppState;

/// Create the file serving routes.
///
/// Every path goes through the same dispatcher; `get` also answers `HEAD`
/// and rejects other methods with 405.
pub fn serve_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::serve))
        .route("/{*path}", get(handlers::serve))
}
