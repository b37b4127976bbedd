use std::path::{Path, PathBuf};
use std::time::SystemTime;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use crate::archive::{self, ZipLimits};
use crate::error::FileServerError;
use crate::listing;
use crate::paths::{decode_request_path, resolve_path};
use crate::AppState;

/// Documents served in place of a listing when `serve_index` is enabled
const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Query parameters understood on every path
#[derive(Debug, Default)]
pub struct ServeQuery {
    /// `zip=1` on a directory requests it as a ZIP download
    pub zip: Option<String>,
}

/// How a streamed file is presented to the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Offered as a download
    Attachment,
    /// Rendered in place, used for index documents
    Inline,
}

impl ServeQuery {
    /// Collect known parameters; the first occurrence of a repeated key wins.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let zip = pairs
            .into_iter()
            .find(|(key, _)| key == "zip")
            .map(|(_, value)| value);

        Self { zip }
    }

    pub fn wants_archive(&self) -> bool {
        self.zip.as_deref() == Some("1")
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// `Content-Disposition` value for a download named `file_name`.
///
/// The quoted `filename` is kept ASCII-only; names that needed substitution
/// also get an RFC 5987 `filename*` with the exact UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

/// Format a timestamp as an HTTP-date.
fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Parsed `If-Modified-Since`, in Unix seconds.
fn if_modified_since(headers: &HeaderMap) -> Option<i64> {
    let value = headers.get(header::IF_MODIFIED_SINCE)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.timestamp())
}

fn redirect_to_directory(uri: &Uri) -> Response {
    let location = match uri.query() {
        Some(query) => format!("{}/?{}", uri.path(), query),
        None => format!("{}/", uri.path()),
    };

    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

async fn find_index(dir: &Path) -> Option<PathBuf> {
    for name in INDEX_FILES {
        let candidate = dir.join(name);
        if fs::metadata(&candidate)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Some(candidate);
        }
    }
    None
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /<path> - Serve a file, a directory listing, or a directory as ZIP
pub async fn serve(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, FileServerError> {
    let query = ServeQuery::from_pairs(params);
    let request_path = decode_request_path(uri.path())?;
    let path = resolve_path(&state.root_dir, &request_path)?;

    let metadata = fs::metadata(&path)
        .await
        .map_err(|_| FileServerError::NotFound(request_path.clone()))?;

    if metadata.is_dir() {
        if query.wants_archive() {
            return download_archive(&state, path).await;
        }

        if !request_path.ends_with('/') {
            return Ok(redirect_to_directory(&uri));
        }

        if state.config.serve_index {
            if let Some(index) = find_index(&path).await {
                return serve_file(&index, &request_path, &headers, Disposition::Inline).await;
            }
        }

        return list_directory(&state, path).await;
    }

    if request_path.ends_with('/') {
        return Err(FileServerError::NotFound(request_path));
    }

    serve_file(&path, &request_path, &headers, Disposition::Attachment).await
}

/// Render the listing page for a directory.
async fn list_directory(state: &AppState, path: PathBuf) -> Result<Response, FileServerError> {
    let display_path = listing::display_path(&state.root_dir, &path);
    debug!("Listing directory: {}", path.display());

    let config = state.config.clone();
    let entries = tokio::task::spawn_blocking(move || listing::read_entries(&path, &config))
        .await
        .map_err(|err| FileServerError::ListingFailed(err.to_string()))??;

    let body = listing::render(&entries, &display_path);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_LENGTH, body.len().to_string()),
        ],
        body,
    )
        .into_response())
}

/// Build a ZIP of a directory in memory and send it as an attachment.
async fn download_archive(state: &AppState, path: PathBuf) -> Result<Response, FileServerError> {
    let zip_name = archive::archive_name(&path, &state.config.fallback_archive_name);
    let limits = ZipLimits::from_config(&state.config);

    debug!("Building archive for directory: {}", path.display());

    let zip_data = archive::build_archive(path.clone(), limits)
        .await
        .inspect_err(|e| error!("Failed to build archive for {}: {}", path.display(), e))?;

    info!("Serving {} ({} bytes)", zip_name, zip_data.len());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_LENGTH, zip_data.len().to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&zip_name)),
        ],
        zip_data,
    )
        .into_response())
}

/// Stream a regular file to the client.
///
/// Uses streaming to handle large files without loading them into memory.
async fn serve_file(
    path: &Path,
    request_path: &str,
    headers: &HeaderMap,
    disposition: Disposition,
) -> Result<Response, FileServerError> {
    let not_found = |e: std::io::Error| match e.kind() {
        std::io::ErrorKind::NotFound => FileServerError::NotFound(request_path.to_string()),
        _ => FileServerError::Io(e),
    };

    let metadata = fs::metadata(path).await.map_err(not_found)?;
    let modified = metadata.modified().ok();
    let last_modified = modified.map(http_date);

    if let (Some(modified), Some(since)) = (modified, if_modified_since(headers)) {
        if DateTime::<Utc>::from(modified).timestamp() <= since {
            debug!("Not modified: {}", path.display());
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            if let Some(value) = last_modified.and_then(|v| v.parse().ok()) {
                response.headers_mut().insert(header::LAST_MODIFIED, value);
            }
            return Ok(response);
        }
    }

    let file = fs::File::open(path).await.map_err(not_found)?;
    debug!("Streaming file: {}", path.display());

    let body = Body::from_stream(ReaderStream::new(file));

    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
        ],
        body,
    )
        .into_response();

    if disposition == Disposition::Attachment {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Ok(value) = content_disposition(&file_name).parse() {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    if let Some(value) = last_modified.and_then(|v| v.parse().ok()) {
        response.headers_mut().insert(header::LAST_MODIFIED, value);
    }

    Ok(response)
}
