//! Mapping of request paths onto the served root.
//!
//! Everything here is lexical: no filesystem call is made, so a request that
//! would escape the root is rejected before anything on disk is touched.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use tracing::{error, warn};

use crate::error::FileServerError;

/// Percent-decode the path part of a request URI.
pub fn decode_request_path(raw: &str) -> Result<String, FileServerError> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| FileServerError::InvalidPath(raw.to_string()))
}

/// Resolve a decoded request path to a location at or below `root`.
///
/// `.` segments are dropped and `..` segments pop the previous segment, so
/// `a/../b` resolves to `root/b`. A `..` with nothing left to pop would leave
/// the root and is rejected with [`FileServerError::PathTraversal`].
pub fn resolve_path(root: &Path, relative: &str) -> Result<PathBuf, FileServerError> {
    let relative = relative.trim_start_matches('/');

    if relative.is_empty() || relative == "." {
        return Ok(root.to_path_buf());
    }

    let mut segments: Vec<&OsStr> = Vec::new();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(name) => {
                if name.to_string_lossy().contains('\0') {
                    warn!("Path component contains null byte: {:?}", name);
                    return Err(FileServerError::PathTraversal);
                }
                segments.push(name);
            }
            Component::ParentDir => {
                if segments.pop().is_none() {
                    warn!("Path traversal attempt detected: {:?}", relative);
                    return Err(FileServerError::PathTraversal);
                }
            }
            Component::CurDir => continue,
            Component::RootDir | Component::Prefix(_) => {
                warn!("Absolute path component in request path: {:?}", relative);
                return Err(FileServerError::PathTraversal);
            }
        }
    }

    let mut result = root.to_path_buf();
    result.extend(segments);

    if !result.starts_with(root) {
        error!("Path resolution resulted in path outside root: {:?}", result);
        return Err(FileServerError::PathTraversal);
    }

    Ok(result)
}
