//! Directory enumeration and the generated HTML listing page.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::config::Config;
use crate::error::FileServerError;

/// One child of a listed directory, read fresh from the filesystem.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    /// Byte size, files only
    pub size: Option<u64>,
    pub modified: Option<SystemTime>,
}

/// Enumerate `dir`, sorted case-insensitively by name.
///
/// Entries that disappear between enumeration and `stat` are skipped.
/// Symbolic links are reported as what they point to.
pub fn read_entries(dir: &Path, config: &Config) -> Result<Vec<DirEntry>, FileServerError> {
    let read_dir =
        std::fs::read_dir(dir).map_err(|e| FileServerError::ListingFailed(e.to_string()))?;

    let mut entries = Vec::new();

    for entry in read_dir {
        let entry = entry.map_err(|e| FileServerError::ListingFailed(e.to_string()))?;
        let name = entry.file_name().to_string_lossy().to_string();

        if config.is_hidden(&name) {
            continue;
        }

        let metadata = match std::fs::metadata(entry.path()).or_else(|_| entry.metadata()) {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping {:?} in listing: {}", entry.path(), e);
                continue;
            }
        };

        let is_dir = metadata.is_dir();
        entries.push(DirEntry {
            name,
            is_dir,
            size: (!is_dir).then(|| metadata.len()),
            modified: metadata.modified().ok(),
        });
    }

    // sort_by_key is stable: names equal ignoring case keep enumeration order
    entries.sort_by_key(|e| e.name.to_lowercase());

    Ok(entries)
}

/// Request path shown for `path`: `/` for the root, `/a/b/` below it.
pub fn display_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(Path::new(""));
    let mut display = String::from("/");
    for component in relative.components() {
        display.push_str(&component.as_os_str().to_string_lossy());
        display.push('/');
    }
    display
}

/// Render the listing page for `entries` under `display_path`.
///
/// The whole document is built before returning so the caller knows the
/// exact `Content-Length`.
pub fn render(entries: &[DirEntry], display_path: &str) -> Vec<u8> {
    let title = escape_html(display_path);
    let mut html = String::with_capacity(512 + entries.len() * 160);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>Directory listing for {}</title>\n", title));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h2>Directory listing for {}</h2>\n", title));
    html.push_str("<hr>\n<table>\n");
    html.push_str("<tr><th>Name</th><th>Size</th><th>Modified</th><th></th></tr>\n");

    if let Some(parent) = parent_href(display_path) {
        html.push_str(&format!(
            "<tr><td><a href=\"{}\">.. (parent directory)</a></td><td>-</td><td></td><td></td></tr>\n",
            escape_html(&parent)
        ));
    }

    for entry in entries {
        let name = escape_html(&entry.name);
        let link = escape_html(&urlencoding::encode(&entry.name));
        let modified = format_modified(entry.modified);

        if entry.is_dir {
            html.push_str(&format!(
                "<tr><td><a href=\"{link}/\">{name}/</a></td><td>-</td><td>{modified}</td>\
                 <td><a href=\"{link}/?zip=1\">[Download ZIP]</a></td></tr>\n"
            ));
        } else {
            let size = format_size(entry.size.unwrap_or(0));
            html.push_str(&format!(
                "<tr><td><a href=\"{link}\">{name}</a></td><td>{size}</td><td>{modified}</td><td></td></tr>\n"
            ));
        }
    }

    html.push_str("</table>\n<hr>\n</body>\n</html>\n");
    html.into_bytes()
}

/// Absolute link to the parent of `display_path`, or `None` at the root.
pub fn parent_href(display_path: &str) -> Option<String> {
    let trimmed = display_path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let parent = trimmed.rfind('/').map(|idx| &trimmed[..idx]).unwrap_or("");
    let encoded: Vec<String> = parent
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();

    Some(format!("{}/", encoded.join("/")))
}

/// Human-readable size with binary prefixes and one decimal place.
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 7] = ["B", "K", "M", "G", "T", "P", "E"];

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, UNITS[unit])
}

fn format_modified(modified: Option<SystemTime>) -> String {
    match modified {
        Some(time) => DateTime::<Local>::from(time)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
