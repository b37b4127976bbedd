//! In-memory ZIP assembly for directory downloads.
//!
//! The complete archive is built before anything is sent, so the response
//! carries an exact `Content-Length` and a failed build never leaks a
//! truncated archive to the client.

use std::fs::Metadata;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::config::Config;
use crate::error::FileServerError;

/// Upper bounds for a single archive build. Zero disables a bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipLimits {
    pub max_bytes: u64,
    pub max_entries: u64,
}

impl ZipLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_bytes: config.max_zip_bytes,
            max_entries: config.max_zip_entries,
        }
    }
}

/// Suggested download name for an archive of `dir`.
pub fn archive_name(dir: &Path, fallback: &str) -> String {
    let base = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback.to_string());

    format!("{}.zip", base)
}

/// Build the archive on the blocking pool.
pub async fn build_archive(dir: PathBuf, limits: ZipLimits) -> Result<Vec<u8>, FileServerError> {
    tokio::task::spawn_blocking(move || build(&dir, limits))
        .await
        .map_err(|err| FileServerError::ArchiveFailed(err.to_string()))?
}

/// Walk `dir` recursively and pack every file into a deflated ZIP.
///
/// Entry names are relative to `dir` and always use `/` as separator.
/// Symbolic links are followed; a link cycle is reported by the walk and
/// aborts the build like any other I/O error.
pub fn build(dir: &Path, limits: ZipLimits) -> Result<Vec<u8>, FileServerError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut total_bytes = 0u64;
    let mut total_entries = 0u64;

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| FileServerError::ArchiveFailed(e.to_string()))?;

        if !entry.file_type().is_file() {
            continue;
        }

        let entry_path = entry.path();
        let metadata = entry
            .metadata()
            .map_err(|e| FileServerError::ArchiveFailed(e.to_string()))?;

        track_zip_entry(metadata.len(), &mut total_bytes, &mut total_entries, limits)?;

        let name = archive_entry_name(dir, entry_path);
        debug!("Adding {} to archive", name);

        zip.start_file(name.as_str(), entry_options(&metadata))
            .map_err(|e| FileServerError::ArchiveFailed(e.to_string()))?;
        let mut input = std::fs::File::open(entry_path).map_err(|e| {
            FileServerError::ArchiveFailed(format!("{}: {}", entry_path.display(), e))
        })?;
        std::io::copy(&mut input, &mut zip).map_err(|e| {
            FileServerError::ArchiveFailed(format!("{}: {}", entry_path.display(), e))
        })?;
    }

    let buffer = zip
        .finish()
        .map_err(|e| FileServerError::ArchiveFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

fn archive_entry_name(dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn entry_options(metadata: &Metadata) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .large_file(metadata.len() >= u32::MAX as u64);

    if let Some(modified) = metadata.modified().ok().and_then(zip_timestamp) {
        options = options.last_modified_time(modified);
    }

    options.unix_permissions(file_mode(metadata))
}

/// DOS timestamps only cover 1980..=2107; anything else keeps the default.
fn zip_timestamp(time: SystemTime) -> Option<zip::DateTime> {
    let local = DateTime::<Local>::from(time);
    let year = u16::try_from(local.year()).ok()?;

    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &Metadata) -> u32 {
    0o644
}

fn track_zip_entry(
    size: u64,
    total_bytes: &mut u64,
    total_entries: &mut u64,
    limits: ZipLimits,
) -> Result<(), FileServerError> {
    *total_entries = total_entries.saturating_add(1);
    *total_bytes = total_bytes.saturating_add(size);

    if limits.max_entries > 0 && *total_entries > limits.max_entries {
        return Err(FileServerError::ZipTooManyEntries {
            entries: *total_entries,
            limit: limits.max_entries,
        });
    }

    if limits.max_bytes > 0 && *total_bytes > limits.max_bytes {
        return Err(FileServerError::ZipTooLarge {
            size: *total_bytes,
            limit: limits.max_bytes,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn extract(data: Vec<u8>) -> Vec<(String, String)> {
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

    #[test]
    fn test_build_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("a.txt"), "hello").unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("sub/b.txt"), "world").unwrap();

        let data = build(root, ZipLimits::default()).unwrap();
        let files = extract(data);

        assert_eq!(
            files,
            vec![
                ("a.txt".to_string(), "hello".to_string()),
                ("sub/b.txt".to_string(), "world".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_uses_deflate() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("big.txt"), "z".repeat(64 * 1024)).unwrap();

        let data = build(temp_dir.path(), ZipLimits::default()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        let file = archive.by_index(0).unwrap();

        assert_eq!(file.compression(), zip::CompressionMethod::Deflated);
        assert!(file.compressed_size() < file.size());
    }

    #[test]
    fn test_build_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let data = build(temp_dir.path(), ZipLimits::default()).unwrap();
        let archive = ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn test_build_skips_empty_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("empty/deeper")).unwrap();
        std::fs::write(temp_dir.path().join("keep.txt"), "k").unwrap();

        let files = extract(build(temp_dir.path(), ZipLimits::default()).unwrap());
        assert_eq!(files, vec![("keep.txt".to_string(), "k".to_string())]);
    }

    #[test]
    fn test_build_only_covers_requested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("outside.txt"), "no").unwrap();
        std::fs::create_dir(root.join("docs")).unwrap();
        std::fs::write(root.join("docs/inside.txt"), "yes").unwrap();

        let files = extract(build(&root.join("docs"), ZipLimits::default()).unwrap());
        assert_eq!(files, vec![("inside.txt".to_string(), "yes".to_string())]);
    }

    #[test]
    fn test_build_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();

        let result = build(&temp_dir.path().join("gone"), ZipLimits::default());
        assert!(matches!(result, Err(FileServerError::ArchiveFailed(_))));
    }

    #[test]
    fn test_build_enforces_entry_limit() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["1.txt", "2.txt", "3.txt"] {
            std::fs::write(temp_dir.path().join(name), "x").unwrap();
        }

        let limits = ZipLimits {
            max_bytes: 0,
            max_entries: 2,
        };
        let result = build(temp_dir.path(), limits);
        assert!(matches!(
            result,
            Err(FileServerError::ZipTooManyEntries {
                entries: 3,
                limit: 2
            })
        ));
    }

    #[test]
    fn test_build_enforces_byte_limit() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("big.bin"), vec![0u8; 2048]).unwrap();

        let limits = ZipLimits {
            max_bytes: 1024,
            max_entries: 0,
        };
        let result = build(temp_dir.path(), limits);
        assert!(matches!(
            result,
            Err(FileServerError::ZipTooLarge {
                size: 2048,
                limit: 1024
            })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_build_follows_file_symlinks() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("target.txt"), "linked").unwrap();
        symlink(outside.path().join("target.txt"), temp_dir.path().join("link.txt")).unwrap();

        let files = extract(build(temp_dir.path(), ZipLimits::default()).unwrap());
        assert_eq!(files, vec![("link.txt".to_string(), "linked".to_string())]);
    }

    #[tokio::test]
    async fn test_build_archive_on_blocking_pool() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "hello").unwrap();

        let data = build_archive(temp_dir.path().to_path_buf(), ZipLimits::default())
            .await
            .unwrap();
        assert_eq!(extract(data).len(), 1);
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name(Path::new("/srv/share/photos"), "archive"), "photos.zip");
        assert_eq!(archive_name(Path::new("/"), "archive"), "archive.zip");
        assert_eq!(archive_name(Path::new("/srv/my docs"), "archive"), "my docs.zip");
    }

    #[test]
    fn test_zip_limits_from_config() {
        let config = Config {
            max_zip_bytes: 10,
            max_zip_entries: 3,
            ..Config::default()
        };
        let limits = ZipLimits::from_config(&config);
        assert_eq!(limits.max_bytes, 10);
        assert_eq!(limits.max_entries, 3);
    }
}
