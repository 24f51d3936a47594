//! Image intake: MIME filtering and timestamp-named storage of uploads.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};

/// Multipart field carrying the upload.
pub const IMAGE_FIELD: &str = "image";

pub const ACCEPTED_TYPES: &[&str] = &["image/png", "image/jpg", "image/jpeg"];

/// Characters escaped in the stored name when it becomes a URL path segment.
/// `:` stays literal so timestamps read naturally.
const SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b':');

/// An upload that passed the MIME filter and is waiting to be written.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

pub fn accepts(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_TYPES.contains(&essence.as_str())
}

/// `<ISO-8601 UTC timestamp>-<original name>`, the original reduced to its last
/// path component.
pub fn stored_name(now: DateTime<Utc>, original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or("upload");
    format!(
        "{}-{}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
        base
    )
}

/// A written upload: where it sits on disk and the `imageUrl` pointing at it.
#[derive(Debug, Clone)]
pub struct SavedImage {
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ImageIntake {
    dir: PathBuf,
    url_prefix: String,
}

impl ImageIntake {
    pub fn new(dir: PathBuf, url_prefix: String) -> Self {
        Self { dir, url_prefix }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the image verbatim under its timestamped name.
    pub async fn save(&self, image: UploadedImage) -> std::io::Result<SavedImage> {
        let name = stored_name(Utc::now(), &image.file_name);
        let path = self.dir.join(&name);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &image.bytes).await?;

        tracing::info!(
            "Stored {} upload ({} bytes) as {}",
            image.content_type,
            image.bytes.len(),
            name
        );
        Ok(SavedImage {
            url: self.url_for(&name),
            path,
        })
    }

    /// Removes an upload that no post ended up referencing. Failures are only
    /// logged.
    pub async fn discard(&self, saved: &SavedImage) {
        if let Err(e) = tokio::fs::remove_file(&saved.path).await {
            tracing::warn!("Could not remove orphaned upload {:?}: {}", saved.path, e);
        }
    }

    fn url_for(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.url_prefix.trim_matches('/'),
            utf8_percent_encode(name, SEGMENT_SET)
        )
    }
}
