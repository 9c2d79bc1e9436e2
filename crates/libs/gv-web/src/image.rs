//! Byte responder for run images.

use std::path::Path;

use axum::{
    body::Body,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::prelude::*;

/// Content type inferred from the final segment's extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("avif") => "image/avif",
        Some("svg") => "image/svg+xml",
        Some("json") => "application/json",
        Some("jsonl" | "txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// `Cache-Control` value sent with every image.
pub fn cache_control(max_age_s: u64) -> String {
    format!("public, max-age={max_age_s}, immutable")
}

/// Stream the bytes of `path`, which must already be confined to its run.
pub async fn respond_with_file(path: &Path, max_age_s: u64) -> Result<Response> {
    let file = tokio::fs::File::open(path).await?;
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        debug!("{} is not a regular file", path.display());
        return Err(Error::FileNotFound);
    }
    let cache = HeaderValue::from_str(&cache_control(max_age_s))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"));
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(path)),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(metadata.len())),
            (header::CACHE_CONTROL, cache),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
