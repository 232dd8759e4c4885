//! Range-addressable video byte server.
//!
//! [`VideoRangeStreamer::serve`] decides status, headers and the byte window
//! for one request and hands back a reader positioned at the window. The
//! reader owns its own file handle: concurrent requests never share state,
//! and dropping the reader (client abort) closes the file.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};

use crate::byte_range::{self, ByteRange};
use crate::video_library::video_content_type;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("unsupported video format: {0}")]
    UnsupportedFormat(String),

    #[error("video file not found: {0}")]
    NotFound(String),

    #[error("range not satisfiable for {size} byte file")]
    RangeNotSatisfiable { size: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a successful `serve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// 200, full body.
    Full,
    /// 206, the requested window.
    Partial(ByteRange),
}

impl StreamStatus {
    pub fn code(&self) -> u16 {
        match self {
            Self::Full => 200,
            Self::Partial(_) => 206,
        }
    }
}

#[derive(Debug)]
pub struct StreamResponse {
    pub status: StreamStatus,
    pub content_type: &'static str,
    pub content_length: u64,
    pub file_size: u64,
    /// File reader limited to exactly `content_length` bytes.
    pub body: Take<File>,
}

impl StreamResponse {
    /// Response headers as `(name, value)` pairs.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("content-type", self.content_type.to_string()),
            ("content-length", self.content_length.to_string()),
            ("accept-ranges", "bytes".to_string()),
        ];
        if let StreamStatus::Partial(range) = self.status {
            headers.push(("content-range", range.content_range(self.file_size)));
        }
        headers
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VideoRangeStreamer;

impl VideoRangeStreamer {
    /// Serve `path`, honoring an optional raw `Range` header value.
    pub async fn serve(
        &self,
        path: &Path,
        range_header: Option<&str>,
    ) -> Result<StreamResponse, StreamError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let content_type = video_content_type(&name)
            .ok_or_else(|| StreamError::UnsupportedFormat(name.clone()))?;

        let mut file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StreamError::NotFound(name));
            }
            Err(e) => return Err(StreamError::Io(e)),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StreamError::NotFound(name));
        }
        let file_size = metadata.len();

        let requested = range_header.and_then(byte_range::parse_range_header);
        let Some(spec) = requested else {
            return Ok(StreamResponse {
                status: StreamStatus::Full,
                content_type,
                content_length: file_size,
                file_size,
                body: file.take(file_size),
            });
        };

        let range = byte_range::resolve(spec, file_size)
            .ok_or(StreamError::RangeNotSatisfiable { size: file_size })?;

        file.seek(std::io::SeekFrom::Start(range.start)).await?;
        Ok(StreamResponse {
            status: StreamStatus::Partial(range),
            content_type,
            content_length: range.length(),
            file_size,
            body: file.take(range.length()),
        })
    }
}
