//! Attachment specifications and their data sources.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use reqwest::Url;

/// Name used when nothing else determines one.
pub const FALLBACK_FILENAME: &str = "attachment";

/// Content type used for unknown extensions.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An attachment as requested by the caller.
///
/// Exactly one of `content`, `path`, `href` is expected to carry data.
/// When several do, the first in that order is used; when none do, the
/// attachment is skipped.
///
/// Zero-length data counts as no data: an empty `content` buffer, an empty
/// file at `path` and an empty body downloaded from `href` are all skipped
/// rather than attached as empty files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentSpec {
    pub filename: Option<String>,
    pub content: Option<Vec<u8>>,
    pub path: Option<PathBuf>,
    pub href: Option<String>,
}

impl AttachmentSpec {
    pub fn from_bytes(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: Some(filename.into()),
            content: Some(content),
            ..Default::default()
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn from_url(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Default::default()
        }
    }

    /// Overrides the derived filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Splits the spec into its source and resolved naming.
    ///
    /// Returns `None` when no data source is present.
    pub fn resolve(self) -> Option<(AttachmentSource, ResolvedAttachment)> {
        let filename = resolve_filename(
            self.filename.as_deref(),
            self.path.as_deref(),
            self.href.as_deref(),
        );
        let content_type = content_type_for(&filename).to_string();

        let (source, total_size) = if let Some(bytes) = self.content.filter(|c| !c.is_empty()) {
            let len = bytes.len() as u64;
            (AttachmentSource::Buffer(bytes), Some(len))
        } else if let Some(path) = self.path {
            (AttachmentSource::Path(path), None)
        } else if let Some(href) = self.href.filter(|h| !h.trim().is_empty()) {
            (AttachmentSource::Url(href), None)
        } else {
            return None;
        };

        Some((
            source,
            ResolvedAttachment {
                filename,
                content_type,
                total_size,
            },
        ))
    }
}

/// Where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// In-memory bytes; length known.
    Buffer(Vec<u8>),
    /// Local file; length known after a stat.
    Path(PathBuf),
    /// Remote http(s) URL; length possibly never known upfront.
    Url(String),
}

/// Naming and size of an attachment, derived once before transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub filename: String,
    pub content_type: String,
    pub total_size: Option<u64>,
}

impl ResolvedAttachment {
    pub fn with_size(mut self, size: u64) -> Self {
        self.total_size = Some(size);
        self
    }
}

/// Picks the filename: explicit, then path basename, then URL basename.
pub fn resolve_filename(explicit: Option<&str>, path: Option<&Path>, href: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| {
            path.and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
        })
        .or_else(|| href.and_then(url_basename))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Last non-empty path segment of a URL, percent-decoded.
fn url_basename(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    (!decoded.is_empty()).then_some(decoded)
}

/// Maps a filename extension to a content type.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("txt" | "log") => "text/plain",
        Some("csv") => "text/csv",
        Some("htm" | "html") => "text/html",
        Some("xml") => "application/xml",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("eml") => "message/rfc822",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
