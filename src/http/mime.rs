//! MIME type detection module
//!
//! Resolves a Content-Type from a file path's extension.

use std::path::Path;

/// Fallback when neither the extension nor the caller supplies a type
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Get MIME Content-Type based on file extension
///
/// Extension matching is case-insensitive.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.to_ascii_lowercase();
    let mime = match ext.as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" | "text" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",

        // Scripts and data
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Archives and documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",

        _ => return None,
    };
    Some(mime)
}

/// Look up the Content-Type of a path, falling back to `default`
///
/// # Examples
/// ```
/// use dish::http::mime::lookup;
/// assert_eq!(lookup("fixtures/hello.txt", None), "text/plain");
/// assert_eq!(lookup("blob.bin", Some("text/x-custom")), "text/x-custom");
/// assert_eq!(lookup("blob.bin", None), "application/octet-stream");
/// ```
pub fn lookup(path: impl AsRef<Path>, default: Option<&str>) -> String {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .and_then(content_type_for_extension)
        .or(default)
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Base type of a Content-Type value: the part before any `;` parameter, lowercased
pub fn base_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
