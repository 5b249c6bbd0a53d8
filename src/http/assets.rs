//! Embedded web UI.
//!
//! Two read-only content roots are compiled into the binary:
//!
//! ```text
//! ui/public/  → ContentRoot::Public  → served at /            (the site)
//! ui/assets/  → ContentRoot::Assets  → served at /assets/...  (terminal script and styles)
//! ```
//!
//! Roots are addressed by name, never by overlapping paths: a lookup under
//! `/assets` only ever consults the asset root, and the site handler never
//! consults it.

use std::borrow::Cow;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rust_embed::{EmbeddedFile, RustEmbed};

pub const ASSET_PREFIX: &str = "/assets";

const ASSET_NOT_FOUND: &str = "File not found";
const PAGE_NOT_FOUND: &str = "404 page not found";
const INDEX: &str = "index.html";

#[derive(RustEmbed)]
#[folder = "ui/public/"]
struct PublicSite;

#[derive(RustEmbed)]
#[folder = "ui/assets/"]
struct TerminalAssets;

/// A named root of embedded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRoot {
    Public,
    Assets,
}

impl ContentRoot {
    pub fn name(&self) -> &'static str {
        match self {
            ContentRoot::Public => "public",
            ContentRoot::Assets => "assets",
        }
    }

    /// Look up a file by its path relative to the root.
    pub fn get(&self, path: &str) -> Option<EmbeddedFile> {
        match self {
            ContentRoot::Public => PublicSite::get(path),
            ContentRoot::Assets => TerminalAssets::get(path),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Every file path in the root.
    pub fn paths(&self) -> Vec<Cow<'static, str>> {
        match self {
            ContentRoot::Public => PublicSite::iter().collect(),
            ContentRoot::Assets => TerminalAssets::iter().collect(),
        }
    }
}

/// Handler for `/assets` and everything below it.
///
/// The prefix is stripped and the remainder looked up in the asset root.
pub async fn serve_asset(uri: Uri, headers: HeaderMap) -> Response {
    let requested = uri
        .path()
        .strip_prefix(ASSET_PREFIX)
        .unwrap_or_default()
        .trim_start_matches('/');
    let Some(requested) = decode(requested) else {
        return (StatusCode::NOT_FOUND, ASSET_NOT_FOUND).into_response();
    };

    match ContentRoot::Assets.get(&requested) {
        Some(file) => file_response(&requested, file, &headers),
        None => {
            tracing::debug!(root = ContentRoot::Assets.name(), path = %requested, "Asset not found");
            (StatusCode::NOT_FOUND, ASSET_NOT_FOUND).into_response()
        }
    }
}

/// Fallback handler: static file server for the public site.
///
/// `.../` resolves to `.../index.html`, a directory requested without the
/// trailing slash is redirected to it, and `.../index.html` is redirected to
/// its directory.
pub async fn serve_public(uri: Uri, headers: HeaderMap) -> Response {
    let Some(path) = decode(uri.path()) else {
        return (StatusCode::NOT_FOUND, PAGE_NOT_FOUND).into_response();
    };

    if let Some(dir) = path.strip_suffix(INDEX) {
        if dir.ends_with('/') {
            return redirect(dir, uri.query());
        }
    }

    let relative = path.trim_start_matches('/');
    if relative.is_empty() || relative.ends_with('/') {
        let index = format!("{relative}{INDEX}");
        return match ContentRoot::Public.get(&index) {
            Some(file) => file_response(&index, file, &headers),
            None => not_found(&path),
        };
    }

    if let Some(file) = ContentRoot::Public.get(relative) {
        return file_response(relative, file, &headers);
    }

    if ContentRoot::Public.contains(&format!("{relative}/{INDEX}")) {
        return redirect(&format!("{path}/"), uri.query());
    }

    not_found(&path)
}

fn not_found(path: &str) -> Response {
    tracing::debug!(root = ContentRoot::Public.name(), path = %path, "Page not found");
    (StatusCode::NOT_FOUND, PAGE_NOT_FOUND).into_response()
}

fn decode(path: &str) -> Option<Cow<'_, str>> {
    let decoded = urlencoding::decode(path).ok()?;
    // Embedded roots have no parent directories to escape to, but reject
    // traversal segments rather than rely on lookup misses.
    if decoded.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(decoded)
}

fn redirect(location: &str, query: Option<&str>) -> Response {
    let location = match query {
        Some(query) => format!("{location}?{query}"),
        None => location.to_string(),
    };
    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, PAGE_NOT_FOUND).into_response(),
    }
}

/// Serve an embedded file with content type and entity tag.
fn file_response(path: &str, file: EmbeddedFile, request_headers: &HeaderMap) -> Response {
    let etag = entity_tag(&file);
    if not_modified(request_headers, &etag) {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, etag)
            .body(Body::empty())
            .unwrap_or_else(|_| StatusCode::NOT_MODIFIED.into_response());
    }

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::ETAG, etag)
        .body(Body::from(file.data))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn entity_tag(file: &EmbeddedFile) -> String {
    let hash: String = file
        .metadata
        .sha256_hash()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("\"{hash}\"")
}

fn not_modified(request_headers: &HeaderMap, etag: &str) -> bool {
    request_headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate.trim_start_matches("W/") == etag)
}
