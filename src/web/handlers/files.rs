//! File listing and download handlers.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use tokio_util::io::ReaderStream;
use url::{Position, Url};

use crate::web::auth::query_key;
use crate::web::error::WebError;
use crate::web::state::AppState;

/// List the CSV logs.
///
/// Answers a JSON array of names when the client accepts
/// `application/json`, otherwise an HTML page of download links. Links repeat
/// the `?key=` the page was opened with so they can be followed in a browser.
pub async fn list_files(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let store = state.store().clone();
    let files = tokio::task::spawn_blocking(move || store.list_files()).await??;

    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    if wants_json {
        return Ok(Json(files).into_response());
    }

    let key = query_key(&uri);
    Ok(Html(render_listing(&files, key.as_deref())).into_response())
}

/// Stream one file from the storage directory as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, WebError> {
    let store = state.store().clone();
    let lookup = name.clone();
    let path = tokio::task::spawn_blocking(move || store.resolve_file(&lookup)).await??;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| WebError::Internal(format!("Failed to open {}: {}", path.display(), e)))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| WebError::Internal(format!("Failed to stat {}: {}", path.display(), e)))?
        .len();
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    tracing::info!(file = %name, bytes = len, "Serving download");

    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, len)
        .header(header::CONTENT_DISPOSITION, content_disposition(&name))
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| WebError::Internal(format!("Failed to build download response: {}", e)))
}

/// `Content-Disposition` for a download.
///
/// Names that are not plain printable ASCII get an ASCII `filename=` fallback
/// plus an RFC 5987 `filename*=` carrying the UTF-8 name.
fn content_disposition(name: &str) -> String {
    let plain = name.chars().all(|c| c.is_ascii() && !c.is_ascii_control());
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if plain && fallback == name {
        return format!("attachment; filename=\"{}\"", name);
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        encode_ext_value(name)
    )
}

/// Percent-encode everything outside RFC 5987 `attr-char`.
fn encode_ext_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

fn render_listing(files: &[String], key: Option<&str>) -> String {
    let links: String = files
        .iter()
        .map(|file| {
            format!(
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&download_href(file, key)),
                escape_html(file)
            )
        })
        .collect();

    format!(
        "<html>\n  <head><title>Available Files</title></head>\n  <body>\n    \
         <h2>Available Files</h2>\n    <ul>{}</ul>\n  </body>\n</html>\n",
        links
    )
}

/// Relative link to a file, path segment and query percent-encoded.
fn download_href(name: &str, key: Option<&str>) -> String {
    let Ok(mut url) = Url::parse("http://localhost/files") else {
        return format!("/files/{}", name);
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(name);
    }
    if let Some(key) = key {
        url.query_pairs_mut().append_pair("key", key);
    }
    url[Position::BeforePath..].to_string()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
