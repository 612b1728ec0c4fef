//! HTTP response building module
//!
//! Builders for every response the server emits. Builders never panic: a
//! header that fails to build is logged and a bare response substituted.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::response::Builder;
use hyper::header::{
    ACCEPT_RANGES, ALLOW, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG,
    LAST_MODIFIED,
};
use hyper::{Response, StatusCode};

use super::cache::Validators;
use super::range::ByteRange;

pub type HttpResponse = Response<Full<Bytes>>;

/// Methods accepted on static paths
const STATIC_ALLOW: &str = "GET, HEAD, OPTIONS";

/// A file ready to be written out
pub struct FileBody<'a> {
    pub data: Bytes,
    pub content_type: &'a str,
    pub validators: &'a Validators,
    pub max_age: u32,
}

fn finish(builder: Builder, body: Bytes, label: &str) -> HttpResponse {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        crate::logger::log_error(&format!("Failed to build {label} response: {e}"));
        Response::new(Full::new(Bytes::new()))
    })
}

fn with_validators(mut builder: Builder, validators: &Validators, max_age: u32) -> Builder {
    builder = builder
        .header(ETAG, &validators.etag)
        .header(CACHE_CONTROL, format!("public, max-age={max_age}"));
    if let Some(last_modified) = validators.last_modified_header() {
        builder = builder.header(LAST_MODIFIED, last_modified);
    }
    builder
}

fn plain(status: StatusCode, text: &'static str) -> HttpResponse {
    let builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, text.len());
    finish(builder, Bytes::from_static(text.as_bytes()), status.as_str())
}

/// 200 with the whole file
pub fn build_file_response(file: FileBody<'_>, is_head: bool) -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, file.content_type)
        .header(CONTENT_LENGTH, file.data.len())
        .header(ACCEPT_RANGES, "bytes");
    let builder = with_validators(builder, file.validators, file.max_age);
    let body = if is_head { Bytes::new() } else { file.data };
    finish(builder, body, "200")
}

/// 206 with one byte range of the file
pub fn build_partial_response(file: FileBody<'_>, range: ByteRange, is_head: bool) -> HttpResponse {
    let total = file.data.len();
    let builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(CONTENT_TYPE, file.content_type)
        .header(CONTENT_LENGTH, range.len())
        .header(
            CONTENT_RANGE,
            format!("bytes {}-{}/{total}", range.start, range.end),
        )
        .header(ACCEPT_RANGES, "bytes");
    let builder = with_validators(builder, file.validators, file.max_age);
    let body = if is_head {
        Bytes::new()
    } else {
        file.data.slice(range.start..=range.end)
    };
    finish(builder, body, "206")
}

/// 304 Not Modified, repeating the validators
pub fn build_304_response(validators: &Validators, max_age: u32) -> HttpResponse {
    let builder = with_validators(
        Response::builder().status(StatusCode::NOT_MODIFIED),
        validators,
        max_age,
    );
    finish(builder, Bytes::new(), "304")
}

/// 416 Range Not Satisfiable
pub fn build_416_response(size: usize) -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_RANGE, format!("bytes */{size}"))
        .header(CONTENT_TYPE, "text/plain; charset=utf-8");
    finish(builder, Bytes::from_static(b"416 Range Not Satisfiable"), "416")
}

/// 404 rendered from the site's not-found document
pub fn build_not_found_document(document: Bytes, is_head: bool) -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CONTENT_LENGTH, document.len())
        .header(CACHE_CONTROL, "no-cache");
    let body = if is_head { Bytes::new() } else { document };
    finish(builder, body, "404")
}

/// Plain 404, used when the site has no not-found document
pub fn build_404_response() -> HttpResponse {
    plain(StatusCode::NOT_FOUND, "404 Not Found")
}

pub fn build_400_response() -> HttpResponse {
    plain(StatusCode::BAD_REQUEST, "400 Bad Request")
}

pub fn build_413_response() -> HttpResponse {
    plain(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

pub fn build_405_response() -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, STATIC_ALLOW)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8");
    finish(builder, Bytes::from_static(b"405 Method Not Allowed"), "405")
}

/// 204 answer to OPTIONS
pub fn build_options_response() -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, STATIC_ALLOW);
    finish(builder, Bytes::new(), "OPTIONS")
}

/// Empty 200, the webhook acknowledgement
pub fn build_empty_response() -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_LENGTH, 0);
    finish(builder, Bytes::new(), "200")
}
