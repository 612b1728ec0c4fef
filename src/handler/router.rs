//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: the webhook POST goes to the
//! rebuild trigger, GET/HEAD go to the static responder.

use crate::config::AppState;
use crate::handler::{static_files, webhook};
use crate::http::{self, HttpResponse};
use crate::logger;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, CONTENT_LENGTH, IF_MODIFIED_SINCE, IF_NONE_MATCH, RANGE};
use hyper::{HeaderMap, Method, Request};
use std::convert::Infallible;
use std::sync::Arc;

/// Request context encapsulating information needed for static serving
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub range_header: Option<String>,
}

impl<'a> RequestContext<'a> {
    fn from_parts(path: &'a str, method: &Method, headers: &HeaderMap) -> Self {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            path,
            is_head: method == Method::HEAD,
            if_none_match: header(IF_NONE_MATCH),
            if_modified_since: header(IF_MODIFIED_SINCE),
            range_header: header(RANGE),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    // 1. Webhook
    if req.method() == Method::POST && is_webhook_path(req.uri().path(), &state) {
        if let Some(trigger) = &state.rebuild {
            if let Some(resp) = check_body_size(req.headers(), state.config.http.max_body_size) {
                return Ok(resp);
            }
            let resp =
                webhook::handle_webhook(req, trigger, state.config.http.max_body_size).await;
            return Ok(resp);
        }
    }

    // 2. Method check for static paths
    if let Some(resp) = check_http_method(req.method()) {
        return Ok(resp);
    }

    // 3. Static responder
    let ctx = RequestContext::from_parts(req.uri().path(), req.method(), req.headers());
    Ok(static_files::serve(&ctx, &state.config.site, state.config.http.cache_max_age).await)
}

fn is_webhook_path(path: &str, state: &AppState) -> bool {
    state.webhook_path.as_deref() == Some(path)
}

/// Return early response for anything but GET/HEAD
fn check_http_method(method: &Method) -> Option<HttpResponse> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<HttpResponse> {
    let size_str = headers.get(CONTENT_LENGTH)?.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        _ => None,
    }
}
