//! HTTP cache validators
//!
//! `ETag`/`Last-Modified` generation and conditional request evaluation
//! (RFC 9110 §13). `If-None-Match` takes precedence over `If-Modified-Since`.

use chrono::{DateTime, SubsecRound, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Validators attached to a file response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    pub etag: String,
    /// File modification time, truncated to whole seconds
    pub last_modified: Option<DateTime<Utc>>,
}

impl Validators {
    pub fn new(content: &[u8], modified: Option<SystemTime>) -> Self {
        Self {
            etag: generate_etag(content),
            last_modified: modified.map(|t| DateTime::<Utc>::from(t).trunc_subsecs(0)),
        }
    }

    pub fn last_modified_header(&self) -> Option<String> {
        self.last_modified.map(format_http_date)
    }

    /// Whether the client's cached copy is still current
    pub fn is_not_modified(&self, if_none_match: Option<&str>, if_modified_since: Option<&str>) -> bool {
        if let Some(client_etags) = if_none_match {
            return etag_list_matches(client_etags, &self.etag);
        }

        match (self.last_modified, if_modified_since.and_then(parse_http_date)) {
            (Some(modified), Some(since)) => modified <= since,
            _ => false,
        }
    }
}

/// Strong `ETag` from content length and hash, e.g. `"1f4-9a3c..."`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// Weak comparison against a comma-separated `If-None-Match` list; `*` matches
/// any current representation.
fn etag_list_matches(client_etags: &str, etag: &str) -> bool {
    client_etags.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE).to_string()
}

/// Parse an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
