//! Static file serving module
//!
//! Maps request paths onto the content root, applies conditional GET and
//! Range handling, and renders the site's not-found document for misses.

use crate::config::SiteConfig;
use crate::error::PathError;
use crate::handler::router::RequestContext;
use crate::http::cache::Validators;
use crate::http::response::{
    build_file_response, build_not_found_document, build_partial_response, FileBody,
};
use crate::http::{self, mime, HttpResponse, RangeOutcome};
use crate::logger;
use hyper::body::Bytes;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// A file read from the content root
struct LoadedFile {
    data: Bytes,
    modified: Option<SystemTime>,
    content_type: &'static str,
}

/// Serve `ctx.path` from the content root
pub async fn serve(ctx: &RequestContext<'_>, site: &SiteConfig, max_age: u32) -> HttpResponse {
    let relative = match relative_path(ctx.path) {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!("Rejected path '{}': {e}", ctx.path));
            return http::build_400_response();
        }
    };

    let Some(path) = locate(&site.root, &relative, &site.index_file).await else {
        return serve_not_found(ctx, site).await;
    };

    match load_file(&path).await {
        Some(file) => build_static_file_response(ctx, file, max_age),
        None => serve_not_found(ctx, site).await,
    }
}

/// Render the configured not-found document with status 404
pub async fn serve_not_found(ctx: &RequestContext<'_>, site: &SiteConfig) -> HttpResponse {
    match fs::read(site.root.join(&site.not_found_file)).await {
        Ok(document) => build_not_found_document(Bytes::from(document), ctx.is_head),
        Err(_) => http::build_404_response(),
    }
}

/// Percent-decode a URL path and turn it into a path relative to the
/// content root. Fails closed: any `..` segment is rejected rather than
/// normalized.
pub fn relative_path(raw: &str) -> Result<PathBuf, PathError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| PathError::InvalidEncoding)?;

    if decoded.contains(['\0', '\\']) {
        return Err(PathError::ForbiddenCharacter);
    }

    let mut relative = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(PathError::Traversal),
            name => relative.push(name),
        }
    }

    // Only plain names may remain
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(PathError::Traversal);
    }
    Ok(relative)
}

/// Find the file to serve for `relative`: the file itself, or the index
/// document of a directory. Symlinks leading outside the root are refused.
async fn locate(root: &Path, relative: &Path, index_file: &str) -> Option<PathBuf> {
    let canonical_root = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Content root '{}' not accessible: {e}",
                root.display()
            ));
            return None;
        }
    };

    let mut candidate = root.join(relative);
    if fs::metadata(&candidate).await.ok()?.is_dir() {
        candidate.push(index_file);
    }

    let canonical = fs::canonicalize(&candidate).await.ok()?;
    if !canonical.starts_with(&canonical_root) {
        logger::log_warning(&format!(
            "Path escapes content root: {} -> {}",
            relative.display(),
            canonical.display()
        ));
        return None;
    }

    fs::metadata(&canonical)
        .await
        .ok()
        .filter(std::fs::Metadata::is_file)
        .map(|_| canonical)
}

async fn load_file(path: &Path) -> Option<LoadedFile> {
    let data = match fs::read(path).await {
        Ok(d) => d,
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return None;
        }
    };
    let modified = fs::metadata(path).await.and_then(|m| m.modified()).ok();

    Some(LoadedFile {
        data: Bytes::from(data),
        modified,
        content_type: mime::content_type_for(path),
    })
}

/// Build the 200/206/304/416 response for a loaded file
fn build_static_file_response(
    ctx: &RequestContext<'_>,
    file: LoadedFile,
    max_age: u32,
) -> HttpResponse {
    let validators = Validators::new(&file.data, file.modified);

    if validators.is_not_modified(ctx.if_none_match.as_deref(), ctx.if_modified_since.as_deref()) {
        return http::build_304_response(&validators, max_age);
    }

    let size = file.data.len();
    let body = FileBody {
        data: file.data,
        content_type: file.content_type,
        validators: &validators,
        max_age,
    };

    match http::parse_range_header(ctx.range_header.as_deref(), size) {
        RangeOutcome::Full => build_file_response(body, ctx.is_head),
        RangeOutcome::Partial(range) => build_partial_response(body, range, ctx.is_head),
        RangeOutcome::NotSatisfiable => http::build_416_response(size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::StatusCode;

    fn site(root: &Path) -> SiteConfig {
        SiteConfig {
            root: root.to_path_buf(),
            index_file: "index.html".to_string(),
            not_found_file: "404.html".to_string(),
        }
    }

    fn ctx(path: &str) -> RequestContext<'_> {
        RequestContext {
            path,
            is_head: false,
            if_none_match: None,
            if_modified_since: None,
            range_header: None,
        }
    }

    fn populate(root: &Path) {
        std::fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(root.join("404.html"), "<h1>lost</h1>").unwrap();
        std::fs::create_dir_all(root.join("posts/hello")).unwrap();
        std::fs::write(root.join("posts/hello/index.html"), "<h1>hello</h1>").unwrap();
        std::fs::write(root.join("posts/hello/photo one.txt"), "pixels").unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();
    }

    async fn body_of(resp: HttpResponse) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("/").unwrap(), PathBuf::new());
        assert_eq!(
            relative_path("/posts//./hello/").unwrap(),
            PathBuf::from("posts/hello")
        );
        assert_eq!(
            relative_path("/posts/hello/photo%20one.txt").unwrap(),
            PathBuf::from("posts/hello/photo one.txt")
        );
    }

    #[test]
    fn test_relative_path_rejects_traversal() {
        for raw in ["/../etc/passwd", "/posts/../../x", "/%2e%2e/secret", "/a/..%2F..%2Fb"] {
            assert_eq!(relative_path(raw), Err(PathError::Traversal), "{raw}");
        }
        assert_eq!(
            relative_path("/a%00b"),
            Err(PathError::ForbiddenCharacter)
        );
        assert_eq!(
            relative_path("/a%5C..%5Cb"),
            Err(PathError::ForbiddenCharacter)
        );
        assert_eq!(relative_path("/%ff%fe"), Err(PathError::InvalidEncoding));
    }

    #[tokio::test]
    async fn test_serves_file_and_directory_index() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let site = site(dir.path());

        let resp = serve(&ctx("/"), &site, 60).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, "<h1>home</h1>");

        let resp = serve(&ctx("/posts/hello"), &site, 60).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, "<h1>hello</h1>");

        let resp = serve(&ctx("/posts/hello/photo%20one.txt"), &site, 60).await;
        assert_eq!(resp.headers()["content-type"], "text/plain; charset=utf-8");
        assert_eq!(body_of(resp).await, "pixels");
    }

    #[tokio::test]
    async fn test_missing_renders_not_found_document() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let site = site(dir.path());

        for path in ["/nonexistent/path", "/empty/", "/posts/hello/index.html/x"] {
            let resp = serve(&ctx(path), &site, 60).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
            assert_eq!(body_of(resp).await, "<h1>lost</h1>");
        }
    }

    #[tokio::test]
    async fn test_plain_404_without_document() {
        let dir = tempfile::tempdir().unwrap();
        let resp = serve(&ctx("/missing"), &site(dir.path()), 60).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(resp).await, "404 Not Found");
    }

    #[tokio::test]
    async fn test_traversal_never_leaves_root() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("public");
        std::fs::create_dir_all(&root).unwrap();
        populate(&root);
        let site = site(&root);

        let resp = serve(&ctx("/../secret.txt"), &site, 60).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = serve(&ctx("/%2e%2e/secret.txt"), &site, 60).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_ne!(body_of(resp).await, "top secret");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_not_found() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("public");
        std::fs::create_dir_all(&root).unwrap();
        populate(&root);
        std::os::unix::fs::symlink(outer.path().join("secret.txt"), root.join("leak.txt")).unwrap();

        let resp = serve(&ctx("/leak.txt"), &site(&root), 60).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(resp).await, "<h1>lost</h1>");
    }

    #[tokio::test]
    async fn test_conditional_get() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let site = site(dir.path());

        let first = serve(&ctx("/index.html"), &site, 60).await;
        let etag = first.headers()["etag"].to_str().unwrap().to_string();
        let last_modified = first.headers()["last-modified"].to_str().unwrap().to_string();

        let mut revalidate = ctx("/index.html");
        revalidate.if_none_match = Some(etag.clone());
        let resp = serve(&revalidate, &site, 60).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(resp.headers()["etag"], etag.as_str());
        assert!(body_of(resp).await.is_empty());

        let mut by_date = ctx("/index.html");
        by_date.if_modified_since = Some(last_modified);
        let resp = serve(&by_date, &site, 60).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

        let mut stale = ctx("/index.html");
        stale.if_none_match = Some("\"stale\"".to_string());
        let resp = serve(&stale, &site, 60).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_range_and_head() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let site = site(dir.path());

        let mut ranged = ctx("/index.html");
        ranged.range_header = Some("bytes=4-7".to_string());
        let resp = serve(&ranged, &site, 60).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_of(resp).await, "home");

        ranged.range_header = Some("bytes=999-".to_string());
        let resp = serve(&ranged, &site, 60).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);

        let mut head = ctx("/index.html");
        head.is_head = true;
        let resp = serve(&head, &site, 60).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-length"], "13");
        assert!(body_of(resp).await.is_empty());
    }
}
